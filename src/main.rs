use clap::CommandFactory;
use colored::*;
use env_logger::{Builder, Env, Target};
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use log::info;
use recoll_outline::config::Config;
use recoll_outline::dispatch::{AcceptPrompter, DispatchOptions, Dispatcher, Prompter, TerminalPrompter};
use recoll_outline::error::{RecollOutlineError, Result as RecollResult};
use recoll_outline::{
    engine_from_config, load_config, Cli, Commands, Engine, InteractiveBrowser, OutputFormat,
    PageWindow, Parser, Query, ResultFormatter, SearchSession, TerminalViewer,
};
use std::fs;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = setup_logging(&cli) {
        eprintln!("{}", e.to_string().red());
        return ExitCode::FAILURE;
    }

    let start_time = Instant::now();
    info!("Application started with command: {:?}", cli.command);

    let result = run(&cli);

    info!(
        "Application finished. Total elapsed time: {:.2?}",
        start_time.elapsed()
    );
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> RecollResult<()> {
    let config = load_config(cli)?;
    let engine = engine_from_config(&config);

    match &cli.command {
        Commands::Search {
            query,
            page,
            format,
            output,
        } => {
            let query = Query::new(query.join(" "));
            let window = PageWindow::at_page(config.search.results_per_page, *page)?;
            let formatter = ResultFormatter::new(config.display.fill_column);

            let pb = spinner();
            pb.set_message(format!("Searching for '{query}'..."));
            let fetched = SearchSession::with_window(query, window).fetch(&engine, &formatter);
            pb.finish_and_clear();
            let document = fetched?;

            let rendered = match format {
                OutputFormat::Org => formatter.to_org(&document)?,
                OutputFormat::Text => {
                    let color = output.is_none() && config.display.color.enabled();
                    formatter.to_text(&document, color)?
                }
                OutputFormat::Json => formatter.to_json(&document)?,
            };

            match output {
                Some(path) => {
                    fs::write(path, rendered)?;
                    println!("{}", format!("Wrote {}", path.display()).green());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Interactive { query } => {
            let initial = query.join(" ");
            let mut browser = InteractiveBrowser::new(&engine, prompter(), config);
            let stdin = io::stdin();
            browser.run(Some(initial.as_str()), stdin.lock(), &mut io::stdout())?;
        }
        Commands::Open { path, query, mime } => {
            open_document(&config, path, query.as_deref(), mime.as_deref())?;
        }
        Commands::Index => {
            engine.refresh_index()?;
            println!("{}", "Index refresh started in the background".green());
        }
        Commands::Config { write } => match write {
            Some(path) => {
                config.save(path)?;
                println!("{}", format!("Wrote {}", path.display()).green());
            }
            None => print!("{}", config.to_toml()?),
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "recoll-outline", &mut io::stdout());
        }
    }

    Ok(())
}

fn spinner() -> ProgressBar {
    if !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn prompter() -> Box<dyn Prompter> {
    if io::stdin().is_terminal() {
        Box::new(TerminalPrompter)
    } else {
        Box::new(AcceptPrompter)
    }
}

fn open_document(
    config: &Config,
    path: &Path,
    query: Option<&str>,
    mime: Option<&str>,
) -> RecollResult<()> {
    let term = query.map(|q| Query::new(q).reduced()).unwrap_or_default();
    let color = config.display.color.enabled();
    let mut viewer = TerminalViewer::open(path, mime, &config.open, color)?;
    let report = Dispatcher::new(DispatchOptions::from(&config.open)).dispatch(
        &mut viewer,
        &term,
        prompter().as_ref(),
    )?;

    println!("{}", viewer.render());
    for notice in &report.notices {
        println!("{}", notice.yellow());
    }
    Ok(())
}

fn setup_logging(cli: &Cli) -> RecollResult<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "{} [{}] [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });

    if let Some(log_path) = &cli.log {
        if let Some(parent_dir) = log_path.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                fs::create_dir_all(parent_dir).map_err(RecollOutlineError::Io)?;
            }
        }
        let log_file = fs::File::create(log_path).map_err(RecollOutlineError::Io)?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| RecollOutlineError::Other(e.to_string()))?;
    Ok(())
}
