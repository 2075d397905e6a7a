//! Interactive browsing of result pages.
use crate::config::Config;
use crate::dispatch::{DispatchOptions, Dispatcher, Prompter};
use crate::engine::Engine;
use crate::error::{RecollOutlineError, Result as RecollResult};
use crate::formatter::{FormattedDocument, ResultFormatter};
use crate::query::Query;
use crate::session::{QueryHistory, SearchSession};
use crate::viewer::TerminalViewer;
use colored::Colorize;
use log::{error, info, warn};
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

/// Command processing result
#[derive(Debug, PartialEq, Eq)]
enum CommandResult {
    Continue,
    Quit,
}

/// Failures are shown to the user; the session carries on.
fn report<W: Write>(outcome: RecollResult<CommandResult>, out: &mut W) -> RecollResult<CommandResult> {
    match outcome {
        Ok(result) => Ok(result),
        Err(e) => {
            if e.is_recoverable() {
                warn!("{e}");
            } else {
                error!("{e}");
            }
            writeln!(out, "{}", e.to_string().red())?;
            Ok(CommandResult::Continue)
        }
    }
}

/// Holds the active search session and the page it is showing.
pub struct InteractiveBrowser<'a> {
    engine: &'a dyn Engine,
    prompter: Box<dyn Prompter + 'a>,
    formatter: ResultFormatter,
    config: Config,
    session: Option<SearchSession>,
    document: Option<FormattedDocument>,
    history: QueryHistory,
    color: bool,
}

impl<'a> InteractiveBrowser<'a> {
    pub fn new(engine: &'a dyn Engine, prompter: Box<dyn Prompter + 'a>, config: Config) -> Self {
        Self {
            engine,
            prompter,
            formatter: ResultFormatter::new(config.display.fill_column),
            color: config.display.color.enabled(),
            history: QueryHistory::new(config.search.history_size),
            config,
            session: None,
            document: None,
        }
    }

    pub fn document(&self) -> Option<&FormattedDocument> {
        self.document.as_ref()
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }

    /// Reads commands until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        initial_query: Option<&str>,
        input: R,
        out: &mut W,
    ) -> RecollResult<()> {
        info!("Starting interactive session");
        writeln!(out, "{}", "Type 'help' for commands, 'quit' to close".dimmed())?;

        if let Some(query) = initial_query.filter(|q| !q.trim().is_empty()) {
            let outcome = self.submit(query, out);
            report(outcome, out)?;
        }

        let mut lines = input.lines();
        loop {
            write!(out, "\n> ")?;
            out.flush()?;
            let Some(line) = lines.next() else {
                break;
            };
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let outcome = self.process_command(line, out);
            if report(outcome, out)? == CommandResult::Quit {
                break;
            }
        }

        info!("Interactive session closed");
        Ok(())
    }

    fn process_command<W: Write>(&mut self, input: &str, out: &mut W) -> RecollResult<CommandResult> {
        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        // Command words only count as commands with the arguments they
        // take; `index cards` or `open source` are queries.
        match (command, rest) {
            ("q" | "quit" | "close" | "exit", "") => {
                self.session = None;
                self.document = None;
                Ok(CommandResult::Quit)
            }
            ("h" | "help", "") => {
                self.show_help(out)?;
                Ok(CommandResult::Continue)
            }
            ("s" | "search", "") => {
                writeln!(out, "Usage: search <query>")?;
                Ok(CommandResult::Continue)
            }
            ("s" | "search", query) => self.submit(query, out),
            ("n" | "next", "") => self.page(out, true),
            ("p" | "prev" | "previous", "") => self.page(out, false),
            ("o" | "open", "") => {
                writeln!(out, "Usage: open <result number>")?;
                Ok(CommandResult::Continue)
            }
            ("o" | "open", arg) => match arg.parse::<usize>() {
                Ok(rank) => self.open(rank, out),
                Err(_) => self.submit(input, out),
            },
            ("r" | "refresh" | "index", "") => {
                self.engine.refresh_index()?;
                writeln!(out, "{}", "Index refresh started in the background".green())?;
                Ok(CommandResult::Continue)
            }
            ("w" | "write", "") => {
                writeln!(out, "Usage: write <file.org>")?;
                Ok(CommandResult::Continue)
            }
            ("w" | "write", file) => self.write_document(Path::new(file), out),
            ("history", "") => {
                self.show_history(out)?;
                Ok(CommandResult::Continue)
            }
            (recall, "") if recall.starts_with('!') => {
                let recalled = recall[1..]
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| self.history.get(n))
                    .map(str::to_string);
                match recalled {
                    Some(query) => self.submit(&query, out),
                    None => {
                        writeln!(out, "No such history entry: {recall}")?;
                        Ok(CommandResult::Continue)
                    }
                }
            }
            // Anything else is a query
            _ => self.submit(input, out),
        }
    }

    /// Starts a new session at the first page.
    fn submit<W: Write>(&mut self, text: &str, out: &mut W) -> RecollResult<CommandResult> {
        let query = Query::new(text);
        self.history.push(query.as_str());
        let session = SearchSession::new(query, self.config.search.results_per_page);
        let document = session.fetch(self.engine, &self.formatter)?;
        self.session = Some(session);
        self.show(document, out)
    }

    fn page<W: Write>(&mut self, out: &mut W, forward: bool) -> RecollResult<CommandResult> {
        let Some(session) = self.session.as_mut() else {
            writeln!(out, "No active search; type a query first")?;
            return Ok(CommandResult::Continue);
        };
        let document = if forward {
            session.next_page(self.engine, &self.formatter)?
        } else {
            session.previous_page(self.engine, &self.formatter)?
        };
        self.show(document, out)
    }

    fn show<W: Write>(&mut self, document: FormattedDocument, out: &mut W) -> RecollResult<CommandResult> {
        write!(out, "{}", self.formatter.to_text(&document, self.color)?)?;
        self.document = Some(document);
        Ok(CommandResult::Continue)
    }

    fn open<W: Write>(&mut self, rank: usize, out: &mut W) -> RecollResult<CommandResult> {
        let Some(entry) = self.document.as_ref().and_then(|d| d.entry_by_rank(rank)) else {
            writeln!(out, "No result [{rank}] on this page")?;
            return Ok(CommandResult::Continue);
        };
        let path = Path::new(&entry.link.target);
        if !path.is_file() {
            return Err(RecollOutlineError::MissingCapability(format!(
                "{} is not a local file",
                entry.link.target
            )));
        }
        let term = self
            .session
            .as_ref()
            .map(|s| s.query().reduced())
            .unwrap_or_default();

        let mut viewer = TerminalViewer::open(path, Some(entry.mime.as_str()), &self.config.open, self.color)?;
        let dispatcher = Dispatcher::new(DispatchOptions::from(&self.config.open));
        let report = dispatcher.dispatch(&mut viewer, &term, self.prompter.as_ref())?;

        writeln!(out, "{}", viewer.render())?;
        for notice in &report.notices {
            writeln!(out, "{}", notice.yellow())?;
        }
        Ok(CommandResult::Continue)
    }

    fn write_document<W: Write>(&self, path: &Path, out: &mut W) -> RecollResult<CommandResult> {
        let Some(document) = &self.document else {
            writeln!(out, "Nothing to write yet")?;
            return Ok(CommandResult::Continue);
        };
        fs::write(path, self.formatter.to_org(document)?)?;
        writeln!(out, "{}", format!("Wrote {}", path.display()).green())?;
        Ok(CommandResult::Continue)
    }

    fn show_history<W: Write>(&self, out: &mut W) -> RecollResult<()> {
        if self.history.is_empty() {
            writeln!(out, "No queries yet")?;
        }
        for (i, query) in self.history.iter().enumerate() {
            writeln!(out, "  !{}: {}", i + 1, query)?;
        }
        Ok(())
    }

    fn show_help<W: Write>(&self, out: &mut W) -> RecollResult<()> {
        writeln!(out, "\n{}", "Available commands:".green().bold())?;
        writeln!(out, "  {} - Search (any other text also searches)", "search <query>".yellow())?;
        writeln!(
            out,
            "  {}",
            "Commands other than search and write take no text; 'open source' searches".dimmed()
        )?;
        writeln!(out, "  {} - Next page", "next".yellow())?;
        writeln!(out, "  {} - Previous page", "prev".yellow())?;
        writeln!(out, "  {} - Open result and search it", "open <n>".yellow())?;
        writeln!(out, "  {} - Save page as an Org outline", "write <file>".yellow())?;
        writeln!(out, "  {} - Update the index in the background", "refresh".yellow())?;
        writeln!(out, "  {} - Show query history", "history".yellow())?;
        writeln!(out, "  {} - Repeat history entry n", "!<n>".yellow())?;
        writeln!(out, "  {} - Close the results view", "quit".yellow())?;
        Ok(())
    }
}
