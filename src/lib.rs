pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod formatter;
pub mod interactive;
pub mod query;
pub mod report;
pub mod session;
pub mod viewer;

pub use crate::config::Config;
pub use crate::error::{RecollOutlineError, Result};
pub use clap::Parser;
pub use cli::{Cli, ColorChoice, Commands, OutputFormat};
pub use dispatch::{DispatchOptions, Dispatcher, FileKind, Viewer};
pub use engine::{Engine, EngineOutcome, ShellEngine};
pub use formatter::{FormattedDocument, ResultFormatter};
pub use interactive::InteractiveBrowser;
pub use query::{reduce, sanitize, Query};
pub use session::{PageWindow, QueryHistory, SearchSession};
pub use viewer::TerminalViewer;

/// Configuration from file (or `--config`) with command-line overrides applied.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(page_size) = cli.page_size {
        config.search.results_per_page = page_size;
    }
    if let Some(engine_command) = &cli.engine_command {
        config.search.engine_command = engine_command.clone();
    }
    if let Some(index_command) = &cli.index_command {
        config.search.index_command = index_command.clone();
    }
    config
        .validate()
        .map_err(|e| RecollOutlineError::Config(e.to_string()))?;
    Ok(config)
}

pub fn engine_from_config(config: &Config) -> ShellEngine {
    ShellEngine::new(
        config.search.engine_command.clone(),
        config.search.index_command.clone(),
    )
}
