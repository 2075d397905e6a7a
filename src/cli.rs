use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(long, value_parser, default_value_t = false, global = true)]
    pub verbose: bool,

    #[clap(long, value_parser, global = true)]
    pub log: Option<PathBuf>,

    /// Read configuration from this file instead of the usual locations
    #[clap(long, value_parser, global = true)]
    pub config: Option<PathBuf>,

    /// Number of results shown per page
    #[clap(long, value_parser, global = true)]
    pub page_size: Option<usize>,

    /// Engine command line, e.g. "recoll -t -A"
    #[clap(long, value_parser, global = true)]
    pub engine_command: Option<String>,

    /// Index refresh command line, e.g. "recollindex"
    #[clap(long, value_parser, global = true)]
    pub index_command: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one query and print a single page of results
    Search {
        #[clap(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Zero-based page number
        #[clap(long, value_parser, default_value_t = 0)]
        page: usize,

        #[clap(long, value_enum, default_value_t = OutputFormat::Org)]
        format: OutputFormat,

        /// Write the document to a file instead of stdout
        #[clap(short, long, value_parser)]
        output: Option<PathBuf>,
    },
    /// Browse results page by page
    Interactive {
        #[clap(num_args = 0..)]
        query: Vec<String>,
    },
    /// Open a document and search it for the query term
    Open {
        path: PathBuf,

        #[clap(short, long, value_parser)]
        query: Option<String>,

        /// MIME type reported by the engine, when known
        #[clap(long, value_parser)]
        mime: Option<String>,
    },
    /// Launch the index refresh in the background
    Index,
    /// Show the effective configuration, or write it to a file
    Config {
        #[clap(long, value_parser)]
        write: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        #[clap(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Org,
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Org => write!(f, "org"),
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => is_terminal::is_terminal(&std::io::stdout()),
        }
    }
}
