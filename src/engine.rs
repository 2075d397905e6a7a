//! Invocation of the external full-text engine.
use crate::error::{RecollOutlineError, Result};
use crate::query::Query;
use crate::session::PageWindow;
use log::{debug, info, warn};
use std::process::{Command, Output, Stdio};

/// Banner lines the engine prints ahead of the listed matches.
pub const RESULTS_BANNER_LINES: usize = 2;

/// What one engine invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    Matches(String),
    Empty,
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl EngineOutcome {
    /// Text on success (empty when there was nothing), error otherwise.
    pub fn into_text(self) -> Result<String> {
        match self {
            EngineOutcome::Matches(text) => Ok(text),
            EngineOutcome::Empty => Ok(String::new()),
            EngineOutcome::Failed {
                command,
                code,
                stderr,
            } => Err(RecollOutlineError::EngineUnavailable {
                command,
                code,
                stderr,
            }),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Engine {
    /// Summary block for the query: result count and timing.
    fn header(&self, query: &Query) -> EngineOutcome;

    /// Matches inside `window`, banner lines already removed.
    fn results(&self, query: &Query, window: &PageWindow) -> EngineOutcome;

    /// Starts an index update and returns without waiting for it.
    fn refresh_index(&self) -> Result<()>;
}

/// Runs the engine through `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellEngine {
    engine_command: String,
    index_command: String,
}

impl ShellEngine {
    pub fn new(engine_command: impl Into<String>, index_command: impl Into<String>) -> Self {
        Self {
            engine_command: engine_command.into(),
            index_command: index_command.into(),
        }
    }

    pub fn header_command(&self, query: &Query) -> String {
        format!("{} -Q '{}'", self.engine_command, query.sanitized())
    }

    pub fn results_command(&self, query: &Query, window: &PageWindow) -> String {
        format!(
            "{} -n '{}-{}' -q '{}'",
            self.engine_command,
            window.start(),
            window.page_size(),
            query.sanitized()
        )
    }

    fn run(&self, command_line: &str) -> EngineOutcome {
        debug!("Running engine: {command_line}");
        match Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) => classify(command_line, output),
            Err(e) => {
                warn!("Could not start shell for `{command_line}`: {e}");
                EngineOutcome::Failed {
                    command: command_line.to_string(),
                    code: None,
                    stderr: e.to_string(),
                }
            }
        }
    }
}

fn classify(command_line: &str, output: Output) -> EngineOutcome {
    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Engine returned {} bytes", stdout.len());
        EngineOutcome::Matches(stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(
            "Engine command `{command_line}` failed with {:?}: {stderr}",
            output.status.code()
        );
        EngineOutcome::Failed {
            command: command_line.to_string(),
            code: output.status.code(),
            stderr,
        }
    }
}

/// Drops the leading banner lines of a results listing.
pub fn strip_banner(text: &str) -> &str {
    let mut rest = text;
    for _ in 0..RESULTS_BANNER_LINES {
        match rest.find('\n') {
            Some(idx) => rest = &rest[idx + 1..],
            None => return "",
        }
    }
    rest
}

fn non_blank(text: String) -> EngineOutcome {
    if text.trim().is_empty() {
        EngineOutcome::Empty
    } else {
        EngineOutcome::Matches(text)
    }
}

impl Engine for ShellEngine {
    fn header(&self, query: &Query) -> EngineOutcome {
        match self.run(&self.header_command(query)) {
            EngineOutcome::Matches(text) => non_blank(text),
            other => other,
        }
    }

    fn results(&self, query: &Query, window: &PageWindow) -> EngineOutcome {
        match self.run(&self.results_command(query, window)) {
            EngineOutcome::Matches(text) => non_blank(strip_banner(&text).to_string()),
            other => other,
        }
    }

    fn refresh_index(&self) -> Result<()> {
        let detached = format!("{} >/dev/null 2>&1 &", self.index_command);
        info!("Launching index refresh: {}", self.index_command);
        // The shell backgrounds the indexer and exits at once.
        Command::new("sh")
            .arg("-c")
            .arg(&detached)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: usize, size: usize) -> PageWindow {
        let mut w = PageWindow::new(size);
        while w.start() < start {
            w.advance().unwrap();
        }
        w
    }

    #[test]
    fn command_lines_follow_engine_conventions() {
        let engine = ShellEngine::new("recoll -t -A", "recollindex");
        let q = Query::new("it's done");
        assert_eq!(engine.header_command(&q), r"recoll -t -A -Q 'it'\''s done'");
        assert_eq!(
            engine.results_command(&q, &window(20, 10)),
            r"recoll -t -A -n '20-10' -q 'it'\''s done'"
        );
    }

    #[test]
    fn strip_banner_drops_two_lines() {
        assert_eq!(strip_banner("a\nb\nc\nd\n"), "c\nd\n");
        assert_eq!(strip_banner("a\nb\n"), "");
        assert_eq!(strip_banner("only"), "");
    }

    #[test]
    fn failed_outcome_becomes_engine_error() {
        let outcome = EngineOutcome::Failed {
            command: "recoll".into(),
            code: Some(1),
            stderr: "no index".into(),
        };
        assert!(matches!(
            outcome.into_text(),
            Err(RecollOutlineError::EngineUnavailable { code: Some(1), .. })
        ));
        assert_eq!(EngineOutcome::Empty.into_text().unwrap(), "");
    }

    #[cfg(unix)]
    #[test]
    fn missing_engine_binary_is_reported_as_failure() {
        testing_logger::setup();
        let engine = ShellEngine::new("definitely-not-an-engine-binary -t -A", "true");
        match engine.header(&Query::new("x")) {
            EngineOutcome::Failed { code, .. } => assert_eq!(code, Some(127)),
            other => panic!("expected failure, got {other:?}"),
        }
        testing_logger::validate(|logs| {
            assert!(logs
                .iter()
                .any(|l| l.level == log::Level::Warn && l.body.contains("failed with Some(127)")));
        });
    }

    #[cfg(unix)]
    #[test]
    fn successful_run_without_matches_is_empty() {
        let engine = ShellEngine::new("printf 'banner\\ncount\\n' #", "true");
        assert_eq!(
            engine.results(&Query::new("x"), &window(0, 10)),
            EngineOutcome::Empty
        );
    }

    #[cfg(unix)]
    #[test]
    fn results_skip_banner_lines() {
        let engine = ShellEngine::new("printf 'banner\\ncount\\ntext/plain\\n' #", "true");
        assert_eq!(
            engine.results(&Query::new("x"), &window(0, 10)),
            EngineOutcome::Matches("text/plain\n".to_string())
        );
    }

    #[cfg(unix)]
    #[test]
    fn refresh_index_returns_immediately() {
        let engine = ShellEngine::new("true", "sleep 5");
        let started = std::time::Instant::now();
        engine.refresh_index().unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(4));
    }
}
