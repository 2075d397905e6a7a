use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecollOutlineError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Search engine unavailable: `{command}` exited with {}", exit_summary(.code, .stderr))]
    EngineUnavailable {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{0}")]
    InvalidNavigation(String),

    #[error("Capability unavailable: {0}")]
    MissingCapability(String),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("An unexpected error occurred: {0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl RecollOutlineError {
    /// Errors the interactive loop reports and then carries on from.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RecollOutlineError::EngineUnavailable { .. }
                | RecollOutlineError::InvalidNavigation(_)
                | RecollOutlineError::MissingCapability(_)
        )
    }
}

fn exit_summary(code: &Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    };
    if stderr.is_empty() {
        status
    } else {
        format!("{status}: {stderr}")
    }
}

pub type Result<T> = std::result::Result<T, RecollOutlineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_unavailable_message_carries_status_and_stderr() {
        let err = RecollOutlineError::EngineUnavailable {
            command: "recoll -t -A -Q 'x'".to_string(),
            code: Some(127),
            stderr: "sh: recoll: not found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("status 127"));
        assert!(msg.contains("recoll: not found"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn signal_termination_is_described() {
        let err = RecollOutlineError::EngineUnavailable {
            command: "recoll".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().ends_with("exited with a signal"));
    }

    #[test]
    fn io_errors_are_fatal() {
        let err = RecollOutlineError::from(io::Error::other("boom"));
        assert!(!err.is_recoverable());
    }
}
