use rpa_agent_core::SnapshotError;
use rpa_agent_daemon::AgentError;
use thiserror::Error;

/// Failures surfaced at the process boundary.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    pub fn suggestion(&self) -> String {
        match self {
            CliError::Snapshot(SnapshotError::Io { .. }) => {
                "Check that the --tree path exists and is readable.".to_string()
            }
            CliError::Snapshot(SnapshotError::Parse(_)) => {
                "The snapshot must be a JSON object with class_name, text, clickable, scrollable and children fields."
                    .to_string()
            }
            CliError::Agent(e) => e.suggestion(),
            CliError::Output(_) => "This is a bug; please report it.".to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CliError::Agent(e) if e.is_retryable())
    }

    /// Converts to UNIX sysexits.h-compliant exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Snapshot(SnapshotError::Io { .. }) => 66, // EX_NOINPUT
            CliError::Snapshot(SnapshotError::Parse(_)) => 65,  // EX_DATAERR
            CliError::Agent(e) => e.exit_code(),
            CliError::Output(_) => 70, // EX_SOFTWARE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_exit_codes() {
        let missing = CliError::from(SnapshotError::Io {
            path: "missing.json".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert_eq!(missing.exit_code(), 66);
        assert!(missing.suggestion().contains("--tree"));
        assert!(!missing.is_retryable());

        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let malformed = CliError::from(SnapshotError::Parse(parse_err));
        assert_eq!(malformed.exit_code(), 65);
    }

    #[test]
    fn test_agent_errors_keep_their_codes() {
        let err = CliError::from(AgentError::AlreadyRunning);
        assert_eq!(err.exit_code(), 73);
        assert_eq!(err.to_string(), AgentError::AlreadyRunning.to_string());
    }
}
