//! Errors raised by the agent's connection and startup paths.
//!
//! Nothing here ever reaches the controller: transport failures are absorbed
//! by the reconnect loop, and command failures are reported as response text.
//! Only startup problems make it back to the caller of `run`.

use std::io;

use thiserror::Error;

/// Failure on the controller socket.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
    #[error("Connection timeout")]
    Timeout,
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Line exceeds size limit (max {max_bytes} bytes)")]
    LineTooLong { max_bytes: usize },
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => Self::ConnectionClosed,
            _ => Self::Io(err),
        }
    }
}

/// Agent startup and lifecycle errors.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid controller address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("The agent is already running")]
    AlreadyRunning,
    #[error("Failed to setup signal handler: {0}")]
    SignalSetup(String),
    #[error("Failed to create worker pool: {0}")]
    ThreadPool(String),
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },
}

impl AgentError {
    /// Returns a helpful suggestion for resolving the error.
    pub fn suggestion(&self) -> String {
        match self {
            AgentError::InvalidAddress { .. } => {
                "Check --host/--port or the RPA_IP and RPA_PORT environment variables.".to_string()
            }
            AgentError::AlreadyRunning => {
                "Only one connection loop may run per agent. Call shutdown() before starting again."
                    .to_string()
            }
            AgentError::SignalSetup(_) | AgentError::ThreadPool(_) => {
                "The process could not allocate OS resources. Check thread and signal limits."
                    .to_string()
            }
            AgentError::Connect { .. } => {
                "Make sure the controller is listening; the agent retries automatically."
                    .to_string()
            }
        }
    }

    /// Returns whether this error is potentially transient and may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::Connect { .. })
    }

    /// Converts to UNIX sysexits.h-compliant exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            AgentError::InvalidAddress { .. } => 64, // EX_USAGE
            AgentError::AlreadyRunning => 73,        // EX_CANTCREAT
            AgentError::SignalSetup(_) | AgentError::ThreadPool(_) => 71, // EX_OSERR
            AgentError::Connect { .. } => 74, // EX_IOERR
        }
    }
}
