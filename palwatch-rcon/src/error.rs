use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RconError {
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("authentication rejected: wrong password")]
    Auth,

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RconError {
    /// True when the session can no longer be used and a fresh connection is
    /// needed.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            RconError::Connect { .. } | RconError::Io(_) | RconError::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RconError>;
