use palwatch_rcon::RconError;
use thiserror::Error;

use crate::snapshot::ParseError;

/// Why a poll cycle was abandoned. The loop logs it and retries after one
/// interval.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("remote console: {0}")]
    Console(#[from] RconError),

    #[error("malformed player list: {0}")]
    Parse(#[from] ParseError),
}
