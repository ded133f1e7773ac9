//! Error types for mudweave.

use thiserror::Error;

use crate::RoomId;

/// Main error type for mudweave operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Connecting to or talking to the remote game failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// A line hook failed while processing a line
    #[error("Hook error: {0}")]
    Hook(String),

    /// An exit would be registered twice on the same room
    #[error("Duplicate exit '{exit}' in room {room}")]
    TopologyConflict {
        /// Room that already owns the exit
        room: RoomId,
        /// Exit name
        exit: String,
    },

    /// A persisted map could not be parsed
    #[error("Malformed map file (line {line}): {reason}")]
    MalformedMap {
        /// 1-based line number where parsing stopped
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Room id is not part of the map
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    /// Exit, tag or map name that cannot be stored
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or parameters (generic)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
