//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use axon_core::NnError;

/// Errors that can occur during allocator operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// No free block is large enough for the request.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
        /// Largest block that could have been handed out, in bytes.
        available: usize,
    },
    /// The arena configuration is unusable.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                available,
            } => {
                write!(
                    f,
                    "arena exhausted: requested {requested} bytes, largest free block {available} bytes"
                )
            }
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
        }
    }
}

impl Error for ArenaError {}

impl From<ArenaError> for NnError {
    fn from(e: ArenaError) -> Self {
        match e {
            ArenaError::OutOfMemory {
                requested,
                available,
            } => NnError::OutOfMemory {
                requested,
                available,
            },
            // An arena too small to hold anything behaves like an empty one.
            ArenaError::InvalidConfig { .. } => NnError::OutOfMemory {
                requested: 0,
                available: 0,
            },
        }
    }
}
