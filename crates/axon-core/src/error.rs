//! Error taxonomy for the Axon network engine.
//!
//! Every fallible operation in the workspace reports one of the
//! [`NnError`] variants. None of them abort the process; callers decide
//! whether to retry with smaller requests.

use std::error::Error;
use std::fmt;

/// Convenience alias used throughout the workspace.
pub type NnResult<T> = Result<T, NnError>;

/// Errors reported by the allocator, network model and training drivers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NnError {
    /// The allocator is exhausted or the request exceeds the arena.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
        /// Largest block that could have been handed out, in bytes.
        available: usize,
    },
    /// Non-positive layer dimensions, exhausted layer capacity, a layer
    /// that does not chain onto its predecessor, or scratch built for a
    /// different network shape.
    InvalidShape {
        /// Human-readable description of the violated constraint.
        reason: String,
    },
    /// An operation that needs at least one layer was called on an empty
    /// network.
    NoNetwork,
    /// A layer, unit or record index is outside its valid range.
    IndexOutOfRange {
        /// What was being indexed (e.g. `"layer"`, `"weight"`).
        what: &'static str,
        /// The offending index.
        index: usize,
        /// Exclusive upper bound of the valid range.
        len: usize,
    },
    /// The network does not satisfy an operation's precondition, such as
    /// the Hebbian rule being requested on a multi-layer network.
    UnsuitablePrecondition {
        /// Description of the unmet precondition.
        reason: String,
    },
    /// An observation was appended to a store that is already full.
    DatasetCapacityExceeded {
        /// Capacity of the store, in records.
        capacity: usize,
    },
}

impl NnError {
    /// Shorthand for building an [`NnError::InvalidShape`].
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Shorthand for building an [`NnError::UnsuitablePrecondition`].
    pub fn unsuitable(reason: impl Into<String>) -> Self {
        Self::UnsuitablePrecondition {
            reason: reason.into(),
        }
    }

    /// Check `index < len`, producing [`NnError::IndexOutOfRange`] otherwise.
    pub fn check_index(what: &'static str, index: usize, len: usize) -> NnResult<()> {
        if index < len {
            Ok(())
        } else {
            Err(Self::IndexOutOfRange { what, index, len })
        }
    }
}

impl fmt::Display for NnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                available,
            } => {
                write!(
                    f,
                    "out of memory: requested {requested} bytes, largest free block {available} bytes"
                )
            }
            Self::InvalidShape { reason } => write!(f, "invalid shape: {reason}"),
            Self::NoNetwork => write!(f, "network has no layers"),
            Self::IndexOutOfRange { what, index, len } => {
                write!(f, "{what} index {index} out of range (len {len})")
            }
            Self::UnsuitablePrecondition { reason } => {
                write!(f, "unsuitable network: {reason}")
            }
            Self::DatasetCapacityExceeded { capacity } => {
                write!(f, "dataset capacity of {capacity} observations exceeded")
            }
        }
    }
}

impl Error for NnError {}
