//! Host-visible status codes.
//!
//! [`HostStatus`] is the `repr(i16)` value the host reads back after a
//! call. Codes are stable: scripts compare against the raw numbers.

use std::fmt;

use axon_core::NnError;

/// Sticky status reported to the host.
///
/// `Ok` = 0, every error is positive. Values are stable.
#[repr(i16)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HostStatus {
    /// No error since the last reset.
    #[default]
    Ok = 0,
    /// The allocator could not satisfy a request.
    OutOfMemory = 1,
    /// The call needs a network and none is configured.
    NoNetwork = 2,
    /// A layer, unit or parameter index is out of range, or a fraction
    /// has a zero denominator.
    IndexOutOfRange = 3,
    /// The Hebbian rule was requested on a network other than a single
    /// identity layer.
    UnsuitableForHebbianRule = 4,
    /// The dataset is full.
    DatasetSizeExceeded = 5,
    /// Layer widths are zero or do not chain.
    InvalidShape = 6,
}

impl HostStatus {
    /// The raw code.
    pub fn code(self) -> i16 {
        self as i16
    }

    /// Whether this is [`HostStatus::Ok`].
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl From<&NnError> for HostStatus {
    fn from(e: &NnError) -> Self {
        match e {
            NnError::OutOfMemory { .. } => HostStatus::OutOfMemory,
            NnError::InvalidShape { .. } => HostStatus::InvalidShape,
            NnError::NoNetwork => HostStatus::NoNetwork,
            NnError::IndexOutOfRange { .. } => HostStatus::IndexOutOfRange,
            NnError::UnsuitablePrecondition { .. } => HostStatus::UnsuitableForHebbianRule,
            NnError::DatasetCapacityExceeded { .. } => HostStatus::DatasetSizeExceeded,
        }
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "ok",
            Self::OutOfMemory => "out of memory",
            Self::NoNetwork => "no network",
            Self::IndexOutOfRange => "index out of range",
            Self::UnsuitableForHebbianRule => "unsuitable for hebbian rule",
            Self::DatasetSizeExceeded => "dataset size exceeded",
            Self::InvalidShape => "invalid shape",
        };
        write!(f, "{name} ({})", self.code())
    }
}
