//! Training configuration and validation.

use std::error::Error;
use std::fmt;

use axon_core::NnError;

use crate::backprop::Accumulate;

/// Errors detected by [`TrainingConfig::validate`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The learning rate is NaN, infinite, zero or negative.
    InvalidEta {
        /// The rejected value.
        value: f32,
    },
    /// Training was requested with zero iterations.
    ZeroIterations,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEta { value } => {
                write!(f, "learning rate must be finite and positive, got {value}")
            }
            Self::ZeroIterations => write!(f, "iteration count must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

impl From<ConfigError> for NnError {
    fn from(e: ConfigError) -> Self {
        NnError::unsuitable(e.to_string())
    }
}

/// Parameters of a [`train`](crate::train) run.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingConfig {
    /// Learning rate. Default: 0.02.
    pub eta: f32,
    /// Number of single-observation steps. Default: 1.
    pub iterations: usize,
    /// [`Accumulate::Reset`] applies the gradient after every observation;
    /// [`Accumulate::Sum`] sums over each pass through the dataset and
    /// applies once per pass. Default: reset.
    pub accumulate: Accumulate,
    /// Seed that [`train_from_seed`](crate::train_from_seed) initialises
    /// the weights from. Default: 0.
    pub seed: u64,
}

impl TrainingConfig {
    /// Default learning rate.
    pub const DEFAULT_ETA: f32 = 0.02;
    /// Default number of iterations.
    pub const DEFAULT_ITERATIONS: usize = 1;

    /// Config with the given learning rate and iteration count.
    pub fn new(eta: f32, iterations: usize) -> Self {
        Self {
            eta,
            iterations,
            ..Self::default()
        }
    }

    /// The same config with a different initialisation seed.
    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    /// Check the learning rate and iteration count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.eta.is_finite() || self.eta <= 0.0 {
            return Err(ConfigError::InvalidEta { value: self.eta });
        }
        if self.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            eta: Self::DEFAULT_ETA,
            iterations: Self::DEFAULT_ITERATIONS,
            accumulate: Accumulate::Reset,
            seed: 0,
        }
    }
}
