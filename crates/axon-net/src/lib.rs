//! Dense feed-forward networks with online training.
//!
//! Every buffer the engine touches comes from a
//! [`BlockAllocator`](axon_arena::BlockAllocator): one block per layer
//! for parameters and activations, one block for backpropagation scratch,
//! and one for the observation store. On a target without a heap the
//! allocator is a [`BlockArena`](axon_arena::BlockArena).
//!
//! # Training cycle
//!
//! ```text
//! input_mut() ← x          output_mut() ← y          (stage one observation)
//! BackpropScratch::accumulate_gradients(Accumulate::Reset)
//!     E ← y; evaluate (recording P); E ← y − ŷ
//!     for k = last..=0: δ = E ⊙ φ'(P[k]); Bg[k] += δ; Wg[k] += δ xᵀ; E ← W[k]ᵀ δ
//! BackpropScratch::apply_gradients(eta)
//!     B += eta · Bg;  W += eta · Wg
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod backprop;
pub mod config;
pub mod forward;
pub mod hebbian;
pub mod layout;
pub mod network;
pub mod observations;
pub mod trainer;

pub use backprop::{cost, scratch_size, Accumulate, BackpropScratch, ScratchLayout};
pub use config::{ConfigError, TrainingConfig};
pub use forward::{evaluate, evaluate_recording};
pub use hebbian::{hebbian_step, hebbian_step_checked};
pub use layout::{InputSource, LayerLayout};
pub use network::{Layer, LayerView, LayerViewMut, Network};
pub use observations::ObservationStore;
pub use trainer::{
    train, train_epochs, train_from_seed, train_step, validate, TrainingReport, ValidationReport,
};
