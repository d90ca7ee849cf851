//! Axon: a minimal arena-backed feed-forward neural network engine with
//! online training.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Axon sub-crates. For most users, adding `axon` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use axon::prelude::*;
//!
//! // A 1 -> 1 linear network learning y = 2x.
//! let shape = NetworkShape::new(1).with_layer(1, Activation::Identity);
//! let mut net = Network::from_shape(HeapAllocator::new(), &shape).unwrap();
//! let mut scratch = BackpropScratch::new(&mut net).unwrap();
//!
//! let mut data = ObservationStore::new(HeapAllocator::new(), 1, 1, 4).unwrap();
//! for x in [0.0f32, 0.5, 1.0, -1.0] {
//!     data.push(&[x], &[2.0 * x]).unwrap();
//! }
//! train(&mut net, &mut scratch, &data, &TrainingConfig::new(0.1, 400)).unwrap();
//!
//! net.set_input(&[3.0]).unwrap();
//! evaluate(&mut net).unwrap();
//! assert!((net.output().unwrap()[0] - 6.0).abs() < 0.1);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `axon-core` | Activations, network shapes, the error taxonomy |
//! | [`arena`] | `axon-arena` | The block allocator trait, fixed arena and heap backends |
//! | [`net`] | `axon-net` | Network model, evaluation, backprop, Hebbian rule, datasets |
//! | [`host`] | `axon-host` | Fixed-point host bridge and sticky status codes |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Activations, shapes and errors (`axon-core`).
pub use axon_core as types;

/// Block allocation (`axon-arena`).
///
/// [`arena::BlockArena`] for fixed-memory targets, [`arena::HeapAllocator`]
/// where the global allocator is available.
pub use axon_arena as arena;

/// The network engine (`axon-net`).
///
/// Build a [`net::Network`], run [`net::evaluate`], train with
/// [`net::BackpropScratch`] or the drivers in [`net::trainer`].
pub use axon_net as net;

/// Fixed-point host bridge (`axon-host`).
///
/// A [`host::HostContext`] exchanges parameters as `i16` fractions and
/// records a sticky [`host::HostStatus`].
pub use axon_host as host;

/// Common imports for typical Axon usage.
///
/// ```rust
/// use axon::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use axon_core::{Activation, NetworkShape, NnError, NnResult};

    // Allocation
    pub use axon_arena::{BlockAllocator, BlockArena, HeapAllocator};

    // Network and training
    pub use axon_net::{
        cost, evaluate, hebbian_step, hebbian_step_checked, scratch_size, train, train_epochs,
        train_from_seed, train_step, validate, Accumulate, BackpropScratch, Network,
        ObservationStore, TrainingConfig,
    };

    // Host bridge
    pub use axon_host::{fraction_approx, HostContext, HostStatus};
}
