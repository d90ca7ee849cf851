//! Core types for the Axon network engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the rest of the workspace: the activation
//! functions, network shape descriptions, and the error taxonomy every
//! fallible operation reports through.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod activation;
pub mod error;
pub mod shape;

pub use activation::Activation;
pub use error::{NnError, NnResult};
pub use shape::{LayerSpec, NetworkShape};
