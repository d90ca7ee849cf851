//! Test utilities for Axon development.
//!
//! Provides reference datasets ([`fixtures`]), network builders and float
//! comparison helpers shared by the integration tests, benchmarks and
//! examples of every crate in the workspace.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use axon_arena::{BlockArena, HeapAllocator};
use axon_core::{Activation, NetworkShape};
use axon_net::Network;

/// Arena size used by the firmware build.
pub const FIRMWARE_ARENA_BYTES: usize = 20_000;

/// Heap-backed network with layer sizes `sizes` (input first) and one
/// activation throughout.
///
/// # Panics
///
/// Panics if the shape is invalid.
pub fn heap_network(sizes: &[usize], activation: Activation) -> Network<HeapAllocator> {
    let shape = NetworkShape::from_sizes(sizes, activation);
    Network::from_shape(HeapAllocator::new(), &shape).expect("valid test shape")
}

/// Arena-backed network sized like the firmware build.
///
/// # Panics
///
/// Panics if the shape is invalid or does not fit the arena.
pub fn arena_network(sizes: &[usize], activation: Activation) -> Network<BlockArena> {
    let shape = NetworkShape::from_sizes(sizes, activation);
    let arena = BlockArena::with_bytes(FIRMWARE_ARENA_BYTES).expect("valid arena size");
    Network::from_shape(arena, &shape).expect("shape fits the firmware arena")
}

/// Single identity layer of width `n` whose weight matrix is the identity.
pub fn identity_network(n: usize) -> Network<HeapAllocator> {
    let mut net = heap_network(&[n, n], Activation::Identity);
    for i in 0..n {
        net.set_weight(0, i, i, 1.0).expect("diagonal index in range");
    }
    net
}

/// Assert that two slices agree element-wise within `tol`.
///
/// # Panics
///
/// Panics with the first differing index.
pub fn assert_close(actual: &[f32], expected: &[f32], tol: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tol,
            "index {i}: {a} differs from {e} by more than {tol}"
        );
    }
}
