//! Benchmark profiles for the Axon network engine.
//!
//! - [`reference_shape`]: the 9-16-16-2 controller the firmware runs
//! - [`wide_shape`]: a heavier 32-64-64-8 network for host-side training
//! - [`synthetic_dataset`]: deterministic observations for either shape

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use axon_arena::HeapAllocator;
use axon_core::{Activation, NetworkShape, NnResult};
use axon_net::ObservationStore;

/// The firmware controller: 9 proximity readings, two tanh hidden layers
/// of 16, two linear wheel outputs.
pub fn reference_shape() -> NetworkShape {
    NetworkShape::new(9)
        .with_layer(16, Activation::Tanh)
        .with_layer(16, Activation::Tanh)
        .with_layer(2, Activation::Identity)
}

/// A larger sigmoid network, too big for the firmware arena.
pub fn wide_shape() -> NetworkShape {
    NetworkShape::new(32)
        .with_layer(64, Activation::Sigmoid)
        .with_layer(64, Activation::Sigmoid)
        .with_layer(8, Activation::Identity)
}

/// `count` observations sized for `shape`, with values in `[-1, 1)` from
/// a fixed linear congruential sequence seeded by `seed`.
pub fn synthetic_dataset(shape: &NetworkShape, count: usize, seed: u64) -> NnResult<ObservationStore> {
    let (inputs, outputs) = (shape.input_count, shape.output_count());
    let mut store = ObservationStore::new(HeapAllocator::new(), inputs, outputs, count)?;
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
    };
    for _ in 0..count {
        let input: Vec<f32> = (0..inputs).map(|_| next()).collect();
        let output: Vec<f32> = (0..outputs).map(|_| next()).collect();
        store.push(&input, &output)?;
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_validate() {
        reference_shape().validate().unwrap();
        wide_shape().validate().unwrap();
        assert_eq!(reference_shape().output_count(), 2);
    }

    #[test]
    fn synthetic_dataset_is_deterministic_and_bounded() {
        let shape = reference_shape();
        let a = synthetic_dataset(&shape, 8, 42).unwrap();
        let b = synthetic_dataset(&shape, 8, 42).unwrap();
        assert_eq!(a.count(), 8);
        for ((ai, ao), (bi, bo)) in a.iter().zip(b.iter()) {
            assert_eq!(ai, bi);
            assert_eq!(ao, bo);
            assert!(ai.iter().chain(ao).all(|v| (-1.0..1.0).contains(v)));
        }
    }
}
