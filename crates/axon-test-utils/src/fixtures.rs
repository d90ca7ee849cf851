//! Reference datasets.
//!
//! - [`XOR`]: the four patterns of exclusive-or.
//! - [`OBSTACLE_AVOIDANCE`]: proximity readings to wheel speeds for a
//!   two-sensor robot, used with the Hebbian rule.

use axon_arena::HeapAllocator;
use axon_net::ObservationStore;

/// `(input, target)` pair with fixed widths.
pub type Pattern<const I: usize, const O: usize> = ([f32; I], [f32; O]);

/// Exclusive-or on `{0, 1}`.
pub const XOR: [Pattern<2, 1>; 4] = [
    ([0.0, 0.0], [0.0]),
    ([0.0, 1.0], [1.0]),
    ([1.0, 0.0], [1.0]),
    ([1.0, 1.0], [0.0]),
];

/// Left/right proximity readings mapped to left/right wheel speeds: drive
/// forward when clear, turn away from whichever side sees an obstacle,
/// stop when blocked on both.
pub const OBSTACLE_AVOIDANCE: [Pattern<2, 2>; 4] = [
    ([0.0, 0.0], [100.0, 100.0]),
    ([500.0, 0.0], [80.0, 20.0]),
    ([0.0, 500.0], [20.0, 80.0]),
    ([500.0, 500.0], [0.0, 0.0]),
];

/// Learning rate that keeps the Hebbian obstacle-avoidance run stable
/// with inputs in the hundreds.
pub const OBSTACLE_ALPHA: f32 = 1e-6;

/// Heap-backed store holding `patterns`.
///
/// # Panics
///
/// Panics if the store cannot be allocated.
pub fn store_of<const I: usize, const O: usize>(patterns: &[Pattern<I, O>]) -> ObservationStore {
    let mut store = ObservationStore::new(HeapAllocator::new(), I, O, patterns.len())
        .expect("heap store allocation");
    for (input, output) in patterns {
        store.push(input, output).expect("store sized for every pattern");
    }
    store
}

/// The [`XOR`] patterns as an observation store.
pub fn xor_store() -> ObservationStore {
    store_of(&XOR)
}

/// The [`OBSTACLE_AVOIDANCE`] patterns as an observation store.
pub fn obstacle_store() -> ObservationStore {
    store_of(&OBSTACLE_AVOIDANCE)
}
