//! Learn exclusive-or with a 2-3-1 tanh network in the firmware arena.
//!
//! Run with `RUST_LOG=debug` to see allocation and training logs.

use axon::prelude::*;
use axon_test_utils::fixtures::{xor_store, XOR};
use axon_test_utils::FIRMWARE_ARENA_BYTES;

const EPOCHS: usize = 2_000;
const ETA: f32 = 0.1;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Axon XOR Example ===\n");

    let store = xor_store();
    let shape = NetworkShape::from_sizes(&[2, 3, 1], Activation::Tanh);

    for seed in 0..8 {
        let arena = BlockArena::with_bytes(FIRMWARE_ARENA_BYTES)?;
        let mut net = Network::from_shape(arena, &shape)?;
        let mut scratch = BackpropScratch::new(&mut net)?;
        println!(
            "seed {seed}: scratch {} bytes, {} words free",
            scratch.size_bytes(),
            net.allocator().free_words()
        );

        let config = TrainingConfig::new(ETA, EPOCHS * store.count()).with_seed(seed);
        let training = train_from_seed(&mut net, &mut scratch, &store, &config)?;
        println!("  cost over first pass: {:.5}", training.initial_cost);
        let report = validate(&mut net, &store, 0.5)?;
        println!("  cost after {EPOCHS} epochs: {:.5}", report.total_cost);
        if !report.passed() {
            continue;
        }

        for (input, target) in XOR {
            net.set_input(&input)?;
            evaluate(&mut net)?;
            println!(
                "  {:?} -> {:.3} (target {})",
                input,
                net.output()?[0],
                target[0]
            );
        }
        return Ok(());
    }

    println!("no seed converged; try more epochs");
    Ok(())
}
