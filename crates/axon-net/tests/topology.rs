//! Shape, capacity and sizing properties of networks.

use axon_arena::{BlockAllocator, BlockArena, HeapAllocator};
use axon_core::{Activation, NetworkShape, NnError};
use axon_net::{evaluate, scratch_size, BackpropScratch, Network};
use axon_test_utils::{assert_close, heap_network, identity_network};
use proptest::prelude::*;

#[test]
fn add_layer_respects_reset_capacity() {
    let mut net = Network::new(HeapAllocator::new());
    net.reset(3).unwrap();
    net.add_layer(2, 4, Activation::Tanh).unwrap();
    net.add_layer(4, 4, Activation::Tanh).unwrap();
    net.add_layer(4, 1, Activation::Sigmoid).unwrap();
    assert!(matches!(
        net.add_layer(1, 1, Activation::Identity),
        Err(NnError::InvalidShape { .. })
    ));
    assert_eq!(net.layer_count(), 3);
    assert_eq!(net.max_layer_count(), 3);
    assert_eq!((net.input_count(), net.output_count()), (2, 1));
}

#[test]
fn identity_network_copies_any_input() {
    let mut net = identity_network(4);
    let input = [1.5, -3.0, 0.0, 1e6];
    net.set_input(&input).unwrap();
    evaluate(&mut net).unwrap();
    assert_close(net.output().unwrap(), &input, 0.0);
}

#[test]
fn scratch_size_matches_reference_topologies() {
    let word = std::mem::size_of::<usize>();
    let net = heap_network(&[2, 3, 1], Activation::Tanh);
    assert_eq!(scratch_size(&net), 6 * word + 20 * 4);
    let net = heap_network(&[4, 4, 4, 2], Activation::Tanh);
    assert_eq!(scratch_size(&net), 9 * word + 64 * 4);
}

#[test]
fn firmware_arena_holds_network_and_scratch() {
    let arena = BlockArena::with_bytes(20_000).unwrap();
    let shape = NetworkShape::from_sizes(&[9, 16, 16, 2], Activation::Tanh);
    let mut net = Network::from_shape(arena, &shape).unwrap();
    let scratch = BackpropScratch::new(&mut net).unwrap();
    assert!(net.allocator().largest_free_words() > 0);
    scratch.release(&mut net);
}

fn arb_sizes() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(1usize..12, 2..6)
}

proptest! {
    #[test]
    fn scratch_size_follows_formula(sizes in arb_sizes()) {
        let net = heap_network(&sizes, Activation::Tanh);
        let layers = sizes.len() - 1;
        let data: usize = sizes.windows(2).map(|w| w[1] * (2 + w[0])).sum();
        let max_out = sizes[1..].iter().copied().max().unwrap();
        let expected = 3 * layers * std::mem::size_of::<usize>() + (data + max_out) * 4;
        prop_assert_eq!(scratch_size(&net), expected);
    }

    #[test]
    fn init_weights_stay_within_amplitude(sizes in arb_sizes(), seed in any::<u64>()) {
        let mut net = heap_network(&sizes, Activation::Tanh);
        net.init_weights_seeded(seed);
        for k in 0..net.layer_count() {
            let a = 1.0 / (sizes[k] as f32).sqrt();
            let view = net.layer(k).unwrap();
            prop_assert!(view.weights().iter().all(|w| w.abs() <= a));
            prop_assert!(view.biases().iter().all(|b| *b == 0.0));
        }
    }

    #[test]
    fn tanh_outputs_stay_in_range(sizes in arb_sizes(), seed in any::<u64>(), x in -10.0f32..10.0) {
        let mut net = heap_network(&sizes, Activation::Tanh);
        net.init_weights_seeded(seed);
        net.input_mut().unwrap().fill(x);
        evaluate(&mut net).unwrap();
        prop_assert!(net.output().unwrap().iter().all(|y| (-1.0..=1.0).contains(y)));
    }

    #[test]
    fn reset_frees_everything(sizes in arb_sizes()) {
        let arena = BlockArena::with_bytes(20_000).unwrap();
        let shape = NetworkShape::from_sizes(&sizes, Activation::Identity);
        let mut net = Network::from_shape(arena, &shape).unwrap();
        let scratch = BackpropScratch::new(&mut net).unwrap();
        scratch.release(&mut net);
        net.reset(0).unwrap();
        let arena = net.allocator();
        prop_assert_eq!(arena.largest_free_words(), arena.cell_count() - 1);
    }
}

#[test]
fn allocator_trait_is_usable_generically() {
    fn build<A: BlockAllocator>(alloc: A) -> Network<A> {
        let shape = NetworkShape::from_sizes(&[3, 2], Activation::Identity);
        Network::from_shape(alloc, &shape).unwrap()
    }
    let a = build(HeapAllocator::new());
    let b = build(BlockArena::with_bytes(1_000).unwrap());
    assert_eq!(a.layer(0).unwrap().weights().len(), b.layer(0).unwrap().weights().len());
}
