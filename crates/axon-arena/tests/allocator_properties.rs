//! Property and stress tests for the block allocators.

use axon_arena::{cells_for_bytes, BlockAllocator, BlockArena, BlockHandle, HeapAllocator};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Alloc(usize),
    Free(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..600).prop_map(Op::Alloc),
        2 => (0usize..32).prop_map(Op::Free),
    ]
}

/// Every live view lies within the arena and no two views overlap.
fn assert_disjoint(arena: &BlockArena, live: &[(BlockHandle, f32)]) {
    let mut spans: Vec<(usize, usize)> = live
        .iter()
        .map(|(h, _)| {
            let view = arena.block(*h).expect("live handle must resolve");
            let start = view.as_ptr() as usize;
            (start, start + view.len() * 4)
        })
        .collect();
    spans.sort();
    for pair in spans.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "overlapping blocks: {pair:?}");
    }
}

proptest! {
    #[test]
    fn allocation_succeeds_when_a_coalesced_block_fits(
        ops in proptest::collection::vec(arb_op(), 1..200),
    ) {
        let mut arena = BlockArena::with_bytes(4_000).unwrap();
        let mut live: Vec<(BlockHandle, f32)> = Vec::new();
        let mut stamp = 0.0f32;

        for op in ops {
            match op {
                Op::Alloc(bytes) => {
                    let fits = cells_for_bytes(bytes) <= arena.largest_free_words();
                    match arena.allocate(bytes) {
                        Ok(h) => {
                            prop_assert!(fits);
                            prop_assert_eq!(arena.block(h).unwrap().len(), cells_for_bytes(bytes));
                            stamp += 1.0;
                            arena.block_mut(h).unwrap().fill(stamp);
                            live.push((h, stamp));
                        }
                        Err(_) => prop_assert!(!fits),
                    }
                }
                Op::Free(i) => {
                    if !live.is_empty() {
                        let (h, _) = live.swap_remove(i % live.len());
                        arena.deallocate(h);
                    }
                }
            }
            // Live blocks keep their contents across other operations.
            for (h, value) in &live {
                prop_assert!(arena.block(*h).unwrap().iter().all(|v| v == value));
            }
        }
        assert_disjoint(&arena, &live);
    }

    #[test]
    fn requests_beyond_capacity_always_fail(extra in 0usize..10_000) {
        let mut arena = BlockArena::with_bytes(2_000).unwrap();
        prop_assert!(arena.allocate(arena.capacity_bytes() + extra).is_err());
        let mut heap = HeapAllocator::with_limit(2_000);
        prop_assert!(heap.allocate(2_001 + extra).is_err());
    }
}

#[test]
fn rotating_small_blocks_never_exhaust_the_arena() {
    const SIMULTANEOUS: usize = 20;
    const MAX_SIZE: usize = 200;

    let mut arena = BlockArena::with_bytes(20_000).unwrap();
    let mut slots: [Option<BlockHandle>; SIMULTANEOUS] = [None; SIMULTANEOUS];

    for i in 0..100_000usize {
        if i % 13 == 0 {
            assert!(arena.allocate(0x7fff_ffff).is_err(), "huge request at i={i}");
        }
        let slot = i % SIMULTANEOUS;
        arena.release(slots[slot].take());
        let size = 1 + (7 * i) % (MAX_SIZE - 1);
        match arena.allocate(size) {
            Ok(h) => slots[slot] = Some(h),
            Err(e) => panic!("allocation failed at i={i}, size={size}: {e}"),
        }
    }
}

#[test]
fn heap_and_arena_share_the_contract() {
    fn exercise<A: BlockAllocator>(alloc: &mut A) {
        let a = alloc.allocate_floats(6).unwrap();
        let b = alloc.allocate(9).unwrap();
        assert_eq!(alloc.block(a).unwrap().len(), 6);
        assert_eq!(alloc.block(b).unwrap().len(), 3);
        {
            let [x, y] = alloc.blocks_mut([a, b]).unwrap();
            x.copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
            y.fill(-1.0);
        }
        assert_eq!(alloc.block(a).unwrap()[5], 6.0);
        alloc.deallocate(a);
        assert!(alloc.block(a).is_none());
        assert_eq!(alloc.block(b).unwrap(), &[-1.0, -1.0, -1.0]);
        alloc.release(None);
    }

    exercise(&mut BlockArena::with_bytes(1_000).unwrap());
    exercise(&mut HeapAllocator::new());
}
