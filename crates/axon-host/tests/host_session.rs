//! End-to-end host sessions driven only through `i16` calls.

use axon_host::{ContextTable, HostContext, HostStatus};
use axon_test_utils::fixtures::OBSTACLE_AVOIDANCE;
use axon_test_utils::FIRMWARE_ARENA_BYTES;

fn to_i16<const N: usize>(values: [f32; N]) -> [i16; N] {
    values.map(|v| v as i16)
}

#[test]
fn hebbian_obstacle_avoidance_session() {
    let mut ctx = HostContext::on_heap();
    ctx.init(2, &[2], &[0]).unwrap();
    ctx.clear_weights();

    // Supervised Hebbian: stage the desired wheel speeds as the output.
    for (input, target) in OBSTACLE_AVOIDANCE {
        ctx.set_inputs(&to_i16(input)).unwrap();
        ctx.set_outputs(&to_i16(target)).unwrap();
        ctx.hebbian_rule(1, 1000).unwrap();
    }
    // Only the mixed patterns contribute: W = 1e-3 * 500 * target.
    assert_eq!(ctx.weight(0, 0, 0).unwrap(), (40, 1));
    assert_eq!(ctx.weight(0, 0, 1).unwrap(), (10, 1));
    assert_eq!(ctx.weight(0, 1, 0).unwrap(), (10, 1));
    assert_eq!(ctx.weight(0, 1, 1).unwrap(), (40, 1));

    ctx.set_inputs(&[1, 0]).unwrap();
    ctx.eval().unwrap();
    let mut speeds = [0i16; 2];
    ctx.outputs(&mut speeds).unwrap();
    // Obstacle on the left: the left wheel turns faster, steering right.
    assert_eq!(speeds, [40, 10]);
    assert_eq!(ctx.error(), HostStatus::Ok);
}

#[test]
fn errors_stick_until_reset() {
    let mut ctx = HostContext::on_heap();
    assert!(ctx.eval().is_err());
    assert_eq!(ctx.error(), HostStatus::NoNetwork);

    ctx.init(2, &[3, 1], &[1, 0]).unwrap();
    assert_eq!(ctx.error(), HostStatus::NoNetwork);

    assert!(ctx.hebbian_rule(1, 10).is_err());
    assert_eq!(ctx.error(), HostStatus::UnsuitableForHebbianRule);
    assert_eq!(ctx.error().code(), 4);

    ctx.reset_error();
    ctx.eval().unwrap();
    assert_eq!(ctx.error(), HostStatus::Ok);
}

#[test]
fn dataset_training_on_the_firmware_arena() {
    let mut ctx = HostContext::with_arena_bytes(FIRMWARE_ARENA_BYTES, 4_096).unwrap();
    ctx.init(1, &[1], &[0]).unwrap();
    ctx.clear_weights();
    ctx.dataset_init(3).unwrap();
    for x in [1i16, 2, 3] {
        ctx.dataset_add(&[x], &[2 * x]).unwrap();
    }
    assert!(ctx.dataset_add(&[4], &[8]).is_err());
    assert_eq!(ctx.error(), HostStatus::DatasetSizeExceeded);
    ctx.reset_error();

    ctx.backprop_dataset(1, 50, 400).unwrap();
    ctx.set_inputs(&[5]).unwrap();
    ctx.eval().unwrap();
    let mut out = [0i16; 1];
    ctx.outputs(&mut out).unwrap();
    assert_eq!(out, [10]);
    assert!(ctx.error().is_ok());
}

#[test]
fn table_keeps_sessions_apart() {
    let mut table = ContextTable::new();
    let a = table.open(HostContext::on_heap());
    let b = table.open(HostContext::on_heap());

    table.with(a, |ctx| ctx.init(2, &[1], &[0])).unwrap();
    table.with(b, |ctx| ctx.init(3, &[2], &[1])).unwrap();
    assert_eq!(table.get(a).unwrap().network().input_count(), 2);
    assert_eq!(table.get(b).unwrap().network().input_count(), 3);

    assert!(table.close(a).is_ok());
    assert!(table.get(a).is_none());
    assert_eq!(table.with(a, |ctx| ctx.eval()), Err(HostStatus::NoNetwork));
    assert_eq!(table.status(b), HostStatus::Ok);
    assert_eq!(table.len(), 1);
}
