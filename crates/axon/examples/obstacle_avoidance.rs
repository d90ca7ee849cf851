//! Teach a two-sensor robot to steer around obstacles with the Hebbian
//! rule, driven through the fixed-point host bridge the way a 16-bit
//! controller would.

use axon::host::{fraction_approx, HostContext};
use axon_test_utils::fixtures::OBSTACLE_AVOIDANCE;
use log::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Axon Obstacle Avoidance Example ===\n");

    let mut ctx = HostContext::on_heap();
    ctx.init(2, &[2], &[0])?;
    ctx.clear_weights();

    // Learning rate 1/1000, passed as a fraction.
    let (alpha_num, alpha_den) = fraction_approx(0.001);
    info!("alpha as fraction: {alpha_num}/{alpha_den}");

    for (input, target) in OBSTACLE_AVOIDANCE {
        ctx.set_inputs(&input.map(|v| v as i16))?;
        ctx.set_outputs(&target.map(|v| v as i16))?;
        ctx.hebbian_rule(alpha_num, alpha_den)?;
    }

    let (mut num, mut den) = ([0i16; 4], [0i16; 4]);
    ctx.weights(0, &mut num, &mut den)?;
    println!("learned weights:");
    for (n, d) in num.iter().zip(&den) {
        println!("  {n}/{d}");
    }

    println!("\nsensors (left, right) -> wheels (left, right):");
    for (input, _) in OBSTACLE_AVOIDANCE {
        // Scale readings down so wheel speeds stay in range.
        let sensors = input.map(|v| (v / 500.0) as i16);
        ctx.set_inputs(&sensors)?;
        ctx.eval()?;
        let mut wheels = [0i16; 2];
        ctx.outputs(&mut wheels)?;
        println!("  {sensors:?} -> {wheels:?}");
    }

    println!("\nstatus: {}", ctx.error());
    Ok(())
}
