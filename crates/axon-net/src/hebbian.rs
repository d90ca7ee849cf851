//! Hebbian update rule.

use axon_arena::BlockAllocator;
use axon_core::{Activation, NnError, NnResult};
use log::trace;

use crate::network::Network;

/// Strengthen each weight by the co-activity of its endpoints:
/// `W[i,j] += alpha · input_j · output_i`. Biases are untouched.
///
/// Uses whatever is currently in the layer's input and output vectors; a
/// supervised variant stages the target in the output vector instead of
/// evaluating.
pub fn hebbian_step<A: BlockAllocator>(
    network: &mut Network<A>,
    layer_index: usize,
    alpha: f32,
) -> NnResult<()> {
    network.ensure_layers()?;
    let buf = network.buffers(layer_index)?;
    let input_count = buf.input.len();
    for (i, out) in buf.output.iter().enumerate() {
        let row = &mut buf.weights[i * input_count..(i + 1) * input_count];
        for (w, x) in row.iter_mut().zip(buf.input) {
            *w += alpha * x * out;
        }
    }
    trace!("hebbian step on layer {layer_index} with alpha {alpha}");
    Ok(())
}

/// [`hebbian_step`] restricted to networks of exactly one identity layer,
/// the only topology for which the rule is well defined on the host.
pub fn hebbian_step_checked<A: BlockAllocator>(network: &mut Network<A>, alpha: f32) -> NnResult<()> {
    network.ensure_layers()?;
    let layers = network.layers();
    if layers.len() != 1 {
        return Err(NnError::unsuitable(format!(
            "hebbian rule needs a single layer, network has {}",
            layers.len()
        )));
    }
    if layers[0].activation() != Activation::Identity {
        return Err(NnError::unsuitable(format!(
            "hebbian rule needs an identity layer, got {}",
            layers[0].activation()
        )));
    }
    hebbian_step(network, 0, alpha)
}
