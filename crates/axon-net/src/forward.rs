//! Forward evaluation.

use axon_arena::BlockAllocator;
use axon_core::{Activation, NnResult};

use crate::backprop::BackpropScratch;
use crate::network::Network;

/// Compute one layer: `p_i = B_i + Σ_j W[i,j]·input_j`, `output_i = φ(p_i)`,
/// optionally recording every `p_i` into `pre`.
pub(crate) fn forward_layer(
    activation: Activation,
    weights: &[f32],
    biases: &[f32],
    input: &[f32],
    output: &mut [f32],
    mut pre: Option<&mut [f32]>,
) {
    let input_count = input.len();
    for (i, (out, bias)) in output.iter_mut().zip(biases).enumerate() {
        let row = &weights[i * input_count..(i + 1) * input_count];
        let p = row
            .iter()
            .zip(input)
            .fold(*bias, |acc, (w, x)| acc + w * x);
        if let Some(pre) = pre.as_deref_mut() {
            pre[i] = p;
        }
        *out = activation.apply(p);
    }
}

/// Evaluate the network on its current input, layer by layer.
///
/// Weights and biases are never modified; only each layer's output
/// vector changes.
pub fn evaluate<A: BlockAllocator>(network: &mut Network<A>) -> NnResult<()> {
    network.ensure_layers()?;
    for k in 0..network.layer_count() {
        let activation = network.layers[k].activation;
        let buf = network.buffers(k)?;
        forward_layer(activation, buf.weights, buf.biases, buf.input, buf.output, None);
    }
    Ok(())
}

/// Evaluate the network, recording each layer's pre-activation sums in
/// the scratch `P[k]` vectors.
pub fn evaluate_recording<A: BlockAllocator>(
    network: &mut Network<A>,
    scratch: &mut BackpropScratch,
) -> NnResult<()> {
    scratch.check_shape(network)?;
    let handle = scratch.handle();
    for k in 0..network.layer_count() {
        let activation = network.layers[k].activation;
        let pre_range = scratch.layout().pre_activation(k);
        let (buf, block) = network.buffers_with(k, handle)?;
        let pre = Some(&mut block[pre_range]);
        forward_layer(activation, buf.weights, buf.biases, buf.input, buf.output, pre);
    }
    Ok(())
}
