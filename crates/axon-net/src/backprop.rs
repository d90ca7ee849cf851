//! Gradient backpropagation.
//!
//! Training state lives in one scratch block allocated from the network's
//! own allocator and partitioned as
//!
//! ```text
//! [ index table (3·L entries) | E (max out) | P[0] Bg[0] Wg[0] | P[1] Bg[1] Wg[1] | ... ]
//! ```
//!
//! The index table reserves room for three per-layer pointers so that
//! [`scratch_size`] matches the arena footprint of the firmware build
//! exactly. It is zeroed and otherwise unused.
//!
//! Sign convention: `E = desired − actual`, so gradients are *added* with a
//! positive learning rate.

use std::ops::Range;

use axon_arena::{BlockAllocator, BlockHandle};
use axon_core::{NnError, NnResult};
use log::{debug, warn};

use crate::forward::evaluate_recording;
use crate::layout::{span, unaddressable};
use crate::network::Network;

const F32_BYTES: usize = std::mem::size_of::<f32>();
const TABLE_ENTRY_BYTES: usize = std::mem::size_of::<usize>();

/// Whether [`BackpropScratch::accumulate_gradients`] starts from zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Accumulate {
    /// Zero the gradients first: a single-sample step.
    #[default]
    Reset,
    /// Add onto the existing gradients: mini-batch summation.
    Sum,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LayerRanges {
    pre: Range<usize>,
    bias_grad: Range<usize>,
    weight_grad: Range<usize>,
}

/// Partition of a scratch block for one network shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScratchLayout {
    dims: Vec<(usize, usize)>,
    error: Range<usize>,
    layers: Vec<LayerRanges>,
    len: usize,
}

impl ScratchLayout {
    /// Lay out scratch for layers of the given `(input, output)` widths.
    ///
    /// Fails with [`NnError::OutOfMemory`] when the block would not be
    /// addressable in bytes.
    pub fn for_dims(dims: impl IntoIterator<Item = (usize, usize)>) -> NnResult<Self> {
        let dims: Vec<(usize, usize)> = dims.into_iter().collect();
        // Rounded up so the table never undercounts its entries.
        let table_words = dims
            .len()
            .checked_mul(3 * TABLE_ENTRY_BYTES)
            .ok_or_else(unaddressable)?
            .div_ceil(F32_BYTES);
        let max_output = dims.iter().map(|&(_, out)| out).max().unwrap_or(0);
        let error = span(table_words, max_output)?;

        let mut at = error.end;
        let mut layers = Vec::with_capacity(dims.len());
        for &(input, output) in &dims {
            let pre = span(at, output)?;
            let bias_grad = span(pre.end, output)?;
            let weight_count = output.checked_mul(input).ok_or_else(unaddressable)?;
            let weight_grad = span(bias_grad.end, weight_count)?;
            at = weight_grad.end;
            layers.push(LayerRanges {
                pre,
                bias_grad,
                weight_grad,
            });
        }
        if at.checked_mul(F32_BYTES).is_none() {
            return Err(unaddressable());
        }

        Ok(Self {
            dims,
            error,
            layers,
            len: at,
        })
    }

    /// Lay out scratch for the current shape of `network`.
    pub fn for_network<A: BlockAllocator>(network: &Network<A>) -> NnResult<Self> {
        Self::for_dims(network.dims())
    }

    /// Size of the scratch block in bytes, index table included.
    pub fn size_bytes(&self) -> usize {
        self.len * F32_BYTES
    }

    /// Number of `f32` words in the block.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the layout covers no layers.
    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    /// Range of the error vector `E`.
    pub fn error(&self) -> Range<usize> {
        self.error.clone()
    }

    /// Range of the pre-activation vector `P[k]`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not a layer of this layout.
    pub fn pre_activation(&self, k: usize) -> Range<usize> {
        self.layers[k].pre.clone()
    }

    /// Range of the bias gradient `Bg[k]`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not a layer of this layout.
    pub fn bias_gradient(&self, k: usize) -> Range<usize> {
        self.layers[k].bias_grad.clone()
    }

    /// Range of the weight gradient `Wg[k]`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not a layer of this layout.
    pub fn weight_gradient(&self, k: usize) -> Range<usize> {
        self.layers[k].weight_grad.clone()
    }

    fn matches<A: BlockAllocator>(&self, network: &Network<A>) -> bool {
        self.dims.iter().copied().eq(network.dims())
    }

    /// Split the block into the vectors touched while backpropagating
    /// through layer `k`.
    fn split_layer<'a>(&self, k: usize, block: &'a mut [f32]) -> LayerScratch<'a> {
        let r = &self.layers[k];
        let (head, tail) = block.split_at_mut(r.pre.start);
        let error = &mut head[self.error.clone()];
        let (pre, tail) = tail.split_at_mut(r.pre.len());
        let (bias_grad, tail) = tail.split_at_mut(r.bias_grad.len());
        let weight_grad = &mut tail[..r.weight_grad.len()];
        LayerScratch {
            error,
            pre,
            bias_grad,
            weight_grad,
        }
    }
}

struct LayerScratch<'a> {
    error: &'a mut [f32],
    pre: &'a mut [f32],
    bias_grad: &'a mut [f32],
    weight_grad: &'a mut [f32],
}

/// Bytes of scratch needed to backpropagate through `network`:
/// `3·L·size_of::<usize>() + (Σ_k out_k·(2 + in_k) + max_k out_k)·size_of::<f32>()`,
/// with the table rounded up to whole `f32` words.
///
/// Saturates at `usize::MAX` for a shape whose scratch is not addressable.
pub fn scratch_size<A: BlockAllocator>(network: &Network<A>) -> usize {
    if network.is_empty() {
        return 0;
    }
    ScratchLayout::for_network(network).map_or(usize::MAX, |layout| layout.size_bytes())
}

/// Half the squared error between `observed` and the network's output:
/// `½ Σ (observed_i − output_i)²`.
///
/// Call after [`evaluate`](crate::evaluate); the output vector is read as is.
pub fn cost<A: BlockAllocator>(network: &Network<A>, observed: &[f32]) -> NnResult<f32> {
    let output = network.output()?;
    if observed.len() != output.len() {
        return Err(NnError::invalid_shape(format!(
            "expected {} observed values, got {}",
            output.len(),
            observed.len()
        )));
    }
    let sum: f32 = observed
        .iter()
        .zip(output)
        .map(|(y, yhat)| {
            let d = y - yhat;
            d * d
        })
        .sum();
    Ok(sum / 2.0)
}

/// Backpropagation scratch for one network shape.
///
/// The block lives in the network's allocator; hand it back with
/// [`release`](Self::release) before dropping the network's allocator, or
/// it stays reserved. A scratch belongs to the network that created it:
/// any shape change since then makes every operation fail with
/// [`NnError::InvalidShape`].
#[derive(Debug)]
pub struct BackpropScratch {
    block: BlockHandle,
    layout: ScratchLayout,
}

impl BackpropScratch {
    /// Allocate scratch sized for the current shape of `network`.
    pub fn new<A: BlockAllocator>(network: &mut Network<A>) -> NnResult<Self> {
        network.ensure_layers()?;
        let layout = ScratchLayout::for_network(network)?;
        let block = network.alloc.allocate(layout.size_bytes())?;
        debug!(
            "backprop scratch allocated: {} bytes for {} layers",
            layout.size_bytes(),
            layout.dims.len()
        );
        // Fresh blocks are zero-filled, which covers the gradient reset.
        Ok(Self { block, layout })
    }

    /// Return the scratch block to the network's allocator.
    pub fn release<A: BlockAllocator>(self, network: &mut Network<A>) {
        network.alloc.deallocate(self.block);
    }

    /// Layout of the scratch block.
    pub fn layout(&self) -> &ScratchLayout {
        &self.layout
    }

    /// Size of the scratch block in bytes.
    pub fn size_bytes(&self) -> usize {
        self.layout.size_bytes()
    }

    pub(crate) fn handle(&self) -> BlockHandle {
        self.block
    }

    /// Whether this scratch still fits the network's current shape.
    pub fn matches<A: BlockAllocator>(&self, network: &Network<A>) -> bool {
        self.layout.matches(network)
    }

    pub(crate) fn check_shape<A: BlockAllocator>(&self, network: &Network<A>) -> NnResult<()> {
        network.ensure_layers()?;
        if self.layout.matches(network) {
            Ok(())
        } else {
            warn!("backprop scratch does not match the network shape");
            Err(NnError::invalid_shape(
                "backprop scratch was sized for a different network shape",
            ))
        }
    }

    fn block<'n, A: BlockAllocator>(&self, network: &'n Network<A>) -> NnResult<&'n [f32]> {
        self.check_shape(network)?;
        network
            .alloc
            .block(self.block)
            .ok_or_else(|| NnError::invalid_shape("backprop scratch block is not live"))
    }

    fn block_mut<'n, A: BlockAllocator>(
        &self,
        network: &'n mut Network<A>,
    ) -> NnResult<&'n mut [f32]> {
        self.check_shape(network)?;
        network
            .alloc
            .block_mut(self.block)
            .ok_or_else(|| NnError::invalid_shape("backprop scratch block is not live"))
    }

    /// Zero every bias and weight gradient.
    pub fn reset_gradients<A: BlockAllocator>(&mut self, network: &mut Network<A>) -> NnResult<()> {
        let block = self.block_mut(network)?;
        for r in &self.layout.layers {
            block[r.bias_grad.clone()].fill(0.0);
            block[r.weight_grad.clone()].fill(0.0);
        }
        Ok(())
    }

    /// Backpropagate the error between the desired output (staged in the
    /// network's output vector) and the network's response to its current
    /// input, adding the result into the gradients.
    ///
    /// On return the output vector holds the network's actual output.
    pub fn accumulate_gradients<A: BlockAllocator>(
        &mut self,
        network: &mut Network<A>,
        mode: Accumulate,
    ) -> NnResult<()> {
        self.check_shape(network)?;
        if mode == Accumulate::Reset {
            self.reset_gradients(network)?;
        }
        let last = network.layer_count() - 1;

        // Save the desired output into E.
        {
            let (buf, block) = network.buffers_with(last, self.block)?;
            let error = &mut block[self.layout.error.clone()];
            error[..buf.output.len()].copy_from_slice(buf.output);
        }

        evaluate_recording(network, self)?;

        for k in (0..=last).rev() {
            let activation = network.layers[k].activation;
            let (buf, block) = network.buffers_with(k, self.block)?;
            let s = self.layout.split_layer(k, block);
            let input_count = buf.input.len();

            if k == last {
                for (e, y) in s.error.iter_mut().zip(buf.output.iter()) {
                    *e -= *y;
                }
            }

            // δ replaces P[k] in place; it is reused below to propagate E.
            for (i, pre) in s.pre.iter_mut().enumerate() {
                let delta = s.error[i] * activation.derivative(*pre);
                *pre = delta;
                s.bias_grad[i] += delta;
                let row = &mut s.weight_grad[i * input_count..(i + 1) * input_count];
                for (g, x) in row.iter_mut().zip(buf.input) {
                    *g += delta * x;
                }
            }

            if k > 0 {
                for (j, e) in s.error[..input_count].iter_mut().enumerate() {
                    *e = s
                        .pre
                        .iter()
                        .enumerate()
                        .fold(0.0, |acc, (i, delta)| acc + buf.weights[i * input_count + j] * delta);
                }
            }
        }
        Ok(())
    }

    /// Update parameters: `B += eta·Bg`, `W += eta·Wg`.
    pub fn apply_gradients<A: BlockAllocator>(
        &mut self,
        network: &mut Network<A>,
        eta: f32,
    ) -> NnResult<()> {
        self.check_shape(network)?;
        for k in 0..network.layer_count() {
            let (buf, block) = network.buffers_with(k, self.block)?;
            let s = self.layout.split_layer(k, block);
            for (b, g) in buf.biases.iter_mut().zip(s.bias_grad.iter()) {
                *b += eta * g;
            }
            for (w, g) in buf.weights.iter_mut().zip(s.weight_grad.iter()) {
                *w += eta * g;
            }
        }
        Ok(())
    }

    /// Bias gradient `Bg[k]`.
    pub fn bias_gradient<'n, A: BlockAllocator>(
        &self,
        network: &'n Network<A>,
        k: usize,
    ) -> NnResult<&'n [f32]> {
        NnError::check_index("layer", k, self.layout.layers.len())?;
        Ok(&self.block(network)?[self.layout.bias_gradient(k)])
    }

    /// Weight gradient `Wg[k]`, row-major like the weights.
    pub fn weight_gradient<'n, A: BlockAllocator>(
        &self,
        network: &'n Network<A>,
        k: usize,
    ) -> NnResult<&'n [f32]> {
        NnError::check_index("layer", k, self.layout.layers.len())?;
        Ok(&self.block(network)?[self.layout.weight_gradient(k)])
    }
}
