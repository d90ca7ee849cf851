//! The network model: an ordered stack of dense layers.
//!
//! A [`Network`] owns its allocator, a layer table reserved from that
//! allocator, and one parameter block per layer (see
//! [`LayerLayout`](crate::layout::LayerLayout)). Every buffer access goes
//! through bounds-checked slice views; an index outside the network
//! produces [`NnError::IndexOutOfRange`] and an empty network produces
//! [`NnError::NoNetwork`].

use axon_arena::{BlockAllocator, BlockHandle, HeapAllocator, CELL_BYTES};
use axon_core::{Activation, NetworkShape, NnError, NnResult};
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::layout::{InputSource, LayerLayout};

/// Bytes reserved in the allocator per layer-table slot.
const LAYER_RECORD_BYTES: usize = CELL_BYTES;

/// One dense layer: its dimensions, activation and parameter block.
#[derive(Clone, Debug)]
pub struct Layer {
    pub(crate) input_count: usize,
    pub(crate) output_count: usize,
    pub(crate) activation: Activation,
    pub(crate) block: BlockHandle,
    pub(crate) layout: LayerLayout,
    pub(crate) input: InputSource,
}

impl Layer {
    /// Width of the input vector.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Width of the output vector.
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Activation applied to the pre-activation sum.
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Where this layer reads its input from.
    pub fn input_source(&self) -> InputSource {
        self.input
    }

    /// Offsets of the parameter sub-vectors.
    pub fn layout(&self) -> &LayerLayout {
        &self.layout
    }
}

/// Read-only view of one layer's buffers.
#[derive(Clone, Copy, Debug)]
pub struct LayerView<'a> {
    weights: &'a [f32],
    biases: &'a [f32],
    input: &'a [f32],
    output: &'a [f32],
}

impl<'a> LayerView<'a> {
    /// Weight matrix, row-major: `weights()[i * input_count + j]`.
    pub fn weights(&self) -> &'a [f32] {
        self.weights
    }

    /// Bias vector.
    pub fn biases(&self) -> &'a [f32] {
        self.biases
    }

    /// Input vector; for later layers this is the previous layer's output.
    pub fn input(&self) -> &'a [f32] {
        self.input
    }

    /// Output vector.
    pub fn output(&self) -> &'a [f32] {
        self.output
    }
}

/// Mutable view of one layer's own buffers.
#[derive(Debug)]
pub struct LayerViewMut<'a> {
    /// Weight matrix, row-major.
    pub weights: &'a mut [f32],
    /// Bias vector.
    pub biases: &'a mut [f32],
    /// Owned input vector (first layer only).
    pub input: Option<&'a mut [f32]>,
    /// Output vector.
    pub output: &'a mut [f32],
}

/// Buffers touched by one layer during evaluation or training.
///
/// `input` borrows the previous layer's block for chained layers, so the
/// whole set is obtained through one disjoint multi-block borrow.
pub(crate) struct LayerBuffers<'a> {
    pub(crate) weights: &'a mut [f32],
    pub(crate) biases: &'a mut [f32],
    pub(crate) input: &'a [f32],
    pub(crate) output: &'a mut [f32],
}

impl<'a> LayerBuffers<'a> {
    fn owned(layout: &LayerLayout, block: &'a mut [f32]) -> Self {
        let (weights, biases, input, output) = layout.split_mut(block);
        let input: &'a [f32] = input.unwrap_or_default();
        Self {
            weights,
            biases,
            input,
            output,
        }
    }

    fn chained(layout: &LayerLayout, block: &'a mut [f32], input: &'a [f32]) -> Self {
        let (weights, biases, _, output) = layout.split_mut(block);
        Self {
            weights,
            biases,
            input,
            output,
        }
    }
}

/// A linear stack of dense layers backed by a block allocator.
///
/// # Examples
///
/// ```
/// use axon_arena::HeapAllocator;
/// use axon_core::Activation;
/// use axon_net::{evaluate, Network};
///
/// let mut net = Network::new(HeapAllocator::new());
/// net.reset(1).unwrap();
/// net.add_layer(2, 2, Activation::Identity).unwrap();
/// net.set_weight(0, 0, 0, 1.0).unwrap();
/// net.set_weight(0, 1, 1, 1.0).unwrap();
/// net.input_mut().unwrap().copy_from_slice(&[3.0, -4.0]);
/// evaluate(&mut net).unwrap();
/// assert_eq!(net.output().unwrap(), &[3.0, -4.0]);
/// ```
pub struct Network<A: BlockAllocator = HeapAllocator> {
    pub(crate) alloc: A,
    table: Option<BlockHandle>,
    pub(crate) layers: Vec<Layer>,
    max_layer_count: usize,
    input_count: usize,
    output_count: usize,
}

impl<A: BlockAllocator> Network<A> {
    /// Create an empty network with no layer capacity.
    pub fn new(alloc: A) -> Self {
        Self {
            alloc,
            table: None,
            layers: Vec::new(),
            max_layer_count: 0,
            input_count: 0,
            output_count: 0,
        }
    }

    /// Build a network from a validated shape.
    pub fn from_shape(alloc: A, shape: &NetworkShape) -> NnResult<Self> {
        shape.validate()?;
        let mut network = Self::new(alloc);
        network.reset(shape.layer_count())?;
        for (input_count, output_count, activation) in shape.layer_dims() {
            network.add_layer(input_count, output_count, activation)?;
        }
        Ok(network)
    }

    /// Release every layer and reserve room for `capacity` new ones.
    ///
    /// Destructive first: on failure the network is left empty with no
    /// capacity.
    pub fn reset(&mut self, capacity: usize) -> NnResult<()> {
        for layer in self.layers.drain(..) {
            self.alloc.deallocate(layer.block);
        }
        self.alloc.release(self.table.take());
        self.max_layer_count = 0;
        self.input_count = 0;
        self.output_count = 0;

        if capacity > 0 {
            let bytes = capacity
                .checked_mul(LAYER_RECORD_BYTES)
                .ok_or_else(|| NnError::invalid_shape("layer capacity overflows"))?;
            self.table = Some(self.alloc.allocate(bytes)?);
            self.layers.reserve_exact(capacity);
            self.max_layer_count = capacity;
        }
        debug!("network reset with capacity for {capacity} layers");
        Ok(())
    }

    /// Append a dense layer.
    ///
    /// The input width must equal the previous layer's output width. On
    /// allocation failure the existing layers are left untouched.
    pub fn add_layer(
        &mut self,
        input_count: usize,
        output_count: usize,
        activation: Activation,
    ) -> NnResult<()> {
        if self.layers.len() >= self.max_layer_count {
            return Err(NnError::invalid_shape(format!(
                "layer capacity of {} exhausted",
                self.max_layer_count
            )));
        }
        if input_count == 0 || output_count == 0 {
            return Err(NnError::invalid_shape(format!(
                "layer dimensions must be positive, got {input_count}x{output_count}"
            )));
        }
        if let Some(prev) = self.layers.last() {
            if prev.output_count != input_count {
                return Err(NnError::invalid_shape(format!(
                    "layer input width {input_count} does not match previous output width {}",
                    prev.output_count
                )));
            }
        }

        let index = self.layers.len();
        let owns_input = index == 0;
        let layout = LayerLayout::new(input_count, output_count, owns_input)?;
        let block = self.alloc.allocate_floats(layout.len())?;
        debug!(
            "layer {index}: {input_count} -> {output_count} ({activation}), {} floats",
            layout.len()
        );

        self.layers.push(Layer {
            input_count,
            output_count,
            activation,
            block,
            layout,
            input: if owns_input {
                InputSource::Owned
            } else {
                InputSource::PreviousLayer(index - 1)
            },
        });
        if owns_input {
            self.input_count = input_count;
        }
        self.output_count = output_count;
        Ok(())
    }

    /// Number of layers added since the last reset.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Layer capacity reserved by the last reset.
    pub fn max_layer_count(&self) -> usize {
        self.max_layer_count
    }

    /// Width of the first layer's input (0 when empty).
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Width of the last layer's output (0 when empty).
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Whether the network has no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// All layers, first to last.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Layer metadata by index.
    pub fn layer_info(&self, k: usize) -> NnResult<&Layer> {
        self.ensure_layers()?;
        NnError::check_index("layer", k, self.layers.len())?;
        Ok(&self.layers[k])
    }

    /// The allocator backing every buffer of this network.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Per-layer `(input_count, output_count)` pairs.
    pub fn dims(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.layers.iter().map(|l| (l.input_count, l.output_count))
    }

    pub(crate) fn ensure_layers(&self) -> NnResult<()> {
        if self.layers.is_empty() {
            Err(NnError::NoNetwork)
        } else {
            Ok(())
        }
    }

    /// Zero every weight and bias.
    pub fn clear_weights(&mut self) {
        for layer in &self.layers {
            if let Some(block) = self.alloc.block_mut(layer.block) {
                let (weights, biases, _, _) = layer.layout.split_mut(block);
                weights.fill(0.0);
                biases.fill(0.0);
            }
        }
    }

    /// Draw every weight uniformly from `[-a, a]` with
    /// `a = 1/sqrt(input_count)` and zero every bias.
    pub fn init_weights<R: Rng>(&mut self, rng: &mut R) {
        for layer in &self.layers {
            let amplitude = 1.0 / (layer.input_count as f32).sqrt();
            if let Some(block) = self.alloc.block_mut(layer.block) {
                let (weights, biases, _, _) = layer.layout.split_mut(block);
                for w in weights.iter_mut() {
                    *w = rng.random_range(-amplitude..=amplitude);
                }
                biases.fill(0.0);
            }
        }
    }

    /// [`init_weights`](Self::init_weights) with a `ChaCha8Rng` seeded
    /// from `seed`.
    pub fn init_weights_seeded(&mut self, seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.init_weights(&mut rng);
    }

    fn stale_block(k: usize) -> NnError {
        NnError::invalid_shape(format!("parameter block of layer {k} is not live"))
    }

    /// Read-only view of layer `k`.
    pub fn layer(&self, k: usize) -> NnResult<LayerView<'_>> {
        let layer = self.layer_info(k)?;
        let block = self
            .alloc
            .block(layer.block)
            .ok_or_else(|| Self::stale_block(k))?;
        let (weights, biases, input, output) = layer.layout.split(block);
        let input = match (input, layer.input) {
            (Some(input), _) => input,
            (None, InputSource::PreviousLayer(p)) => {
                let prev = &self.layers[p];
                let prev_block = self
                    .alloc
                    .block(prev.block)
                    .ok_or_else(|| Self::stale_block(p))?;
                &prev_block[prev.layout.output.clone()]
            }
            (None, InputSource::Owned) => &[],
        };
        Ok(LayerView {
            weights,
            biases,
            input,
            output,
        })
    }

    /// Mutable view of layer `k`'s own buffers.
    pub fn layer_mut(&mut self, k: usize) -> NnResult<LayerViewMut<'_>> {
        self.ensure_layers()?;
        NnError::check_index("layer", k, self.layers.len())?;
        let layer = &self.layers[k];
        let block = self
            .alloc
            .block_mut(layer.block)
            .ok_or_else(|| Self::stale_block(k))?;
        let (weights, biases, input, output) = layer.layout.split_mut(block);
        Ok(LayerViewMut {
            weights,
            biases,
            input,
            output,
        })
    }

    /// Buffers of layer `k`.
    pub(crate) fn buffers(&mut self, k: usize) -> NnResult<LayerBuffers<'_>> {
        NnError::check_index("layer", k, self.layers.len())?;
        let layer = &self.layers[k];
        let stale = || Self::stale_block(k);
        match layer.input {
            InputSource::Owned => {
                let cur = self.alloc.block_mut(layer.block).ok_or_else(stale)?;
                Ok(LayerBuffers::owned(&layer.layout, cur))
            }
            InputSource::PreviousLayer(p) => {
                let prev = &self.layers[p];
                let [prev_block, cur] = self
                    .alloc
                    .blocks_mut([prev.block, layer.block])
                    .ok_or_else(stale)?;
                let prev_block: &[f32] = prev_block;
                let input = &prev_block[prev.layout.output.clone()];
                Ok(LayerBuffers::chained(&layer.layout, cur, input))
            }
        }
    }

    /// Buffers of layer `k` together with `extra`, a different block
    /// borrowed disjointly from the same allocator.
    pub(crate) fn buffers_with(
        &mut self,
        k: usize,
        extra: BlockHandle,
    ) -> NnResult<(LayerBuffers<'_>, &mut [f32])> {
        NnError::check_index("layer", k, self.layers.len())?;
        let layer = &self.layers[k];
        let stale = || Self::stale_block(k);
        match layer.input {
            InputSource::Owned => {
                let [cur, extra] = self
                    .alloc
                    .blocks_mut([layer.block, extra])
                    .ok_or_else(stale)?;
                Ok((LayerBuffers::owned(&layer.layout, cur), extra))
            }
            InputSource::PreviousLayer(p) => {
                let prev = &self.layers[p];
                let [prev_block, cur, extra] = self
                    .alloc
                    .blocks_mut([prev.block, layer.block, extra])
                    .ok_or_else(stale)?;
                let prev_block: &[f32] = prev_block;
                let input = &prev_block[prev.layout.output.clone()];
                Ok((LayerBuffers::chained(&layer.layout, cur, input), extra))
            }
        }
    }

    /// The first layer's input vector.
    pub fn input(&self) -> NnResult<&[f32]> {
        self.ensure_layers()?;
        Ok(self.layer(0)?.input())
    }

    /// Mutable input vector of the first layer.
    pub fn input_mut(&mut self) -> NnResult<&mut [f32]> {
        self.ensure_layers()?;
        let view = self.layer_mut(0)?;
        Ok(view.input.unwrap_or_default())
    }

    /// The last layer's output vector.
    pub fn output(&self) -> NnResult<&[f32]> {
        self.ensure_layers()?;
        Ok(self.layer(self.layers.len() - 1)?.output())
    }

    /// Mutable output vector of the last layer.
    ///
    /// Training drivers stage the desired output here before
    /// accumulating gradients.
    pub fn output_mut(&mut self) -> NnResult<&mut [f32]> {
        self.ensure_layers()?;
        let last = self.layers.len() - 1;
        Ok(self.layer_mut(last)?.output)
    }

    /// Copy `values` into the input vector; the widths must match.
    pub fn set_input(&mut self, values: &[f32]) -> NnResult<()> {
        let input = self.input_mut()?;
        if input.len() != values.len() {
            return Err(NnError::invalid_shape(format!(
                "expected {} input values, got {}",
                input.len(),
                values.len()
            )));
        }
        input.copy_from_slice(values);
        Ok(())
    }

    /// Copy `values` into the output vector; the widths must match.
    pub fn set_output(&mut self, values: &[f32]) -> NnResult<()> {
        let output = self.output_mut()?;
        if output.len() != values.len() {
            return Err(NnError::invalid_shape(format!(
                "expected {} output values, got {}",
                output.len(),
                values.len()
            )));
        }
        output.copy_from_slice(values);
        Ok(())
    }

    fn weight_index(&self, k: usize, input: usize, output: usize) -> NnResult<usize> {
        let layer = self.layer_info(k)?;
        NnError::check_index("input", input, layer.input_count)?;
        NnError::check_index("output", output, layer.output_count)?;
        Ok(output * layer.input_count + input)
    }

    /// Weight connecting `input` to `output` in layer `k`.
    pub fn weight(&self, k: usize, input: usize, output: usize) -> NnResult<f32> {
        let at = self.weight_index(k, input, output)?;
        Ok(self.layer(k)?.weights()[at])
    }

    /// Overwrite the weight connecting `input` to `output` in layer `k`.
    pub fn set_weight(&mut self, k: usize, input: usize, output: usize, value: f32) -> NnResult<()> {
        let at = self.weight_index(k, input, output)?;
        self.layer_mut(k)?.weights[at] = value;
        Ok(())
    }

    /// Bias of unit `index` in layer `k`.
    pub fn bias(&self, k: usize, index: usize) -> NnResult<f32> {
        let layer = self.layer_info(k)?;
        NnError::check_index("bias", index, layer.output_count)?;
        Ok(self.layer(k)?.biases()[index])
    }

    /// Overwrite the bias of unit `index` in layer `k`.
    pub fn set_bias(&mut self, k: usize, index: usize, value: f32) -> NnResult<()> {
        let layer = self.layer_info(k)?;
        NnError::check_index("bias", index, layer.output_count)?;
        self.layer_mut(k)?.biases[index] = value;
        Ok(())
    }
}

impl<A: BlockAllocator> std::fmt::Debug for Network<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("layers", &self.layers)
            .field("max_layer_count", &self.max_layer_count)
            .field("input_count", &self.input_count)
            .field("output_count", &self.output_count)
            .finish()
    }
}
