//! Network shape descriptions.
//!
//! A [`NetworkShape`] is the validated, allocation-free description of a
//! linear stack of dense layers. Drivers build one from configuration and
//! hand it to the network model, which performs the actual allocations.

use smallvec::SmallVec;

use crate::activation::Activation;
use crate::error::{NnError, NnResult};

/// One dense layer in a [`NetworkShape`]: its width and nonlinearity.
///
/// The layer's input width is implied by its predecessor (or by the
/// network's input width for the first layer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerSpec {
    /// Number of output units.
    pub output_count: usize,
    /// Activation applied to the layer's pre-activation values.
    pub activation: Activation,
}

/// A linear stack of dense layers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkShape {
    /// Width of the network input vector.
    pub input_count: usize,
    /// Layers in evaluation order.
    pub layers: SmallVec<[LayerSpec; 4]>,
}

impl NetworkShape {
    /// Start a shape with the given input width and no layers.
    pub fn new(input_count: usize) -> Self {
        Self {
            input_count,
            layers: SmallVec::new(),
        }
    }

    /// Append a layer, builder style.
    pub fn with_layer(mut self, output_count: usize, activation: Activation) -> Self {
        self.layers.push(LayerSpec {
            output_count,
            activation,
        });
        self
    }

    /// Build a shape from a size list such as `[2, 3, 1]` (input width
    /// followed by each layer's output width), using one activation for
    /// every layer.
    pub fn from_sizes(sizes: &[usize], activation: Activation) -> Self {
        let mut shape = Self::new(sizes.first().copied().unwrap_or(0));
        for &output_count in sizes.iter().skip(1) {
            shape = shape.with_layer(output_count, activation);
        }
        shape
    }

    /// Build a shape from host arguments: per-layer output widths and
    /// activation codes. Missing codes default to identity.
    pub fn from_codes(input_count: usize, output_counts: &[usize], codes: &[i32]) -> Self {
        let mut shape = Self::new(input_count);
        for (k, &output_count) in output_counts.iter().enumerate() {
            let activation = codes
                .get(k)
                .map_or(Activation::Identity, |&c| Activation::from_code(c));
            shape = shape.with_layer(output_count, activation);
        }
        shape
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Width of the last layer's output, or the input width if there are
    /// no layers.
    pub fn output_count(&self) -> usize {
        self.layers
            .last()
            .map_or(self.input_count, |l| l.output_count)
    }

    /// Iterate `(input_count, output_count, activation)` per layer.
    pub fn layer_dims(&self) -> impl Iterator<Item = (usize, usize, Activation)> + '_ {
        let mut input_count = self.input_count;
        self.layers.iter().map(move |spec| {
            let dims = (input_count, spec.output_count, spec.activation);
            input_count = spec.output_count;
            dims
        })
    }

    /// Check that every width is positive and that there is at least one
    /// layer.
    pub fn validate(&self) -> NnResult<()> {
        if self.input_count == 0 {
            return Err(NnError::invalid_shape("input count must be positive"));
        }
        if self.layers.is_empty() {
            return Err(NnError::invalid_shape("network needs at least one layer"));
        }
        if let Some(k) = self.layers.iter().position(|l| l.output_count == 0) {
            return Err(NnError::invalid_shape(format!(
                "layer {k} output count must be positive"
            )));
        }
        Ok(())
    }
}
