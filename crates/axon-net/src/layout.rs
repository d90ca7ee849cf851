//! Parameter block layout for one dense layer.
//!
//! Each layer owns a single block partitioned, in order, as
//!
//! ```text
//! [ W (out × in, row-major) | B (out) | input (in, first layer only) | output (out) ]
//! ```

use std::ops::Range;

use axon_core::{NnError, NnResult};

/// Where a layer reads its input vector from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// The layer owns its input vector (only the first layer).
    Owned,
    /// The layer reads the output vector of the layer at this index.
    PreviousLayer(usize),
}

/// Offsets of a layer's sub-vectors within its parameter block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerLayout {
    /// Weight matrix `W`, `output_count` rows of `input_count` columns.
    pub weights: Range<usize>,
    /// Bias vector `B`.
    pub biases: Range<usize>,
    /// Owned input vector, present only for the first layer.
    pub input: Option<Range<usize>>,
    /// Output (post-activation) vector.
    pub output: Range<usize>,
}

impl LayerLayout {
    /// Compute the layout for a layer of the given dimensions.
    ///
    /// Fails with [`NnError::OutOfMemory`] when the block would not be
    /// addressable.
    pub fn new(input_count: usize, output_count: usize, owns_input: bool) -> NnResult<Self> {
        let weights = 0..input_count.checked_mul(output_count).ok_or_else(unaddressable)?;
        let biases = span(weights.end, output_count)?;
        let input = if owns_input {
            Some(span(biases.end, input_count)?)
        } else {
            None
        };
        let output_start = input.as_ref().map_or(biases.end, |r| r.end);
        let output = span(output_start, output_count)?;
        Ok(Self {
            weights,
            biases,
            input,
            output,
        })
    }

    /// Number of `f32` values in the block.
    pub fn len(&self) -> usize {
        self.output.end
    }

    /// Whether the layout is empty (never true for a valid layer).
    pub fn is_empty(&self) -> bool {
        self.output.end == 0
    }

    /// Split a block into `(W, B, input, output)` views.
    pub fn split<'a>(
        &self,
        block: &'a [f32],
    ) -> (&'a [f32], &'a [f32], Option<&'a [f32]>, &'a [f32]) {
        let (weights, rest) = block.split_at(self.weights.len());
        let (biases, rest) = rest.split_at(self.biases.len());
        let (input, rest) = match &self.input {
            Some(r) => {
                let (input, rest) = rest.split_at(r.len());
                (Some(input), rest)
            }
            None => (None, rest),
        };
        (weights, biases, input, &rest[..self.output.len()])
    }

    /// Split a block into mutable `(W, B, input, output)` views.
    #[allow(clippy::type_complexity)]
    pub fn split_mut<'a>(
        &self,
        block: &'a mut [f32],
    ) -> (
        &'a mut [f32],
        &'a mut [f32],
        Option<&'a mut [f32]>,
        &'a mut [f32],
    ) {
        let (weights, rest) = block.split_at_mut(self.weights.len());
        let (biases, rest) = rest.split_at_mut(self.biases.len());
        let (input, rest) = match &self.input {
            Some(r) => {
                let (input, rest) = rest.split_at_mut(r.len());
                (Some(input), rest)
            }
            None => (None, rest),
        };
        let output_len = self.output.len();
        (weights, biases, input, &mut rest[..output_len])
    }
}

/// `start..start + len`, failing on overflow.
pub(crate) fn span(start: usize, len: usize) -> NnResult<Range<usize>> {
    let end = start.checked_add(len).ok_or_else(unaddressable)?;
    Ok(start..end)
}

/// The error for a request no allocator could ever satisfy.
pub(crate) fn unaddressable() -> NnError {
    NnError::OutOfMemory {
        requested: usize::MAX,
        available: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_layer_owns_input() {
        let layout = LayerLayout::new(2, 3, true).unwrap();
        assert_eq!(layout.weights, 0..6);
        assert_eq!(layout.biases, 6..9);
        assert_eq!(layout.input, Some(9..11));
        assert_eq!(layout.output, 11..14);
        assert_eq!(layout.len(), 14);
    }

    #[test]
    fn later_layer_has_no_input() {
        let layout = LayerLayout::new(3, 1, false).unwrap();
        assert_eq!(layout.weights, 0..3);
        assert_eq!(layout.biases, 3..4);
        assert_eq!(layout.input, None);
        assert_eq!(layout.output, 4..5);
    }

    #[test]
    fn split_mut_views_match_ranges() {
        let layout = LayerLayout::new(2, 2, true).unwrap();
        let mut block: Vec<f32> = (0..layout.len()).map(|v| v as f32).collect();
        let (w, b, input, out) = layout.split_mut(&mut block);
        assert_eq!(w, &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(b, &[4.0, 5.0]);
        assert_eq!(input.unwrap(), &[6.0, 7.0]);
        assert_eq!(out, &[8.0, 9.0]);
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        let expected = Err(NnError::OutOfMemory {
            requested: usize::MAX,
            available: 0,
        });
        assert_eq!(LayerLayout::new(usize::MAX / 2, 3, true), expected);
        assert_eq!(LayerLayout::new(1, usize::MAX, false), expected);
        assert_eq!(LayerLayout::new(usize::MAX, 1, true), expected);
    }
}
