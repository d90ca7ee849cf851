//! The stateful bridge a 16-bit host drives.
//!
//! A [`HostContext`] owns one network, its backpropagation scratch, an
//! observation store and a sticky [`HostStatus`]. Every operation returns
//! its [`NnResult`] and, on failure, also records the matching status so
//! a host that only polls [`error`](HostContext::error) sees it.
//!
//! Parameters cross the boundary as `i16` fractions `num / den`; reads go
//! through [`fraction_approx`].

use axon_arena::{ArenaError, BlockAllocator, BlockArena, HeapAllocator};
use axon_core::{NetworkShape, NnError, NnResult};
use axon_net::{
    evaluate, hebbian_step_checked, train_epochs, Accumulate, BackpropScratch, Network,
    ObservationStore,
};
use log::{debug, warn};
use smallvec::SmallVec;

use crate::fraction::{fraction_approx, fraction_value};
use crate::status::HostStatus;

fn ratio(num: i16, den: i16) -> NnResult<f32> {
    fraction_value(num, den).ok_or(NnError::IndexOutOfRange {
        what: "denominator",
        index: 0,
        len: 0,
    })
}

fn check_denominators(den: &[i16]) -> NnResult<()> {
    match den.iter().position(|&d| d == 0) {
        Some(index) => Err(NnError::IndexOutOfRange {
            what: "denominator",
            index,
            len: den.len(),
        }),
        None => Ok(()),
    }
}

fn to_host(value: f32) -> i16 {
    value.round() as i16
}

fn copy_from_host(dst: &mut [f32], src: &[i16]) -> usize {
    let n = dst.len().min(src.len());
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = s as f32;
    }
    n
}

fn copy_to_host(dst: &mut [i16], src: &[f32]) -> usize {
    let n = dst.len().min(src.len());
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = to_host(s);
    }
    n
}

/// Run `op` with scratch that fits the network's current shape, creating
/// or replacing it as needed. The scratch is kept for the next call even
/// when `op` fails.
fn with_scratch<A: BlockAllocator, T>(
    network: &mut Network<A>,
    slot: &mut Option<BackpropScratch>,
    op: impl FnOnce(&mut Network<A>, &mut BackpropScratch) -> NnResult<T>,
) -> NnResult<T> {
    let mut scratch = match slot.take() {
        Some(scratch) if scratch.matches(network) => scratch,
        stale => {
            if let Some(scratch) = stale {
                scratch.release(network);
            }
            BackpropScratch::new(network)?
        }
    };
    let result = op(network, &mut scratch);
    *slot = Some(scratch);
    result
}

/// Network, scratch, dataset and sticky status of one host.
pub struct HostContext<A: BlockAllocator = HeapAllocator> {
    network: Network<A>,
    scratch: Option<BackpropScratch>,
    dataset: ObservationStore<A>,
    status: HostStatus,
    seed: u64,
}

impl HostContext<HeapAllocator> {
    /// Context whose network and dataset live on the heap.
    pub fn on_heap() -> Self {
        Self::new(HeapAllocator::new(), HeapAllocator::new())
    }
}

impl HostContext<BlockArena> {
    /// Context with one fixed arena for the network and its scratch and
    /// another for the dataset.
    pub fn with_arena_bytes(network_bytes: usize, dataset_bytes: usize) -> Result<Self, ArenaError> {
        Ok(Self::new(
            BlockArena::with_bytes(network_bytes)?,
            BlockArena::with_bytes(dataset_bytes)?,
        ))
    }
}

impl<A: BlockAllocator> HostContext<A> {
    /// Context with no network over the given allocators.
    pub fn new(network_alloc: A, dataset_alloc: A) -> Self {
        Self {
            network: Network::new(network_alloc),
            scratch: None,
            dataset: ObservationStore::empty(dataset_alloc),
            status: HostStatus::Ok,
            seed: 0,
        }
    }

    fn run<T>(&mut self, op: &'static str, f: impl FnOnce(&mut Self) -> NnResult<T>) -> NnResult<T> {
        let result = f(self);
        if let Err(e) = &result {
            self.status = HostStatus::from(e);
            warn!("host {op} failed: {e}");
        }
        result
    }

    fn release_scratch(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            scratch.release(&mut self.network);
        }
    }

    fn ensure_network(&self) -> NnResult<()> {
        if self.network.is_empty() {
            Err(NnError::NoNetwork)
        } else {
            Ok(())
        }
    }

    /// The network being driven.
    pub fn network(&self) -> &Network<A> {
        &self.network
    }

    /// The training dataset.
    pub fn dataset(&self) -> &ObservationStore<A> {
        &self.dataset
    }

    /// Status of the most recent failure, or `Ok` since the last reset.
    pub fn error(&self) -> HostStatus {
        self.status
    }

    /// Clear the sticky status.
    pub fn reset_error(&mut self) {
        self.status = HostStatus::Ok;
    }

    // --- topology ---

    /// Rebuild the network: `output_counts[k]` units in layer `k`, whose
    /// input width is the previous layer's output width (or `input_count`
    /// for the first). Activation codes follow
    /// [`axon_core::Activation::from_code`]; missing codes mean identity.
    ///
    /// The old network and scratch are released first; on failure the
    /// network is left empty. Weights are then randomised.
    pub fn init(
        &mut self,
        input_count: usize,
        output_counts: &[usize],
        activation_codes: &[i16],
    ) -> NnResult<()> {
        self.run("init", |ctx| {
            ctx.release_scratch();
            let built = ctx.build(input_count, output_counts, activation_codes);
            if built.is_err() {
                ctx.network.reset(0)?;
            }
            built?;
            ctx.randomize();
            debug!(
                "host network: {input_count} inputs, layers {output_counts:?}, seed {}",
                ctx.seed
            );
            Ok(())
        })
    }

    fn build(
        &mut self,
        input_count: usize,
        output_counts: &[usize],
        activation_codes: &[i16],
    ) -> NnResult<()> {
        let codes: Vec<i32> = activation_codes.iter().map(|&c| c.into()).collect();
        let shape = NetworkShape::from_codes(input_count, output_counts, &codes);
        self.network.reset(shape.layer_count())?;
        for (inputs, outputs, activation) in shape.layer_dims() {
            self.network.add_layer(inputs, outputs, activation)?;
        }
        Ok(())
    }

    fn randomize(&mut self) {
        self.network.init_weights_seeded(self.seed);
        self.seed = self.seed.wrapping_add(1);
    }

    /// Re-randomise every weight and zero every bias. Each call draws from
    /// a fresh seed.
    pub fn reset_weights(&mut self) {
        self.randomize();
    }

    /// Zero every weight and bias.
    pub fn clear_weights(&mut self) {
        self.network.clear_weights();
    }

    // --- parameters ---

    /// Weight from `input` to `output` in `layer`, as a fraction.
    pub fn weight(&mut self, layer: usize, input: usize, output: usize) -> NnResult<(i16, i16)> {
        self.run("weight", |ctx| {
            Ok(fraction_approx(ctx.network.weight(layer, input, output)?))
        })
    }

    /// Set the weight from `input` to `output` in `layer` to `num / den`.
    pub fn set_weight(
        &mut self,
        layer: usize,
        input: usize,
        output: usize,
        num: i16,
        den: i16,
    ) -> NnResult<()> {
        self.run("set_weight", |ctx| {
            let value = ratio(num, den)?;
            ctx.network.set_weight(layer, input, output, value)
        })
    }

    /// Read the weights of `layer` in row-major `[output][input]` order
    /// into `num`/`den`, as many as fit in both. Returns the count written.
    pub fn weights(&mut self, layer: usize, num: &mut [i16], den: &mut [i16]) -> NnResult<usize> {
        self.run("weights", |ctx| {
            ctx.ensure_network()?;
            let view = ctx.network.layer(layer)?;
            Ok(write_fractions(view.weights(), num, den))
        })
    }

    /// Overwrite the leading weights of `layer` with `num[i] / den[i]`.
    /// Nothing is written if any denominator in range is zero.
    pub fn set_weights(&mut self, layer: usize, num: &[i16], den: &[i16]) -> NnResult<usize> {
        self.run("set_weights", |ctx| {
            ctx.ensure_network()?;
            let view = ctx.network.layer_mut(layer)?;
            read_fractions(view.weights, num, den)
        })
    }

    /// Bias (offset) of unit `index` in `layer`, as a fraction.
    pub fn offset(&mut self, layer: usize, index: usize) -> NnResult<(i16, i16)> {
        self.run("offset", |ctx| Ok(fraction_approx(ctx.network.bias(layer, index)?)))
    }

    /// Set the bias of unit `index` in `layer` to `num / den`.
    pub fn set_offset(&mut self, layer: usize, index: usize, num: i16, den: i16) -> NnResult<()> {
        self.run("set_offset", |ctx| {
            let value = ratio(num, den)?;
            ctx.network.set_bias(layer, index, value)
        })
    }

    /// Read the biases of `layer` into `num`/`den`.
    pub fn offsets(&mut self, layer: usize, num: &mut [i16], den: &mut [i16]) -> NnResult<usize> {
        self.run("offsets", |ctx| {
            ctx.ensure_network()?;
            let view = ctx.network.layer(layer)?;
            Ok(write_fractions(view.biases(), num, den))
        })
    }

    /// Overwrite the leading biases of `layer` with `num[i] / den[i]`.
    pub fn set_offsets(&mut self, layer: usize, num: &[i16], den: &[i16]) -> NnResult<usize> {
        self.run("set_offsets", |ctx| {
            ctx.ensure_network()?;
            let view = ctx.network.layer_mut(layer)?;
            read_fractions(view.biases, num, den)
        })
    }

    // --- input / output ---

    /// Copy the network input, rounded, into `values`.
    pub fn inputs(&mut self, values: &mut [i16]) -> NnResult<usize> {
        self.run("inputs", |ctx| Ok(copy_to_host(values, ctx.network.input()?)))
    }

    /// Copy `values` into the leading network inputs.
    pub fn set_inputs(&mut self, values: &[i16]) -> NnResult<usize> {
        self.run("set_inputs", |ctx| {
            Ok(copy_from_host(ctx.network.input_mut()?, values))
        })
    }

    /// Copy the network output, rounded, into `values`.
    pub fn outputs(&mut self, values: &mut [i16]) -> NnResult<usize> {
        self.run("outputs", |ctx| Ok(copy_to_host(values, ctx.network.output()?)))
    }

    /// Copy `values` into the leading network outputs, typically the
    /// target before [`backprop`](Self::backprop).
    pub fn set_outputs(&mut self, values: &[i16]) -> NnResult<usize> {
        self.run("set_outputs", |ctx| {
            Ok(copy_from_host(ctx.network.output_mut()?, values))
        })
    }

    // --- learning ---

    /// Evaluate the network on its current input.
    pub fn eval(&mut self) -> NnResult<()> {
        self.run("eval", |ctx| evaluate(&mut ctx.network))
    }

    /// One Hebbian step with rate `num / den` on a single identity layer.
    ///
    /// An empty network is reported as unsuitable, like any other
    /// topology the rule does not support.
    pub fn hebbian_rule(&mut self, num: i16, den: i16) -> NnResult<()> {
        self.run("hebbian_rule", |ctx| {
            if ctx.network.is_empty() {
                return Err(NnError::unsuitable("hebbian rule needs a network"));
            }
            let alpha = ratio(num, den)?;
            hebbian_step_checked(&mut ctx.network, alpha)
        })
    }

    /// One backpropagation step with learning rate `num / den`, using the
    /// staged input and the target staged in the output vector.
    pub fn backprop(&mut self, num: i16, den: i16) -> NnResult<()> {
        self.run("backprop", |ctx| {
            ctx.ensure_network()?;
            let eta = ratio(num, den)?;
            with_scratch(&mut ctx.network, &mut ctx.scratch, |net, scratch| {
                scratch.accumulate_gradients(net, Accumulate::Reset)?;
                scratch.apply_gradients(net, eta)
            })
        })
    }

    // --- dataset ---

    /// Size the dataset for `max_count` records of the network's current
    /// widths, discarding any stored records.
    pub fn dataset_init(&mut self, max_count: usize) -> NnResult<()> {
        self.run("dataset_init", |ctx| {
            ctx.ensure_network()?;
            let (inputs, outputs) = (ctx.network.input_count(), ctx.network.output_count());
            ctx.dataset.init(inputs, outputs, max_count)
        })
    }

    /// Append a record, copying as many values as fit.
    pub fn dataset_add(&mut self, input: &[i16], output: &[i16]) -> NnResult<()> {
        self.run("dataset_add", |ctx| {
            ctx.ensure_network()?;
            let input = widen(input);
            let output = widen(output);
            ctx.dataset.push(&input, &output)
        })
    }

    /// Backpropagate over every stored record `iterations` times with
    /// learning rate `num / den`.
    pub fn backprop_dataset(&mut self, num: i16, den: i16, iterations: usize) -> NnResult<()> {
        self.run("backprop_dataset", |ctx| {
            ctx.ensure_network()?;
            let eta = ratio(num, den)?;
            if ctx.dataset.is_empty() {
                return Ok(());
            }
            let dataset = &ctx.dataset;
            with_scratch(&mut ctx.network, &mut ctx.scratch, |net, scratch| {
                train_epochs(net, scratch, dataset, eta, iterations)
            })
        })
    }
}

fn widen(values: &[i16]) -> SmallVec<[f32; 16]> {
    values.iter().map(|&v| v as f32).collect()
}

fn write_fractions(values: &[f32], num: &mut [i16], den: &mut [i16]) -> usize {
    let mut written = 0;
    for ((&v, n), d) in values.iter().zip(num.iter_mut()).zip(den.iter_mut()) {
        (*n, *d) = fraction_approx(v);
        written += 1;
    }
    written
}

fn read_fractions(values: &mut [f32], num: &[i16], den: &[i16]) -> NnResult<usize> {
    let len = values.len().min(num.len()).min(den.len());
    check_denominators(&den[..len])?;
    for ((v, &n), &d) in values.iter_mut().zip(num).zip(den) {
        *v = n as f32 / d as f32;
    }
    Ok(len)
}

impl<A: BlockAllocator> std::fmt::Debug for HostContext<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("network", &self.network)
            .field("has_scratch", &self.scratch.is_some())
            .field("dataset", &self.dataset)
            .field("status", &self.status)
            .field("seed", &self.seed)
            .finish()
    }
}
