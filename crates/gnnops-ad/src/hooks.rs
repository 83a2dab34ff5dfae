//! Integration hooks for external AD frameworks
//!
//! External autodiff systems compose the graph operators through two traits:
//! [`AdOperation`] is a type-erased operator over dynamic-rank arrays and
//! [`AdContext`] is the tape that records operators and runs the backward
//! pass. [`GradientTape`] is the reference context.
//!
//! Operators are looked up by value, never by name: registering an operator
//! hands the tape a boxed [`AdOperation`], so there is no global registry to
//! populate at load time.
//!
//! Backward results are positional, one slot per forward input. Inputs that do
//! not take a gradient (group ids, the destination array, edge lists) get
//! `None`. The weighted graph reduce therefore yields
//! `[Some(grad_src), None, None, Some(grad_weights)]`.
//!
//! # Example
//!
//! ```
//! use gnnops_ad::hooks::{AdContext, GradientTape};
//! use gnnops_ad::vjp::GraphReduceOp;
//! use gnnops_kernels::ReduceMethod;
//! use scirs2_core::ndarray_ext::array;
//!
//! let mut tape = GradientTape::<f64>::new();
//! let op = GraphReduceOp::new(array![[1.0], [2.0]], (1, 1), vec![(0, 0), (1, 0)], ReduceMethod::Sum);
//! let id = tape.register_operation(Box::new(op)).unwrap();
//!
//! tape.backward(id, &array![[1.0]].into_dyn()).unwrap();
//! let grad_src = tape.get_gradient(id, 0).unwrap();
//! assert_eq!(grad_src.shape(), &[2, 1]);
//! assert!(tape.get_gradient(id, 1).is_none());
//! ```

use crate::vjp::{DifferentiableOp, GraphReduceOp, SegmentSoftmaxOp, WeightedGraphReduceOp};
use anyhow::{anyhow, bail, Result};
use rustc_hash::FxHashMap;
use scirs2_core::ndarray_ext::{ArrayD, Ix1, Ix2};
use scirs2_core::numeric::Float;
use std::fmt::Debug;

/// Unique identifier for operations in the AD graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId(pub u64);

/// Trait for differentiable operations
///
/// Implemented for every operator in [`crate::vjp`]; external frameworks may
/// implement it for their own operators and record them on the same tape.
pub trait AdOperation<T>: Debug
where
    T: Float + 'static,
{
    /// Execute the forward pass
    fn forward(&self) -> Result<Vec<ArrayD<T>>>;

    /// Execute the backward pass
    ///
    /// # Arguments
    ///
    /// * `outputs` - Values returned by [`forward`](Self::forward)
    /// * `output_grads` - Gradients w.r.t. outputs (∂L/∂output)
    ///
    /// # Returns
    ///
    /// One entry per input, `None` where the input takes no gradient
    fn backward(
        &self,
        outputs: &[ArrayD<T>],
        output_grads: &[ArrayD<T>],
    ) -> Result<Vec<Option<ArrayD<T>>>>;

    /// Get a unique name for this operation (for debugging)
    fn name(&self) -> &str;

    /// Get the number of inputs
    fn num_inputs(&self) -> usize;

    /// Get the number of outputs
    fn num_outputs(&self) -> usize {
        1
    }
}

/// Trait for AD framework context management
///
/// This represents the "tape" that records operations for later
/// differentiation.
pub trait AdContext<T>
where
    T: Float + 'static,
{
    /// Run the forward pass of `op` and record it
    fn register_operation(&mut self, op: Box<dyn AdOperation<T>>) -> Result<OperationId>;

    /// Execute backward pass starting from a specific operation
    ///
    /// # Arguments
    ///
    /// * `op_id` - The operation to start backpropagation from
    /// * `grad` - Gradient w.r.t. that operation's output
    fn backward(&mut self, op_id: OperationId, grad: &ArrayD<T>) -> Result<()>;

    /// Clear the tape
    fn clear(&mut self);

    /// Gradient of input `input` of operation `op_id`, if one was computed
    fn get_gradient(&self, op_id: OperationId, input: usize) -> Option<&ArrayD<T>>;
}

fn single<'a, T>(op: &str, arrays: &'a [ArrayD<T>]) -> Result<&'a ArrayD<T>> {
    match arrays {
        [one] => Ok(one),
        _ => Err(anyhow!("{}: expected 1 array, got {}", op, arrays.len())),
    }
}

fn as_1d<T: Clone>(op: &str, array: &ArrayD<T>) -> Result<scirs2_core::ndarray_ext::Array1<T>> {
    array
        .clone()
        .into_dimensionality::<Ix1>()
        .map_err(|e| anyhow!("{}: expected a 1-D array: {}", op, e))
}

fn as_2d<T: Clone>(op: &str, array: &ArrayD<T>) -> Result<scirs2_core::ndarray_ext::Array2<T>> {
    array
        .clone()
        .into_dimensionality::<Ix2>()
        .map_err(|e| anyhow!("{}: expected a 2-D array: {}", op, e))
}

impl<T> AdOperation<T> for SegmentSoftmaxOp<T>
where
    T: Float + Debug + 'static,
{
    fn forward(&self) -> Result<Vec<ArrayD<T>>> {
        Ok(vec![DifferentiableOp::forward(self)?.into_dyn()])
    }

    fn backward(
        &self,
        outputs: &[ArrayD<T>],
        output_grads: &[ArrayD<T>],
    ) -> Result<Vec<Option<ArrayD<T>>>> {
        let op = DifferentiableOp::name(self);
        let output = as_1d(op, single(op, outputs)?)?;
        let grad = as_1d(op, single(op, output_grads)?)?;
        let grad_values = DifferentiableOp::backward(self, &output, &grad)?;
        Ok(vec![Some(grad_values.into_dyn()), None])
    }

    fn name(&self) -> &str {
        DifferentiableOp::name(self)
    }

    fn num_inputs(&self) -> usize {
        2
    }
}

impl<T> AdOperation<T> for GraphReduceOp<T>
where
    T: Float + Debug + 'static,
{
    fn forward(&self) -> Result<Vec<ArrayD<T>>> {
        Ok(vec![DifferentiableOp::forward(self)?.into_dyn()])
    }

    fn backward(
        &self,
        outputs: &[ArrayD<T>],
        output_grads: &[ArrayD<T>],
    ) -> Result<Vec<Option<ArrayD<T>>>> {
        let op = DifferentiableOp::name(self);
        let output = as_2d(op, single(op, outputs)?)?;
        let grad = as_2d(op, single(op, output_grads)?)?;
        let grad_src = DifferentiableOp::backward(self, &output, &grad)?;
        Ok(vec![Some(grad_src.into_dyn()), None, None])
    }

    fn name(&self) -> &str {
        DifferentiableOp::name(self)
    }

    fn num_inputs(&self) -> usize {
        3
    }
}

impl<T> AdOperation<T> for WeightedGraphReduceOp<T>
where
    T: Float + Debug + 'static,
{
    fn forward(&self) -> Result<Vec<ArrayD<T>>> {
        Ok(vec![DifferentiableOp::forward(self)?.into_dyn()])
    }

    fn backward(
        &self,
        outputs: &[ArrayD<T>],
        output_grads: &[ArrayD<T>],
    ) -> Result<Vec<Option<ArrayD<T>>>> {
        let op = DifferentiableOp::name(self);
        let output = as_2d(op, single(op, outputs)?)?;
        let grad = as_2d(op, single(op, output_grads)?)?;
        let grads = DifferentiableOp::backward(self, &output, &grad)?;
        Ok(vec![
            Some(grads.src.into_dyn()),
            None,
            None,
            Some(grads.weights.into_dyn()),
        ])
    }

    fn name(&self) -> &str {
        DifferentiableOp::name(self)
    }

    fn num_inputs(&self) -> usize {
        4
    }
}

struct TapeEntry<T> {
    id: OperationId,
    op: Box<dyn AdOperation<T>>,
    outputs: Vec<ArrayD<T>>,
}

/// Reference [`AdContext`]: a linear tape
///
/// Operations recorded in sequence form a chain, the output of operation `k`
/// feeding the first input of operation `k + 1`. `backward` walks the chain
/// from the requested operation towards the first one and stops early when an
/// operation's first input takes no gradient.
///
/// Ids are never reused, not even across [`AdContext::clear`]. An operation
/// registered while recording is paused gets an id the tape does not know.
/// Each `backward` call replaces the gradients left by the previous one.
pub struct GradientTape<T>
where
    T: Float + 'static,
{
    /// Recorded operations in forward pass order
    entries: Vec<TapeEntry<T>>,

    /// Input gradients keyed by (operation, input slot)
    gradients: FxHashMap<(u64, usize), ArrayD<T>>,

    /// Recording mode flag
    recording: bool,

    /// Id handed to the next registered operation
    next_id: u64,
}

impl<T> GradientTape<T>
where
    T: Float + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            gradients: FxHashMap::default(),
            recording: true,
            next_id: 0,
        }
    }

    pub fn start_recording(&mut self) {
        self.recording = true;
    }

    /// Stop recording; registered operations still run forward but are not kept
    pub fn stop_recording(&mut self) {
        self.recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn num_operations(&self) -> usize {
        self.entries.len()
    }

    /// Forward outputs of a recorded operation
    pub fn outputs(&self, op_id: OperationId) -> Option<&[ArrayD<T>]> {
        self.position(op_id)
            .map(|idx| self.entries[idx].outputs.as_slice())
    }

    /// Index of a recorded operation in `entries`; ids increase along the tape
    fn position(&self, op_id: OperationId) -> Option<usize> {
        self.entries.binary_search_by_key(&op_id, |entry| entry.id).ok()
    }
}

impl<T> Default for GradientTape<T>
where
    T: Float + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AdContext<T> for GradientTape<T>
where
    T: Float + 'static,
{
    fn register_operation(&mut self, op: Box<dyn AdOperation<T>>) -> Result<OperationId> {
        let outputs = op.forward()?;
        if outputs.len() != op.num_outputs() {
            bail!(
                "{}: forward produced {} outputs, declared {}",
                op.name(),
                outputs.len(),
                op.num_outputs()
            );
        }

        let op_id = OperationId(self.next_id);
        self.next_id += 1;
        if self.recording {
            tracing::trace!(op = op.name(), id = op_id.0, "record");
            self.entries.push(TapeEntry { id: op_id, op, outputs });
        }
        Ok(op_id)
    }

    fn backward(&mut self, op_id: OperationId, grad: &ArrayD<T>) -> Result<()> {
        let Some(start) = self.position(op_id) else {
            bail!("unknown operation {:?}", op_id);
        };
        self.gradients.clear();

        let mut current = grad.clone();
        for idx in (0..=start).rev() {
            let entry = &self.entries[idx];
            let expected = entry.outputs.first().map(|o| o.shape().to_vec());
            if expected.as_deref() != Some(current.shape()) {
                bail!(
                    "{}: output gradient shape {:?} does not match output shape {:?}",
                    entry.op.name(),
                    current.shape(),
                    expected
                );
            }

            let input_grads = entry
                .op
                .backward(&entry.outputs, std::slice::from_ref(&current))?;
            if input_grads.len() != entry.op.num_inputs() {
                bail!(
                    "{}: backward produced {} gradients for {} inputs",
                    entry.op.name(),
                    input_grads.len(),
                    entry.op.num_inputs()
                );
            }
            tracing::trace!(op = entry.op.name(), id = entry.id.0, "backward");

            let mut upstream = None;
            for (slot, g) in input_grads.into_iter().enumerate() {
                if let Some(g) = g {
                    if slot == 0 {
                        upstream = Some(g.clone());
                    }
                    self.gradients.insert((entry.id.0, slot), g);
                }
            }

            match upstream {
                Some(g) => current = g,
                None => break,
            }
        }

        Ok(())
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.gradients.clear();
    }

    fn get_gradient(&self, op_id: OperationId, input: usize) -> Option<&ArrayD<T>> {
        self.gradients.get(&(op_id.0, input))
    }
}
