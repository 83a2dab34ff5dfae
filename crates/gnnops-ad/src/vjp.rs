//! Vector-Jacobian Product (VJP) rules for graph operators
//!
//! Each operator is a struct that owns the inputs of its forward pass and
//! implements [`DifferentiableOp`]: `forward` computes the output and
//! `backward` maps an output cotangent to input cotangents.
//!
//! # Overview
//!
//! For a forward operation `y = f(x1, x2, ...)`, the VJP computes:
//! ```text
//! vjp(dy) = (∂L/∂x1, ∂L/∂x2, ...)
//! ```
//! where `dy = ∂L/∂y` is the incoming gradient (cotangent).
//!
//! Only floating-point inputs receive gradients. Group ids, edge lists and the
//! destination array (which contributes only its shape) are treated as
//! constants.
//!
//! # Example
//!
//! ```
//! use gnnops_ad::vjp::{DifferentiableOp, SegmentSoftmaxOp};
//! use scirs2_core::ndarray_ext::array;
//!
//! let op = SegmentSoftmaxOp::new(array![1.0_f64, 2.0, 3.0], vec![0, 0, 1]);
//! let y = op.forward().unwrap();
//! let dx = op.backward(&y, &array![1.0, 0.0, 0.0]).unwrap();
//! assert_eq!(dx.len(), 3);
//! assert_eq!(dx[2], 0.0);
//! ```

use anyhow::{Context, Result};
use gnnops_kernels::{
    graph_reduce, graph_reduce_grad, graph_reduce_with_weight_grad, segment_softmax,
    segment_softmax_grad, ReduceMethod, WeightedReduceGrads,
};
use scirs2_core::ndarray_ext::{Array1, Array2};
use scirs2_core::numeric::Float;

/// A forward computation paired with its reverse-mode gradient
pub trait DifferentiableOp {
    /// Forward output type
    type Output;

    /// Gradients w.r.t. the differentiable inputs
    type Grads;

    /// Operator name, used in error context and logs
    fn name(&self) -> &'static str;

    /// Compute the forward output from the stored inputs
    fn forward(&self) -> Result<Self::Output>;

    /// Compute input gradients
    ///
    /// # Arguments
    ///
    /// * `output` - The value returned by [`forward`](Self::forward)
    /// * `output_grad` - Gradient w.r.t. the output (∂L/∂output)
    fn backward(&self, output: &Self::Output, output_grad: &Self::Output) -> Result<Self::Grads>;
}

/// Segment softmax over contiguous runs of equal group ids
#[derive(Debug, Clone)]
pub struct SegmentSoftmaxOp<T> {
    /// Scores (saved from forward pass)
    pub values: Array1<T>,
    /// Group id per score
    pub group_ids: Vec<i64>,
}

impl<T> SegmentSoftmaxOp<T>
where
    T: Float,
{
    pub fn new(values: Array1<T>, group_ids: Vec<i64>) -> Self {
        Self { values, group_ids }
    }
}

impl<T> DifferentiableOp for SegmentSoftmaxOp<T>
where
    T: Float,
{
    type Output = Array1<T>;
    type Grads = Array1<T>;

    fn name(&self) -> &'static str {
        "segment_softmax"
    }

    fn forward(&self) -> Result<Array1<T>> {
        segment_softmax(&self.values.view(), &self.group_ids)
            .with_context(|| format!("{} forward", self.name()))
    }

    /// The softmax Jacobian is expressed through the forward output, so the
    /// scores themselves are not revisited.
    fn backward(&self, output: &Array1<T>, output_grad: &Array1<T>) -> Result<Array1<T>> {
        segment_softmax_grad(&output.view(), &output_grad.view(), &self.group_ids)
            .with_context(|| format!("{} backward", self.name()))
    }
}

/// Unweighted graph reduce
#[derive(Debug, Clone)]
pub struct GraphReduceOp<T> {
    /// Source features (saved from forward pass)
    pub src: Array2<T>,
    /// Shape of the destination array
    pub dst_shape: (usize, usize),
    /// `(source_row, destination_row)` pairs
    pub edges: Vec<(usize, usize)>,
    pub method: ReduceMethod,
}

impl<T> GraphReduceOp<T>
where
    T: Float,
{
    pub fn new(
        src: Array2<T>,
        dst_shape: (usize, usize),
        edges: Vec<(usize, usize)>,
        method: ReduceMethod,
    ) -> Self {
        Self {
            src,
            dst_shape,
            edges,
            method,
        }
    }
}

impl<T> DifferentiableOp for GraphReduceOp<T>
where
    T: Float,
{
    type Output = Array2<T>;
    type Grads = Array2<T>;

    fn name(&self) -> &'static str {
        "graph_reduce"
    }

    fn forward(&self) -> Result<Array2<T>> {
        let dst = Array2::<T>::zeros(self.dst_shape);
        graph_reduce(&self.src.view(), &dst.view(), &self.edges, None, self.method)
            .with_context(|| format!("{} forward ({})", self.name(), self.method))
    }

    fn backward(&self, _output: &Array2<T>, output_grad: &Array2<T>) -> Result<Array2<T>> {
        graph_reduce_grad(&output_grad.view(), self.src.dim(), &self.edges, self.method)
            .with_context(|| format!("{} backward ({})", self.name(), self.method))
    }
}

/// Graph reduce with one scalar weight per edge
///
/// Gradients flow to both the source features and the weights.
#[derive(Debug, Clone)]
pub struct WeightedGraphReduceOp<T> {
    pub src: Array2<T>,
    pub dst_shape: (usize, usize),
    pub edges: Vec<(usize, usize)>,
    /// One weight per edge
    pub weights: Array1<T>,
    pub method: ReduceMethod,
}

impl<T> WeightedGraphReduceOp<T>
where
    T: Float,
{
    pub fn new(
        src: Array2<T>,
        dst_shape: (usize, usize),
        edges: Vec<(usize, usize)>,
        weights: Array1<T>,
        method: ReduceMethod,
    ) -> Self {
        Self {
            src,
            dst_shape,
            edges,
            weights,
            method,
        }
    }
}

impl<T> DifferentiableOp for WeightedGraphReduceOp<T>
where
    T: Float,
{
    type Output = Array2<T>;
    type Grads = WeightedReduceGrads<T>;

    fn name(&self) -> &'static str {
        "weighted_graph_reduce"
    }

    fn forward(&self) -> Result<Array2<T>> {
        let dst = Array2::<T>::zeros(self.dst_shape);
        graph_reduce(
            &self.src.view(),
            &dst.view(),
            &self.edges,
            Some(&self.weights.view()),
            self.method,
        )
        .with_context(|| format!("{} forward ({})", self.name(), self.method))
    }

    fn backward(
        &self,
        _output: &Array2<T>,
        output_grad: &Array2<T>,
    ) -> Result<WeightedReduceGrads<T>> {
        graph_reduce_with_weight_grad(
            &output_grad.view(),
            &self.src.view(),
            &self.edges,
            &self.weights.view(),
            self.method,
        )
        .with_context(|| format!("{} backward ({})", self.name(), self.method))
    }
}

/// Run forward then backward in one call
///
/// Returns the forward output together with the input gradients.
pub fn value_and_grad<Op>(op: &Op, output_grad: &Op::Output) -> Result<(Op::Output, Op::Grads)>
where
    Op: DifferentiableOp,
{
    let output = op.forward()?;
    let grads = op.backward(&output, output_grad)?;
    tracing::trace!(op = op.name(), "value_and_grad");
    Ok((output, grads))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray_ext::array;

    #[test]
    fn test_segment_softmax_op_roundtrip() {
        let op = SegmentSoftmaxOp::new(array![0.0_f64, 0.0, 1.0], vec![4, 4, 9]);
        let y = op.forward().unwrap();
        assert_eq!(y, array![0.5, 0.5, 1.0]);

        let dx = op.backward(&y, &array![1.0, -1.0, 3.0]).unwrap();
        assert_eq!(dx, array![0.5, -0.5, 0.0]);
    }

    #[test]
    fn test_graph_reduce_op_backward_shape() {
        let op = GraphReduceOp::new(
            array![[1.0_f64, 2.0], [3.0, 4.0]],
            (3, 2),
            vec![(0, 2), (1, 2)],
            ReduceMethod::Mean,
        );
        let y = op.forward().unwrap();
        assert_eq!(y, array![[0.0, 0.0], [0.0, 0.0], [2.0, 3.0]]);

        let dx = op.backward(&y, &array![[9.0, 9.0], [9.0, 9.0], [2.0, 4.0]]).unwrap();
        assert_eq!(dx, array![[1.0, 2.0], [1.0, 2.0]]);
    }

    #[test]
    fn test_weighted_op_returns_both_gradients() {
        let op = WeightedGraphReduceOp::new(
            array![[1.0_f64], [2.0]],
            (1, 1),
            vec![(0, 0), (1, 0)],
            array![3.0, 5.0],
            ReduceMethod::Sum,
        );
        let (y, grads) = value_and_grad(&op, &array![[2.0]]).unwrap();
        assert_eq!(y, array![[13.0]]);
        assert_eq!(grads.src, array![[6.0], [10.0]]);
        assert_eq!(grads.weights, array![2.0, 4.0]);
    }

    #[test]
    fn test_errors_carry_operator_context() {
        let op = SegmentSoftmaxOp::new(array![1.0_f64, 2.0], vec![0]);
        let err = op.forward().unwrap_err();
        assert!(format!("{:#}", err).starts_with("segment_softmax forward"));
    }
}
