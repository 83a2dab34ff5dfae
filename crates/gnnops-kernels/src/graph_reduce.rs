//! Graph reduce: scatter-accumulate along an edge list, and its gradients
//!
//! Given source rows `src`, a destination array `dst` (used for its shape) and
//! edges `(s, d)`, the forward pass computes
//!
//! ```text
//! out[d] = Σ_{e=(s,d)} w_e * src[s]            (sum)
//! out[d] = Σ_{e=(s,d)} w_e * src[s] / deg(d)   (mean)
//! ```
//!
//! where `w_e` is the optional per-edge weight (1 when absent) and `deg(d)` is
//! the in-degree of `d`. Rows with no incoming edge stay zero in both modes.
//!
//! Sources are 2-D (`rows × width`). A source of width 1 broadcasts across a
//! wider destination in unweighted mode; in weighted mode widths must agree.
//! The `_1d` functions cover scalar-per-slot arrays.
//!
//! The backward passes are the transpose of the forward scatter: gradients are
//! gathered from destination rows back into source rows with the same scaling.
//!
//! # Examples
//!
//! ```
//! use scirs2_core::ndarray_ext::{array, Array1};
//! use gnnops_kernels::{graph_reduce_1d, ReduceMethod};
//!
//! let src = array![1.0_f64, 2.0, 4.0];
//! let dst = Array1::<f64>::zeros(2);
//! let edges = [(0, 0), (1, 0), (2, 0)];
//!
//! let sum = graph_reduce_1d(&src.view(), &dst.view(), &edges, None, ReduceMethod::Sum).unwrap();
//! assert_eq!(sum.to_vec(), vec![7.0, 0.0]);
//!
//! let mean = graph_reduce_1d(&src.view(), &dst.view(), &edges, None, ReduceMethod::Mean).unwrap();
//! assert!((mean[0] - 7.0 / 3.0).abs() < 1e-12);
//! assert_eq!(mean[1], 0.0);
//! ```

use crate::error::{KernelError, KernelResult};
use scirs2_core::ndarray_ext::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use scirs2_core::numeric::Float;
use std::fmt;
use std::str::FromStr;

/// Aggregation applied to the contributions arriving at a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReduceMethod {
    /// Plain sum of contributions
    Sum,
    /// Sum divided by in-degree
    #[default]
    Mean,
}

impl ReduceMethod {
    /// Attribute spelling of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            ReduceMethod::Sum => "sum",
            ReduceMethod::Mean => "mean",
        }
    }
}

impl FromStr for ReduceMethod {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(ReduceMethod::Sum),
            "mean" => Ok(ReduceMethod::Mean),
            other => Err(KernelError::InvalidMethod(other.to_string())),
        }
    }
}

impl fmt::Display for ReduceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gradients produced by [`graph_reduce_with_weight_grad`]
///
/// Positionally these are the gradients of the forward inputs
/// `(src, dst, edges, weights)` as `(src, None, None, weights)`: `dst` only
/// contributes its shape and the edge list is integral.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedReduceGrads<T> {
    /// ∂L/∂src, shaped like the forward source
    pub src: Array2<T>,
    /// ∂L/∂w, one entry per edge
    pub weights: Array1<T>,
}

/// Count incoming edges for every destination slot
///
/// # Errors
///
/// `IndexOutOfRange` if an edge targets a slot `>= num_dst`
pub fn in_degrees(edges: &[(usize, usize)], num_dst: usize) -> KernelResult<Vec<usize>> {
    let mut degrees = vec![0usize; num_dst];
    for &(_, d) in edges {
        if d >= num_dst {
            return Err(KernelError::index_out_of_range("in_degrees", d, num_dst));
        }
        degrees[d] += 1;
    }
    Ok(degrees)
}

/// Scatter-reduce source rows into destination rows along `edges`
///
/// # Arguments
///
/// * `src` - Source features, `num_src × width` (or `num_src × 1` to broadcast)
/// * `dst` - Destination array; only its shape `num_dst × width` is read
/// * `edges` - `(source_row, destination_row)` pairs
/// * `weights` - Optional scalar per edge
/// * `method` - [`ReduceMethod::Sum`] or [`ReduceMethod::Mean`]
///
/// # Returns
///
/// Freshly allocated array shaped like `dst`
///
/// # Errors
///
/// - `ShapeMismatch` if `weights.len() != edges.len()`, if weighted and
///   `src` width differs from `dst` width, or if unweighted and `src` width is
///   neither 1 nor the `dst` width
/// - `IndexOutOfRange` if an edge references a missing source or destination row
///
/// # Complexity
///
/// Time: O(E × width + num_dst × width)
/// Space: O(num_dst × width)
pub fn graph_reduce<T>(
    src: &ArrayView2<T>,
    dst: &ArrayView2<T>,
    edges: &[(usize, usize)],
    weights: Option<&ArrayView1<T>>,
    method: ReduceMethod,
) -> KernelResult<Array2<T>>
where
    T: Float,
{
    const OP: &str = "graph_reduce";

    let (num_src, src_width) = src.dim();
    let (num_dst, width) = dst.dim();

    match weights {
        Some(w) => {
            if w.len() != edges.len() {
                return Err(KernelError::shape_mismatch(OP, vec![edges.len()], vec![w.len()]));
            }
            if src_width != width {
                return Err(KernelError::shape_mismatch(
                    OP,
                    vec![num_src, width],
                    vec![num_src, src_width],
                ));
            }
        }
        None => {
            if src_width != width && src_width != 1 {
                return Err(KernelError::shape_mismatch(
                    OP,
                    vec![num_src, width],
                    vec![num_src, src_width],
                ));
            }
        }
    }
    validate_edges(OP, edges, num_src, num_dst)?;

    tracing::debug!(
        edges = edges.len(),
        num_src,
        num_dst,
        width,
        weighted = weights.is_some(),
        method = %method,
        "graph_reduce"
    );

    let mut out = Array2::<T>::zeros((num_dst, width));
    for (e, &(s, d)) in edges.iter().enumerate() {
        let w = weights.map_or(T::one(), |w| w[e]);
        if src_width == width {
            for j in 0..width {
                out[[d, j]] = out[[d, j]] + w * src[[s, j]];
            }
        } else {
            let v = w * src[[s, 0]];
            for j in 0..width {
                out[[d, j]] = out[[d, j]] + v;
            }
        }
    }

    if method == ReduceMethod::Mean {
        let scales = destination_scales::<T>(method, edges, num_dst)?;
        for (mut row, scale) in out.axis_iter_mut(Axis(0)).zip(scales) {
            row.mapv_inplace(|v| v * scale);
        }
    }

    Ok(out)
}

/// Scalar-per-slot form of [`graph_reduce`]
pub fn graph_reduce_1d<T>(
    src: &ArrayView1<T>,
    dst: &ArrayView1<T>,
    edges: &[(usize, usize)],
    weights: Option<&ArrayView1<T>>,
    method: ReduceMethod,
) -> KernelResult<Array1<T>>
where
    T: Float,
{
    let src2 = src.view().insert_axis(Axis(1));
    let dst2 = dst.view().insert_axis(Axis(1));
    let out = graph_reduce(&src2, &dst2, edges, weights, method)?;
    Ok(out.remove_axis(Axis(1)))
}

/// Gradient of unweighted [`graph_reduce`] with respect to `src`
///
/// `grad_src[s] += grad_out[d] * scale(d)` for every edge `(s, d)`, where
/// `scale(d)` is 1 for sum and `1 / deg(d)` for mean.
///
/// # Arguments
///
/// * `grad_out` - Upstream gradient, shaped like the forward destination
/// * `src_shape` - `(num_src, src_width)` of the forward source
/// * `edges` - Same edge list as the forward pass
/// * `method` - Same method as the forward pass
///
/// When the forward source was broadcast (`src_width == 1` against a wider
/// destination) the gradient row is summed across features.
///
/// # Errors
///
/// - `ShapeMismatch` if `src_width` is neither 1 nor the `grad_out` width
/// - `IndexOutOfRange` if an edge references a missing row
pub fn graph_reduce_grad<T>(
    grad_out: &ArrayView2<T>,
    src_shape: (usize, usize),
    edges: &[(usize, usize)],
    method: ReduceMethod,
) -> KernelResult<Array2<T>>
where
    T: Float,
{
    const OP: &str = "graph_reduce_grad";

    let (num_dst, width) = grad_out.dim();
    let (num_src, src_width) = src_shape;
    if src_width != width && src_width != 1 {
        return Err(KernelError::shape_mismatch(
            OP,
            vec![num_src, width],
            vec![num_src, src_width],
        ));
    }
    validate_edges(OP, edges, num_src, num_dst)?;

    let scales = destination_scales::<T>(method, edges, num_dst)?;

    let mut grad_src = Array2::<T>::zeros((num_src, src_width));
    for &(s, d) in edges {
        let scale = scales[d];
        if src_width == width {
            for j in 0..width {
                grad_src[[s, j]] = grad_src[[s, j]] + grad_out[[d, j]] * scale;
            }
        } else {
            let row_sum = grad_out.row(d).iter().fold(T::zero(), |acc, &g| acc + g);
            grad_src[[s, 0]] = grad_src[[s, 0]] + row_sum * scale;
        }
    }

    Ok(grad_src)
}

/// Scalar-per-slot form of [`graph_reduce_grad`]
pub fn graph_reduce_grad_1d<T>(
    grad_out: &ArrayView1<T>,
    num_src: usize,
    edges: &[(usize, usize)],
    method: ReduceMethod,
) -> KernelResult<Array1<T>>
where
    T: Float,
{
    let grad2 = grad_out.view().insert_axis(Axis(1));
    let out = graph_reduce_grad(&grad2, (num_src, 1), edges, method)?;
    Ok(out.remove_axis(Axis(1)))
}

/// Gradient of weighted [`graph_reduce`] with respect to `src` and the weights
///
/// For every edge `e = (s, d)`:
///
/// ```text
/// grad_src[s]  += grad_out[d] * w_e * scale(d)
/// grad_w[e]     = <grad_out[d], src[s]> * scale(d)
/// ```
///
/// # Arguments
///
/// * `grad_out` - Upstream gradient, shaped like the forward destination
/// * `src` - Forward source features (needed for the weight gradient)
/// * `edges` - Same edge list as the forward pass
/// * `weights` - Same per-edge weights as the forward pass
/// * `method` - Same method as the forward pass
///
/// # Errors
///
/// - `ShapeMismatch` if `weights.len() != edges.len()` or `src` width differs
///   from the `grad_out` width
/// - `IndexOutOfRange` if an edge references a missing row
pub fn graph_reduce_with_weight_grad<T>(
    grad_out: &ArrayView2<T>,
    src: &ArrayView2<T>,
    edges: &[(usize, usize)],
    weights: &ArrayView1<T>,
    method: ReduceMethod,
) -> KernelResult<WeightedReduceGrads<T>>
where
    T: Float,
{
    const OP: &str = "graph_reduce_with_weight_grad";

    let (num_dst, width) = grad_out.dim();
    let (num_src, src_width) = src.dim();
    if weights.len() != edges.len() {
        return Err(KernelError::shape_mismatch(OP, vec![edges.len()], vec![weights.len()]));
    }
    if src_width != width {
        return Err(KernelError::shape_mismatch(
            OP,
            vec![num_src, width],
            vec![num_src, src_width],
        ));
    }
    validate_edges(OP, edges, num_src, num_dst)?;

    let scales = destination_scales::<T>(method, edges, num_dst)?;

    let mut grad_src = Array2::<T>::zeros((num_src, width));
    let mut grad_w = Array1::<T>::zeros(edges.len());
    for (e, &(s, d)) in edges.iter().enumerate() {
        let scale = scales[d];
        let w = weights[e];
        let mut dot = T::zero();
        for j in 0..width {
            let g = grad_out[[d, j]];
            grad_src[[s, j]] = grad_src[[s, j]] + g * w * scale;
            dot = dot + g * src[[s, j]];
        }
        grad_w[e] = dot * scale;
    }

    Ok(WeightedReduceGrads {
        src: grad_src,
        weights: grad_w,
    })
}

/// Scalar-per-slot form of [`graph_reduce_with_weight_grad`]
///
/// Returns `(grad_src, grad_weights)`.
pub fn graph_reduce_with_weight_grad_1d<T>(
    grad_out: &ArrayView1<T>,
    src: &ArrayView1<T>,
    edges: &[(usize, usize)],
    weights: &ArrayView1<T>,
    method: ReduceMethod,
) -> KernelResult<(Array1<T>, Array1<T>)>
where
    T: Float,
{
    let grad2 = grad_out.view().insert_axis(Axis(1));
    let src2 = src.view().insert_axis(Axis(1));
    let grads = graph_reduce_with_weight_grad(&grad2, &src2, edges, weights, method)?;
    Ok((grads.src.remove_axis(Axis(1)), grads.weights))
}

fn validate_edges(
    operation: &str,
    edges: &[(usize, usize)],
    num_src: usize,
    num_dst: usize,
) -> KernelResult<()> {
    for &(s, d) in edges {
        if s >= num_src {
            return Err(KernelError::index_out_of_range(operation, s, num_src));
        }
        if d >= num_dst {
            return Err(KernelError::index_out_of_range(operation, d, num_dst));
        }
    }
    Ok(())
}

/// Per-destination factor: 1 for sum, `1 / deg(d)` for mean (0 when `deg(d) == 0`).
fn destination_scales<T: Float>(
    method: ReduceMethod,
    edges: &[(usize, usize)],
    num_dst: usize,
) -> KernelResult<Vec<T>> {
    match method {
        ReduceMethod::Sum => Ok(vec![T::one(); num_dst]),
        ReduceMethod::Mean => Ok(in_degrees(edges, num_dst)?
            .into_iter()
            .map(|deg| {
                if deg == 0 {
                    T::zero()
                } else {
                    T::from(deg).map_or(T::zero(), |c| T::one() / c)
                }
            })
            .collect()),
    }
}
