//! Segmented softmax and its gradient
//!
//! A flat value array is partitioned by a parallel group-id array. Partitions
//! are the maximal runs of *equal consecutive* ids: `[0, 0, 3, 5, 5, 0]`
//! yields four runs `0..2`, `2..3`, `3..5`, `5..6`. The trailing `0` starts a
//! new run, it is not merged with the first two slots.
//!
//! Softmax is computed independently inside every run with the usual
//! max-subtraction for numerical stability.
//!
//! # Examples
//!
//! ```
//! use scirs2_core::ndarray_ext::array;
//! use gnnops_kernels::segment_softmax;
//!
//! let values = array![1.0_f64, 1.0, 5.0];
//! let out = segment_softmax(&values.view(), &[7, 7, 9]).unwrap();
//!
//! assert!((out[0] - 0.5).abs() < 1e-12);
//! assert!((out[1] - 0.5).abs() < 1e-12);
//! assert!((out[2] - 1.0).abs() < 1e-12);
//! ```

use crate::error::{KernelError, KernelResult};
use scirs2_core::ndarray_ext::{Array1, ArrayView1};
use scirs2_core::numeric::Float;
use std::ops::Range;

/// Split a group-id array into its contiguous runs of equal ids
///
/// An empty id array has no runs.
///
/// # Examples
///
/// ```
/// use gnnops_kernels::segments;
///
/// let runs = segments(&[0, 0, 0, 1, 1, 2, 3, 3, 5]);
/// assert_eq!(runs, vec![0..3, 3..5, 5..6, 6..8, 8..9]);
/// ```
pub fn segments(group_ids: &[i64]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    if group_ids.is_empty() {
        return runs;
    }

    let mut start = 0;
    for i in 1..group_ids.len() {
        if group_ids[i] != group_ids[i - 1] {
            runs.push(start..i);
            start = i;
        }
    }
    runs.push(start..group_ids.len());
    runs
}

/// Compute softmax independently within each contiguous run of equal group ids
///
/// # Arguments
///
/// * `values` - Input logits, one per slot
/// * `group_ids` - Partition id per slot, same length as `values`
///
/// # Returns
///
/// Array of the same length as `values` whose entries sum to one inside every run
///
/// # Errors
///
/// `ShapeMismatch` if `values` and `group_ids` differ in length
///
/// # Complexity
///
/// Time: O(n), three passes per run
/// Space: O(n)
pub fn segment_softmax<T>(values: &ArrayView1<T>, group_ids: &[i64]) -> KernelResult<Array1<T>>
where
    T: Float,
{
    check_len("segment_softmax", values.len(), group_ids.len())?;

    let runs = segments(group_ids);
    tracing::trace!(len = values.len(), runs = runs.len(), "segment_softmax");

    let mut out = vec![T::zero(); values.len()];
    for run in runs {
        softmax_run(values, &mut out[run.clone()], run);
    }

    Ok(Array1::from_vec(out))
}

/// Gradient of [`segment_softmax`] given its output and the upstream gradient
///
/// For slot `i` in run `R`: `grad_i = s_i * (g_i - Σ_{j∈R} s_j * g_j)`.
///
/// The forward *output* is consumed rather than the forward input, so the
/// softmax is never recomputed during the backward pass.
///
/// # Errors
///
/// `ShapeMismatch` if the three arrays are not all the same length
pub fn segment_softmax_grad<T>(
    softmax_output: &ArrayView1<T>,
    upstream_grad: &ArrayView1<T>,
    group_ids: &[i64],
) -> KernelResult<Array1<T>>
where
    T: Float,
{
    check_len("segment_softmax_grad", softmax_output.len(), group_ids.len())?;
    check_len("segment_softmax_grad", softmax_output.len(), upstream_grad.len())?;

    let mut out = vec![T::zero(); softmax_output.len()];
    for run in segments(group_ids) {
        softmax_grad_run(softmax_output, upstream_grad, &mut out[run.clone()], run);
    }

    Ok(Array1::from_vec(out))
}

/// Parallel version of [`segment_softmax`]
///
/// Runs are independent, so each one is handed to the rayon pool. Worth it
/// only for inputs with many long runs.
#[cfg(feature = "parallel")]
pub fn segment_softmax_parallel<T>(
    values: &ArrayView1<T>,
    group_ids: &[i64],
) -> KernelResult<Array1<T>>
where
    T: Float + Send + Sync,
{
    use rayon::prelude::*;

    check_len("segment_softmax_parallel", values.len(), group_ids.len())?;

    let runs = segments(group_ids);
    let pieces: Vec<Vec<T>> = runs
        .into_par_iter()
        .map(|run| {
            let mut buf = vec![T::zero(); run.len()];
            softmax_run(values, &mut buf, run);
            buf
        })
        .collect();

    Ok(Array1::from_vec(pieces.concat()))
}

fn check_len(operation: &str, expected: usize, got: usize) -> KernelResult<()> {
    if expected != got {
        return Err(KernelError::shape_mismatch(
            operation,
            vec![expected],
            vec![got],
        ));
    }
    Ok(())
}

/// Writes softmax of `values[run]` into `out` (which has `run.len()` slots).
fn softmax_run<T: Float>(values: &ArrayView1<T>, out: &mut [T], run: Range<usize>) {
    let max = run
        .clone()
        .map(|i| values[i])
        .fold(T::neg_infinity(), |acc, v| acc.max(v));

    let mut sum = T::zero();
    for (slot, i) in out.iter_mut().zip(run) {
        let e = (values[i] - max).exp();
        *slot = e;
        sum = sum + e;
    }

    for slot in out.iter_mut() {
        *slot = *slot / sum;
    }
}

fn softmax_grad_run<T: Float>(
    s: &ArrayView1<T>,
    g: &ArrayView1<T>,
    out: &mut [T],
    run: Range<usize>,
) {
    let dot = run
        .clone()
        .fold(T::zero(), |acc, i| acc + s[i] * g[i]);

    for (slot, i) in out.iter_mut().zip(run) {
        *slot = s[i] * (g[i] - dot);
    }
}
