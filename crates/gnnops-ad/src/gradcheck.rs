//! Gradient checking utilities
//!
//! Verifies analytical backward passes against finite differences of the
//! scalar loss `L(x) = <grad_y, f(x)>`. Its gradient with respect to `x` is
//! exactly what a backward pass returns when fed `grad_y`.
//!
//! # Finite Difference Methods
//!
//! - **Central difference**: `f'(x) ≈ [f(x+h) - f(x-h)] / (2h)` (more accurate)
//! - **Forward difference**: `f'(x) ≈ [f(x+h) - f(x)] / h` (faster)
//!
//! Operations with several differentiable inputs are checked one input at a
//! time by closing over the others.
//!
//! # Example
//!
//! ```
//! use gnnops_ad::gradcheck::{check_gradient, GradCheckConfig};
//! use gnnops_kernels::{segment_softmax, segment_softmax_grad};
//! use scirs2_core::ndarray_ext::array;
//!
//! let ids = [0, 0, 1, 1, 1];
//! let x = array![0.3_f64, -1.2, 2.0, 0.1, 0.7];
//! let grad_y = array![1.0_f64, -0.5, 0.25, 2.0, -1.0];
//!
//! let result = check_gradient(
//!     |x| Ok(segment_softmax(&x.view(), &ids)?),
//!     |x, g| {
//!         let s = segment_softmax(&x.view(), &ids)?;
//!         Ok(segment_softmax_grad(&s.view(), &g.view(), &ids)?)
//!     },
//!     &x,
//!     &grad_y,
//!     &GradCheckConfig::default(),
//! )
//! .unwrap();
//! assert!(result.passed);
//! ```

use anyhow::{anyhow, Result};
use scirs2_core::ndarray_ext::{Array, Dimension};
use scirs2_core::numeric::Float;

/// Gradient checking configuration
#[derive(Debug, Clone)]
pub struct GradCheckConfig {
    /// Step size for finite differences (default: 1e-5)
    pub epsilon: f64,

    /// Relative tolerance for gradient comparison (default: 1e-3)
    pub rtol: f64,

    /// Absolute tolerance for gradient comparison (default: 1e-5)
    pub atol: f64,

    /// Use central difference (more accurate but 2x slower)
    pub use_central_diff: bool,

    /// Log every mismatching element
    pub verbose: bool,
}

impl Default for GradCheckConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-5,
            rtol: 1e-3,
            atol: 1e-5,
            use_central_diff: true,
            verbose: false,
        }
    }
}

impl GradCheckConfig {
    /// Same tolerance on both the absolute and relative error
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.rtol = tol;
        self.atol = tol;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Result of gradient checking
#[derive(Debug, Clone)]
pub struct GradCheckResult {
    /// Maximum absolute difference between analytical and numerical gradients
    pub max_abs_diff: f64,

    /// Maximum relative difference
    pub max_rel_diff: f64,

    /// Whether the gradient check passed
    pub passed: bool,

    /// Number of elements checked
    pub num_elements: usize,

    /// Number of elements that failed the check
    pub num_failures: usize,
}

/// Check gradient using finite differences
///
/// # Arguments
///
/// * `f` - Forward function: x -> y
/// * `df` - Gradient function: (x, grad_y) -> grad_x
/// * `x` - Input to check gradients at
/// * `grad_y` - Upstream gradient (∂L/∂y)
/// * `config` - Gradient checking configuration
///
/// # Errors
///
/// Propagates errors from `f` and `df`, and fails if the analytical gradient
/// is not shaped like `x` or `f(x)` is not shaped like `grad_y`.
pub fn check_gradient<T, D, E, F, G>(
    f: F,
    df: G,
    x: &Array<T, D>,
    grad_y: &Array<T, E>,
    config: &GradCheckConfig,
) -> Result<GradCheckResult>
where
    T: Float + std::fmt::Display,
    D: Dimension,
    E: Dimension,
    F: Fn(&Array<T, D>) -> Result<Array<T, E>>,
    G: Fn(&Array<T, D>, &Array<T, E>) -> Result<Array<T, D>>,
{
    let analytical_grad = df(x, grad_y)?;

    if analytical_grad.shape() != x.shape() {
        return Err(anyhow!(
            "Gradient shape {:?} doesn't match input shape {:?}",
            analytical_grad.shape(),
            x.shape()
        ));
    }

    let numerical_grad = compute_numerical_gradient(f, x, grad_y, config)?;

    compare_gradients(&analytical_grad, &numerical_grad, config)
}

/// Numerical gradient of `L(x) = <grad_y, f(x)>`, element by element
fn compute_numerical_gradient<T, D, E, F>(
    f: F,
    x: &Array<T, D>,
    grad_y: &Array<T, E>,
    config: &GradCheckConfig,
) -> Result<Array<T, D>>
where
    T: Float,
    D: Dimension,
    E: Dimension,
    F: Fn(&Array<T, D>) -> Result<Array<T, E>>,
{
    let epsilon = T::from(config.epsilon).ok_or_else(|| anyhow!("Failed to convert epsilon"))?;
    let base: Vec<T> = x.iter().copied().collect();

    let perturbed = |idx: usize, delta: T| -> Result<Array<T, E>> {
        let mut data = base.clone();
        data[idx] = data[idx] + delta;
        let shifted = Array::from_shape_vec(x.raw_dim(), data)?;
        f(&shifted)
    };

    let y0 = if config.use_central_diff {
        None
    } else {
        Some(f(x)?)
    };

    let mut numerical = Vec::with_capacity(base.len());
    for idx in 0..base.len() {
        let y_plus = perturbed(idx, epsilon)?;

        let grad_contribution = match &y0 {
            None => {
                let y_minus = perturbed(idx, -epsilon)?;
                (dot_product(grad_y, &y_plus)? - dot_product(grad_y, &y_minus)?)
                    / (epsilon + epsilon)
            }
            Some(y) => (dot_product(grad_y, &y_plus)? - dot_product(grad_y, y)?) / epsilon,
        };
        numerical.push(grad_contribution);
    }

    Ok(Array::from_shape_vec(x.raw_dim(), numerical)?)
}

/// Element-wise product summed over all elements
fn dot_product<T, E>(a: &Array<T, E>, b: &Array<T, E>) -> Result<T>
where
    T: Float,
    E: Dimension,
{
    if a.shape() != b.shape() {
        return Err(anyhow!(
            "Shape mismatch: {:?} vs {:?}",
            a.shape(),
            b.shape()
        ));
    }

    Ok(a.iter().zip(b.iter()).fold(T::zero(), |acc, (&x, &y)| acc + x * y))
}

/// Compare analytical and numerical gradients
fn compare_gradients<T, D>(
    analytical: &Array<T, D>,
    numerical: &Array<T, D>,
    config: &GradCheckConfig,
) -> Result<GradCheckResult>
where
    T: Float + std::fmt::Display,
    D: Dimension,
{
    let rtol = T::from(config.rtol).ok_or_else(|| anyhow!("Failed to convert rtol"))?;
    let atol = T::from(config.atol).ok_or_else(|| anyhow!("Failed to convert atol"))?;

    let mut max_abs_diff = 0.0_f64;
    let mut max_rel_diff = 0.0_f64;
    let mut num_failures = 0;

    for (idx, (&a_val, &n_val)) in analytical.iter().zip(numerical.iter()).enumerate() {
        let abs_diff = (a_val - n_val).abs();
        let rel_diff = if n_val.abs() > T::epsilon() {
            abs_diff / n_val.abs()
        } else {
            abs_diff
        };

        let abs_diff_f64 = abs_diff
            .to_f64()
            .ok_or_else(|| anyhow!("Conversion error"))?;
        let rel_diff_f64 = rel_diff
            .to_f64()
            .ok_or_else(|| anyhow!("Conversion error"))?;

        max_abs_diff = max_abs_diff.max(abs_diff_f64);
        max_rel_diff = max_rel_diff.max(rel_diff_f64);

        if abs_diff > atol && rel_diff > rtol {
            num_failures += 1;

            if config.verbose {
                tracing::warn!(
                    element = idx,
                    analytical = %a_val,
                    numerical = %n_val,
                    abs_diff = %abs_diff,
                    rel_diff = %rel_diff,
                    "gradient mismatch"
                );
            }
        }
    }

    let passed = num_failures == 0;

    if config.verbose {
        tracing::info!(
            passed,
            num_failures,
            num_elements = analytical.len(),
            max_abs_diff,
            max_rel_diff,
            "gradient check finished"
        );
    }

    Ok(GradCheckResult {
        max_abs_diff,
        max_rel_diff,
        passed,
        num_elements: analytical.len(),
        num_failures,
    })
}
