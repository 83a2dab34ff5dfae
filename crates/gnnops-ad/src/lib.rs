//! # gnnops-ad
//!
//! Automatic differentiation support for the gnnops graph kernels.
//!
//! This crate provides:
//! - Forward/backward operator pairs ([`vjp::DifferentiableOp`]) for segment
//!   softmax and (weighted) graph reduce
//! - Finite-difference gradient checking ([`gradcheck`])
//! - Integration hooks for external AD frameworks ([`hooks`])

#![deny(warnings)]

pub mod gradcheck;
pub mod hooks;
pub mod vjp;

// Re-exports
pub use gradcheck::{check_gradient, GradCheckConfig, GradCheckResult};
pub use hooks::{AdContext, AdOperation, GradientTape, OperationId};
pub use vjp::*;
