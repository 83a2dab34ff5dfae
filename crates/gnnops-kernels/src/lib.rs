//! # gnnops-kernels
//!
//! Stateless numeric kernels for graph neural network training.
//!
//! **Version:** 0.1.0-alpha.1
//!
//! ## Overview
//!
//! - **Segment softmax** - softmax inside contiguous runs of equal group ids,
//!   plus its gradient computed from the forward output
//! - **Graph reduce** - scatter-accumulate source rows into destination rows
//!   along an edge list (`sum` / `mean`, optional per-edge weight), plus
//!   gradients w.r.t. source features and weights
//! - **Node reindex** - merge several id sequences into one first-seen unique
//!   table plus per-sequence positions
//! - **Neighbor sampling** - weighted and top-k neighbor selection over an
//!   in-memory typed adjacency
//!
//! Every kernel borrows its inputs, allocates a fresh output and validates
//! shapes and indices before writing anything. Kernels hold no state and are
//! safe to call from any number of threads.
//!
//! ## Quick Start
//!
//! ```rust
//! use scirs2_core::ndarray_ext::{array, Array2};
//! use gnnops_kernels::{graph_reduce, reindex, segment_softmax, ReduceMethod};
//!
//! // Attention scores normalized per destination node
//! let scores = array![0.1_f64, 0.7, 2.0, -0.3];
//! let attn = segment_softmax(&scores.view(), &[0, 0, 1, 1]).unwrap();
//! assert!((attn[0] + attn[1] - 1.0).abs() < 1e-12);
//!
//! // Mean-aggregate neighbor features
//! let feats = array![[1.0_f64, 0.0], [0.0, 1.0], [1.0, 1.0]];
//! let dst = Array2::<f64>::zeros((2, 2));
//! let edges = [(0, 0), (1, 0), (2, 1)];
//! let agg = graph_reduce(&feats.view(), &dst.view(), &edges, None, ReduceMethod::Mean).unwrap();
//! assert_eq!(agg.row(0).to_vec(), vec![0.5, 0.5]);
//!
//! // Compact a mini-batch's node ids
//! let batch = reindex(&[&[10, 20], &[20, 30]]);
//! assert_eq!(batch.unique, vec![10, 20, 30]);
//! ```
//!
//! ## Features
//!
//! - `parallel` (default) - rayon-backed [`segment_softmax_parallel`]
//!
//! # SciRS2 Integration
//!
//! All array types come from `scirs2_core::ndarray_ext` and numeric traits
//! from `scirs2_core::numeric`.

#![deny(warnings)]

pub mod error;
pub mod graph_reduce;
pub mod neighbor;
pub mod reindex;
pub mod segment;


pub use error::*;
pub use graph_reduce::*;
pub use neighbor::{sample_neighbor, topk_neighbor, Neighbor, NeighborTable, SparseNeighbors};
pub use reindex::*;
pub use segment::*;
