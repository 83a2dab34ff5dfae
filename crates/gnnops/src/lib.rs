//! # gnnops - Graph Neural Network Operators
//!
//! Numeric building blocks for message-passing GNN training, plus an
//! in-process parameter store for embedding tables.
//!
//! **Version:** 0.1.0-alpha.1
//!
//! This is the **meta crate** that re-exports all gnnops components.
//!
//! ## Quick Start
//!
//! ```
//! use gnnops::prelude::*;
//! use gnnops::ndarray::{array, Array1, Array2};
//!
//! // Embedding table shared by all workers
//! let emb = PsShard::<f64>::new(ShardConfig::new(2))?;
//! emb.push(&[10, 20], &array![[1.0, 0.0], [0.0, 1.0]].view())?;
//!
//! // Mini-batch: seeds 10 and 30, sampled neighbors 20 and 10
//! let batch = reindex(&[&[10, 30], &[20, 10]]);
//! let feats = emb.pull(&batch.unique, PullDefault::Shared(Array1::zeros(2).view()))?;
//!
//! // Attention over the two edges into seed 0, then weighted sum
//! let edges = [(batch.positions[1][0], 0), (batch.positions[1][1], 0)];
//! let attn = segment_softmax(&array![0.0, 0.0].view(), &[0, 0])?;
//! let dst = Array2::<f64>::zeros((2, 2));
//! let out = graph_reduce(&feats.view(), &dst.view(), &edges, Some(&attn.view()), ReduceMethod::Sum)?;
//! assert_eq!(out.row(0).to_vec(), vec![0.5, 0.5]);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Components
//!
//! ### Kernels ([`kernels`])
//!
//! Segment softmax, graph reduce (sum/mean, optionally edge-weighted) and their
//! gradients, node reindexing, neighbor sampling.
//!
//! ### Automatic Differentiation ([`ad`])
//!
//! Forward/backward operator pairs, finite-difference gradient checking and a
//! gradient tape for external AD frameworks.
//!
//! ### Parameter Store ([`ps`])
//!
//! Concurrent sharded key → row store with a named registry and logging setup.
//!
//! ## Features
//!
//! - `parallel` (default): rayon-backed segment softmax
//! - `tracing`: `tracing-subscriber` setup in [`ps::tracing_support`]

#![deny(warnings)]

pub use gnnops_ad as ad;
pub use gnnops_kernels as kernels;
pub use gnnops_ps as ps;
pub use scirs2_core::ndarray_ext as ndarray;

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! # Example
    //!
    //! ```
    //! use gnnops::prelude::*;
    //!
    //! assert_eq!("mean".parse::<ReduceMethod>().unwrap(), ReduceMethod::Mean);
    //! ```

    // Kernels
    pub use crate::kernels::{
        graph_reduce, graph_reduce_grad, graph_reduce_with_weight_grad, reindex,
        sample_neighbor, segment_softmax, segment_softmax_grad, topk_neighbor, KernelError,
        NeighborTable, ReduceMethod, Reindexed,
    };

    // Differentiation
    pub use crate::ad::{
        check_gradient, DifferentiableOp, GradCheckConfig, GraphReduceOp, SegmentSoftmaxOp,
        WeightedGraphReduceOp,
    };

    // Parameter store
    pub use crate::ps::{PsError, PsShard, PullDefault, ShardConfig, ShardRegistry};
}
