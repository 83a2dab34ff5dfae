//! # gnnops-ps
//!
//! In-process parameter-server shard for GNN embedding tables.
//!
//! - [`PsShard`] - concurrent `i64` key → fixed-width row store with batched
//!   push/pull, defaults for missing keys, load/export and counters
//! - [`ShardRegistry`] - hands out one shared shard per name
//! - [`tracing_support`] - subscriber setup for the crates' `tracing` events
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use gnnops_ps::{PullDefault, ShardConfig, ShardRegistry};
//! use scirs2_core::ndarray_ext::{array, Array1};
//!
//! let registry = ShardRegistry::<f32>::new();
//! let emb = registry.get_or_create("node_emb", ShardConfig::new(4)).unwrap();
//!
//! let worker = Arc::clone(&emb);
//! std::thread::spawn(move || {
//!     worker.push(&[3], &array![[0.1, 0.2, 0.3, 0.4]].view()).unwrap();
//! })
//! .join()
//! .unwrap();
//!
//! let zeros = Array1::<f32>::zeros(4);
//! let rows = emb.pull(&[3, 4], PullDefault::Shared(zeros.view())).unwrap();
//! assert_eq!(rows.row(0)[3], 0.4);
//! assert_eq!(rows.row(1)[3], 0.0);
//! ```
//!
//! ## Features
//!
//! - `tracing` - enables [`tracing_support::init_tracing`] (via `tracing-subscriber`)

#![deny(warnings)]

pub mod config;
pub mod error;
pub mod registry;
pub mod shard;
pub mod tracing_support;

pub use config::{ShardConfig, DEFAULT_SHARD_AMOUNT};
pub use error::{PsError, PsResult};
pub use registry::ShardRegistry;
pub use shard::{PsShard, PullDefault, ShardStats};
