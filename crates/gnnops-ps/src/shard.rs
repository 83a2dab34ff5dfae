//! Sharded in-memory key-value store for embedding rows
//!
//! A [`PsShard`] maps `i64` keys to fixed-width rows of values. Workers push
//! rows and pull them back concurrently through a shared `Arc<PsShard<T>>`.
//!
//! # Consistency
//!
//! - Each row is written and read whole under the lock of its internal
//!   partition, so a pull never sees a half-written row.
//! - Last write wins, both across calls and within one batch.
//! - A batch holds at most one partition lock at a time. Batches are not
//!   atomic: a concurrent pull may see some rows of a push and not others.
//! - [`load`](PsShard::load) and [`export`](PsShard::export) are not
//!   snapshots with respect to concurrent pushes.
//!
//! # Example
//!
//! ```
//! use gnnops_ps::{PsShard, PullDefault, ShardConfig};
//! use scirs2_core::ndarray_ext::array;
//!
//! let shard = PsShard::<f32>::new(ShardConfig::new(2)).unwrap();
//! shard.push(&[7], &array![[1.0, 2.0]].view()).unwrap();
//!
//! let default = array![0.0, 0.0];
//! let rows = shard.pull(&[7, 8], PullDefault::Shared(default.view())).unwrap();
//! assert_eq!(rows, array![[1.0, 2.0], [0.0, 0.0]]);
//! ```

use crate::config::ShardConfig;
use crate::error::{PsError, PsResult};
use dashmap::DashMap;
use scirs2_core::ndarray_ext::{Array2, ArrayView1, ArrayView2, Axis};
use scirs2_core::numeric::Float;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fallback rows for keys a pull does not find
#[derive(Debug, Clone, Copy)]
pub enum PullDefault<'a, T> {
    /// One row used for every missing key
    Shared(ArrayView1<'a, T>),
    /// One row per requested key, used when that key is missing
    PerKey(ArrayView2<'a, T>),
}

/// Snapshot of shard counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardStats {
    /// Rows written by push and load
    pub pushes: u64,
    /// Rows requested by pull
    pub pulls: u64,
    /// Pulled keys that were present
    pub hits: u64,
    /// Pulled keys that fell back to the default
    pub misses: u64,
    /// Number of stored keys
    pub num_keys: usize,
}

impl ShardStats {
    /// Calculate hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct ShardStatsInternal {
    pushes: AtomicU64,
    pulls: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ShardStatsInternal {
    fn snapshot(&self, num_keys: usize) -> ShardStats {
        ShardStats {
            pushes: self.pushes.load(Ordering::Relaxed),
            pulls: self.pulls.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            num_keys,
        }
    }
}

/// Concurrent key → row store
#[derive(Debug)]
pub struct PsShard<T> {
    config: ShardConfig,
    entries: DashMap<i64, Box<[T]>>,
    stats: ShardStatsInternal,
}

impl<T> PsShard<T>
where
    T: Float + Send + Sync + 'static,
{
    /// Create an empty shard
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the configuration does not validate
    pub fn new(config: ShardConfig) -> PsResult<Self> {
        config.validate()?;
        let entries =
            DashMap::with_capacity_and_shard_amount(config.initial_capacity, config.shard_amount);
        tracing::info!(
            value_width = config.value_width,
            shard_amount = config.shard_amount,
            initial_capacity = config.initial_capacity,
            "created parameter shard"
        );
        Ok(Self {
            config,
            entries,
            stats: ShardStatsInternal::default(),
        })
    }

    pub fn config(&self) -> &ShardConfig {
        &self.config
    }

    /// Number of values per row
    pub fn value_width(&self) -> usize {
        self.config.value_width
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: i64) -> bool {
        self.entries.contains_key(&key)
    }

    /// Upsert one row per key
    ///
    /// Row `i` of `values` is stored under `keys[i]`. When a key repeats in
    /// the batch, the later row wins.
    ///
    /// # Errors
    ///
    /// - `ShapeMismatch` if `keys.len() != values.nrows()`
    /// - `InvalidKeyOrValueWidth` if `values.ncols()` is not the value width
    ///
    /// Nothing is written when validation fails.
    pub fn push(&self, keys: &[i64], values: &ArrayView2<T>) -> PsResult<()> {
        self.check_rows("push", keys, values)?;
        self.write_rows(keys, values);
        tracing::debug!(keys = keys.len(), size = self.len(), "push");
        Ok(())
    }

    /// Read one row per key, substituting defaults for missing keys
    ///
    /// # Errors
    ///
    /// - `InvalidKeyOrValueWidth` if a default row is not the value width
    /// - `ShapeMismatch` if `PerKey` defaults do not have one row per key
    pub fn pull(&self, keys: &[i64], defaults: PullDefault<'_, T>) -> PsResult<Array2<T>> {
        const OP: &str = "pull";
        let width = self.config.value_width;

        match &defaults {
            PullDefault::Shared(row) => {
                if row.len() != width {
                    return Err(PsError::invalid_width(OP, width, row.len()));
                }
            }
            PullDefault::PerKey(rows) => {
                if rows.nrows() != keys.len() {
                    return Err(PsError::shape_mismatch(
                        OP,
                        vec![keys.len(), width],
                        rows.shape().to_vec(),
                    ));
                }
                if rows.ncols() != width {
                    return Err(PsError::invalid_width(OP, width, rows.ncols()));
                }
            }
        }

        let mut out = Array2::<T>::zeros((keys.len(), width));
        let mut hits = 0u64;
        for (i, (key, mut row)) in keys.iter().zip(out.axis_iter_mut(Axis(0))).enumerate() {
            match self.entries.get(key) {
                Some(stored) => {
                    hits += 1;
                    for (dst, &src) in row.iter_mut().zip(stored.iter()) {
                        *dst = src;
                    }
                }
                None => match &defaults {
                    PullDefault::Shared(default) => row.assign(default),
                    PullDefault::PerKey(defaults) => row.assign(&defaults.row(i)),
                },
            }
        }

        let requested = keys.len() as u64;
        self.stats.pulls.fetch_add(requested, Ordering::Relaxed);
        self.stats.hits.fetch_add(hits, Ordering::Relaxed);
        self.stats.misses.fetch_add(requested - hits, Ordering::Relaxed);
        tracing::debug!(keys = keys.len(), hits, "pull");
        Ok(out)
    }

    /// Replace the whole contents with the given rows
    ///
    /// # Errors
    ///
    /// Same as [`push`](Self::push); the existing contents are kept when
    /// validation fails.
    pub fn load(&self, keys: &[i64], values: &ArrayView2<T>) -> PsResult<()> {
        self.check_rows("load", keys, values)?;
        self.entries.clear();
        self.write_rows(keys, values);
        tracing::debug!(keys = keys.len(), size = self.len(), "load");
        Ok(())
    }

    /// Copy out every stored row, keys in ascending order
    pub fn export(&self) -> (Vec<i64>, Array2<T>) {
        let width = self.config.value_width;
        let mut rows: Vec<(i64, Box<[T]>)> = self
            .entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        rows.sort_unstable_by_key(|(key, _)| *key);

        let mut values = Array2::<T>::zeros((rows.len(), width));
        for ((_, stored), mut row) in rows.iter().zip(values.axis_iter_mut(Axis(0))) {
            for (dst, &src) in row.iter_mut().zip(stored.iter()) {
                *dst = src;
            }
        }
        let keys = rows.into_iter().map(|(key, _)| key).collect();

        tracing::debug!(size = values.nrows(), "export");
        (keys, values)
    }

    /// Delete keys, returning how many were present
    pub fn remove(&self, keys: &[i64]) -> usize {
        let removed = keys
            .iter()
            .filter(|&&key| self.entries.remove(&key).is_some())
            .count();
        tracing::debug!(keys = keys.len(), removed, "remove");
        removed
    }

    /// Approximate heap bytes held by stored rows and their keys
    pub fn memory_used(&self) -> usize {
        let per_key = std::mem::size_of::<i64>()
            + std::mem::size_of::<Box<[T]>>()
            + self.config.value_width * std::mem::size_of::<T>();
        self.entries.len() * per_key
    }

    pub fn stats(&self) -> ShardStats {
        self.stats.snapshot(self.len())
    }

    fn check_rows(&self, operation: &str, keys: &[i64], values: &ArrayView2<T>) -> PsResult<()> {
        let width = self.config.value_width;
        if keys.len() != values.nrows() {
            return Err(PsError::shape_mismatch(
                operation,
                vec![keys.len(), width],
                values.shape().to_vec(),
            ));
        }
        if values.ncols() != width {
            return Err(PsError::invalid_width(operation, width, values.ncols()));
        }
        Ok(())
    }

    fn write_rows(&self, keys: &[i64], values: &ArrayView2<T>) {
        for (&key, row) in keys.iter().zip(values.axis_iter(Axis(0))) {
            self.entries
                .entry(key)
                .and_modify(|stored| {
                    for (dst, &src) in stored.iter_mut().zip(row.iter()) {
                        *dst = src;
                    }
                })
                .or_insert_with(|| row.iter().copied().collect());
        }
        self.stats
            .pushes
            .fetch_add(keys.len() as u64, Ordering::Relaxed);
    }
}
