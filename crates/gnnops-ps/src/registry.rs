//! Named shard lookup
//!
//! Several model components may ask for the same embedding table by name. The
//! registry hands every caller the same `Arc<PsShard<T>>`, creating the shard
//! on first use.

use crate::config::ShardConfig;
use crate::error::{PsError, PsResult};
use crate::shard::PsShard;
use parking_lot::RwLock;
use scirs2_core::numeric::Float;
use std::collections::HashMap;
use std::sync::Arc;

/// Name → shard table
#[derive(Debug)]
pub struct ShardRegistry<T> {
    shards: RwLock<HashMap<String, Arc<PsShard<T>>>>,
}

impl<T> Default for ShardRegistry<T> {
    fn default() -> Self {
        Self {
            shards: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> ShardRegistry<T>
where
    T: Float + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shard registered under `name`, creating it from `config`
    /// if absent
    ///
    /// # Errors
    ///
    /// - `InvalidKeyOrValueWidth` if a shard with this name exists with a
    ///   different value width
    /// - `InvalidConfig` if a new shard would be built from an invalid config
    pub fn get_or_create(&self, name: &str, config: ShardConfig) -> PsResult<Arc<PsShard<T>>> {
        if let Some(shard) = self.shards.read().get(name) {
            return Self::check_width(name, shard, &config);
        }

        let mut shards = self.shards.write();
        // Another caller may have created it between the two locks
        if let Some(shard) = shards.get(name) {
            return Self::check_width(name, shard, &config);
        }

        let shard = Arc::new(PsShard::new(config)?);
        shards.insert(name.to_string(), Arc::clone(&shard));
        tracing::info!(name, value_width = shard.value_width(), "registered shard");
        Ok(shard)
    }

    pub fn get(&self, name: &str) -> Option<Arc<PsShard<T>>> {
        self.shards.read().get(name).cloned()
    }

    /// Unregister a shard; holders of the `Arc` keep using it
    pub fn remove(&self, name: &str) -> Option<Arc<PsShard<T>>> {
        let removed = self.shards.write().remove(name);
        if removed.is_some() {
            tracing::info!(name, "unregistered shard");
        }
        removed
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shards.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.shards.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.read().is_empty()
    }

    fn check_width(
        name: &str,
        shard: &Arc<PsShard<T>>,
        config: &ShardConfig,
    ) -> PsResult<Arc<PsShard<T>>> {
        if shard.value_width() != config.value_width {
            tracing::warn!(
                name,
                existing = shard.value_width(),
                requested = config.value_width,
                "shard reopened with a different value width"
            );
            return Err(PsError::invalid_width(
                format!("get_or_create({})", name),
                shard.value_width(),
                config.value_width,
            ));
        }
        Ok(Arc::clone(shard))
    }
}
