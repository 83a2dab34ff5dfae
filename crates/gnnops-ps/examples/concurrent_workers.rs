//! Several workers pushing and pulling one embedding table
//!
//! Run with: cargo run -p gnnops-ps --example concurrent_workers --features tracing
//! Set `RUST_LOG=gnnops_ps=debug` to see every push and pull.

use anyhow::Result;
use gnnops_ps::tracing_support::{init_tracing, TracingConfig};
use gnnops_ps::{PullDefault, ShardConfig, ShardRegistry};
use scirs2_core::ndarray_ext::{Array1, Array2};
use std::sync::Arc;
use std::thread;

const WIDTH: usize = 16;
const WORKERS: i64 = 4;
const KEYS_PER_WORKER: i64 = 2_500;

fn main() -> Result<()> {
    init_tracing(TracingConfig::default())?;

    let registry = Arc::new(ShardRegistry::<f32>::new());
    let config = ShardConfig::new(WIDTH).with_initial_capacity((WORKERS * KEYS_PER_WORKER) as usize);

    thread::scope(|scope| -> Result<()> {
        let mut handles = Vec::new();
        for worker in 0..WORKERS {
            let registry = Arc::clone(&registry);
            let config = config.clone();
            handles.push(scope.spawn(move || -> Result<()> {
                let shard = registry.get_or_create("node_emb", config)?;
                let keys: Vec<i64> =
                    (0..KEYS_PER_WORKER).map(|k| k * WORKERS + worker).collect();
                let values = Array2::from_shape_fn((keys.len(), WIDTH), |(i, _)| keys[i] as f32);
                shard.push(&keys, &values.view())?;
                Ok(())
            }));
        }
        for handle in handles {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("worker panicked"))??;
        }
        Ok(())
    })?;

    let shard = registry
        .get("node_emb")
        .ok_or_else(|| anyhow::anyhow!("shard missing"))?;
    let default = Array1::<f32>::from_elem(WIDTH, -1.0);
    let rows = shard.pull(&[0, 1, 9_999, 10_000], PullDefault::Shared(default.view()))?;

    println!("stored keys: {}", shard.len());
    println!("memory used: {} bytes", shard.memory_used());
    println!("first column of pulled rows: {:?}", rows.column(0).to_vec());
    println!("stats: {:?}", shard.stats());
    Ok(())
}
