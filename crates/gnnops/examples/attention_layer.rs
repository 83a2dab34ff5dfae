//! A few training steps of a one-layer graph attention model
//!
//! Embeddings live in a parameter shard. Each step samples neighbors, reindexes
//! the batch, pulls embeddings, runs forward/backward and pushes SGD updates.
//!
//! Run with: cargo run -p gnnops --example attention_layer

use anyhow::Result;
use gnnops::ndarray::{Array1, Array2};
use gnnops::prelude::*;
use scirs2_core::random::{rngs::StdRng, SeedableRng};

const WIDTH: usize = 8;
const NODES: i64 = 50;

fn main() -> Result<()> {
    let mut edges = Vec::new();
    for n in 0..NODES {
        for k in 1..=3 {
            edges.push((n, (n * 7 + k * 11) % NODES, k as f32, 0));
        }
    }
    let table = NeighborTable::from_edges(&edges);

    let emb = PsShard::<f64>::new(ShardConfig::new(WIDTH))?;
    let all: Vec<i64> = (0..NODES).collect();
    let init = Array2::from_shape_fn((all.len(), WIDTH), |(i, j)| ((i * 31 + j * 17) % 13) as f64 / 13.0 - 0.5);
    emb.push(&all, &init.view())?;

    let mut rng = StdRng::seed_from_u64(7);
    let zeros = Array1::<f64>::zeros(WIDTH);

    for step in 0..5 {
        let seeds: Vec<i64> = (0..8).map(|i| (i * 5 + step) % NODES).collect();
        let sampled = sample_neighbor(&table, &seeds, &[0], 4, -1, &mut rng);
        let batch = reindex(&[&seeds, &sampled.neighbors]);
        let feats = emb.pull(&batch.unique, PullDefault::Shared(zeros.view()))?;

        let edge_list: Vec<(usize, usize)> = sampled
            .indices
            .iter()
            .zip(&batch.positions[1])
            .map(|(&[row, _], &local)| (local, row))
            .collect();
        let group_ids: Vec<i64> = edge_list.iter().map(|&(_, d)| d as i64).collect();
        let scores = Array1::from_iter(
            edge_list
                .iter()
                .map(|&(s, d)| feats.row(s).dot(&feats.row(batch.positions[0][d]))),
        );

        let attn = SegmentSoftmaxOp::new(scores, group_ids);
        let alpha = attn.forward()?;
        let layer = WeightedGraphReduceOp::new(
            feats.clone(),
            (seeds.len(), WIDTH),
            edge_list,
            alpha.clone(),
            ReduceMethod::Sum,
        );
        let out = layer.forward()?;
        let loss = 0.5 * out.iter().map(|v| v * v).sum::<f64>();

        let grads = layer.backward(&out, &out)?;
        let _grad_scores = attn.backward(&alpha, &grads.weights)?;

        let updated = &feats - &(grads.src * 0.05);
        emb.push(&batch.unique, &updated.view())?;
        println!("step {}: batch {} nodes, loss {:.6}", step, batch.unique.len(), loss);
    }

    println!("{:?}", emb.stats());
    Ok(())
}
