//! Performance benchmarks for gradient operations
//!
//! Benchmarks operator backward passes, the gradient tape and gradient checking

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gnnops_ad::gradcheck::{check_gradient, GradCheckConfig};
use gnnops_ad::hooks::{AdContext, GradientTape};
use gnnops_ad::vjp::{DifferentiableOp, GraphReduceOp, SegmentSoftmaxOp, WeightedGraphReduceOp};
use gnnops_kernels::ReduceMethod;
use scirs2_core::ndarray_ext::{Array1, Array2};
use std::hint::black_box;

fn edges(nodes: usize, fan_in: usize) -> Vec<(usize, usize)> {
    (0..nodes)
        .flat_map(|d| (0..fan_in).map(move |k| ((d * 13 + k * 7) % nodes, d)))
        .collect()
}

/// Benchmark segment softmax backward from a saved forward output
fn bench_segment_softmax_vjp(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_softmax_vjp");

    for size in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |bencher, &size| {
            let values = Array1::from_shape_fn(size, |i| (i % 11) as f64 * 0.3);
            let ids: Vec<i64> = (0..size).map(|i| (i / 8) as i64).collect();
            let op = SegmentSoftmaxOp::new(values, ids);
            let y = op.forward().unwrap();
            let cotangent = Array1::<f64>::ones(size);

            bencher.iter(|| black_box(op.backward(black_box(&y), black_box(&cotangent)).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark graph reduce backward, unweighted and weighted
fn bench_graph_reduce_vjp(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_reduce_vjp");
    let width = 32;

    for nodes in [1_000, 10_000].iter() {
        let nodes = *nodes;
        let edge_list = edges(nodes, 8);
        let src = Array2::from_shape_fn((nodes, width), |(i, j)| ((i + j) % 17) as f64);
        let weights = Array1::from_shape_fn(edge_list.len(), |e| (e % 3) as f64 + 0.5);
        let cotangent = Array2::<f64>::ones((nodes, width));

        group.throughput(Throughput::Elements((edge_list.len() * width) as u64));

        let op = GraphReduceOp::new(src.clone(), (nodes, width), edge_list.clone(), ReduceMethod::Mean);
        let y = op.forward().unwrap();
        group.bench_with_input(BenchmarkId::new("mean", nodes), &nodes, |bencher, _| {
            bencher.iter(|| black_box(op.backward(&y, black_box(&cotangent)).unwrap()));
        });

        let wop = WeightedGraphReduceOp::new(src, (nodes, width), edge_list, weights, ReduceMethod::Sum);
        let wy = wop.forward().unwrap();
        group.bench_with_input(BenchmarkId::new("weighted_sum", nodes), &nodes, |bencher, _| {
            bencher.iter(|| black_box(wop.backward(&wy, black_box(&cotangent)).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark record + backward through a two-hop tape
fn bench_tape(c: &mut Criterion) {
    let mut group = c.benchmark_group("gradient_tape");

    for nodes in [1_000, 10_000].iter() {
        let nodes = *nodes;
        let edge_list = edges(nodes, 4);
        let x = Array2::from_shape_fn((nodes, 16), |(i, j)| (i * j % 5) as f64);
        let grad = Array2::<f64>::ones((nodes, 16)).into_dyn();

        group.bench_with_input(BenchmarkId::from_parameter(nodes), &nodes, |bencher, _| {
            bencher.iter(|| {
                let first = GraphReduceOp::new(x.clone(), (nodes, 16), edge_list.clone(), ReduceMethod::Mean);
                let hidden = first.forward().unwrap();
                let second = GraphReduceOp::new(hidden, (nodes, 16), edge_list.clone(), ReduceMethod::Sum);

                let mut tape = GradientTape::<f64>::new();
                tape.register_operation(Box::new(first)).unwrap();
                let last = tape.register_operation(Box::new(second)).unwrap();
                tape.backward(last, &grad).unwrap();
                black_box(tape.num_operations())
            });
        });
    }
    group.finish();
}

/// Benchmark gradient checking overhead
fn bench_gradcheck(c: &mut Criterion) {
    let mut group = c.benchmark_group("gradcheck");
    group.sample_size(10);

    for size in [16, 64].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |bencher, &size| {
            let ids: Vec<i64> = (0..size).map(|i| (i / 4) as i64).collect();
            let x = Array1::from_shape_fn(size, |i| (i % 7) as f64 * 0.2);
            let grad_y = Array1::<f64>::ones(size);
            let config = GradCheckConfig::default();

            bencher.iter(|| {
                let result = check_gradient(
                    |x: &Array1<f64>| SegmentSoftmaxOp::new(x.clone(), ids.clone()).forward(),
                    |x: &Array1<f64>, g: &Array1<f64>| {
                        let op = SegmentSoftmaxOp::new(x.clone(), ids.clone());
                        let y = op.forward()?;
                        op.backward(&y, g)
                    },
                    &x,
                    &grad_y,
                    &config,
                )
                .unwrap();
                black_box(result)
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_segment_softmax_vjp,
    bench_graph_reduce_vjp,
    bench_tape,
    bench_gradcheck
);
criterion_main!(benches);
