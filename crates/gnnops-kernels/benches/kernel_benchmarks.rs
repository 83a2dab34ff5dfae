//! Performance benchmarks for gnnops-kernels
//!
//! Run with: cargo bench -p gnnops-kernels
//!
//! Benchmarks cover:
//! - Segment softmax (serial & parallel) and its gradient
//! - Graph reduce (sum, mean, weighted) and its gradients
//! - Node reindex

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scirs2_core::ndarray_ext::{Array1, Array2};
use gnnops_kernels::*;

/// Deterministic edge list: every destination receives `fan_in` edges
fn ring_edges(num_src: usize, num_dst: usize, fan_in: usize) -> Vec<(usize, usize)> {
    (0..num_dst)
        .flat_map(|d| (0..fan_in).map(move |k| ((d * 31 + k * 17) % num_src, d)))
        .collect()
}

fn bench_segment_softmax(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_softmax");

    for &size in [1_000, 10_000, 100_000].iter() {
        let values = Array1::<f64>::from_shape_fn(size, |i| ((i * 7) % 13) as f64 * 0.25);
        let ids: Vec<i64> = (0..size).map(|i| (i / 16) as i64).collect();
        let grad = Array1::<f64>::ones(size);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("forward", size), &size, |bencher, _| {
            bencher.iter(|| {
                black_box(segment_softmax(&values.view(), &ids).unwrap());
            });
        });

        #[cfg(feature = "parallel")]
        group.bench_with_input(BenchmarkId::new("parallel", size), &size, |bencher, _| {
            bencher.iter(|| {
                black_box(segment_softmax_parallel(&values.view(), &ids).unwrap());
            });
        });

        let out = segment_softmax(&values.view(), &ids).unwrap();
        group.bench_with_input(BenchmarkId::new("backward", size), &size, |bencher, _| {
            bencher.iter(|| {
                black_box(segment_softmax_grad(&out.view(), &grad.view(), &ids).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_graph_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_reduce");

    for &(nodes, width) in [(1_000, 16), (10_000, 16), (10_000, 64)].iter() {
        let fan_in = 8;
        let src = Array2::<f64>::from_shape_fn((nodes, width), |(i, j)| (i + j) as f64 * 0.01);
        let dst = Array2::<f64>::zeros((nodes, width));
        let edges = ring_edges(nodes, nodes, fan_in);
        let weights = Array1::<f64>::from_shape_fn(edges.len(), |e| 1.0 / (1 + e % 5) as f64);
        let label = format!("{}x{}", nodes, width);

        group.throughput(Throughput::Elements((edges.len() * width) as u64));

        for method in [ReduceMethod::Sum, ReduceMethod::Mean] {
            group.bench_with_input(
                BenchmarkId::new(method.as_str(), &label),
                &nodes,
                |bencher, _| {
                    bencher.iter(|| {
                        black_box(graph_reduce(&src.view(), &dst.view(), &edges, None, method).unwrap());
                    });
                },
            );
        }

        group.bench_with_input(BenchmarkId::new("weighted", &label), &nodes, |bencher, _| {
            bencher.iter(|| {
                black_box(
                    graph_reduce(
                        &src.view(),
                        &dst.view(),
                        &edges,
                        Some(&weights.view()),
                        ReduceMethod::Sum,
                    )
                    .unwrap(),
                );
            });
        });

        let grad_out = Array2::<f64>::ones((nodes, width));
        group.bench_with_input(BenchmarkId::new("grad", &label), &nodes, |bencher, _| {
            bencher.iter(|| {
                black_box(
                    graph_reduce_grad(&grad_out.view(), src.dim(), &edges, ReduceMethod::Mean).unwrap(),
                );
            });
        });

        group.bench_with_input(BenchmarkId::new("weighted_grad", &label), &nodes, |bencher, _| {
            bencher.iter(|| {
                black_box(
                    graph_reduce_with_weight_grad(
                        &grad_out.view(),
                        &src.view(),
                        &edges,
                        &weights.view(),
                        ReduceMethod::Sum,
                    )
                    .unwrap(),
                );
            });
        });
    }
    group.finish();
}

fn bench_reindex(c: &mut Criterion) {
    let mut group = c.benchmark_group("reindex");

    for &size in [1_000, 10_000, 100_000].iter() {
        let seeds: Vec<i64> = (0..size as i64).map(|i| i * 3).collect();
        let hops: Vec<i64> = (0..size as i64).map(|i| (i * 7) % (size as i64 * 2)).collect();

        group.throughput(Throughput::Elements((2 * size) as u64));
        group.bench_with_input(BenchmarkId::new("two_sequences", size), &size, |bencher, _| {
            bencher.iter(|| {
                black_box(reindex(&[&seeds, &hops]));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_segment_softmax, bench_graph_reduce, bench_reindex);
criterion_main!(benches);
