//! Property-based tests for VJP and gradient correctness
//!
//! Uses proptest to verify mathematical properties across random inputs

use gnnops_ad::gradcheck::{check_gradient, GradCheckConfig};
use gnnops_ad::vjp::{DifferentiableOp, GraphReduceOp, SegmentSoftmaxOp, WeightedGraphReduceOp};
use gnnops_kernels::ReduceMethod;
use proptest::prelude::*;
use scirs2_core::ndarray_ext::{Array1, Array2};

type GraphCase = (Array2<f64>, usize, Vec<(usize, usize)>, Array1<f64>);

fn graph_case() -> impl Strategy<Value = GraphCase> {
    (1usize..6, 1usize..6, 1usize..4, 1usize..15).prop_flat_map(|(num_src, num_dst, width, num_edges)| {
        (
            prop::collection::vec(-3.0..3.0f64, num_src * width),
            Just(num_dst),
            prop::collection::vec((0..num_src, 0..num_dst), num_edges),
            prop::collection::vec(-2.0..2.0f64, num_edges),
        )
            .prop_map(move |(data, num_dst, edges, weights)| {
                (
                    Array2::from_shape_vec((num_src, width), data).unwrap(),
                    num_dst,
                    edges,
                    Array1::from_vec(weights),
                )
            })
    })
}

fn method_strategy() -> impl Strategy<Value = ReduceMethod> {
    prop_oneof![Just(ReduceMethod::Sum), Just(ReduceMethod::Mean)]
}

proptest! {
    /// Segment softmax backward matches finite differences
    #[test]
    fn test_segment_softmax_gradcheck(
        values in prop::collection::vec(-4.0..4.0f64, 1..20),
        seed in 0usize..100,
    ) {
        let n = values.len();
        let ids: Vec<i64> = (0..n).map(|i| ((i + seed) / 3) as i64).collect();
        let x = Array1::from_vec(values);
        let grad_y = Array1::from_shape_fn(n, |i| ((i * 7 + seed) % 5) as f64 - 2.0);

        let result = check_gradient(
            |x: &Array1<f64>| SegmentSoftmaxOp::new(x.clone(), ids.clone()).forward(),
            |x: &Array1<f64>, g: &Array1<f64>| {
                let op = SegmentSoftmaxOp::new(x.clone(), ids.clone());
                let y = op.forward()?;
                op.backward(&y, g)
            },
            &x,
            &grad_y,
            &GradCheckConfig::default().with_tolerance(1e-4),
        ).unwrap();
        prop_assert!(result.passed, "max abs diff {}", result.max_abs_diff);
    }

    /// VJP is linear in the cotangent: vjp(a*v1 + b*v2) = a*vjp(v1) + b*vjp(v2)
    #[test]
    fn test_graph_reduce_vjp_linear_in_cotangent(
        (src, num_dst, edges, _) in graph_case(),
        method in method_strategy(),
        a in -3.0..3.0f64,
        b in -3.0..3.0f64,
    ) {
        let width = src.ncols();
        let op = GraphReduceOp::new(src, (num_dst, width), edges, method);
        let y = op.forward().unwrap();

        let v1 = Array2::from_shape_fn((num_dst, width), |(i, j)| (i + j) as f64);
        let v2 = Array2::from_shape_fn((num_dst, width), |(i, j)| i as f64 - 2.0 * j as f64);
        let combo = &v1 * a + &v2 * b;

        let g1 = op.backward(&y, &v1).unwrap();
        let g2 = op.backward(&y, &v2).unwrap();
        let g = op.backward(&y, &combo).unwrap();

        let expected = &g1 * a + &g2 * b;
        for (e, actual) in expected.iter().zip(g.iter()) {
            prop_assert!((e - actual).abs() < 1e-9);
        }
    }

    /// Weighted backward matches finite differences for src and weights
    #[test]
    fn test_weighted_reduce_gradcheck(
        (src, num_dst, edges, weights) in graph_case(),
        method in method_strategy(),
    ) {
        let width = src.ncols();
        let grad_y = Array2::from_shape_fn((num_dst, width), |(i, j)| ((i * 3 + j) % 4) as f64 - 1.5);
        let config = GradCheckConfig::default().with_tolerance(1e-4);

        let by_src = check_gradient(
            |x: &Array2<f64>| {
                WeightedGraphReduceOp::new(x.clone(), (num_dst, width), edges.clone(), weights.clone(), method)
                    .forward()
            },
            |x: &Array2<f64>, g: &Array2<f64>| {
                let op = WeightedGraphReduceOp::new(x.clone(), (num_dst, width), edges.clone(), weights.clone(), method);
                let y = op.forward()?;
                Ok(op.backward(&y, g)?.src)
            },
            &src,
            &grad_y,
            &config,
        ).unwrap();
        prop_assert!(by_src.passed);

        let by_weight = check_gradient(
            |w: &Array1<f64>| {
                WeightedGraphReduceOp::new(src.clone(), (num_dst, width), edges.clone(), w.clone(), method)
                    .forward()
            },
            |w: &Array1<f64>, g: &Array2<f64>| {
                let op = WeightedGraphReduceOp::new(src.clone(), (num_dst, width), edges.clone(), w.clone(), method);
                let y = op.forward()?;
                Ok(op.backward(&y, g)?.weights)
            },
            &weights,
            &grad_y,
            &config,
        ).unwrap();
        prop_assert!(by_weight.passed);
    }
}
