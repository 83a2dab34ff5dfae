//! Property-based tests for the parameter shard
//!
//! A shard must behave like a plain map under any sequence of batched pushes.

use gnnops_ps::{PsShard, PullDefault, ShardConfig};
use proptest::prelude::*;
use scirs2_core::ndarray_ext::{Array1, Array2};
use std::collections::HashMap;

fn batch_strategy(width: usize) -> impl Strategy<Value = (Vec<i64>, Vec<f64>)> {
    (0usize..20).prop_flat_map(move |n| {
        (
            prop::collection::vec(-30i64..30, n),
            prop::collection::vec(-100.0..100.0f64, n * width),
        )
    })
}

proptest! {
    /// Pull after any series of pushes equals a last-write-wins HashMap model
    #[test]
    fn prop_matches_map_model(
        batches in prop::collection::vec(batch_strategy(3), 1..6),
        probe in prop::collection::vec(-40i64..40, 0..30),
    ) {
        let shard = PsShard::<f64>::new(ShardConfig::new(3)).unwrap();
        let mut model: HashMap<i64, Vec<f64>> = HashMap::new();

        for (keys, data) in &batches {
            let values = Array2::from_shape_vec((keys.len(), 3), data.clone()).unwrap();
            shard.push(keys, &values.view()).unwrap();
            for (i, &key) in keys.iter().enumerate() {
                model.insert(key, values.row(i).to_vec());
            }
        }

        prop_assert_eq!(shard.len(), model.len());

        let default = Array1::from_vec(vec![f64::NAN, 0.0, 1.0]);
        let rows = shard.pull(&probe, PullDefault::Shared(default.view())).unwrap();
        for (i, key) in probe.iter().enumerate() {
            match model.get(key) {
                Some(expected) => prop_assert_eq!(&rows.row(i).to_vec(), expected),
                None => {
                    prop_assert!(rows[[i, 0]].is_nan());
                    prop_assert_eq!(rows[[i, 1]], 0.0);
                    prop_assert_eq!(rows[[i, 2]], 1.0);
                }
            }
        }
    }

    /// Export is sorted, complete and reloads to an identical shard
    #[test]
    fn prop_export_load_identity((keys, data) in batch_strategy(2)) {
        let shard = PsShard::<f64>::new(ShardConfig::new(2)).unwrap();
        let values = Array2::from_shape_vec((keys.len(), 2), data).unwrap();
        shard.push(&keys, &values.view()).unwrap();

        let (exported_keys, exported) = shard.export();
        prop_assert!(exported_keys.windows(2).all(|w| w[0] < w[1]));

        let copy = PsShard::<f64>::new(ShardConfig::new(2)).unwrap();
        copy.load(&exported_keys, &exported.view()).unwrap();
        let (again_keys, again) = copy.export();
        prop_assert_eq!(again_keys, exported_keys);
        prop_assert_eq!(again, exported);
    }

    /// Removing keys drops exactly the present ones
    #[test]
    fn prop_remove_counts_present(
        (keys, data) in batch_strategy(1),
        to_remove in prop::collection::vec(-30i64..30, 0..10),
    ) {
        let shard = PsShard::<f64>::new(ShardConfig::new(1)).unwrap();
        let values = Array2::from_shape_vec((keys.len(), 1), data).unwrap();
        shard.push(&keys, &values.view()).unwrap();

        let before = shard.len();
        let mut unique_remove = to_remove.clone();
        unique_remove.sort_unstable();
        unique_remove.dedup();
        let present = unique_remove.iter().filter(|k| shard.contains_key(**k)).count();

        prop_assert_eq!(shard.remove(&unique_remove), present);
        prop_assert_eq!(shard.len(), before - present);
    }
}
