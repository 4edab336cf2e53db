use proptest::prelude::*;

use crate::{ContextKey, UserOverrideModel};

const HALFLIFE: f64 = 5400.0;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn table_never_exceeds_capacity(
        capacity in 1usize..16,
        records in prop::collection::vec((0u16..64, 0u8..4, 0u32..20_000), 1..200),
    ) {
        let model = UserOverrideModel::new(capacity, HALFLIFE).unwrap();
        let mut distinct = std::collections::HashSet::new();
        for (key, candidate, ts) in records {
            distinct.insert(key);
            model.record(&ContextKey::new(format!("k{key}")), &format!("c{candidate}"), ts as f64);
            prop_assert!(model.len() <= capacity);
        }
        prop_assert_eq!(model.len(), distinct.len().min(capacity));
    }

    #[test]
    fn weight_never_grows_with_time(
        count in 1u32..50,
        t1 in 0.0f64..100_000.0,
        dt in 0.001f64..100_000.0,
    ) {
        let model = UserOverrideModel::new(4, HALFLIFE).unwrap();
        let key = ContextKey::new("k");
        for _ in 0..count {
            model.record(&key, "甲", 0.0);
        }
        let w1 = model.query(&key, t1)["甲"];
        let w2 = model.query(&key, t1 + dt)["甲"];
        prop_assert!(w2 < w1);
        prop_assert!(w1 <= count as f64);
    }
}
