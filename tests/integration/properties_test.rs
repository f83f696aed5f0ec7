//! Property tests over the UDI rules

use proptest::prelude::*;
use udi_engine::algorithm::{UnitAccess, build_metric, categorize, decay_weight};
use udi_engine::{Category, DemandUnit, TravelEdge, UdiValue, compute_metrics};

use crate::utils::{provider, test_config};

proptest! {
    #[test]
    fn udi_is_non_negative_unless_flagged(
        population in 0u64..200_000,
        prevalence in 0.0f64..=1.0,
        capacity in 0.0f64..5_000.0,
    ) {
        let config = test_config();
        let unit = DemandUnit::new("90001", population, prevalence);
        let access = UnitAccess {
            accessible_capacity: capacity,
            reachable_providers: u32::from(capacity > 0.0),
            nearest_provider_minutes: None,
        };
        let metric = build_metric(&unit, &access, &config).unwrap();

        match metric.udi {
            UdiValue::Value(v) => prop_assert!(v >= 0.0),
            UdiValue::Undefined => prop_assert!(capacity == 0.0 && unit.estimated_patients() > 0.0),
            UdiValue::Suppressed => prop_assert!(unit.estimated_patients() < 11.0),
        }
        if unit.estimated_patients() == 0.0 {
            prop_assert_eq!(metric.udi, UdiValue::Value(0.0));
        }
    }

    #[test]
    fn decay_is_non_increasing(a in 0.0f64..200.0, b in 0.0f64..200.0) {
        let config = test_config();
        let (near, far) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(decay_weight(near, &config) >= decay_weight(far, &config));
    }

    #[test]
    fn category_follows_thresholds(udi in 0.0f64..10.0) {
        let config = test_config();
        let expected = if udi > 1.2 {
            Category::Desert
        } else if udi < 0.8 {
            Category::Overserved
        } else {
            Category::Adequate
        };
        prop_assert_eq!(categorize(udi, &config), expected);
    }

    #[test]
    fn edge_order_does_not_change_metrics(
        edges in proptest::collection::vec((0usize..5, 0usize..6, 0.0f64..150.0), 0..40)
            .prop_shuffle()
    ) {
        let config = test_config();
        let providers: Vec<_> = (0..6).map(|i| provider(&format!("p{i}"))).collect();
        let demand: Vec<_> = (0..5)
            .map(|i| DemandUnit::new(format!("9000{i}"), 1_000 * (i as u64 + 1), 0.05))
            .collect();
        let travel: Vec<_> = edges
            .iter()
            .map(|&(z, p, m)| TravelEdge::new(format!("9000{z}"), format!("p{p}"), m))
            .collect();
        let mut reversed = travel.clone();
        reversed.reverse();

        let forward = compute_metrics(&providers, &demand, &travel, &[], &config).unwrap();
        let backward = compute_metrics(&providers, &demand, &reversed, &[], &config).unwrap();
        prop_assert_eq!(forward.metrics, backward.metrics);
    }
}
