//! Tests for distance-decayed aggregation

use udi_engine::algorithm::{CentroidLookup, ProviderSet, TravelIndex, aggregate};
use udi_engine::{DemandUnit, TravelEdge};

use crate::utils::{provider, test_config};

fn access_for(minutes: &[f64]) -> f64 {
    let config = test_config();
    let providers: Vec<_> = (0..minutes.len()).map(|i| provider(&format!("p{i}"))).collect();
    let set = ProviderSet::build(&providers, &CentroidLookup::default(), &config);
    let units = vec![DemandUnit::new("90001", 1_000, 0.1)];
    let edges: Vec<_> = minutes
        .iter()
        .enumerate()
        .map(|(i, &m)| TravelEdge::new("90001", format!("p{i}"), m))
        .collect();

    let (mut index, mut stats) = TravelIndex::build(&edges, &units, &set, &config);
    index.finalize(&config, &mut stats);
    aggregate(&units, &index, &set, &config).expect("aggregation")[0].accessible_capacity
}

#[test]
fn test_single_provider_weights() {
    assert!((access_for(&[20.0]) - 40.0).abs() < 1e-9);
    assert!((access_for(&[45.0]) - 80.0 / 3.0).abs() < 1e-9);
    assert!((access_for(&[120.0]) - 10.0).abs() < 1e-9);
    assert_eq!(access_for(&[121.0]), 0.0);
}

#[test]
fn test_capacity_non_increasing_in_travel_time() {
    let mut previous = f64::INFINITY;
    for minutes in (0..=150).step_by(5) {
        let capacity = access_for(&[f64::from(minutes), 25.0]);
        assert!(capacity <= previous + 1e-12);
        previous = capacity;
    }
}

#[test]
fn test_units_without_edges_get_zero() {
    let config = test_config();
    let set = ProviderSet::build(&[provider("p0")], &CentroidLookup::default(), &config);
    let units = vec![
        DemandUnit::new("90001", 1_000, 0.1),
        DemandUnit::new("90002", 1_000, 0.1),
    ];
    let edges = vec![TravelEdge::new("90002", "p0", 10.0)];
    let (mut index, mut stats) = TravelIndex::build(&edges, &units, &set, &config);
    index.finalize(&config, &mut stats);

    let access = aggregate(&units, &index, &set, &config).expect("aggregation");
    assert_eq!(access[0].accessible_capacity, 0.0);
    assert_eq!(access[0].reachable_providers, 0);
    assert_eq!(access[1].reachable_providers, 1);
    assert_eq!(access[1].nearest_provider_minutes, Some(10.0));
}

#[test]
fn test_aggregate_rejects_mismatched_index() {
    let config = test_config();
    let set = ProviderSet::build(&[provider("p0")], &CentroidLookup::default(), &config);
    let units = vec![DemandUnit::new("90001", 1_000, 0.1)];
    let index = TravelIndex::default();
    assert!(aggregate(&units, &index, &set, &config).is_err());
}
