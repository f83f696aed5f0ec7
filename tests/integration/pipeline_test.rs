//! End-to-end computation over in-memory tables

use udi_engine::{
    Category, Coordinates, DemandUnit, TravelEdge, UdiConfig, UdiError, UdiValue, compute_metrics,
};

use crate::utils::{provider, synthetic_inputs, test_config};

#[test]
fn test_reference_scenarios() {
    let config = test_config();
    let providers = vec![provider("p1"), provider("p2")];
    let demand = vec![
        DemandUnit::new("90004", 100, 0.05),
        DemandUnit::new("90001", 10_000, 0.08),
        DemandUnit::new("90003", 0, 0.08),
        DemandUnit::new("90002", 500, 0.08),
    ];
    let edges = vec![
        TravelEdge::new("90001", "p1", 20.0),
        TravelEdge::new("90002", "p2", 45.0),
        TravelEdge::new("90004", "p1", 10.0),
    ];

    let result = compute_metrics(&providers, &demand, &edges, &[], &config).unwrap();
    let zips: Vec<_> = result.metrics.iter().map(|m| m.zip_code.as_str()).collect();
    assert_eq!(zips, vec!["90001", "90002", "90003", "90004"]);

    // 800 patients against one provider 20 minutes away
    let first = &result.metrics[0];
    assert!((first.estimated_patients - 800.0).abs() < 1e-9);
    assert!((first.accessible_capacity - 40.0).abs() < 1e-9);
    assert!((first.udi.value().unwrap() - 20.0).abs() < 1e-9);
    assert_eq!(first.category, Some(Category::Desert));

    // 40 patients, provider at 45 minutes weighted by 2/3
    let second = &result.metrics[1];
    assert!((second.accessible_capacity - 80.0 / 3.0).abs() < 1e-9);
    assert!((second.udi.value().unwrap() - 1.5).abs() < 1e-9);
    assert_eq!(second.category, Some(Category::Desert));

    // No demand and no capacity
    let third = &result.metrics[2];
    assert_eq!(third.udi, UdiValue::Value(0.0));
    assert_eq!(third.category, Some(Category::Overserved));
    assert!(!third.critical_desert);

    // Five patients is a small cell
    let fourth = &result.metrics[3];
    assert_eq!(fourth.udi, UdiValue::Suppressed);
    assert!(fourth.annotation.as_deref().unwrap().contains("suppressed"));

    assert_eq!(result.summary.demand_units, 4);
    assert_eq!(result.summary.suppressed, 1);
    assert_eq!(result.edges.explicit_kept, 3);
}

#[test]
fn test_demand_without_capacity_is_critical_desert() {
    let config = test_config();
    let demand = vec![DemandUnit::new("90001", 5_000, 0.1)];
    let result = compute_metrics(&[provider("p1")], &demand, &[], &[], &config).unwrap();

    let metric = &result.metrics[0];
    assert_eq!(metric.udi, UdiValue::Undefined);
    assert!(metric.critical_desert);
    assert_eq!(metric.reachable_providers, 0);
    assert_eq!(metric.nearest_provider_minutes, None);
    assert_eq!(result.summary.critical_deserts, 1);
}

#[test]
fn test_small_cell_without_capacity_hides_desert_flag() {
    let config = test_config();
    let demand = vec![DemandUnit::new("90001", 100, 0.05)];
    let result = compute_metrics(&[provider("p1")], &demand, &[], &[], &config).unwrap();

    let metric = &result.metrics[0];
    assert_eq!(metric.udi, UdiValue::Suppressed);
    assert_eq!(metric.category, None);
    assert!(!metric.critical_desert);
    assert_eq!(result.summary.critical_deserts, 0);
    assert_eq!(result.summary.suppressed, 1);

    let row = udi_engine::MetricRow::from(metric);
    assert!(!row.critical_desert);
    assert_eq!(row.status, "suppressed");
}

#[test]
fn test_repeated_demand_zip_keeps_first() {
    let config = test_config();
    let demand = vec![
        DemandUnit::new("90001", 1_000, 0.1),
        DemandUnit::new("90001", 9_000, 0.1),
    ];
    let result = compute_metrics(&[provider("p1")], &demand, &[], &[], &config).unwrap();
    assert_eq!(result.metrics.len(), 1);
    assert!((result.metrics[0].estimated_patients - 100.0).abs() < 1e-9);
}

#[test]
fn test_estimation_fills_missing_pairs() {
    let here = Coordinates::new(34.05, -118.25).unwrap();
    let nearby = Coordinates::new(34.07, -118.27).unwrap();
    let providers = vec![udi_engine::Provider::new("p1", "Cardiology").with_coordinates(nearby)];
    let demand = vec![DemandUnit::new("90001", 10_000, 0.08)];
    let centroids = vec![("90001".to_string(), here)];

    let off = compute_metrics(&providers, &demand, &[], &centroids, &test_config()).unwrap();
    assert_eq!(off.metrics[0].udi, UdiValue::Undefined);

    let config = UdiConfig {
        estimate_missing_edges: true,
        ..test_config()
    };
    let on = compute_metrics(&providers, &demand, &[], &centroids, &config).unwrap();
    let metric = &on.metrics[0];
    assert_eq!(metric.reachable_providers, 1);
    assert!((metric.accessible_capacity - 40.0).abs() < 1e-9);
    assert_eq!(metric.nearest_provider_minutes, Some(5.0));
    assert_eq!(on.edges.estimated, 1);
}

#[test]
fn test_thread_count_does_not_change_results() {
    let inputs = synthetic_inputs(42, 400, 60);
    let run = |threads| {
        let config = UdiConfig {
            worker_threads: Some(threads),
            ..test_config()
        };
        compute_metrics(&inputs.providers, &inputs.demand, &inputs.edges, &[], &config)
            .unwrap()
            .metrics
    };

    let single = run(1);
    assert_eq!(single.len(), 400);
    assert_eq!(single, run(4));
    assert_eq!(single, run(7));
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let config = UdiConfig {
        max_travel_minutes: 10.0,
        ..test_config()
    };
    let result = compute_metrics(&[], &[], &[], &[], &config);
    assert!(matches!(result, Err(UdiError::Config(_))));
}

#[test]
fn test_estimation_with_continental_travel_limit() {
    let here = Coordinates::new(34.05, -118.25).unwrap();
    let providers = vec![
        udi_engine::Provider::new("la", "Cardiology")
            .with_coordinates(Coordinates::new(34.07, -118.27).unwrap()),
        udi_engine::Provider::new("nyc", "Cardiology")
            .with_coordinates(Coordinates::new(40.71, -74.0).unwrap()),
    ];
    let demand = vec![DemandUnit::new("90001", 10_000, 0.08)];
    let centroids = vec![("90001".to_string(), here)];

    let config = UdiConfig {
        max_travel_minutes: 1e12,
        estimate_missing_edges: true,
        ..test_config()
    };
    assert!(config.validate().is_ok());

    let result = compute_metrics(&providers, &demand, &[], &centroids, &config).unwrap();
    assert_eq!(result.metrics[0].reachable_providers, 2);
    assert_eq!(result.edges.estimated, 2);
    assert_eq!(result.metrics[0].nearest_provider_minutes, Some(5.0));
}
