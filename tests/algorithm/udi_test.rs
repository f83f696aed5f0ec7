//! Tests for the UDI calculator

use udi_engine::algorithm::{UnitAccess, build_metric, categorize};
use udi_engine::{Category, DemandUnit, MetricRow, UdiConfig, UdiStatus, UdiValue};

use crate::utils::test_config;

fn reach(capacity: f64) -> UnitAccess {
    UnitAccess {
        accessible_capacity: capacity,
        reachable_providers: 1,
        nearest_provider_minutes: Some(15.0),
    }
}

#[test]
fn test_category_thresholds_are_configurable() {
    let config = UdiConfig {
        udi_desert_threshold: 2.0,
        udi_overserved_threshold: 0.5,
        ..test_config()
    };
    assert_eq!(categorize(1.5, &config), Category::Adequate);
    assert_eq!(categorize(2.0, &config), Category::Adequate);
    assert_eq!(categorize(2.01, &config), Category::Desert);
    assert_eq!(categorize(0.49, &config), Category::Overserved);
}

#[test]
fn test_min_cell_size_boundary() {
    let config = test_config();
    // 10.99 patients is below the cell size, exactly 11 is not
    let just_below = DemandUnit::new("90001", 1_099, 0.01);
    let at_size = DemandUnit::new("90002", 1_100, 0.01);

    let below = build_metric(&just_below, &reach(40.0), &config).unwrap();
    let at = build_metric(&at_size, &reach(40.0), &config).unwrap();
    assert_eq!(below.udi.status(), UdiStatus::Suppressed);
    assert_eq!(at.udi.status(), UdiStatus::Computed);
}

#[test]
fn test_metric_row_hides_suppressed_values() {
    let config = test_config();
    let metric = build_metric(&DemandUnit::new("90001", 100, 0.05), &reach(40.0), &config).unwrap();
    let row = MetricRow::from(&metric);
    assert_eq!(row.estimated_patients, None);
    assert_eq!(row.udi, None);
    assert_eq!(row.category, None);
    assert_eq!(row.status, "suppressed");
    assert!(row.annotation.is_some());
}

#[test]
fn test_metric_row_for_computed_unit() {
    let config = test_config();
    let metric =
        build_metric(&DemandUnit::new("90001", 10_000, 0.08), &reach(40.0), &config).unwrap();
    assert_eq!(metric.udi, UdiValue::Value(20.0));

    let row = MetricRow::from(&metric);
    assert_eq!(row.udi, Some(20.0));
    assert_eq!(row.category.as_deref(), Some("desert"));
    assert_eq!(row.status, "computed");
    assert!(row.udi_ci_low.unwrap() < 20.0 && row.udi_ci_high.unwrap() > 20.0);
    assert!(!row.critical_desert);
}
