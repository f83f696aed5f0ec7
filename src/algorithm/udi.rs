//! UDI calculation, categorisation and small-cell suppression.

use crate::config::UdiConfig;
use crate::error::{Result, UdiError};
use crate::models::{AccessibilityMetric, Category, DemandUnit, UdiValue};

use super::accessibility::UnitAccess;

/// Demand over accessible capacity
///
/// Zero capacity gives 0 for zero demand and [`UdiValue::Undefined`]
/// otherwise. Inputs outside those cases (negative or non-finite) are a
/// computation error.
pub fn compute_udi(estimated_patients: f64, accessible_capacity: f64) -> Result<UdiValue> {
    if !estimated_patients.is_finite() || estimated_patients < 0.0 {
        return Err(UdiError::Computation(format!(
            "estimated patients must be a non-negative number, got {estimated_patients}"
        )));
    }
    if !accessible_capacity.is_finite() || accessible_capacity < 0.0 {
        return Err(UdiError::Computation(format!(
            "accessible capacity must be a non-negative number, got {accessible_capacity}"
        )));
    }

    if accessible_capacity == 0.0 {
        return Ok(if estimated_patients == 0.0 {
            UdiValue::Value(0.0)
        } else {
            UdiValue::Undefined
        });
    }

    let udi = estimated_patients / accessible_capacity;
    if udi.is_finite() {
        Ok(UdiValue::Value(udi))
    } else {
        Err(UdiError::Computation(format!(
            "UDI overflowed for {estimated_patients} patients over capacity {accessible_capacity}"
        )))
    }
}

/// Category of a defined UDI; both thresholds are inclusive for `adequate`
#[must_use]
pub fn categorize(udi: f64, config: &UdiConfig) -> Category {
    if udi > config.udi_desert_threshold {
        Category::Desert
    } else if udi < config.udi_overserved_threshold {
        Category::Overserved
    } else {
        Category::Adequate
    }
}

/// Whether a patient count is too small to publish
#[must_use]
pub fn is_small_cell(estimated_patients: f64, config: &UdiConfig) -> bool {
    estimated_patients > 0.0 && estimated_patients < f64::from(config.min_cell_size)
}

/// Interval on the UDI from the sampling error of the prevalence
///
/// Normal approximation: `se = sqrt(p(1-p)/n)`, bounds
/// `n(p ± z·se) / capacity` with the lower bound floored at zero. `None`
/// when the UDI itself is undefined.
#[must_use]
pub fn confidence_interval(unit: &DemandUnit, accessible_capacity: f64, z: f64) -> Option<(f64, f64)> {
    let n = unit.population as f64;
    let p = unit.prevalence;

    if n == 0.0 || p == 0.0 {
        return Some((0.0, 0.0));
    }
    if accessible_capacity <= 0.0 {
        return None;
    }

    let se = (p * (1.0 - p) / n).sqrt();
    let low = (n * (p - z * se)).max(0.0) / accessible_capacity;
    let high = n * (p + z * se) / accessible_capacity;
    Some((low, high))
}

/// Combine a unit and its accessibility into an output record
pub fn build_metric(
    unit: &DemandUnit,
    access: &UnitAccess,
    config: &UdiConfig,
) -> Result<AccessibilityMetric> {
    let estimated_patients = unit.estimated_patients();
    let capacity = access.accessible_capacity;
    let udi = compute_udi(estimated_patients, capacity)?;
    let critical_desert = matches!(udi, UdiValue::Undefined);

    let mut metric = AccessibilityMetric {
        zip_code: unit.zip_code.clone(),
        estimated_patients,
        accessible_capacity: capacity,
        reachable_providers: access.reachable_providers,
        nearest_provider_minutes: access.nearest_provider_minutes,
        udi,
        confidence_interval: None,
        category: None,
        critical_desert,
        annotation: None,
    };

    // A suppressed row carries no statistic derived from its demand
    if is_small_cell(estimated_patients, config) {
        metric.udi = UdiValue::Suppressed;
        metric.critical_desert = false;
        metric.annotation = Some(format!(
            "suppressed: fewer than {} estimated patients",
            config.min_cell_size
        ));
        return Ok(metric);
    }

    match udi {
        UdiValue::Value(value) => {
            metric.category = Some(categorize(value, config));
            metric.confidence_interval = confidence_interval(unit, capacity, config.confidence_z);
            if estimated_patients == 0.0 {
                metric.annotation = Some("no estimated demand".to_string());
            }
        }
        UdiValue::Undefined => {
            metric.category = Some(Category::Desert);
            metric.annotation =
                Some("critical desert: demand with no accessible capacity".to_string());
        }
        UdiValue::Suppressed => {}
    }

    Ok(metric)
}
