//! Output records: one accessibility metric per demand unit

use std::fmt;

use serde::{Deserialize, Serialize};

/// Categorical label derived from the UDI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Demand exceeds accessible capacity
    Desert,
    /// Demand and capacity are roughly balanced
    Adequate,
    /// Accessible capacity exceeds demand
    Overserved,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desert => "desert",
            Self::Adequate => "adequate",
            Self::Overserved => "overserved",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The computed UDI, or the reason there is no number to show
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "value")]
pub enum UdiValue {
    /// A finite, non-negative index
    Value(f64),
    /// Demand with no reachable capacity: a critical desert
    Undefined,
    /// Withheld under the small-cell policy
    Suppressed,
}

impl UdiValue {
    /// The numeric index, if one may be shown
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::Undefined | Self::Suppressed => None,
        }
    }

    #[must_use]
    pub const fn status(self) -> UdiStatus {
        match self {
            Self::Value(_) => UdiStatus::Computed,
            Self::Undefined => UdiStatus::Undefined,
            Self::Suppressed => UdiStatus::Suppressed,
        }
    }
}

/// Status column of the metrics table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UdiStatus {
    Computed,
    Undefined,
    Suppressed,
}

impl UdiStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Computed => "computed",
            Self::Undefined => "undefined",
            Self::Suppressed => "suppressed",
        }
    }
}

impl fmt::Display for UdiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accessibility of one demand unit for one computation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibilityMetric {
    pub zip_code: String,
    pub estimated_patients: f64,
    /// Distance-decayed sum of reachable provider capacity
    pub accessible_capacity: f64,
    /// Providers within the maximum travel time
    pub reachable_providers: u32,
    /// Travel time to the closest reachable provider
    pub nearest_provider_minutes: Option<f64>,
    pub udi: UdiValue,
    /// Lower and upper bound on the UDI
    pub confidence_interval: Option<(f64, f64)>,
    /// `None` only when the UDI is suppressed
    pub category: Option<Category>,
    pub critical_desert: bool,
    /// Human-readable flag text
    pub annotation: Option<String>,
}

impl AccessibilityMetric {
    #[must_use]
    pub const fn is_suppressed(&self) -> bool {
        matches!(self.udi, UdiValue::Suppressed)
    }
}

/// Flat row of the metrics table as written to Parquet or CSV
///
/// Suppressed rows carry no patient count, UDI, interval or category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub zip_code: String,
    pub estimated_patients: Option<f64>,
    pub accessible_capacity: f64,
    pub reachable_providers: u32,
    pub nearest_provider_minutes: Option<f64>,
    pub udi: Option<f64>,
    pub udi_ci_low: Option<f64>,
    pub udi_ci_high: Option<f64>,
    pub category: Option<String>,
    pub status: String,
    pub critical_desert: bool,
    pub annotation: Option<String>,
}

impl From<&AccessibilityMetric> for MetricRow {
    fn from(metric: &AccessibilityMetric) -> Self {
        let suppressed = metric.is_suppressed();
        Self {
            zip_code: metric.zip_code.clone(),
            estimated_patients: (!suppressed).then_some(metric.estimated_patients),
            accessible_capacity: metric.accessible_capacity,
            reachable_providers: metric.reachable_providers,
            nearest_provider_minutes: metric.nearest_provider_minutes,
            udi: metric.udi.value(),
            udi_ci_low: metric.confidence_interval.map(|(low, _)| low),
            udi_ci_high: metric.confidence_interval.map(|(_, high)| high),
            category: metric.category.map(|c| c.as_str().to_string()),
            status: metric.udi.status().as_str().to_string(),
            critical_desert: metric.critical_desert,
            annotation: metric.annotation.clone(),
        }
    }
}
