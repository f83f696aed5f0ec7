//! Summary statistics over a run's metrics

use std::fmt::Write as _;

use serde::Serialize;

use crate::models::{AccessibilityMetric, Category, UdiValue};

/// Counts and totals over the metrics table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub demand_units: usize,
    pub computed: usize,
    pub undefined: usize,
    pub suppressed: usize,
    pub deserts: usize,
    pub adequate: usize,
    pub overserved: usize,
    pub critical_deserts: usize,
    /// Units with no provider inside the travel limit
    pub unreachable_units: usize,
    /// Patients over all units that are not suppressed
    pub published_patients: f64,
    pub total_accessible_capacity: f64,
    pub median_udi: Option<f64>,
    pub max_udi: Option<f64>,
}

impl RunSummary {
    #[must_use]
    pub fn from_metrics(metrics: &[AccessibilityMetric]) -> Self {
        let mut summary = Self {
            demand_units: metrics.len(),
            ..Self::default()
        };
        let mut values = Vec::with_capacity(metrics.len());

        for metric in metrics {
            match metric.udi {
                UdiValue::Value(v) => {
                    summary.computed += 1;
                    values.push(v);
                }
                UdiValue::Undefined => summary.undefined += 1,
                UdiValue::Suppressed => summary.suppressed += 1,
            }
            match metric.category {
                Some(Category::Desert) => summary.deserts += 1,
                Some(Category::Adequate) => summary.adequate += 1,
                Some(Category::Overserved) => summary.overserved += 1,
                None => {}
            }
            if metric.critical_desert {
                summary.critical_deserts += 1;
            }
            if metric.reachable_providers == 0 {
                summary.unreachable_units += 1;
            }
            if !metric.is_suppressed() {
                summary.published_patients += metric.estimated_patients;
            }
            summary.total_accessible_capacity += metric.accessible_capacity;
        }

        values.sort_by(f64::total_cmp);
        summary.median_udi = match values.len() {
            0 => None,
            n if n % 2 == 1 => Some(values[n / 2]),
            n => Some((values[n / 2 - 1] + values[n / 2]) / 2.0),
        };
        summary.max_udi = values.last().copied();
        summary
    }

    /// Human-readable summary for the console
    #[must_use]
    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();
        let share = |count: usize| {
            if self.demand_units > 0 {
                count as f64 / self.demand_units as f64 * 100.0
            } else {
                0.0
            }
        };

        let _ = writeln!(summary, "UDI Run Summary:");
        let _ = writeln!(summary, "  Demand Units: {}", self.demand_units);
        let _ = writeln!(summary, "  Computed: {}", self.computed);
        let _ = writeln!(summary, "  Undefined (critical deserts): {}", self.undefined);
        let _ = writeln!(summary, "  Suppressed (small cells): {}", self.suppressed);
        let _ = writeln!(summary, "  Without Reachable Providers: {}", self.unreachable_units);

        let _ = writeln!(summary, "\nCategories:");
        for (label, count) in [
            ("Desert", self.deserts),
            ("Adequate", self.adequate),
            ("Overserved", self.overserved),
        ] {
            let _ = writeln!(summary, "    {label}: {count} ({:.1}%)", share(count));
        }

        let _ = writeln!(summary, "\nTotals:");
        let _ = writeln!(summary, "  Published Patients: {:.1}", self.published_patients);
        let _ = writeln!(
            summary,
            "  Accessible Capacity: {:.1}",
            self.total_accessible_capacity
        );
        if let (Some(median), Some(max)) = (self.median_udi, self.max_udi) {
            let _ = writeln!(summary, "  Median UDI: {median:.3}");
            let _ = writeln!(summary, "  Max UDI: {max:.3}");
        }

        summary
    }
}
