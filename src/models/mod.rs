//! Domain types for the accessibility computation
//!
//! All of these are loaded (or derived) once per run and never mutated
//! afterwards; every stage of the pipeline takes them by shared reference.

pub mod demand;
pub mod location;
pub mod metric;
pub mod provider;
pub mod travel;

use std::fmt;

pub use demand::DemandUnit;
pub use location::{Coordinates, normalize_zip};
pub use metric::{AccessibilityMetric, Category, MetricRow, UdiStatus, UdiValue};
pub use provider::{PracticeStatus, Provider};
pub use travel::TravelEdge;

/// The input tables the engine knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Cardiology providers
    Providers,
    /// ZIP-level population and prevalence
    Demand,
    /// Travel times between demand units and providers
    Travel,
    /// ZIP centroid coordinates used for geocoding
    Centroids,
}

impl TableKind {
    /// Lowercase name used in logs and reports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Providers => "providers",
            Self::Demand => "demand",
            Self::Travel => "travel",
            Self::Centroids => "centroids",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
