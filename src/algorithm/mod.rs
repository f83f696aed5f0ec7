//! The accessibility pipeline stages
//!
//! Capacity model, travel index, accessibility aggregation and UDI
//! calculation, composed leaf to root by [`crate::pipeline`].

pub mod accessibility;
pub mod capacity;
pub mod statistics;
pub mod travel;
pub mod udi;

pub use accessibility::{UnitAccess, aggregate, decay_weight, unit_access};
pub use capacity::{
    CapacityError, CentroidLookup, DiagnosticKind, ProviderDiagnostic, ProviderSet, RatedProvider,
    effective_capacity,
};
pub use statistics::RunSummary;
pub use travel::{EdgeStats, Reach, SpatialGrid, TravelIndex, estimate_travel_minutes};
pub use udi::{build_metric, categorize, compute_udi, confidence_interval, is_small_cell};
