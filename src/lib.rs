//! Unmet-Demand-Index accessibility engine.
//!
//! Estimates, per ZIP code, how much cardiology demand goes unmet given the
//! providers reachable within a travel-time budget. The pipeline runs in
//! three stages: provider capacity, distance-decayed accessibility, and
//! the UDI itself.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod reader;
pub mod schema;
pub mod utils;
pub mod validation;
pub mod writer;

// Core types
pub use config::UdiConfig;
pub use error::{Result, UdiError};
pub use models::{
    AccessibilityMetric, Category, Coordinates, DemandUnit, MetricRow, PracticeStatus, Provider,
    TableKind, TravelEdge, UdiStatus, UdiValue,
};
pub use schema::SchemaIssue;
pub use validation::{IssueKind, RowValidationError, ValidationReport};

// Pipeline entry points
pub use pipeline::{
    Computation, InputPaths, Inputs, PipelineOutput, RunReport, compute_metrics, load_inputs,
    load_inputs_async, run_pipeline, run_pipeline_async,
};
pub use writer::{read_metrics, write_outputs};
