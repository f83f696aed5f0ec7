//! End-to-end accessibility pipeline.
//!
//! [`compute_metrics`] is the pure core: validated tables and a
//! configuration in, one metric per demand unit out. The loaders around it
//! read and validate the input files, and [`run_pipeline`] ties both
//! together with the run report.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::algorithm::{
    CentroidLookup, EdgeStats, ProviderDiagnostic, ProviderSet, RunSummary, TravelIndex, aggregate,
    build_metric,
};
use crate::config::UdiConfig;
use crate::error::Result;
use crate::models::{AccessibilityMetric, Coordinates, DemandUnit, Provider, TravelEdge};
use crate::reader::{RawTable, read_table};
use crate::schema::{CENTROID_TABLE, DEMAND_TABLE, PROVIDER_TABLE, TRAVEL_TABLE, TableSpec};
use crate::utils::logging::log_stage;
use crate::validation::{
    ValidationReport, validate_centroids, validate_demand, validate_providers, validate_travel,
};

/// Locations of the input tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPaths {
    pub providers: PathBuf,
    pub demand: PathBuf,
    pub travel: PathBuf,
    pub centroids: Option<PathBuf>,
}

impl InputPaths {
    /// Paths for tables that share a directory
    #[must_use]
    pub fn in_dir(dir: &Path, providers: &str, demand: &str, travel: &str) -> Self {
        Self {
            providers: dir.join(providers),
            demand: dir.join(demand),
            travel: dir.join(travel),
            centroids: None,
        }
    }

    #[must_use]
    pub fn with_centroids(mut self, path: impl Into<PathBuf>) -> Self {
        self.centroids = Some(path.into());
        self
    }
}

/// Validated input records
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub providers: Vec<Provider>,
    pub demand: Vec<DemandUnit>,
    pub travel: Vec<TravelEdge>,
    pub centroids: Vec<(String, Coordinates)>,
    pub validation: ValidationReport,
}

impl Inputs {
    /// Validate raw tables and enforce the row-error tolerances
    pub fn from_tables(
        providers: &RawTable,
        demand: &RawTable,
        travel: &RawTable,
        centroids: Option<&RawTable>,
        config: &UdiConfig,
    ) -> Result<Self> {
        let mut validation = ValidationReport::default();

        let providers = validate_providers(providers, config);
        validation.absorb(&providers);
        let demand = validate_demand(demand);
        validation.absorb(&demand);
        let travel = validate_travel(travel);
        validation.absorb(&travel);
        let centroids = centroids.map(validate_centroids);
        if let Some(centroids) = &centroids {
            validation.absorb(centroids);
        }

        validation.check_tolerances(config)?;

        Ok(Self {
            providers: providers.records,
            demand: demand.records,
            travel: travel.records,
            centroids: centroids.map(|c| c.records).unwrap_or_default(),
            validation,
        })
    }
}

/// Read and validate all input tables one after another
pub fn load_inputs(paths: &InputPaths, config: &UdiConfig) -> Result<Inputs> {
    let start = Instant::now();
    let providers = read_table(&paths.providers, &PROVIDER_TABLE)?;
    let demand = read_table(&paths.demand, &DEMAND_TABLE)?;
    let travel = read_table(&paths.travel, &TRAVEL_TABLE)?;
    let centroids = paths
        .centroids
        .as_deref()
        .map(|path| read_table(path, &CENTROID_TABLE))
        .transpose()?;
    log_stage("Loading inputs", start.elapsed());

    Inputs::from_tables(&providers, &demand, &travel, centroids.as_ref(), config)
}

async fn read_table_blocking(path: PathBuf, spec: &'static TableSpec) -> Result<RawTable> {
    tokio::task::spawn_blocking(move || read_table(&path, spec)).await?
}

/// Read the input tables concurrently on the blocking pool, then validate
pub async fn load_inputs_async(paths: &InputPaths, config: &UdiConfig) -> Result<Inputs> {
    let start = Instant::now();
    let centroids = async {
        match paths.centroids.clone() {
            Some(path) => read_table_blocking(path, &CENTROID_TABLE).await.map(Some),
            None => Ok(None),
        }
    };

    let (providers, demand, travel, centroids) = tokio::try_join!(
        read_table_blocking(paths.providers.clone(), &PROVIDER_TABLE),
        read_table_blocking(paths.demand.clone(), &DEMAND_TABLE),
        read_table_blocking(paths.travel.clone(), &TRAVEL_TABLE),
        centroids,
    )?;
    log_stage("Loading inputs", start.elapsed());

    Inputs::from_tables(&providers, &demand, &travel, centroids.as_ref(), config)
}

/// Provider outcomes for the run report
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderReport {
    pub rated: usize,
    pub skipped: usize,
    pub excluded: usize,
    pub unknown_practice_types: std::collections::BTreeMap<String, usize>,
    pub diagnostics: Vec<ProviderDiagnostic>,
}

impl From<&ProviderSet> for ProviderReport {
    fn from(set: &ProviderSet) -> Self {
        Self {
            rated: set.len(),
            skipped: set.skipped,
            excluded: set.excluded(),
            unknown_practice_types: set.unknown_practice_types.clone(),
            diagnostics: set.diagnostics.clone(),
        }
    }
}

/// Result of one computation pass
#[derive(Debug, Clone)]
pub struct Computation {
    /// One metric per demand unit, sorted by ZIP code
    pub metrics: Vec<AccessibilityMetric>,
    pub edges: EdgeStats,
    pub providers: ProviderReport,
    pub summary: RunSummary,
}

/// Compute accessibility metrics from in-memory tables
///
/// Demand units are ordered by ZIP code; for a repeated ZIP the first unit
/// wins. Units without coordinates are placed on the centroid table.
pub fn compute_metrics(
    providers: &[Provider],
    demand: &[DemandUnit],
    edges: &[TravelEdge],
    centroids: &[(String, Coordinates)],
    config: &UdiConfig,
) -> Result<Computation> {
    config.validate()?;
    let start = Instant::now();

    let mut units = demand.to_vec();
    units.sort_by(|a, b| a.zip_code.cmp(&b.zip_code));
    units.dedup_by(|later, earlier| later.zip_code == earlier.zip_code);

    let lookup = CentroidLookup::new(&units, centroids);
    for unit in units.iter_mut().filter(|u| u.centroid.is_none()) {
        unit.centroid = lookup.resolve(&unit.zip_code);
    }

    let provider_set = ProviderSet::build(providers, &lookup, config);

    let (mut index, mut edge_stats) = TravelIndex::build(edges, &units, &provider_set, config);
    if config.estimate_missing_edges {
        index.estimate_missing(&units, &provider_set, config, &mut edge_stats);
    }
    index.finalize(config, &mut edge_stats);
    log::info!(
        "Travel edges: {} kept, {} estimated, {} beyond {} minutes",
        edge_stats.explicit_kept,
        edge_stats.estimated,
        edge_stats.beyond_max_minutes,
        config.max_travel_minutes
    );

    let access = aggregate(&units, &index, &provider_set, config)?;
    let metrics = units
        .iter()
        .zip(&access)
        .map(|(unit, access)| build_metric(unit, access, config))
        .collect::<Result<Vec<_>>>()?;

    let summary = RunSummary::from_metrics(&metrics);
    log_stage("Computing metrics", start.elapsed());

    Ok(Computation {
        metrics,
        edges: edge_stats,
        providers: ProviderReport::from(&provider_set),
        summary,
    })
}

/// Everything recorded about a run besides the metrics themselves
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub config: UdiConfig,
    pub validation: ValidationReport,
    pub edges: EdgeStats,
    pub providers: ProviderReport,
    pub summary: RunSummary,
}

/// Metrics plus the report of the run that produced them
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub metrics: Vec<AccessibilityMetric>,
    pub report: RunReport,
}

impl PipelineOutput {
    fn assemble(inputs: Inputs, computation: Computation, config: &UdiConfig) -> Self {
        Self {
            metrics: computation.metrics,
            report: RunReport {
                generated_at: Utc::now(),
                config: config.clone(),
                validation: inputs.validation,
                edges: computation.edges,
                providers: computation.providers,
                summary: computation.summary,
            },
        }
    }
}

fn compute_from_inputs(inputs: Inputs, config: &UdiConfig) -> Result<PipelineOutput> {
    let computation = compute_metrics(
        &inputs.providers,
        &inputs.demand,
        &inputs.travel,
        &inputs.centroids,
        config,
    )?;
    Ok(PipelineOutput::assemble(inputs, computation, config))
}

/// Load, validate and compute in the calling thread
pub fn run_pipeline(paths: &InputPaths, config: &UdiConfig) -> Result<PipelineOutput> {
    config.validate()?;
    let inputs = load_inputs(paths, config)?;
    compute_from_inputs(inputs, config)
}

/// Load concurrently, then compute on the blocking pool
pub async fn run_pipeline_async(paths: &InputPaths, config: &UdiConfig) -> Result<PipelineOutput> {
    config.validate()?;
    let inputs = load_inputs_async(paths, config).await?;
    let config = config.clone();
    tokio::task::spawn_blocking(move || compute_from_inputs(inputs, &config)).await?
}
