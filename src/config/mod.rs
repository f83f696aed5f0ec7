//! Configuration for a UDI computation run.
//!
//! Every tunable of the pipeline lives here and is passed explicitly into
//! each stage, so tests can vary thresholds per scenario. Any subset of the
//! fields can be overridden from a TOML file; missing keys keep their
//! defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UdiError};
use crate::error::util::safe_open_file;

/// Specialties accepted as cardiology-equivalent: names plus NUCC taxonomy codes
pub const DEFAULT_ACCEPTED_SPECIALTIES: &[&str] = &[
    "cardiology",
    "cardiovascular disease",
    "interventional cardiology",
    "clinical cardiac electrophysiology",
    "cardiac electrophysiology",
    "adult congenital heart disease",
    "207RC0000X",
    "207RI0011X",
    "207RC0001X",
    "207RA0201X",
    "207RE0101X",
];

/// Configuration for the accessibility pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UdiConfig {
    /// Weekly patient capacity assumed when a provider has no explicit value
    pub default_weekly_capacity: f64,
    /// Nominal acceptable travel time; providers at or under it get full weight
    pub acceptable_travel_minutes: f64,
    /// Providers further than this contribute nothing
    pub max_travel_minutes: f64,
    /// Minimum number of individuals behind any emitted statistic
    pub min_cell_size: u32,
    /// UDI strictly above this is a desert
    pub udi_desert_threshold: f64,
    /// UDI strictly below this is overserved
    pub udi_overserved_threshold: f64,
    /// Capacity multiplier per practice type (lowercase keys)
    pub practice_type_multipliers: BTreeMap<String, f64>,
    /// Specialty names or taxonomy codes treated as cardiology
    pub accepted_specialties: Vec<String>,
    /// Travel mode used from the travel table
    pub travel_mode: String,
    /// Estimate travel times for pairs missing from the travel table
    pub estimate_missing_edges: bool,
    /// z-score for the UDI confidence interval
    pub confidence_z: f64,
    /// Highest tolerated share of rows missing a required field
    pub missing_field_tolerance: f64,
    /// Highest tolerated share of rows rejected for any other reason
    pub invalid_row_tolerance: f64,
    /// Worker pool size; defaults to the number of CPUs
    pub worker_threads: Option<usize>,
    /// Draw progress bars during aggregation
    pub show_progress: bool,
}

impl Default for UdiConfig {
    fn default() -> Self {
        let practice_type_multipliers = [
            ("solo", 1.0),
            ("group", 1.25),
            ("hospital", 1.5),
            ("academic", 0.8),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            default_weekly_capacity: 40.0,
            acceptable_travel_minutes: 30.0,
            max_travel_minutes: 120.0,
            min_cell_size: 11,
            udi_desert_threshold: 1.2,
            udi_overserved_threshold: 0.8,
            practice_type_multipliers,
            accepted_specialties: DEFAULT_ACCEPTED_SPECIALTIES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            travel_mode: crate::models::travel::DEFAULT_TRAVEL_MODE.to_string(),
            estimate_missing_edges: false,
            confidence_z: 1.96,
            missing_field_tolerance: 0.0,
            invalid_row_tolerance: 1.0,
            worker_threads: None,
            show_progress: true,
        }
    }
}

impl UdiConfig {
    /// Load a configuration from a TOML file, falling back to defaults for absent keys
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let mut file = safe_open_file(path, "configuration")?;
        let mut content = String::new();
        std::io::Read::read_to_string(&mut file, &mut content)
            .map_err(|e| UdiError::io(path, e))?;
        let config = Self::from_toml_str(&content)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Lowercase the keyed lookups so matching is case-insensitive
    pub fn normalize(&mut self) {
        self.practice_type_multipliers = std::mem::take(&mut self.practice_type_multipliers)
            .into_iter()
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v))
            .collect();
        for specialty in &mut self.accepted_specialties {
            *specialty = specialty.trim().to_ascii_lowercase();
        }
        self.travel_mode = self.travel_mode.trim().to_ascii_lowercase();
    }

    /// Reject settings the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(UdiError::Config(format!("{name} must be a positive number, got {value}")))
            }
        }

        fn fraction(name: &str, value: f64) -> Result<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(UdiError::Config(format!("{name} must be within [0, 1], got {value}")))
            }
        }

        positive("default_weekly_capacity", self.default_weekly_capacity)?;
        positive("acceptable_travel_minutes", self.acceptable_travel_minutes)?;
        positive("max_travel_minutes", self.max_travel_minutes)?;
        positive("udi_desert_threshold", self.udi_desert_threshold)?;
        positive("udi_overserved_threshold", self.udi_overserved_threshold)?;
        positive("confidence_z", self.confidence_z)?;
        fraction("missing_field_tolerance", self.missing_field_tolerance)?;
        fraction("invalid_row_tolerance", self.invalid_row_tolerance)?;

        if self.max_travel_minutes < self.acceptable_travel_minutes {
            return Err(UdiError::Config(format!(
                "max_travel_minutes ({}) is below acceptable_travel_minutes ({})",
                self.max_travel_minutes, self.acceptable_travel_minutes
            )));
        }

        if self.udi_overserved_threshold > self.udi_desert_threshold {
            return Err(UdiError::Config(format!(
                "udi_overserved_threshold ({}) is above udi_desert_threshold ({})",
                self.udi_overserved_threshold, self.udi_desert_threshold
            )));
        }

        for (practice_type, multiplier) in &self.practice_type_multipliers {
            positive(&format!("practice_type_multipliers.{practice_type}"), *multiplier)?;
        }

        if self.accepted_specialties.is_empty() {
            return Err(UdiError::Config(
                "accepted_specialties must name at least one specialty".to_string(),
            ));
        }

        if self.travel_mode.is_empty() {
            return Err(UdiError::Config("travel_mode must not be empty".to_string()));
        }

        if self.worker_threads == Some(0) {
            return Err(UdiError::Config("worker_threads must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Number of worker threads to run the aggregation with
    #[must_use]
    pub fn effective_worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Capacity multiplier for a practice type
    ///
    /// Providers without a practice type get 1.0; a type with no configured
    /// multiplier yields `None`.
    #[must_use]
    pub fn practice_type_multiplier(&self, practice_type: Option<&str>) -> Option<f64> {
        match practice_type {
            Some(practice_type) => self
                .practice_type_multipliers
                .get(&practice_type.trim().to_ascii_lowercase())
                .copied(),
            None => Some(1.0),
        }
    }

    /// Whether a specialty string counts as cardiology
    #[must_use]
    pub fn accepts_specialty(&self, specialty: &str) -> bool {
        let specialty = specialty.trim();
        self.accepted_specialties
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(specialty))
    }
}

impl fmt::Display for UdiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "UDI Configuration:")?;
        writeln!(f, "  Default Weekly Capacity: {}", self.default_weekly_capacity)?;
        writeln!(f, "  Acceptable Travel Minutes: {}", self.acceptable_travel_minutes)?;
        writeln!(f, "  Max Travel Minutes: {}", self.max_travel_minutes)?;
        writeln!(f, "  Min Cell Size: {}", self.min_cell_size)?;
        writeln!(
            f,
            "  UDI Thresholds: overserved < {} <= adequate <= {} < desert",
            self.udi_overserved_threshold, self.udi_desert_threshold
        )?;
        for (practice_type, multiplier) in &self.practice_type_multipliers {
            writeln!(f, "  Multiplier ({practice_type}): {multiplier}")?;
        }
        writeln!(f, "  Travel Mode: {}", self.travel_mode)?;
        writeln!(f, "  Estimate Missing Edges: {}", self.estimate_missing_edges)?;
        writeln!(f, "  Confidence z: {}", self.confidence_z)?;
        writeln!(
            f,
            "  Tolerances: missing {} / invalid {}",
            self.missing_field_tolerance, self.invalid_row_tolerance
        )?;
        writeln!(f, "  Worker Threads: {}", self.effective_worker_threads())?;
        Ok(())
    }
}
