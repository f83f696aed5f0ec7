//! Demand units (ZIP codes)

use serde::Serialize;

use super::Coordinates;

/// Population and prevalence for one ZIP code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandUnit {
    /// Five-digit ZIP, unique per run
    pub zip_code: String,
    pub population: u64,
    /// Fraction of the population with the target condition, in [0, 1]
    pub prevalence: f64,
    /// ZIP centroid, when known
    pub centroid: Option<Coordinates>,
}

impl DemandUnit {
    #[must_use]
    pub fn new(zip_code: impl Into<String>, population: u64, prevalence: f64) -> Self {
        Self {
            zip_code: zip_code.into(),
            population,
            prevalence,
            centroid: None,
        }
    }

    #[must_use]
    pub const fn with_centroid(mut self, centroid: Coordinates) -> Self {
        self.centroid = Some(centroid);
        self
    }

    /// Estimated number of patients: population × prevalence
    #[must_use]
    pub fn estimated_patients(&self) -> f64 {
        self.population as f64 * self.prevalence
    }
}
