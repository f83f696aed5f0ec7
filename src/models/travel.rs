//! Travel-time edges between demand units and providers

use serde::Serialize;

/// Travel mode assumed when the travel table has no mode column
pub const DEFAULT_TRAVEL_MODE: &str = "drive";

/// One origin ZIP → provider travel time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TravelEdge {
    /// Origin demand unit
    pub zip_code: String,
    /// Destination provider
    pub provider_id: String,
    /// Lowercased travel mode
    pub mode: String,
    /// Non-negative travel time in minutes
    pub minutes: f64,
    pub distance_miles: Option<f64>,
}

impl TravelEdge {
    /// Create a driving edge
    #[must_use]
    pub fn new(zip_code: impl Into<String>, provider_id: impl Into<String>, minutes: f64) -> Self {
        Self {
            zip_code: zip_code.into(),
            provider_id: provider_id.into(),
            mode: DEFAULT_TRAVEL_MODE.to_string(),
            minutes,
            distance_miles: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into().to_ascii_lowercase();
        self
    }
}
