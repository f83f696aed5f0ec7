//! Provider records

use serde::Serialize;

use super::Coordinates;

/// Whether a provider is currently practising
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeStatus {
    Active,
    Inactive,
}

impl PracticeStatus {
    /// Parse the status spellings found in provider rosters
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" | "a" | "1" | "true" | "yes" | "y" | "current" => Some(Self::Active),
            "inactive" | "i" | "0" | "false" | "no" | "n" | "deactivated" | "retired"
            | "closed" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// A cardiology provider as loaded from the provider table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provider {
    /// Unique provider identifier (usually the NPI)
    pub id: String,
    /// Specialty text or taxonomy code
    pub specialty: String,
    pub status: PracticeStatus,
    /// Practice type, lowercased (solo, group, hospital, ...)
    pub practice_type: Option<String>,
    /// Five-digit practice ZIP
    pub zip_code: Option<String>,
    pub coordinates: Option<Coordinates>,
    /// Explicit weekly capacity; always positive when present
    pub capacity_override: Option<f64>,
}

impl Provider {
    /// Create an active provider with only the required fields set
    #[must_use]
    pub fn new(id: impl Into<String>, specialty: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            specialty: specialty.into(),
            status: PracticeStatus::Active,
            practice_type: None,
            zip_code: None,
            coordinates: None,
            capacity_override: None,
        }
    }

    #[must_use]
    pub fn with_zip(mut self, zip: impl Into<String>) -> Self {
        self.zip_code = Some(zip.into());
        self
    }

    #[must_use]
    pub const fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    #[must_use]
    pub fn with_practice_type(mut self, practice_type: impl Into<String>) -> Self {
        self.practice_type = Some(practice_type.into().to_ascii_lowercase());
        self
    }

    #[must_use]
    pub const fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity_override = Some(capacity);
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: PracticeStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the provider has any location at all
    #[must_use]
    pub const fn has_location(&self) -> bool {
        self.coordinates.is_some() || self.zip_code.is_some()
    }
}
