//! Geographic helpers: coordinates and ZIP code normalisation

use serde::Serialize;

/// Mean Earth radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// A WGS84 latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Create a coordinate pair, rejecting values outside the valid ranges
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance in miles (haversine)
    #[must_use]
    pub fn distance_miles(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_MILES * c
    }
}

/// Normalise a ZIP code to its five-digit form
///
/// Accepts `94102`, `94102-1234`, `941021234` and numeric values that lost
/// their leading zeros (`2134` becomes `02134`). Returns `None` for
/// anything that is not a US ZIP.
#[must_use]
pub fn normalize_zip(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    // Numeric columns come through as "2134.0" when the source was a float
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);

    let base = match trimmed.split_once('-') {
        Some((base, plus4)) if plus4.len() == 4 && plus4.bytes().all(|b| b.is_ascii_digit()) => {
            base
        }
        Some(_) => return None,
        None if trimmed.len() == 9 && trimmed.bytes().all(|b| b.is_ascii_digit()) => {
            &trimmed[..5]
        }
        None => trimmed,
    };

    if base.is_empty() || base.len() > 5 || !base.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(format!("{base:0>5}"))
}
