//! Provider capacity model and provider geocoding.
//!
//! Turns validated provider records into [`RatedProvider`]s: one effective
//! weekly capacity and one resolved location each, sorted by provider id so
//! every later stage visits providers in the same order.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::config::UdiConfig;
use crate::models::{Coordinates, DemandUnit, PracticeStatus, Provider};

/// Why a provider could not be given a capacity
#[derive(Debug, Clone, PartialEq)]
pub enum CapacityError {
    /// Neither coordinates nor a ZIP code
    NoLocation { provider_id: String },
    /// The computed capacity was not strictly positive
    NonPositive { provider_id: String, capacity: f64 },
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLocation { provider_id } => {
                write!(f, "provider {provider_id} has neither coordinates nor a ZIP code")
            }
            Self::NonPositive {
                provider_id,
                capacity,
            } => write!(f, "provider {provider_id} has non-positive capacity {capacity}"),
        }
    }
}

impl std::error::Error for CapacityError {}

/// Effective weekly patient capacity of one provider
///
/// A positive explicit capacity is used as is. Anything else falls back to
/// `default_weekly_capacity` times the practice-type multiplier, with 1.0
/// for practice types that have no configured multiplier.
pub fn effective_capacity(provider: &Provider, config: &UdiConfig) -> Result<f64, CapacityError> {
    if !provider.has_location() {
        return Err(CapacityError::NoLocation {
            provider_id: provider.id.clone(),
        });
    }

    let capacity = match provider.capacity_override {
        Some(explicit) if explicit > 0.0 => explicit,
        _ => {
            let multiplier = config
                .practice_type_multiplier(provider.practice_type.as_deref())
                .unwrap_or(1.0);
            config.default_weekly_capacity * multiplier
        }
    };

    if capacity.is_finite() && capacity > 0.0 {
        Ok(capacity)
    } else {
        Err(CapacityError::NonPositive {
            provider_id: provider.id.clone(),
            capacity,
        })
    }
}

/// ZIP code to centroid lookup
///
/// Demand-unit coordinates take precedence over the centroid table.
#[derive(Debug, Clone, Default)]
pub struct CentroidLookup {
    centroids: FxHashMap<String, Coordinates>,
}

impl CentroidLookup {
    #[must_use]
    pub fn new(demand: &[DemandUnit], centroids: &[(String, Coordinates)]) -> Self {
        let mut lookup = FxHashMap::default();
        for unit in demand {
            if let Some(centroid) = unit.centroid {
                lookup.entry(unit.zip_code.clone()).or_insert(centroid);
            }
        }
        for (zip, centroid) in centroids {
            lookup.entry(zip.clone()).or_insert(*centroid);
        }
        Self { centroids: lookup }
    }

    #[must_use]
    pub fn resolve(&self, zip: &str) -> Option<Coordinates> {
        self.centroids.get(zip).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }
}

/// A provider ready for aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedProvider {
    pub id: String,
    pub capacity: f64,
    pub zip_code: Option<String>,
    /// Own coordinates, or the centroid of the provider's ZIP
    pub location: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Excluded: no location at all
    Unlocatable,
    /// Excluded: capacity could not be made positive
    NonPositiveCapacity,
    /// Kept, but only explicit travel edges can reach it
    NotGeocoded,
}

/// A provider-level note kept for the run report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDiagnostic {
    pub provider_id: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Providers eligible for aggregation, sorted by id
#[derive(Debug, Clone, Default)]
pub struct ProviderSet {
    providers: Vec<RatedProvider>,
    index: FxHashMap<String, u32>,
    pub diagnostics: Vec<ProviderDiagnostic>,
    /// Practice types without a configured multiplier, with provider counts
    pub unknown_practice_types: BTreeMap<String, usize>,
    /// Providers left out for being inactive, non-cardiology or duplicated
    pub skipped: usize,
}

impl ProviderSet {
    /// Rate and geocode every eligible provider
    #[must_use]
    pub fn build(providers: &[Provider], lookup: &CentroidLookup, config: &UdiConfig) -> Self {
        let mut ordered: Vec<&Provider> = providers.iter().collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));

        let mut set = Self::default();
        let mut seen = FxHashSet::default();

        for provider in ordered {
            if provider.status == PracticeStatus::Inactive
                || !config.accepts_specialty(&provider.specialty)
                || !seen.insert(provider.id.as_str())
            {
                set.skipped += 1;
                continue;
            }

            if let Some(practice_type) = &provider.practice_type {
                if config.practice_type_multiplier(Some(practice_type)).is_none() {
                    *set
                        .unknown_practice_types
                        .entry(practice_type.to_ascii_lowercase())
                        .or_insert(0) += 1;
                }
            }

            let capacity = match effective_capacity(provider, config) {
                Ok(capacity) => capacity,
                Err(err) => {
                    let kind = match err {
                        CapacityError::NoLocation { .. } => DiagnosticKind::Unlocatable,
                        CapacityError::NonPositive { .. } => DiagnosticKind::NonPositiveCapacity,
                    };
                    log::warn!("Excluding provider: {err}");
                    set.diagnostics.push(ProviderDiagnostic {
                        provider_id: provider.id.clone(),
                        kind,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            let location = provider.coordinates.or_else(|| {
                provider
                    .zip_code
                    .as_deref()
                    .and_then(|zip| lookup.resolve(zip))
            });
            if location.is_none() {
                set.diagnostics.push(ProviderDiagnostic {
                    provider_id: provider.id.clone(),
                    kind: DiagnosticKind::NotGeocoded,
                    message: format!(
                        "no centroid for ZIP {}; reachable through explicit travel edges only",
                        provider.zip_code.as_deref().unwrap_or("?")
                    ),
                });
            }

            set.index.insert(provider.id.clone(), set.providers.len() as u32);
            set.providers.push(RatedProvider {
                id: provider.id.clone(),
                capacity,
                zip_code: provider.zip_code.clone(),
                location,
            });
        }

        for (practice_type, count) in &set.unknown_practice_types {
            log::warn!(
                "No capacity multiplier for practice type '{practice_type}' ({count} providers); using 1.0"
            );
        }
        log::info!(
            "Rated {} providers ({} skipped, {} excluded)",
            set.providers.len(),
            set.skipped,
            set.excluded()
        );

        set
    }

    /// Look up a provider's position by id
    #[must_use]
    pub fn position(&self, id: &str) -> Option<u32> {
        self.index.get(id).copied()
    }

    #[must_use]
    pub fn get(&self, position: u32) -> Option<&RatedProvider> {
        self.providers.get(position as usize)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[RatedProvider] {
        &self.providers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Number of providers excluded from aggregation
    #[must_use]
    pub fn excluded(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.kind != DiagnosticKind::NotGeocoded)
            .count()
    }
}
