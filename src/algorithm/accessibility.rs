//! Distance-decayed accessibility aggregation.
//!
//! Each demand unit's accessible capacity is the sum of its reachable
//! providers' capacities, weighted down once travel time passes the
//! acceptable threshold. Units are processed on a fixed-size rayon pool;
//! every unit only reads the shared provider set and travel index.

use rayon::prelude::*;
use serde::Serialize;

use super::capacity::ProviderSet;
use super::travel::{Reach, TravelIndex};
use crate::config::UdiConfig;
use crate::error::{Result, UdiError};
use crate::models::DemandUnit;
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar};

/// Weight of a provider `minutes` away
///
/// Full weight up to the acceptable threshold, then
/// `1 / (1 + excess / threshold)`; zero past the travel limit.
#[must_use]
pub fn decay_weight(minutes: f64, config: &UdiConfig) -> f64 {
    if minutes > config.max_travel_minutes {
        return 0.0;
    }
    let threshold = config.acceptable_travel_minutes;
    let excess = (minutes - threshold).max(0.0);
    1.0 / (1.0 + excess / threshold)
}

/// Accessibility of one demand unit
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct UnitAccess {
    pub accessible_capacity: f64,
    /// Providers with a non-zero weight
    pub reachable_providers: u32,
    pub nearest_provider_minutes: Option<f64>,
}

/// Sum the weighted capacity of a unit's reaches
///
/// Reaches are summed in the order given, so equal inputs always produce
/// bit-identical totals.
#[must_use]
pub fn unit_access(reaches: &[Reach], providers: &ProviderSet, config: &UdiConfig) -> UnitAccess {
    let mut access = UnitAccess::default();

    for reach in reaches {
        let weight = decay_weight(reach.minutes, config);
        if weight <= 0.0 {
            continue;
        }
        let Some(provider) = providers.get(reach.provider) else {
            continue;
        };

        access.accessible_capacity += weight * provider.capacity;
        access.reachable_providers += 1;
        access.nearest_provider_minutes = Some(
            access
                .nearest_provider_minutes
                .map_or(reach.minutes, |nearest| nearest.min(reach.minutes)),
        );
    }

    access
}

/// Compute accessibility for every unit, in unit order
///
/// Runs on a dedicated pool of `config.effective_worker_threads()` threads.
pub fn aggregate(
    units: &[DemandUnit],
    index: &TravelIndex,
    providers: &ProviderSet,
    config: &UdiConfig,
) -> Result<Vec<UnitAccess>> {
    if index.len() != units.len() {
        return Err(UdiError::Computation(format!(
            "travel index covers {} units but {} were given",
            index.len(),
            units.len()
        )));
    }

    let threads = config.effective_worker_threads();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("udi-worker-{i}"))
        .build()?;
    log::info!(
        "Aggregating accessibility for {} demand units on {threads} threads",
        units.len()
    );

    let pb = create_main_progress_bar(
        units.len() as u64,
        Some("Aggregating accessibility"),
        config.show_progress,
    );

    let access = pool.install(|| {
        (0..units.len())
            .into_par_iter()
            .map(|position| {
                let access = unit_access(index.reaches_at(position), providers, config);
                pb.inc(1);
                access
            })
            .collect::<Vec<_>>()
    });

    finish_progress_bar(&pb, Some("Aggregation complete"));
    Ok(access)
}
