//! Travel-time index joining demand units to reachable providers.
//!
//! Explicit edges are reconciled into one list of [`Reach`]es per demand
//! unit. When estimation is enabled, pairs with no explicit edge are filled
//! in from great-circle distance, with candidates taken from a spatial grid
//! rather than from all pairs.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use smallvec::SmallVec;

use super::capacity::ProviderSet;
use crate::config::UdiConfig;
use crate::models::{Coordinates, DemandUnit, TravelEdge};

/// Minutes per mile by distance band, upper bound inclusive
const SPEED_BANDS: &[(f64, f64)] = &[(50.0, 1.71), (150.0, 1.09), (300.0, 0.92)];

/// Minutes per mile beyond the last band, before the rest-stop factor
const LONG_HAUL_MINUTES_PER_MILE: f64 = 1.0;

/// Extra time for stops on trips beyond the last band
const REST_STOP_FACTOR: f64 = 1.1;

/// Floor on any estimated trip
pub const MIN_ESTIMATED_MINUTES: f64 = 5.0;

/// Side of a spatial grid cell in degrees
pub const GRID_CELL_DEGREES: f64 = 0.5;

/// Miles per degree of latitude
const MILES_PER_DEGREE: f64 = 69.09;

/// Outermost grid row, at either pole
const MAX_ROW: i32 = (90.0 / GRID_CELL_DEGREES) as i32;

/// Outermost grid column, at either side of the antimeridian
const MAX_COL: i32 = (180.0 / GRID_CELL_DEGREES) as i32;

/// Estimated driving minutes for a great-circle distance
#[must_use]
pub fn estimate_travel_minutes(distance_miles: f64) -> f64 {
    let distance = distance_miles.max(0.0);
    let minutes = SPEED_BANDS
        .iter()
        .find(|(limit, _)| distance <= *limit)
        .map_or(distance * LONG_HAUL_MINUTES_PER_MILE * REST_STOP_FACTOR, |(_, per_mile)| {
            distance * per_mile
        });
    minutes.max(MIN_ESTIMATED_MINUTES)
}

/// Largest distance whose estimated travel time can be within `minutes`
///
/// Band speeds differ, so estimated time is not monotone in distance; each
/// band is checked on its own.
#[must_use]
pub fn reachable_radius_miles(minutes: f64) -> f64 {
    let mut lower = 0.0;
    let mut radius: f64 = 0.0;
    for &(upper, per_mile) in SPEED_BANDS {
        let distance = minutes / per_mile;
        if distance > lower {
            radius = radius.max(distance.min(upper));
        }
        lower = upper;
    }
    let long_haul = minutes / (LONG_HAUL_MINUTES_PER_MILE * REST_STOP_FACTOR);
    if long_haul > lower {
        radius = radius.max(long_haul);
    }
    radius
}

/// One provider reachable from a demand unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reach {
    /// Position in the [`ProviderSet`]
    pub provider: u32,
    pub minutes: f64,
    pub estimated: bool,
}

/// Counts from edge reconciliation and estimation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeStats {
    pub input_edges: usize,
    pub other_mode: usize,
    pub unknown_demand_unit: usize,
    pub unknown_provider: usize,
    pub duplicates: usize,
    pub beyond_max_minutes: usize,
    pub explicit_kept: usize,
    pub estimated: usize,
}

/// Grid of provider positions keyed by cell
#[derive(Debug, Clone, Default)]
pub struct SpatialGrid {
    cells: FxHashMap<(i32, i32), SmallVec<[u32; 8]>>,
}

impl SpatialGrid {
    fn cell_of(coordinates: &Coordinates) -> (i32, i32) {
        (
            (coordinates.latitude / GRID_CELL_DEGREES).floor() as i32,
            (coordinates.longitude / GRID_CELL_DEGREES).floor() as i32,
        )
    }

    /// Index every provider with a location
    #[must_use]
    pub fn from_providers(providers: &ProviderSet) -> Self {
        let mut cells: FxHashMap<(i32, i32), SmallVec<[u32; 8]>> = FxHashMap::default();
        for (position, provider) in providers.as_slice().iter().enumerate() {
            if let Some(location) = &provider.location {
                cells
                    .entry(Self::cell_of(location))
                    .or_default()
                    .push(position as u32);
            }
        }
        Self { cells }
    }

    /// Providers in the cells overlapping a box of `radius_miles` around `center`
    ///
    /// A superset of the providers within the radius; callers filter by
    /// exact distance.
    #[must_use]
    pub fn candidates(&self, center: &Coordinates, radius_miles: f64) -> Vec<u32> {
        let lat_span = radius_miles / MILES_PER_DEGREE;
        let poleward = (center.latitude.abs() + lat_span).min(89.0);
        let lon_span = radius_miles / (MILES_PER_DEGREE * poleward.to_radians().cos().max(0.01));

        // Spans past the whole globe collapse to it
        let lat_cells = (lat_span / GRID_CELL_DEGREES).ceil().min(f64::from(2 * MAX_ROW)) as i32;
        let lon_cells = (lon_span / GRID_CELL_DEGREES).ceil().min(f64::from(2 * MAX_COL)) as i32;
        let (row, col) = Self::cell_of(center);

        let rows = (row - lat_cells).max(-MAX_ROW)..=(row + lat_cells).min(MAX_ROW);
        let cols = (col - lon_cells).max(-MAX_COL)..=(col + lon_cells).min(MAX_COL);

        let mut found = Vec::new();
        for r in rows {
            for c in cols.clone() {
                if let Some(members) = self.cells.get(&(r, c)) {
                    found.extend_from_slice(members);
                }
            }
        }
        found.sort_unstable();
        found
    }
}

/// Reachable providers per demand unit
#[derive(Debug, Clone, Default)]
pub struct TravelIndex {
    units: FxHashMap<String, usize>,
    reaches: Vec<SmallVec<[Reach; 16]>>,
}

impl TravelIndex {
    /// Reconcile explicit edges against the known units and providers
    ///
    /// `units` must already be in output order; reach lists line up with it.
    #[must_use]
    pub fn build(
        edges: &[TravelEdge],
        units: &[DemandUnit],
        providers: &ProviderSet,
        config: &UdiConfig,
    ) -> (Self, EdgeStats) {
        let mut index = Self {
            units: units
                .iter()
                .enumerate()
                .map(|(i, unit)| (unit.zip_code.clone(), i))
                .collect(),
            reaches: vec![SmallVec::new(); units.len()],
        };
        let mut stats = EdgeStats {
            input_edges: edges.len(),
            ..EdgeStats::default()
        };

        for edge in edges {
            if !edge.mode.eq_ignore_ascii_case(&config.travel_mode) {
                stats.other_mode += 1;
                continue;
            }
            let Some(&unit) = index.units.get(&edge.zip_code) else {
                stats.unknown_demand_unit += 1;
                continue;
            };
            let Some(provider) = providers.position(&edge.provider_id) else {
                stats.unknown_provider += 1;
                continue;
            };

            let reaches = &mut index.reaches[unit];
            if let Some(existing) = reaches.iter_mut().find(|r| r.provider == provider) {
                stats.duplicates += 1;
                if edge.minutes < existing.minutes {
                    existing.minutes = edge.minutes;
                }
            } else {
                reaches.push(Reach {
                    provider,
                    minutes: edge.minutes,
                    estimated: false,
                });
            }
        }

        (index, stats)
    }

    /// Estimate pairs with no explicit edge, for units and providers with coordinates
    pub fn estimate_missing(
        &mut self,
        units: &[DemandUnit],
        providers: &ProviderSet,
        config: &UdiConfig,
        stats: &mut EdgeStats,
    ) {
        let grid = SpatialGrid::from_providers(providers);
        let radius = reachable_radius_miles(config.max_travel_minutes);
        log::info!("Estimating missing travel times within {radius:.1} miles");

        for (unit, reaches) in units.iter().zip(self.reaches.iter_mut()) {
            let Some(origin) = &unit.centroid else {
                continue;
            };
            let explicit: FxHashSet<u32> = reaches.iter().map(|r| r.provider).collect();

            for position in grid.candidates(origin, radius) {
                if explicit.contains(&position) {
                    continue;
                }
                let Some(location) = providers.get(position).and_then(|p| p.location) else {
                    continue;
                };
                let minutes = estimate_travel_minutes(origin.distance_miles(&location));
                if minutes <= config.max_travel_minutes {
                    reaches.push(Reach {
                        provider: position,
                        minutes,
                        estimated: true,
                    });
                    stats.estimated += 1;
                }
            }
        }
    }

    /// Drop reaches beyond the travel limit and fix the summation order
    pub fn finalize(&mut self, config: &UdiConfig, stats: &mut EdgeStats) {
        for reaches in &mut self.reaches {
            let before = reaches.len();
            reaches.retain(|r| r.minutes <= config.max_travel_minutes);
            let dropped = before - reaches.len();
            stats.beyond_max_minutes += dropped;
            reaches.sort_unstable_by_key(|r| r.provider);
            stats.explicit_kept += reaches.iter().filter(|r| !r.estimated).count();
        }
    }

    /// Reaches of the unit at `position` in the unit order given to [`Self::build`]
    #[must_use]
    pub fn reaches_at(&self, position: usize) -> &[Reach] {
        self.reaches
            .get(position)
            .map(SmallVec::as_slice)
            .unwrap_or_default()
    }

    /// Reaches of a unit by ZIP code
    #[must_use]
    pub fn reaches(&self, zip_code: &str) -> &[Reach] {
        self.units
            .get(zip_code)
            .map(|&position| self.reaches_at(position))
            .unwrap_or_default()
    }

    /// Number of demand units indexed
    #[must_use]
    pub fn len(&self) -> usize {
        self.reaches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reaches.is_empty()
    }
}
