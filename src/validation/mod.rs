//! Row-level validation of the input tables.
//!
//! Every row either becomes a domain record or is rejected with one or more
//! [`RowValidationError`]s. Rejections never stop the scan: all rows of a
//! table are examined, and only afterwards is the table's error rate
//! compared against the configured tolerances.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::config::UdiConfig;
use crate::error::{Result, UdiError};
use crate::models::{
    Coordinates, DemandUnit, PracticeStatus, Provider, TableKind, TravelEdge, normalize_zip,
};
use crate::models::travel::DEFAULT_TRAVEL_MODE;
use crate::reader::RawTable;

/// Why a row was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A required value is absent
    MissingField,
    /// A value could not be parsed as the expected type
    Unparseable,
    /// A value parsed but violates a range or format constraint
    OutOfRange,
    /// The record's identifier was already seen; the first row wins
    Duplicate,
    /// A provider has neither coordinates nor a ZIP code
    Unlocatable,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingField => "missing field",
            Self::Unparseable => "unparseable value",
            Self::OutOfRange => "out of range",
            Self::Duplicate => "duplicate record",
            Self::Unlocatable => "no usable location",
        })
    }
}

/// A single record violating a field constraint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowValidationError {
    pub table: TableKind,
    /// 1-based data row (header excluded)
    pub row: usize,
    /// Identifier of the record, when it could be read
    pub record_id: Option<String>,
    pub field: String,
    pub kind: IssueKind,
    pub message: String,
}

impl fmt::Display for RowValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row {}", self.table, self.row)?;
        if let Some(id) = &self.record_id {
            write!(f, " ({id})")?;
        }
        write!(f, ", {}: {} - {}", self.field, self.kind, self.message)
    }
}

/// Row counts for one table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStats {
    pub table: TableKind,
    pub rows_read: usize,
    pub rows_accepted: usize,
    /// Rows rejected because a required field was missing
    pub missing_field_rows: usize,
    /// Rows rejected for any other reason
    pub invalid_rows: usize,
    /// Valid rows left out on purpose, by reason
    pub skipped: BTreeMap<String, usize>,
}

impl TableStats {
    fn new(table: TableKind, rows_read: usize) -> Self {
        Self {
            table,
            rows_read,
            rows_accepted: 0,
            missing_field_rows: 0,
            invalid_rows: 0,
            skipped: BTreeMap::new(),
        }
    }

    fn skip(&mut self, reason: &str) {
        *self.skipped.entry(reason.to_string()).or_insert(0) += 1;
    }

    fn rate(&self, count: usize) -> f64 {
        if self.rows_read == 0 {
            0.0
        } else {
            count as f64 / self.rows_read as f64
        }
    }

    /// Share of rows missing a required field
    #[must_use]
    pub fn missing_rate(&self) -> f64 {
        self.rate(self.missing_field_rows)
    }

    /// Share of rows rejected for other reasons
    #[must_use]
    pub fn invalid_rate(&self) -> f64 {
        self.rate(self.invalid_rows)
    }

    /// Fail when either error rate is above its tolerance
    pub fn check_tolerance(&self, config: &UdiConfig) -> Result<()> {
        let checks = [
            (
                "missing required field",
                self.missing_field_rows,
                config.missing_field_tolerance,
            ),
            ("invalid row", self.invalid_rows, config.invalid_row_tolerance),
        ];

        for (kind, count, tolerance) in checks {
            let rate = self.rate(count);
            if rate > tolerance {
                return Err(UdiError::ToleranceExceeded {
                    table: self.table,
                    kind,
                    count,
                    rows: self.rows_read,
                    rate,
                    tolerance,
                });
            }
        }
        Ok(())
    }
}

/// Records accepted from one table, with everything that was rejected
#[derive(Debug, Clone)]
pub struct Validated<T> {
    pub records: Vec<T>,
    pub stats: TableStats,
    pub issues: Vec<RowValidationError>,
}

impl<T> Validated<T> {
    fn new(table: TableKind, rows_read: usize) -> Self {
        Self {
            records: Vec::new(),
            stats: TableStats::new(table, rows_read),
            issues: Vec::new(),
        }
    }

    /// Record the outcome of parsing one row
    fn push_row(&mut self, record: Option<T>, issues: Vec<RowValidationError>) {
        if issues.is_empty() {
            if let Some(record) = record {
                self.records.push(record);
                self.stats.rows_accepted += 1;
            }
            return;
        }

        if issues.iter().any(|i| i.kind == IssueKind::MissingField) {
            self.stats.missing_field_rows += 1;
        } else {
            self.stats.invalid_rows += 1;
        }
        self.issues.extend(issues);
    }

    fn log_summary(&self) {
        let stats = &self.stats;
        log::info!(
            "Validated {} table: {} of {} rows accepted ({} missing fields, {} invalid)",
            stats.table,
            stats.rows_accepted,
            stats.rows_read,
            stats.missing_field_rows,
            stats.invalid_rows
        );
        for (reason, count) in &stats.skipped {
            log::info!("  skipped {count} {} rows: {reason}", stats.table);
        }
        for issue in self.issues.iter().take(5) {
            log::warn!("{issue}");
        }
        if self.issues.len() > 5 {
            log::warn!("... and {} more {} row issues", self.issues.len() - 5, stats.table);
        }
    }
}

/// Reads typed values out of one row, collecting issues as it goes
struct RowParser<'a> {
    table: &'a RawTable,
    row: usize,
    record_id: Option<String>,
    issues: Vec<RowValidationError>,
}

impl<'a> RowParser<'a> {
    const fn new(table: &'a RawTable, row: usize) -> Self {
        Self {
            table,
            row,
            record_id: None,
            issues: Vec::new(),
        }
    }

    fn issue(&mut self, field: &str, kind: IssueKind, message: impl Into<String>) {
        self.issues.push(RowValidationError {
            table: self.table.kind(),
            row: self.row + 1,
            record_id: self.record_id.clone(),
            field: field.to_string(),
            kind,
            message: message.into(),
        });
    }

    fn optional_text(&self, field: &str) -> Option<&'a str> {
        self.table.get(field, self.row)
    }

    fn required_text(&mut self, field: &str) -> Option<&'a str> {
        let value = self.optional_text(field);
        if value.is_none() {
            self.issue(field, IssueKind::MissingField, "required value is missing");
        }
        value
    }

    fn parse_number(&mut self, field: &str, raw: &str) -> Option<f64> {
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                self.issue(field, IssueKind::Unparseable, format!("'{raw}' is not a number"));
                None
            }
        }
    }

    fn optional_number(&mut self, field: &str) -> Option<f64> {
        let raw = self.optional_text(field)?;
        self.parse_number(field, raw)
    }

    fn required_number(&mut self, field: &str) -> Option<f64> {
        let raw = self.required_text(field)?;
        self.parse_number(field, raw)
    }

    fn required_count(&mut self, field: &str) -> Option<u64> {
        let raw = self.required_text(field)?;
        if let Ok(value) = raw.parse::<i64>() {
            return self.non_negative_count(field, value as f64);
        }
        let value = self.parse_number(field, raw)?;
        if value.fract() != 0.0 {
            self.issue(field, IssueKind::Unparseable, format!("'{raw}' is not a whole number"));
            return None;
        }
        self.non_negative_count(field, value)
    }

    fn non_negative_count(&mut self, field: &str, value: f64) -> Option<u64> {
        if value < 0.0 {
            self.issue(field, IssueKind::OutOfRange, format!("{value} is negative"));
            None
        } else {
            Some(value as u64)
        }
    }

    fn zip(&mut self, field: &str, required: bool) -> Option<String> {
        let raw = if required {
            self.required_text(field)?
        } else {
            self.optional_text(field)?
        };
        let zip = normalize_zip(raw);
        if zip.is_none() {
            self.issue(field, IssueKind::OutOfRange, format!("'{raw}' is not a valid ZIP code"));
        }
        zip
    }

    fn coordinates(&mut self, required: bool) -> Option<Coordinates> {
        let (latitude, longitude) = if required {
            (self.required_number("latitude"), self.required_number("longitude"))
        } else {
            (self.optional_number("latitude"), self.optional_number("longitude"))
        };

        match (latitude, longitude) {
            (Some(lat), Some(lon)) => {
                let coordinates = Coordinates::new(lat, lon);
                if coordinates.is_none() {
                    self.issue(
                        "latitude",
                        IssueKind::OutOfRange,
                        format!("({lat}, {lon}) is not a valid coordinate pair"),
                    );
                }
                coordinates
            }
            (Some(_), None) if self.optional_text("longitude").is_none() => {
                self.issue("longitude", IssueKind::OutOfRange, "latitude given without longitude");
                None
            }
            (None, Some(_)) if self.optional_text("latitude").is_none() => {
                self.issue("latitude", IssueKind::OutOfRange, "longitude given without latitude");
                None
            }
            _ => None,
        }
    }

    fn finish(self) -> Vec<RowValidationError> {
        self.issues
    }
}

/// Validate the provider table
///
/// Inactive providers and providers outside the accepted specialties are
/// valid rows that are skipped, not errors.
#[must_use]
pub fn validate_providers(table: &RawTable, config: &UdiConfig) -> Validated<Provider> {
    let mut validated = Validated::new(TableKind::Providers, table.num_rows());
    let mut seen = FxHashSet::default();

    for row in 0..table.num_rows() {
        let mut parser = RowParser::new(table, row);

        let id = parser.required_text("provider_id").map(str::to_string);
        parser.record_id.clone_from(&id);
        let specialty = parser.required_text("specialty").map(str::to_string);

        let status = match parser.optional_text("status") {
            None => Some(PracticeStatus::Active),
            Some(raw) => {
                let status = PracticeStatus::parse(raw);
                if status.is_none() {
                    parser.issue("status", IssueKind::Unparseable, format!("unknown practice status '{raw}'"));
                }
                status
            }
        };

        let practice_type = parser
            .optional_text("practice_type")
            .map(|s| s.to_ascii_lowercase());
        let zip_code = parser.zip("zip_code", false);
        let coordinates = parser.coordinates(false);

        let capacity_override = parser.optional_number("weekly_capacity");
        if let Some(capacity) = capacity_override {
            if capacity <= 0.0 {
                parser.issue(
                    "weekly_capacity",
                    IssueKind::OutOfRange,
                    format!("capacity override must be positive, got {capacity}"),
                );
            }
        }

        let record = match (id, specialty, status) {
            (Some(id), Some(specialty), Some(status)) => Some(Provider {
                id,
                specialty,
                status,
                practice_type,
                zip_code,
                coordinates,
                capacity_override,
            }),
            _ => None,
        };

        if let Some(provider) = &record {
            if parser.issues.is_empty() && !provider.has_location() {
                parser.issue(
                    "zip_code",
                    IssueKind::Unlocatable,
                    "provider has neither coordinates nor a ZIP code",
                );
            }
            if parser.issues.is_empty() && !seen.insert(provider.id.clone()) {
                parser.issue("provider_id", IssueKind::Duplicate, "provider id already seen");
            }
        }

        let issues = parser.finish();
        match record {
            Some(provider) if issues.is_empty() && provider.status == PracticeStatus::Inactive => {
                validated.stats.skip("inactive");
            }
            Some(provider) if issues.is_empty() && !config.accepts_specialty(&provider.specialty) => {
                validated.stats.skip("specialty not cardiology");
            }
            record => validated.push_row(record, issues),
        }
    }

    validated.log_summary();
    validated
}

/// Validate the demand table
#[must_use]
pub fn validate_demand(table: &RawTable) -> Validated<DemandUnit> {
    let mut validated = Validated::new(TableKind::Demand, table.num_rows());
    let mut seen = FxHashSet::default();

    for row in 0..table.num_rows() {
        let mut parser = RowParser::new(table, row);

        let zip_code = parser.zip("zip_code", true);
        parser.record_id.clone_from(&zip_code);
        let population = parser.required_count("population");

        let prevalence = parser.required_number("prevalence");
        if let Some(p) = prevalence {
            if !(0.0..=1.0).contains(&p) {
                parser.issue("prevalence", IssueKind::OutOfRange, format!("{p} is outside [0, 1]"));
            }
        }

        let centroid = parser.coordinates(false);

        let record = match (zip_code, population, prevalence) {
            (Some(zip_code), Some(population), Some(prevalence)) => Some(DemandUnit {
                zip_code,
                population,
                prevalence,
                centroid,
            }),
            _ => None,
        };

        if let Some(unit) = &record {
            if parser.issues.is_empty() && !seen.insert(unit.zip_code.clone()) {
                parser.issue("zip_code", IssueKind::Duplicate, "ZIP code already seen");
            }
        }

        let issues = parser.finish();
        validated.push_row(record, issues);
    }

    validated.log_summary();
    validated
}

/// Validate the travel table
///
/// Duplicate pairs are not rejected here; the travel index keeps the
/// fastest edge per pair.
#[must_use]
pub fn validate_travel(table: &RawTable) -> Validated<TravelEdge> {
    let mut validated = Validated::new(TableKind::Travel, table.num_rows());

    for row in 0..table.num_rows() {
        let mut parser = RowParser::new(table, row);

        let zip_code = parser.zip("zip_code", true);
        let provider_id = parser.required_text("provider_id").map(str::to_string);
        if let (Some(zip), Some(provider)) = (&zip_code, &provider_id) {
            parser.record_id = Some(format!("{zip}->{provider}"));
        }

        let minutes = parser.required_number("travel_minutes");
        if let Some(m) = minutes {
            if m < 0.0 {
                parser.issue("travel_minutes", IssueKind::OutOfRange, format!("travel time {m} is negative"));
            }
        }

        let mode = parser
            .optional_text("mode")
            .map_or_else(|| DEFAULT_TRAVEL_MODE.to_string(), str::to_ascii_lowercase);

        let distance_miles = parser.optional_number("distance_miles");
        if let Some(d) = distance_miles {
            if d < 0.0 {
                parser.issue("distance_miles", IssueKind::OutOfRange, format!("distance {d} is negative"));
            }
        }

        let record = match (zip_code, provider_id, minutes) {
            (Some(zip_code), Some(provider_id), Some(minutes)) => Some(TravelEdge {
                zip_code,
                provider_id,
                mode,
                minutes,
                distance_miles,
            }),
            _ => None,
        };

        let issues = parser.finish();
        validated.push_row(record, issues);
    }

    validated.log_summary();
    validated
}

/// Validate the optional ZIP centroid table
#[must_use]
pub fn validate_centroids(table: &RawTable) -> Validated<(String, Coordinates)> {
    let mut validated = Validated::new(TableKind::Centroids, table.num_rows());
    let mut seen = FxHashSet::default();

    for row in 0..table.num_rows() {
        let mut parser = RowParser::new(table, row);

        let zip_code = parser.zip("zip_code", true);
        parser.record_id.clone_from(&zip_code);
        let coordinates = parser.coordinates(true);

        let record = zip_code.zip(coordinates);
        if let Some((zip, _)) = &record {
            if parser.issues.is_empty() && !seen.insert(zip.clone()) {
                parser.issue("zip_code", IssueKind::Duplicate, "ZIP code already seen");
            }
        }

        let issues = parser.finish();
        validated.push_row(record, issues);
    }

    validated.log_summary();
    validated
}

/// Statistics and issues of every table read in a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub tables: Vec<TableStats>,
    pub issues: Vec<RowValidationError>,
}

impl ValidationReport {
    /// Fold one table's outcome into the report
    pub fn absorb<T>(&mut self, validated: &Validated<T>) {
        self.tables.push(validated.stats.clone());
        self.issues.extend(validated.issues.iter().cloned());
    }

    /// Check every table against the tolerances, failing on the first breach
    pub fn check_tolerances(&self, config: &UdiConfig) -> Result<()> {
        self.tables.iter().try_for_each(|stats| stats.check_tolerance(config))
    }

    /// Stats for one table, if it was read
    #[must_use]
    pub fn table(&self, kind: TableKind) -> Option<&TableStats> {
        self.tables.iter().find(|t| t.table == kind)
    }
}
