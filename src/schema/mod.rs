//! Table layouts for the engine's inputs and output, and schema checks.
//!
//! Input columns are matched by name, case-insensitively, against a
//! canonical name or one of its aliases (the aliases cover the column
//! names used by the upstream NPPES/ACS extracts). Values of every
//! supported Arrow type are read as text and parsed row by row, so a
//! Parquet file and a CSV file with the same columns behave identically.

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};

use crate::models::TableKind;

/// A problem with the shape of an input table, detected before any row is read
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SchemaIssue {
    /// Table the issue was found in
    pub table: TableKind,
    /// Column the issue concerns
    pub column: String,
    /// Description of the incompatibility
    pub description: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} table, column '{}': {}",
            self.table, self.column, self.description
        )
    }
}

/// How a column's text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Number,
}

/// One expected input column
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    /// Canonical column name
    pub name: &'static str,
    /// Alternative spellings accepted in input files
    pub aliases: &'static [&'static str],
    pub kind: ColumnKind,
    pub required: bool,
}

impl ColumnSpec {
    const fn required(name: &'static str, aliases: &'static [&'static str], kind: ColumnKind) -> Self {
        Self {
            name,
            aliases,
            kind,
            required: true,
        }
    }

    const fn optional(name: &'static str, aliases: &'static [&'static str], kind: ColumnKind) -> Self {
        Self {
            name,
            aliases,
            kind,
            required: false,
        }
    }

    /// Whether a header names this column
    #[must_use]
    pub fn matches(&self, header: &str) -> bool {
        let header = header.trim();
        self.name.eq_ignore_ascii_case(header)
            || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(header))
    }
}

/// The expected layout of one input table
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub kind: TableKind,
    pub columns: &'static [ColumnSpec],
}

impl TableSpec {
    /// Position of a canonical column within this layout
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Map each layout column to the position of its header, if present
    ///
    /// Fails with one issue per missing required column.
    pub fn resolve<S: AsRef<str>>(&self, headers: &[S]) -> Result<Vec<Option<usize>>, Vec<SchemaIssue>> {
        let mut issues = Vec::new();
        let resolved = self
            .columns
            .iter()
            .map(|column| {
                let found = headers.iter().position(|h| column.matches(h.as_ref()));
                if found.is_none() && column.required {
                    issues.push(SchemaIssue {
                        table: self.kind,
                        column: column.name.to_string(),
                        description: if column.aliases.is_empty() {
                            "required column is missing".to_string()
                        } else {
                            format!(
                                "required column is missing (also accepted: {})",
                                column.aliases.join(", ")
                            )
                        },
                    });
                }
                found
            })
            .collect();

        if issues.is_empty() {
            Ok(resolved)
        } else {
            Err(issues)
        }
    }
}

/// Provider roster
pub const PROVIDER_TABLE: TableSpec = TableSpec {
    kind: TableKind::Providers,
    columns: &[
        ColumnSpec::required("provider_id", &["provider_npi", "npi"], ColumnKind::Text),
        ColumnSpec::required("specialty", &["taxonomy_code", "primary_taxonomy"], ColumnKind::Text),
        ColumnSpec::optional("status", &["practice_status"], ColumnKind::Text),
        ColumnSpec::optional("practice_type", &[], ColumnKind::Text),
        ColumnSpec::optional("zip_code", &["zip"], ColumnKind::Text),
        ColumnSpec::optional("latitude", &["lat"], ColumnKind::Number),
        ColumnSpec::optional("longitude", &["lon", "lng"], ColumnKind::Number),
        ColumnSpec::optional("weekly_capacity", &["capacity", "capacity_override"], ColumnKind::Number),
    ],
};

/// ZIP-level population and prevalence
pub const DEMAND_TABLE: TableSpec = TableSpec {
    kind: TableKind::Demand,
    columns: &[
        ColumnSpec::required("zip_code", &["zip", "zcta"], ColumnKind::Text),
        ColumnSpec::required("population", &["total_population"], ColumnKind::Number),
        ColumnSpec::required("prevalence", &["prevalence_rate"], ColumnKind::Number),
        ColumnSpec::optional("latitude", &["lat"], ColumnKind::Number),
        ColumnSpec::optional("longitude", &["lon", "lng"], ColumnKind::Number),
    ],
};

/// Origin ZIP to provider travel times
pub const TRAVEL_TABLE: TableSpec = TableSpec {
    kind: TableKind::Travel,
    columns: &[
        ColumnSpec::required("zip_code", &["origin_zip"], ColumnKind::Text),
        ColumnSpec::required("provider_id", &["provider_npi"], ColumnKind::Text),
        ColumnSpec::required(
            "travel_minutes",
            &["drive_minutes", "travel_time_minutes"],
            ColumnKind::Number,
        ),
        ColumnSpec::optional("mode", &["travel_mode"], ColumnKind::Text),
        ColumnSpec::optional("distance_miles", &["distance"], ColumnKind::Number),
    ],
};

/// ZIP centroids (Census gazetteer or plain zip/lat/lon layout)
pub const CENTROID_TABLE: TableSpec = TableSpec {
    kind: TableKind::Centroids,
    columns: &[
        ColumnSpec::required("zip_code", &["zcta5", "geoid", "zip"], ColumnKind::Text),
        ColumnSpec::required("latitude", &["intptlat", "lat"], ColumnKind::Number),
        ColumnSpec::required("longitude", &["intptlong", "lon", "lng"], ColumnKind::Number),
    ],
};

/// Whether values of an Arrow type can be read as text for a column
#[must_use]
pub fn type_supported(data_type: &DataType, kind: ColumnKind) -> bool {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => true,
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float16
        | DataType::Float32
        | DataType::Float64 => true,
        DataType::Boolean => kind == ColumnKind::Text,
        DataType::Dictionary(_, value_type) => type_supported(value_type, kind),
        // A NullType column is an all-null column, read as missing values
        DataType::Null => true,
        _ => false,
    }
}

/// Check an Arrow schema against a table layout, listing every problem
#[must_use]
pub fn check_arrow_schema(spec: &TableSpec, schema: &Schema) -> Vec<SchemaIssue> {
    let headers: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();

    let resolved = match spec.resolve(&headers) {
        Ok(resolved) => resolved,
        Err(issues) => return issues,
    };

    spec.columns
        .iter()
        .zip(resolved)
        .filter_map(|(column, idx)| {
            let field = schema.field(idx?);
            (!type_supported(field.data_type(), column.kind)).then(|| SchemaIssue {
                table: spec.kind,
                column: column.name.to_string(),
                description: format!(
                    "unsupported type {} in column '{}'",
                    field.data_type(),
                    field.name()
                ),
            })
        })
        .collect()
}

/// Arrow schema of the metrics table
#[must_use]
pub fn metrics_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("zip_code", DataType::Utf8, false),
        Field::new("estimated_patients", DataType::Float64, true),
        Field::new("accessible_capacity", DataType::Float64, false),
        Field::new("reachable_providers", DataType::UInt32, false),
        Field::new("nearest_provider_minutes", DataType::Float64, true),
        Field::new("udi", DataType::Float64, true),
        Field::new("udi_ci_low", DataType::Float64, true),
        Field::new("udi_ci_high", DataType::Float64, true),
        Field::new("category", DataType::Utf8, true),
        Field::new("status", DataType::Utf8, false),
        Field::new("critical_desert", DataType::Boolean, false),
        Field::new("annotation", DataType::Utf8, true),
    ]))
}
