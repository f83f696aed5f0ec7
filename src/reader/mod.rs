//! Loading input tables from Parquet or delimited text.
//!
//! A table path may be a single `.parquet` file, a directory of `.parquet`
//! part files, or a `.csv` / `.tsv` / `.txt` file. Whatever the source, the
//! result is a [`RawTable`]: the layout's columns as optional text values,
//! ready for row validation.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::{ProjectionMask, arrow_reader::ParquetRecordBatchReaderBuilder};
use rayon::prelude::*;

use crate::error::util::{safe_open_file, validate_directory};
use crate::error::{Result, UdiError};
use crate::models::TableKind;
use crate::schema::{TableSpec, check_arrow_schema};
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// Text values treated as absent
const NULL_MARKERS: &[&str] = &["", "na", "n/a", "null", "none", "nan"];

/// An input table with its columns read as text
#[derive(Debug, Clone)]
pub struct RawTable {
    spec: &'static TableSpec,
    /// One entry per layout column; `None` when an optional column is absent
    columns: Vec<Option<Vec<Option<String>>>>,
    rows: usize,
}

impl RawTable {
    /// Build a table from column vectors aligned with the layout's columns
    ///
    /// # Panics
    /// Panics if the number of columns does not match the layout, or if the
    /// columns have different lengths.
    #[must_use]
    pub fn from_columns(
        spec: &'static TableSpec,
        columns: Vec<Option<Vec<Option<String>>>>,
    ) -> Self {
        assert_eq!(columns.len(), spec.columns.len(), "column count must match the table layout");
        let rows = columns.iter().flatten().map(Vec::len).next().unwrap_or(0);
        assert!(
            columns.iter().flatten().all(|c| c.len() == rows),
            "all columns must have the same length"
        );
        Self {
            spec,
            columns,
            rows,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> TableKind {
        self.spec.kind
    }

    #[must_use]
    pub const fn num_rows(&self) -> usize {
        self.rows
    }

    /// Text value of a cell; `None` when absent, null or a null marker
    #[must_use]
    pub fn get(&self, column: &str, row: usize) -> Option<&str> {
        let idx = self.spec.column_index(column)?;
        let value = self.columns[idx].as_ref()?.get(row)?.as_deref()?.trim();
        (!is_null_marker(value)).then_some(value)
    }
}

fn is_null_marker(value: &str) -> bool {
    NULL_MARKERS.iter().any(|m| m.eq_ignore_ascii_case(value))
}

/// Read a table from a file or directory, dispatching on the path
pub fn read_table(path: &Path, spec: &'static TableSpec) -> Result<RawTable> {
    let start = Instant::now();
    log_operation_start(&format!("Reading {} table from", spec.kind), path);

    let table = if path.is_dir() {
        let batches = load_parquet_files_parallel(path, spec)?;
        batches_to_table(spec, &batches)?
    } else {
        match extension(path).as_deref() {
            Some("parquet") => {
                let batches = read_parquet(path, spec)?;
                batches_to_table(spec, &batches)?
            }
            Some("csv") => read_delimited(path, spec, b',')?,
            Some("tsv" | "txt") => read_delimited(path, spec, b'\t')?,
            other => {
                return Err(UdiError::schema(
                    spec.kind,
                    "*",
                    format!(
                        "unsupported input format {:?} for {}; expected .parquet, .csv, .tsv or .txt",
                        other.unwrap_or(""),
                        path.display()
                    ),
                ));
            }
        }
    };

    log_operation_complete("read", path, table.num_rows(), Some(start.elapsed()));
    Ok(table)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Read a parquet file into Arrow record batches, projected to the layout's columns
///
/// The file schema is checked before any data is decoded.
pub fn read_parquet(path: &Path, spec: &TableSpec) -> Result<Vec<RecordBatch>> {
    let file = safe_open_file(path, &format!("{} table", spec.kind))?;

    let reader_builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let issues = check_arrow_schema(spec, reader_builder.schema());
    if !issues.is_empty() {
        return Err(UdiError::Schema(issues));
    }

    let projection = create_projection(spec, reader_builder.schema(), reader_builder.parquet_schema());
    let reader = reader_builder.with_projection(projection).build()?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(batches)
}

/// Projection mask covering the layout columns present in the file
fn create_projection(
    spec: &TableSpec,
    file_schema: &Schema,
    parquet_schema: &parquet::schema::types::SchemaDescriptor,
) -> ProjectionMask {
    let projection = file_schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| spec.columns.iter().any(|c| c.matches(field.name())))
        .map(|(idx, _)| idx)
        .collect_vec();

    ProjectionMask::roots(parquet_schema, projection)
}

/// Find all Parquet files in a directory, sorted by file name
pub fn find_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    validate_directory(dir, "parquet part files")?;

    let parquet_files = std::fs::read_dir(dir)
        .map_err(|e| UdiError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()).map_err(|e| UdiError::io(dir, e)))
        .filter_ok(|path| path.is_file() && extension(path).as_deref() == Some("parquet"))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .sorted()
        .collect_vec();

    if parquet_files.is_empty() {
        log_warning("No Parquet files found in directory", Some(dir));
    }

    Ok(parquet_files)
}

/// Load all parquet files from a directory in parallel
///
/// Batches are returned in file-name order regardless of which file
/// finished loading first.
pub fn load_parquet_files_parallel(dir: &Path, spec: &TableSpec) -> Result<Vec<RecordBatch>> {
    let parquet_files = find_parquet_files(dir)?;

    let all_batches: Vec<Result<Vec<RecordBatch>>> = parquet_files
        .par_iter()
        .map(|path| read_parquet(path, spec))
        .collect();

    let mut combined_batches = Vec::new();
    for result in all_batches {
        combined_batches.extend(result?);
    }

    log::info!(
        "Loaded {} batches from {} Parquet files in {}",
        combined_batches.len(),
        parquet_files.len(),
        dir.display()
    );

    Ok(combined_batches)
}

/// Convert record batches into a text table aligned with the layout
pub fn batches_to_table(spec: &'static TableSpec, batches: &[RecordBatch]) -> Result<RawTable> {
    let present: Vec<bool> = match batches.first() {
        Some(batch) => {
            let schema = batch.schema();
            let headers: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
            spec.resolve(&headers)
                .map_err(UdiError::Schema)?
                .iter()
                .map(Option::is_some)
                .collect()
        }
        None => spec.columns.iter().map(|_| true).collect(),
    };

    let mut columns: Vec<Option<Vec<Option<String>>>> = present
        .iter()
        .map(|&p| p.then(Vec::new))
        .collect();

    for batch in batches {
        let schema = batch.schema();
        let headers: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        let resolved = spec.resolve(&headers).map_err(UdiError::Schema)?;

        for (col_idx, target) in columns.iter_mut().enumerate() {
            let Some(values) = target else { continue };
            match resolved[col_idx] {
                Some(batch_idx) => values.extend(column_as_text(batch.column(batch_idx))?),
                None => {
                    return Err(UdiError::schema(
                        spec.kind,
                        spec.columns[col_idx].name,
                        "column is present in some input files but not others",
                    ));
                }
            }
        }
    }

    Ok(RawTable::from_columns(spec, columns))
}

fn column_as_text(array: &arrow::array::ArrayRef) -> Result<Vec<Option<String>>> {
    let text = cast(array, &DataType::Utf8)?;
    let strings = text
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| UdiError::Computation("Utf8 cast did not produce a string array".to_string()))?;

    Ok((0..strings.len())
        .map(|i| (!strings.is_null(i)).then(|| strings.value(i).to_string()))
        .collect())
}

/// Read a delimited text file into a table
pub fn read_delimited(path: &Path, spec: &'static TableSpec, delimiter: u8) -> Result<RawTable> {
    let file: File = safe_open_file(path, &format!("{} table", spec.kind))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let resolved = spec.resolve(&headers).map_err(UdiError::Schema)?;

    let mut columns: Vec<Option<Vec<Option<String>>>> = resolved
        .iter()
        .map(|idx| idx.map(|_| Vec::new()))
        .collect();

    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        for (values, idx) in columns.iter_mut().zip(&resolved) {
            if let (Some(values), Some(idx)) = (values, idx) {
                values.push(record.get(*idx).map(str::to_string));
            }
        }
    }

    Ok(RawTable::from_columns(spec, columns))
}
