//! Writing the metrics table and the run report.
//!
//! Every output goes to a hidden temporary file beside the target and is
//! renamed over it only once fully written and synced, so a failed run
//! never leaves a partial table behind.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::record_batch::RecordBatch;
use arrow_schema::FieldRef;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::util::safe_open_file;
use crate::error::{Result, UdiError};
use crate::models::{AccessibilityMetric, MetricRow};
use crate::pipeline::RunReport;
use crate::schema::metrics_schema;
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// File format of the metrics table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Parquet,
    Csv,
}

impl OutputFormat {
    /// Pick the format from a path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("parquet") => Ok(Self::Parquet),
            Some("csv") => Ok(Self::Csv),
            _ => Err(UdiError::Config(format!(
                "output {} must end in .parquet or .csv",
                path.display()
            ))),
        }
    }
}

/// Hidden sibling path used while writing `path`
fn temporary_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "output".to_string(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}

/// A fully written temporary file waiting to be moved over its target
#[derive(Debug)]
struct Staged {
    temporary: PathBuf,
    target: PathBuf,
}

impl Staged {
    /// Move the temporary file over the target
    fn commit(self) -> Result<()> {
        fs::rename(&self.temporary, &self.target).map_err(|e| {
            let _ = fs::remove_file(&self.temporary);
            UdiError::io(&self.target, e)
        })
    }

    fn discard(self) {
        let _ = fs::remove_file(&self.temporary);
    }
}

/// Write through `write` into a synced temporary file beside `path`
fn stage<F>(path: &Path, write: F) -> Result<Staged>
where
    F: FnOnce(File) -> Result<File>,
{
    let temporary = temporary_path(path);
    let file = File::create(&temporary).map_err(|e| UdiError::io(&temporary, e))?;

    let written = write(file)
        .and_then(|file| file.sync_all().map_err(|e| UdiError::io(&temporary, e)));

    match written {
        Ok(()) => Ok(Staged {
            temporary,
            target: path.to_path_buf(),
        }),
        Err(err) => {
            let _ = fs::remove_file(&temporary);
            Err(err)
        }
    }
}

/// Flatten metrics into a record batch with the metrics schema
pub fn metrics_to_record_batch(metrics: &[AccessibilityMetric]) -> Result<RecordBatch> {
    let rows: Vec<MetricRow> = metrics.iter().map(MetricRow::from).collect();
    let fields: Vec<FieldRef> = metrics_schema().fields().iter().cloned().collect();
    Ok(serde_arrow::to_record_batch(&fields, &rows)?)
}

fn stage_metrics(path: &Path, metrics: &[AccessibilityMetric]) -> Result<Staged> {
    match OutputFormat::from_path(path)? {
        OutputFormat::Parquet => {
            let batch = metrics_to_record_batch(metrics)?;
            stage(path, |file| {
                let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
                writer.write(&batch)?;
                Ok(writer.into_inner()?)
            })
        }
        OutputFormat::Csv => stage(path, |file| {
            let mut writer = csv::Writer::from_writer(file);
            if metrics.is_empty() {
                writer.write_record(metrics_schema().fields().iter().map(|f| f.name()))?;
            }
            for metric in metrics {
                writer.serialize(MetricRow::from(metric))?;
            }
            writer
                .into_inner()
                .map_err(|e| UdiError::io(path, e.into_error()))
        }),
    }
}

fn stage_report(path: &Path, report: &RunReport) -> Result<Staged> {
    stage(path, |file| {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer
            .into_inner()
            .map_err(|e| UdiError::io(path, e.into_error()))
    })
}

/// Write the metrics table, as Parquet or CSV by extension, and optionally
/// the run report as pretty-printed JSON
///
/// Both files are fully written before either replaces its target, so a
/// failure in one leaves both targets untouched.
pub fn write_outputs(
    metrics_path: &Path,
    metrics: &[AccessibilityMetric],
    report: Option<(&Path, &RunReport)>,
) -> Result<()> {
    let start = Instant::now();
    log_operation_start("Writing metrics to", metrics_path);

    let staged_metrics = stage_metrics(metrics_path, metrics)?;
    let staged_report = match report.map(|(path, report)| stage_report(path, report)).transpose() {
        Ok(staged) => staged,
        Err(err) => {
            staged_metrics.discard();
            return Err(err);
        }
    };

    if let Err(err) = staged_metrics.commit() {
        if let Some(staged) = staged_report {
            staged.discard();
        }
        return Err(err);
    }
    log_operation_complete("wrote", metrics_path, metrics.len(), Some(start.elapsed()));

    if let Some(staged) = staged_report {
        let path = staged.target.clone();
        staged.commit()?;
        log::info!("Wrote run report to {}", path.display());
    }
    Ok(())
}

/// Read a metrics table written by [`write_outputs`]
pub fn read_metrics(path: &Path) -> Result<Vec<MetricRow>> {
    let file = safe_open_file(path, "metrics table")?;

    match OutputFormat::from_path(path)? {
        OutputFormat::Parquet => {
            let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
            let mut rows = Vec::new();
            for batch in reader {
                let batch = batch?;
                rows.extend(serde_arrow::from_record_batch::<Vec<MetricRow>>(&batch)?);
            }
            Ok(rows)
        }
        OutputFormat::Csv => csv::Reader::from_reader(file)
            .deserialize()
            .collect::<std::result::Result<Vec<MetricRow>, _>>()
            .map_err(UdiError::from),
    }
}
