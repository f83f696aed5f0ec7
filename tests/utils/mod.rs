//! Shared fixtures for the integration tests

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use udi_engine::{Coordinates, DemandUnit, Provider, TravelEdge, UdiConfig};

/// Default configuration with progress bars off
#[must_use]
pub fn test_config() -> UdiConfig {
    UdiConfig {
        show_progress: false,
        ..UdiConfig::default()
    }
}

/// A located cardiology provider
#[must_use]
pub fn provider(id: &str) -> Provider {
    Provider::new(id, "Cardiology").with_zip("90001")
}

/// Write a CSV file from a header line and data lines
pub fn write_csv(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, lines.join("\n")).expect("failed to write CSV fixture");
    path
}

/// A Parquet column for fixtures
pub enum Column<'a> {
    Text(&'a str, Vec<Option<&'a str>>),
    Float(&'a str, Vec<Option<f64>>),
    Int(&'a str, Vec<Option<i64>>),
    Bool(&'a str, Vec<Option<bool>>),
}

/// Write a single-batch Parquet file
pub fn write_parquet(dir: &Path, name: &str, columns: Vec<Column<'_>>) -> PathBuf {
    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();
    for column in columns {
        match column {
            Column::Text(name, values) => {
                fields.push(Field::new(name, DataType::Utf8, true));
                arrays.push(Arc::new(StringArray::from(values)));
            }
            Column::Float(name, values) => {
                fields.push(Field::new(name, DataType::Float64, true));
                arrays.push(Arc::new(Float64Array::from(values)));
            }
            Column::Int(name, values) => {
                fields.push(Field::new(name, DataType::Int64, true));
                arrays.push(Arc::new(Int64Array::from(values)));
            }
            Column::Bool(name, values) => {
                fields.push(Field::new(name, DataType::Boolean, true));
                arrays.push(Arc::new(BooleanArray::from(values)));
            }
        }
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).expect("invalid fixture batch");
    let path = dir.join(name);
    let file = fs::File::create(&path).expect("failed to create Parquet fixture");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("failed to open writer");
    writer.write(&batch).expect("failed to write batch");
    writer.close().expect("failed to close writer");
    path
}

/// Random but reproducible inputs around Los Angeles
pub struct SyntheticInputs {
    pub providers: Vec<Provider>,
    pub demand: Vec<DemandUnit>,
    pub edges: Vec<TravelEdge>,
}

#[must_use]
pub fn synthetic_inputs(seed: u64, units: usize, providers: usize) -> SyntheticInputs {
    let mut rng = StdRng::seed_from_u64(seed);

    let provider_list: Vec<Provider> = (0..providers)
        .map(|i| {
            let mut p = Provider::new(format!("npi{i:05}"), "Cardiology").with_coordinates(
                Coordinates::new(rng.random_range(33.5..34.5), rng.random_range(-118.8..-117.8))
                    .expect("fixture coordinates in range"),
            );
            if rng.random_bool(0.3) {
                p = p.with_practice_type(["solo", "group", "hospital", "academic"][i % 4]);
            }
            if rng.random_bool(0.1) {
                p = p.with_capacity(rng.random_range(10.0..120.0));
            }
            p
        })
        .collect();

    let demand: Vec<DemandUnit> = (0..units)
        .map(|i| {
            DemandUnit::new(
                format!("{:05}", 90000 + i),
                rng.random_range(0..60_000),
                rng.random_range(0.0..0.15),
            )
            .with_centroid(
                Coordinates::new(rng.random_range(33.5..34.5), rng.random_range(-118.8..-117.8))
                    .expect("fixture coordinates in range"),
            )
        })
        .collect();

    let mut edges = Vec::new();
    for unit in &demand {
        for p in &provider_list {
            if rng.random_bool(0.25) {
                edges.push(TravelEdge::new(
                    unit.zip_code.clone(),
                    p.id.clone(),
                    rng.random_range(1.0..180.0),
                ));
            }
        }
    }

    SyntheticInputs {
        providers: provider_list,
        demand,
        edges,
    }
}
