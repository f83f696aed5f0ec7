use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use udi_engine::algorithm::RunSummary;
use udi_engine::{InputPaths, UdiConfig, run_pipeline_async, write_outputs};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

/// Compute the Unmet-Demand-Index for every ZIP code in a demand table
#[derive(Debug, Parser)]
#[command(name = "udi-engine", version, about)]
struct Cli {
    /// Provider roster (.parquet, directory of .parquet, .csv or .tsv)
    #[arg(long)]
    providers: PathBuf,

    /// ZIP-level population and prevalence
    #[arg(long)]
    demand: PathBuf,

    /// ZIP to provider travel times
    #[arg(long)]
    travel: PathBuf,

    /// Optional ZIP centroid table used to geocode providers
    #[arg(long)]
    centroids: Option<PathBuf>,

    /// Metrics table to write (.parquet or .csv)
    #[arg(long)]
    output: PathBuf,

    /// Optional JSON run report
    #[arg(long)]
    report: Option<PathBuf>,

    /// TOML file overriding configuration defaults
    #[arg(long, env = "UDI_CONFIG")]
    config: Option<PathBuf>,

    /// Worker threads for aggregation
    #[arg(long)]
    threads: Option<usize>,

    /// Estimate travel times for pairs missing from the travel table
    #[arg(long)]
    estimate_missing: bool,

    /// Hide progress bars
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn load_config(&self) -> Result<UdiConfig> {
        let mut config = match &self.config {
            Some(path) => UdiConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => UdiConfig::default(),
        };

        if self.threads.is_some() {
            config.worker_threads = self.threads;
        }
        if self.estimate_missing {
            config.estimate_missing_edges = true;
        }
        if self.quiet {
            config.show_progress = false;
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn input_paths(&self) -> InputPaths {
        InputPaths {
            providers: self.providers.clone(),
            demand: self.demand.clone(),
            travel: self.travel.clone(),
            centroids: self.centroids.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.load_config()?;
    info!("{config}");

    let start = Instant::now();
    let output = run_pipeline_async(&cli.input_paths(), &config)
        .await
        .context("UDI computation failed")?;

    let report = cli.report.as_deref().map(|path| (path, &output.report));
    write_outputs(&cli.output, &output.metrics, report)
        .with_context(|| format!("Failed to write outputs for {}", cli.output.display()))?;

    let summary: &RunSummary = &output.report.summary;
    info!("{}", summary.generate_summary());
    info!("Finished in {:?}", start.elapsed());

    Ok(())
}
