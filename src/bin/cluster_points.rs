use std::fs::{self, File};
use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};
use serde::{Deserialize, Serialize};

use unqud::config::file::OutputFormat;
use unqud::{ClusterAssembler, Feature, Point, UnqudConfig};

/// Clusters a CSV of weighted 2D points into display-ready markers.
#[derive(Debug, Parser)]
#[command(name = "cluster_points")]
struct Args {
    /// Path to the INI configuration file
    #[arg(long, default_value = "default.ini")]
    config: PathBuf,

    /// Override the configured input CSV path
    #[arg(long)]
    input: Option<PathBuf>,

    /// Override the configured output path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct InputRecord {
    x: f64,
    y: f64,
    value: f64,
}

#[derive(Debug, Serialize)]
struct OutputRecord {
    x: f64,
    y: f64,
    value: f64,
    features: usize,
}

fn read_features(path: &PathBuf) -> unqud::Result<Vec<Feature>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut features = Vec::new();
    let mut skipped = 0usize;
    for (row, record) in reader.deserialize::<InputRecord>().enumerate() {
        let record = record?;
        if record.value <= 0.0 {
            warn!(
                "row {}: skipping feature with non-positive value {}",
                row + 1,
                record.value
            );
            skipped += 1;
            continue;
        }
        features.push(Feature::new(Point::new(record.x, record.y), record.value));
    }
    if skipped > 0 {
        warn!("Skipped {} rows with non-positive values", skipped);
    }
    Ok(features)
}

fn write_output(path: &PathBuf, format: OutputFormat, records: &[OutputRecord]) -> unqud::Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_path(path)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        OutputFormat::Json => {
            let file = File::create(path)?;
            serde_json::to_writer_pretty(file, records)?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration and apply command-line overrides
    let mut config = UnqudConfig::from_ini(&args.config)?;
    if let Some(input) = args.input {
        config.files.input_path = input;
    }
    if let Some(output) = args.output {
        config.files.output_path = output;
    }

    // Set up logging to a timestamped file under the log directory
    let timestamp = Local::now().format("%m_%d_%H_%M");
    fs::create_dir_all(&config.files.log_dir)?;
    let log_file = File::create(
        config
            .files
            .log_dir
            .join(format!("cluster_{}.log", timestamp)),
    )?;

    // Convert config string to LevelFilter
    let log_level = match config.files.log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        "none" => LevelFilter::Off,
        _ => {
            println!(
                "Invalid log level '{}', defaulting to Info",
                config.files.log_level
            );
            LevelFilter::Info
        }
    };

    env_logger::Builder::new()
        .filter(None, log_level)
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    info!("Starting clustering with log level: {:?}", log_level);
    info!(
        "Grid: {} map units per pixel, {} px cluster distance, extent ({}, {}) - ({}, {})",
        config.cluster.map_units_per_pixel,
        config.cluster.cluster_distance_in_pixels,
        config.cluster.xmin,
        config.cluster.ymin,
        config.cluster.xmax,
        config.cluster.ymax
    );

    let start_time = Instant::now();
    let mut features = read_features(&config.files.input_path)?;
    info!(
        "Read {} features from {:?}",
        features.len(),
        config.files.input_path
    );

    // Fixed ingest order makes the clustering repeatable across runs:
    // the centroid is a running weighted mean, so merge order affects
    // floating-point rounding.
    features.sort_by(|a, b| a.value.total_cmp(&b.value));

    let mut assembler = ClusterAssembler::from_config(&config.cluster)?;

    let progress = ProgressBar::new(features.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} features",
        )?
        .progress_chars("#>-"),
    );
    for feature in features {
        assembler.add_feature(feature)?;
        progress.inc(1);
    }
    progress.finish_and_clear();

    info!(
        "Ingested {} features into {} clusters, running fix-up",
        assembler.number_of_features(),
        assembler.clusters().len()
    );
    assembler.fix_clusters()?;

    let records: Vec<OutputRecord> = assembler
        .clusters()
        .iter()
        .map(|cluster| OutputRecord {
            x: cluster.point().x,
            y: cluster.point().y,
            value: cluster.value(),
            features: cluster.features().len(),
        })
        .collect();

    write_output(
        &config.files.output_path,
        config.files.output_format,
        &records,
    )?;

    info!(
        "Wrote {} clusters to {:?} in {:.2?}",
        records.len(),
        config.files.output_path,
        start_time.elapsed()
    );
    println!(
        "Clustered {} features into {} clusters ({:?})",
        assembler.number_of_features(),
        records.len(),
        config.files.output_path
    );

    Ok(())
}
