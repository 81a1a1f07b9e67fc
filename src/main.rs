use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Result;
use clap::Parser;
use log::{info, Level};
use prescription_rust_core::config::PrescriptionConfig;
use prescription_rust_core::io::{loader, sink};
use prescription_rust_core::pipeline::PrescriptionPipeline;
use prescription_rust_core::prescription::Tier;
use prescription_rust_core::stream::LogStream;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// CSV with x_coord, y_coord, density_plants_per_m2 and distance_to_corn_cm columns
    #[arg(short, long)]
    samples: PathBuf,

    /// JSON configuration; defaults are used for anything left out
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "prescription_output")]
    output_dir: PathBuf,

    /// Thin the samples to roughly this many before interpolating
    #[arg(short, long)]
    max_samples: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PrescriptionConfig::from_file(path)?,
        None => PrescriptionConfig::default(),
    };
    let mut samples = loader::read_samples_csv(&args.samples)?;
    if let Some(max_samples) = args.max_samples {
        let total = samples.len();
        samples = samples.decimate(max_samples)?;
        info!("thinned {} samples to {}", total, samples.len());
    }

    let run = PrescriptionPipeline::new(config)
        .with_stream(Arc::new(LogStream::new(Level::Debug)))
        .run(&samples)?;
    let artifacts = sink::write_run(&args.output_dir, &run)?;

    for tier in Tier::ALL {
        info!("{}: {} cells ({:.1}%)", tier.label(), run.statistics.count(tier), run.statistics.percent(tier));
    }
    info!("protected: {} cells ({:.1}%)", run.statistics.protected_cells, run.statistics.protected_percent);
    info!("metadata written to {}", artifacts.metadata.display());
    Ok(())
}
