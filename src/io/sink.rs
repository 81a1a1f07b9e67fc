use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use ndarray_npy::write_npy;
use crate::pipeline::PrescriptionRun;

pub const DENSITY_FILE: &str = "density.npy";
pub const DISTANCE_FILE: &str = "distance.npy";
pub const PRESCRIPTION_FILE: &str = "prescription.npy";
pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, PartialEq)]
pub struct RunArtifacts {
    pub density: PathBuf,
    pub distance: PathBuf,
    pub prescription: PathBuf,
    pub metadata: PathBuf,
}

/// Writes both fields and the tier map as `.npy` arrays and the provenance record
/// as pretty JSON into `dir`.
pub fn write_run(dir: impl AsRef<Path>, run: &PrescriptionRun) -> Result<RunArtifacts> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let artifacts = RunArtifacts {
        density: dir.join(DENSITY_FILE),
        distance: dir.join(DISTANCE_FILE),
        prescription: dir.join(PRESCRIPTION_FILE),
        metadata: dir.join(METADATA_FILE),
    };
    write_npy(&artifacts.density, run.density.values())
        .with_context(|| format!("writing {}", artifacts.density.display()))?;
    write_npy(&artifacts.distance, run.distance.values())
        .with_context(|| format!("writing {}", artifacts.distance.display()))?;
    write_npy(&artifacts.prescription, run.prescription.tiers())
        .with_context(|| format!("writing {}", artifacts.prescription.display()))?;

    let file = File::create(&artifacts.metadata).with_context(|| format!("creating {}", artifacts.metadata.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &run.provenance)?;

    log::info!("wrote run artifacts to {}", dir.display());
    Ok(artifacts)
}
