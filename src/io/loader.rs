use std::fs::File;
use std::io::Read;
use std::path::Path;
use anyhow::{bail, Context, Result};
use crate::model::sample::{Sample, SampleSet};

pub const X_COLUMN: &str = "x_coord";
pub const Y_COLUMN: &str = "y_coord";
pub const DENSITY_COLUMN: &str = "density_plants_per_m2";
pub const DISTANCE_COLUMN: &str = "distance_to_corn_cm";

pub const REQUIRED_COLUMNS: [&str; 4] = [X_COLUMN, Y_COLUMN, DENSITY_COLUMN, DISTANCE_COLUMN];

/// Reads weed detections from a CSV file with a header row. Extra columns are ignored.
pub fn read_samples_csv(path: impl AsRef<Path>) -> Result<SampleSet> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening samples {}", path.display()))?;
    read_samples(file).with_context(|| format!("reading samples {}", path.display()))
}

pub fn read_samples<R: Read>(reader: R) -> Result<SampleSet> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS.iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        bail!("missing required columns: {}", missing.join(", "));
    }
    let column_index = |name: &str| headers.iter().position(|h| h == name);
    let indices: Vec<usize> = REQUIRED_COLUMNS.iter().filter_map(|c| column_index(c)).collect();

    let mut samples = vec![];
    for (row, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("row {}", row + 1))?;
        let mut values = [0.0; 4];
        for (value, (&index, column)) in values.iter_mut().zip(indices.iter().zip(REQUIRED_COLUMNS)) {
            let raw = record.get(index).unwrap_or("");
            *value = raw.parse::<f64>()
                .with_context(|| format!("row {}, column {}: '{}' is not a number", row + 1, column, raw))?;
        }
        samples.push(Sample::new(values[0], values[1], values[2], values[3]));
    }
    log::info!("loaded {} weed samples", samples.len());

    Ok(SampleSet::new(samples)?)
}
