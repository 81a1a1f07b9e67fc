use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};
use crate::error::{PrescriptionError, Result};

pub const DEFAULT_MARGIN: f64 = 50.0;
pub const DEFAULT_GRID_SIZE: usize = 500;
pub const DEFAULT_POWER: f64 = 2.0;
pub const DEFAULT_MAX_NEIGHBORS: usize = 8;
pub const DEFAULT_DISTANCE_PROTECT: f64 = 30.0;
pub const DEFAULT_DENSITY_LOW: f64 = 5.0;
pub const DEFAULT_DENSITY_HIGH: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Padding added to every side of the sample bounding box, in coordinate units.
    pub margin: f64,
    pub rows: usize,
    pub cols: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            margin: DEFAULT_MARGIN,
            rows: DEFAULT_GRID_SIZE,
            cols: DEFAULT_GRID_SIZE,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(PrescriptionError::invalid_config("grid.margin", self.margin, "must be finite and non-negative"));
        }
        if self.rows == 0 {
            return Err(PrescriptionError::invalid_config("grid.rows", self.rows, "must be at least 1"));
        }
        if self.cols == 0 {
            return Err(PrescriptionError::invalid_config("grid.cols", self.cols, "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdwConfig {
    pub power: f64,
    pub max_neighbors: usize,
}

impl Default for IdwConfig {
    fn default() -> Self {
        IdwConfig {
            power: DEFAULT_POWER,
            max_neighbors: DEFAULT_MAX_NEIGHBORS,
        }
    }
}

impl IdwConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.power.is_finite() || self.power <= 0.0 {
            return Err(PrescriptionError::invalid_config("idw.power", self.power, "must be finite and greater than 0"));
        }
        if self.max_neighbors == 0 {
            return Err(PrescriptionError::invalid_config("idw.max_neighbors", self.max_neighbors, "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// Cells closer to the crop than this are never treated.
    pub distance_protect: f64,
    pub density_low: f64,
    pub density_high: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        RuleThresholds {
            distance_protect: DEFAULT_DISTANCE_PROTECT,
            density_low: DEFAULT_DENSITY_LOW,
            density_high: DEFAULT_DENSITY_HIGH,
        }
    }
}

impl RuleThresholds {
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("rules.distance_protect", self.distance_protect),
            ("rules.density_low", self.density_low),
            ("rules.density_high", self.density_high),
        ];
        for (key, value) in values {
            if !value.is_finite() {
                return Err(PrescriptionError::invalid_config(key, value, "must be finite"));
            }
        }
        if self.density_low >= self.density_high {
            return Err(PrescriptionError::invalid_config(
                "rules.density_low",
                self.density_low,
                &format!("must be less than rules.density_high ({})", self.density_high),
            ));
        }
        Ok(())
    }
}

/// Labels copied verbatim into the provenance record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub model_version: String,
    pub coordinate_system: String,
    pub density_unit: String,
    pub distance_unit: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        MetadataConfig {
            model_version: "v1.0".to_string(),
            coordinate_system: "EPSG:32650".to_string(),
            density_unit: "plants/m2".to_string(),
            distance_unit: "cm".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrescriptionConfig {
    pub grid: GridConfig,
    pub idw: IdwConfig,
    pub rules: RuleThresholds,
    pub metadata: MetadataConfig,
}

impl PrescriptionConfig {
    pub fn from_file(path: impl AsRef<Path>) -> AnyResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
        let config: PrescriptionConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_idw(mut self, idw: IdwConfig) -> Self {
        self.idw = idw;
        self
    }

    pub fn with_rules(mut self, rules: RuleThresholds) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataConfig) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.idw.validate()?;
        self.rules.validate()
    }
}
