//! Provenance of a prescription map.
//!
//! The record names the tier codes, the rule order and the quantity each rule
//! reads, so a consumer can interpret a map without this crate.

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::config::PrescriptionConfig;
use crate::interpolation::idw::DISTANCE_FLOOR;
use crate::model::field::{FieldSummary, InterpolatedField, Quantity};
use crate::model::grid::{Grid, GridDescriptor};
use crate::prescription::rules::{PrescriptionMap, Tier};
use crate::prescription::statistics::TierStatistics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDescription {
    pub order: usize,
    pub name: String,
    pub quantity: Quantity,
    pub condition: String,
    pub tier: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    pub sample_count: usize,
    pub density_map_size: (usize, usize),
    pub distance_map_size: (usize, usize),
    pub prescription_map_size: (usize, usize),
    pub spatial_extent: SpatialExtent,
    pub density_range: Option<FieldSummary>,
    pub distance_range: Option<FieldSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingParameters {
    pub density_low_threshold: f64,
    pub density_high_threshold: f64,
    pub distance_protection_threshold: f64,
    pub idw_power: f64,
    pub max_neighbors: usize,
    /// Neighbors actually used, `min(max_neighbors, sample_count)`.
    pub effective_neighbors: usize,
    pub distance_floor: f64,
    pub grid_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandDescription {
    pub band: usize,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub model_version: String,
    pub generation_time: DateTime<Utc>,
    pub rules: Vec<RuleDescription>,
    pub tier_encoding: BTreeMap<String, String>,
    pub density_calculation: String,
    pub coordinate_system: String,
    pub density_unit: String,
    pub distance_unit: String,
    pub data_summary: DataSummary,
    pub processing_parameters: ProcessingParameters,
    pub grid: GridDescriptor,
    pub geo_transform: [f64; 6],
    pub bands: Vec<BandDescription>,
    pub statistics: TierStatistics,
}

impl ProvenanceRecord {
    /// Single-level mapping with dotted keys (`processing_parameters.idw_power`,
    /// `geo_transform.0`, ...), for sinks that only store flat key/value metadata.
    pub fn to_flat_map(&self) -> serde_json::Result<Map<String, Value>> {
        let mut flat = Map::new();
        flatten_into("", serde_json::to_value(self)?, &mut flat);
        Ok(flat)
    }
}

fn flatten_into(prefix: &str, value: Value, flat: &mut Map<String, Value>) {
    let join = |key: &str| if prefix.is_empty() { key.to_string() } else { format!("{}.{}", prefix, key) };
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&join(&key), child, flat);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.into_iter().enumerate() {
                flatten_into(&join(&i.to_string()), child, flat);
            }
        }
        leaf => {
            flat.insert(prefix.to_string(), leaf);
        }
    }
}

/// Everything a run produced that ends up in the record.
pub struct RunSummary<'a> {
    pub sample_count: usize,
    pub grid: &'a Grid,
    pub density: &'a InterpolatedField,
    pub distance: &'a InterpolatedField,
    pub prescription: &'a PrescriptionMap,
    pub statistics: &'a TierStatistics,
}

pub struct MetadataAssembler<'a> {
    config: &'a PrescriptionConfig,
    generated_at: DateTime<Utc>,
}

impl<'a> MetadataAssembler<'a> {
    pub fn new(config: &'a PrescriptionConfig) -> Self {
        MetadataAssembler { config, generated_at: Utc::now() }
    }

    pub fn with_timestamp(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn assemble(&self, run: &RunSummary) -> ProvenanceRecord {
        let config = self.config;
        let extent = run.grid.extent();
        let effective_neighbors = config.idw.max_neighbors.min(run.sample_count);

        ProvenanceRecord {
            model_version: config.metadata.model_version.clone(),
            generation_time: self.generated_at,
            rules: self.rules(),
            tier_encoding: self.tier_encoding(),
            density_calculation: format!(
                "inverse distance weighting of sampled {} over the {} nearest samples, power {}",
                Quantity::Density, effective_neighbors, config.idw.power
            ),
            coordinate_system: config.metadata.coordinate_system.clone(),
            density_unit: config.metadata.density_unit.clone(),
            distance_unit: config.metadata.distance_unit.clone(),
            data_summary: DataSummary {
                sample_count: run.sample_count,
                density_map_size: run.density.shape(),
                distance_map_size: run.distance.shape(),
                prescription_map_size: run.prescription.shape(),
                spatial_extent: SpatialExtent {
                    x_min: extent.min().x,
                    x_max: extent.max().x,
                    y_min: extent.min().y,
                    y_max: extent.max().y,
                },
                density_range: run.density.summary(),
                distance_range: run.distance.summary(),
            },
            processing_parameters: ProcessingParameters {
                density_low_threshold: config.rules.density_low,
                density_high_threshold: config.rules.density_high,
                distance_protection_threshold: config.rules.distance_protect,
                idw_power: config.idw.power,
                max_neighbors: config.idw.max_neighbors,
                effective_neighbors,
                distance_floor: DISTANCE_FLOOR,
                grid_margin: config.grid.margin,
            },
            grid: run.grid.descriptor(),
            geo_transform: run.grid.geo_transform(),
            bands: vec![
                BandDescription {
                    band: 1,
                    name: "density".to_string(),
                    description: format!("interpolated weed density ({})", config.metadata.density_unit),
                },
                BandDescription {
                    band: 2,
                    name: "prescription".to_string(),
                    description: "treatment tier (0=no action, 1=light treatment, 2=heavy treatment)".to_string(),
                },
            ],
            statistics: run.statistics.clone(),
        }
    }

    fn rules(&self) -> Vec<RuleDescription> {
        let rules = &self.config.rules;
        let density_unit = &self.config.metadata.density_unit;
        let distance_unit = &self.config.metadata.distance_unit;
        vec![
            RuleDescription {
                order: 1,
                name: "distance_protection".to_string(),
                quantity: Quantity::Distance,
                condition: format!("distance < {} {}", rules.distance_protect, distance_unit),
                tier: Tier::NoAction.code(),
            },
            RuleDescription {
                order: 2,
                name: "low_density".to_string(),
                quantity: Quantity::Density,
                condition: format!("density < {} {}", rules.density_low, density_unit),
                tier: Tier::NoAction.code(),
            },
            RuleDescription {
                order: 3,
                name: "medium_density".to_string(),
                quantity: Quantity::Density,
                condition: format!("{} <= density < {} {}", rules.density_low, rules.density_high, density_unit),
                tier: Tier::Light.code(),
            },
            RuleDescription {
                order: 4,
                name: "high_density".to_string(),
                quantity: Quantity::Density,
                condition: format!("density >= {} {}", rules.density_high, density_unit),
                tier: Tier::Heavy.code(),
            },
        ]
    }

    fn tier_encoding(&self) -> BTreeMap<String, String> {
        let rules = &self.config.rules;
        let unit = &self.config.metadata.density_unit;
        Tier::ALL.iter().map(|tier| {
            let meaning = match tier {
                Tier::NoAction => format!("{}: protected or density < {} {}", tier.label(), rules.density_low, unit),
                Tier::Light => format!("{}: {}-{} {}", tier.label(), rules.density_low, rules.density_high, unit),
                Tier::Heavy => format!("{}: >= {} {}", tier.label(), rules.density_high, unit),
            };
            (tier.code().to_string(), meaning)
        }).collect()
    }
}
