use std::sync::Arc;
use chrono::{DateTime, Utc};
use log::{debug, info};
use crate::config::PrescriptionConfig;
use crate::error::{PrescriptionError, Result};
use crate::interpolation::idw::IdwInterpolator;
use crate::interpolation::spatial_index::SpatialIndex;
use crate::model::field::{InterpolatedField, Quantity};
use crate::model::grid::{Grid, GridBuilder};
use crate::model::sample::SampleSet;
use crate::prescription::metadata::{MetadataAssembler, ProvenanceRecord, RunSummary};
use crate::prescription::rules::{PrescriptionMap, RuleClassifier, Tier};
use crate::prescription::statistics::TierStatistics;
use crate::stream::{SharedStream, Stream};

/// Everything one run produces. Only built once every stage has succeeded.
#[derive(Debug, Clone)]
pub struct PrescriptionRun {
    pub grid: Grid,
    pub density: InterpolatedField,
    pub distance: InterpolatedField,
    pub prescription: PrescriptionMap,
    pub statistics: TierStatistics,
    pub provenance: ProvenanceRecord,
}

pub struct PrescriptionPipeline {
    config: PrescriptionConfig,
    stream: SharedStream,
    generated_at: Option<DateTime<Utc>>,
}

impl PrescriptionPipeline {
    pub fn new(config: PrescriptionConfig) -> Self {
        PrescriptionPipeline {
            config,
            stream: None,
            generated_at: None,
        }
    }

    pub fn with_stream(mut self, stream: Arc<dyn Stream>) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Pins the provenance timestamp instead of using the wall clock.
    pub fn with_timestamp(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    pub fn config(&self) -> &PrescriptionConfig {
        &self.config
    }

    pub fn run(&self, samples: &SampleSet) -> Result<PrescriptionRun> {
        self.config.validate()?;
        let interpolator = IdwInterpolator::new(self.config.idw.clone())?;
        let classifier = RuleClassifier::new(self.config.rules.clone())?;
        if samples.is_empty() {
            return Err(PrescriptionError::InsufficientSamples { found: 0, required: 1 });
        }

        let coords = samples.coords();
        let grid = GridBuilder::new(self.config.grid.clone()).build(&coords)?;
        let (rows, cols) = grid.shape();
        info!("interpolating {} samples onto a {}x{} grid", samples.len(), rows, cols);
        self.stream.stream_message("pipeline", &format!("grid {}x{}, extent {:?}", rows, cols, grid.extent()));

        // Both quantities share coordinates, so one index serves both fields
        let index = SpatialIndex::new(&coords)?;
        let (density, distance) = rayon::join(
            || interpolator.interpolate_values(&index, &samples.values(Quantity::Density), Quantity::Density, &grid, &self.stream),
            || interpolator.interpolate_values(&index, &samples.values(Quantity::Distance), Quantity::Distance, &grid, &self.stream),
        );
        let (density, distance) = (density?, distance?);
        for field in [&density, &distance] {
            if let Some(summary) = field.summary() {
                debug!("{} range {:.2} - {:.2}", field.quantity(), summary.min, summary.max);
                self.stream.stream_scalar(&format!("field/{}/min", field.quantity()), summary.min);
                self.stream.stream_scalar(&format!("field/{}/max", field.quantity()), summary.max);
            }
        }

        let classification = classifier.classify(&density, &distance)?;
        let statistics = classification.statistics;
        for tier in Tier::ALL {
            self.stream.stream_scalar(&format!("tiers/{}", tier.label()), statistics.count(tier) as f64);
        }
        self.stream.stream_scalar("tiers/protected", statistics.protected_cells as f64);
        info!(
            "prescription: {} protected, {} no action, {} light, {} heavy of {} cells",
            statistics.protected_cells,
            statistics.count(Tier::NoAction),
            statistics.count(Tier::Light),
            statistics.count(Tier::Heavy),
            statistics.total_cells
        );

        let mut assembler = MetadataAssembler::new(&self.config);
        if let Some(generated_at) = self.generated_at {
            assembler = assembler.with_timestamp(generated_at);
        }
        let provenance = assembler.assemble(&RunSummary {
            sample_count: samples.len(),
            grid: &grid,
            density: &density,
            distance: &distance,
            prescription: &classification.map,
            statistics: &statistics,
        });

        Ok(PrescriptionRun {
            grid,
            density,
            distance,
            prescription: classification.map,
            statistics,
            provenance,
        })
    }
}
