use std::collections::{HashMap, VecDeque};
use serde::{Deserialize, Serialize};
use crate::error::{PrescriptionError, Result};
use crate::model::field::Quantity;

/// One field measurement: a location with both measured quantities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub density: f64,
    pub distance: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64, density: f64, distance: f64) -> Self {
        Sample { x, y, density, distance }
    }

    pub fn value(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Density => self.density,
            Quantity::Distance => self.distance,
        }
    }
}

/// Ordered, validated samples for one run. Every value is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        let mut fields = vec![];
        if samples.iter().any(|s| !s.x.is_finite()) { fields.push("x".to_string()); }
        if samples.iter().any(|s| !s.y.is_finite()) { fields.push("y".to_string()); }
        if samples.iter().any(|s| !s.density.is_finite()) { fields.push("density_value".to_string()); }
        if samples.iter().any(|s| !s.distance.is_finite()) { fields.push("distance_value".to_string()); }
        if !fields.is_empty() {
            return Err(PrescriptionError::InvalidSamples { fields });
        }
        Ok(SampleSet { samples })
    }

    /// Pairs two `(x, y, value)` collections into samples. When both list the same
    /// coordinates in the same order they are zipped; otherwise every density sample
    /// is matched to a distance sample at the identical coordinate, duplicates being
    /// consumed in order. The result follows the density collection's order.
    pub fn from_parallel(density: &[(f64, f64, f64)], distance: &[(f64, f64, f64)]) -> Result<Self> {
        let aligned = density.len() == distance.len()
            && density.iter().zip(distance).all(|(a, b)| a.0 == b.0 && a.1 == b.1);
        if aligned {
            let samples = density.iter().zip(distance)
                .map(|(&(x, y, d), &(_, _, c))| Sample::new(x, y, d, c))
                .collect();
            return SampleSet::new(samples);
        }

        let mut by_coord: HashMap<(u64, u64), VecDeque<f64>> = HashMap::new();
        for &(x, y, value) in distance {
            by_coord.entry(coord_key(x, y)).or_default().push_back(value);
        }

        let mut samples = Vec::with_capacity(density.len());
        for &(x, y, d) in density {
            let matched = by_coord.get_mut(&coord_key(x, y)).and_then(|queue| queue.pop_front());
            match matched {
                Some(c) => samples.push(Sample::new(x, y, d, c)),
                None => return Err(PrescriptionError::UnpairedSample { x, y, missing: Quantity::Distance }),
            }
        }

        // Leftovers exist only in the distance collection
        if let Some(&(x, y, _)) = distance.iter().find(|&&(x, y, _)| {
            by_coord.get(&coord_key(x, y)).map_or(false, |queue| !queue.is_empty())
        }) {
            return Err(PrescriptionError::UnpairedSample { x, y, missing: Quantity::Density });
        }

        SampleSet::new(samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn coords(&self) -> Vec<[f64; 2]> {
        self.samples.iter().map(|s| [s.x, s.y]).collect()
    }

    pub fn values(&self, quantity: Quantity) -> Vec<f64> {
        self.samples.iter().map(|s| s.value(quantity)).collect()
    }

    /// Thins the set to roughly `max_samples` by keeping every `step`-th sample,
    /// `step = max(1, len / max_samples)`, starting with the first.
    pub fn decimate(&self, max_samples: usize) -> Result<SampleSet> {
        if max_samples == 0 {
            return Err(PrescriptionError::invalid_config("max_samples", max_samples, "must be at least 1"));
        }
        if self.samples.len() <= max_samples {
            return Ok(self.clone());
        }
        let step = (self.samples.len() / max_samples).max(1);
        let samples = self.samples.iter().step_by(step).copied().collect();
        Ok(SampleSet { samples })
    }
}

fn coord_key(x: f64, y: f64) -> (u64, u64) {
    // -0.0 and 0.0 are the same location
    ((x + 0.0).to_bits(), (y + 0.0).to_bits())
}
