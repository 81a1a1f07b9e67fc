//! Inverse distance weighting over the `k` nearest samples.
//!
//! `z = Σ wᵢ·zᵢ / Σ wᵢ` with `wᵢ = 1 / dᵢᵖ`. Distances are floored at
//! [`DISTANCE_FLOOR`], so a query on top of a sample is dominated by it rather
//! than returning it bit-exactly. Weights are evaluated relative to the nearest
//! neighbor, `(d_min / dᵢ)ᵖ`, which normalizes to the same average.

use ndarray::{Array2, ArrayView1};
use crate::config::IdwConfig;
use crate::error::{PrescriptionError, Result};
use crate::interpolation::spatial_index::SpatialIndex;
use crate::model::field::{InterpolatedField, Quantity};
use crate::model::grid::Grid;
use crate::model::sample::SampleSet;
use crate::stream::{SharedStream, Stream};

pub const DISTANCE_FLOOR: f64 = 1e-8;

/// Query points per neighbor batch.
pub(crate) const CHUNK_SIZE: usize = 1000;
const PROGRESS_EVERY_CHUNKS: usize = 10;

#[derive(Debug, Clone)]
pub struct IdwInterpolator {
    config: IdwConfig,
}

impl IdwInterpolator {
    pub fn new(config: IdwConfig) -> Result<Self> {
        config.validate()?;
        Ok(IdwInterpolator { config })
    }

    pub fn config(&self) -> &IdwConfig {
        &self.config
    }

    /// Interpolates one quantity of `samples` over every cell of `grid`.
    pub fn interpolate(&self, samples: &SampleSet, quantity: Quantity, grid: &Grid, stream: &SharedStream) -> Result<InterpolatedField> {
        let index = SpatialIndex::new(&samples.coords())?;
        self.interpolate_values(&index, &samples.values(quantity), quantity, grid, stream)
    }

    /// Interpolates `values`, given in the index's insertion order.
    pub fn interpolate_values(&self, index: &SpatialIndex, values: &[f64], quantity: Quantity, grid: &Grid, stream: &SharedStream) -> Result<InterpolatedField> {
        self.interpolate_chunked(index, values, quantity, grid, stream, CHUNK_SIZE)
    }

    pub(crate) fn interpolate_chunked(&self, index: &SpatialIndex, values: &[f64], quantity: Quantity, grid: &Grid, stream: &SharedStream, chunk_size: usize) -> Result<InterpolatedField> {
        if values.len() != index.len() {
            return Err(PrescriptionError::ValueCountMismatch { coords: index.len(), values: values.len() });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PrescriptionError::InvalidSamples { fields: vec![format!("{}_value", quantity)] });
        }
        let k = index.effective_k(self.config.max_neighbors);
        let path = format!("interpolation/{}", quantity);
        stream.stream_message(&path, &format!("power={}, neighbors={}", self.config.power, k));

        let points = grid.query_points();
        let total = points.len();
        let mut interpolated = Vec::with_capacity(total);
        for (chunk_idx, chunk) in points.chunks(chunk_size.max(1)).enumerate() {
            if chunk_idx % PROGRESS_EVERY_CHUNKS == 0 {
                stream.stream_progress(&path, interpolated.len(), total);
            }
            let batch = index.query(chunk, k);
            for (distances, indices) in batch.distances.rows().into_iter().zip(batch.indices.rows()) {
                interpolated.push(self.weighted_value(distances, indices, values));
            }
        }
        stream.stream_progress(&path, total, total);

        let values = Array2::from_shape_vec(grid.shape(), interpolated)
            .map_err(|_| PrescriptionError::ShapeMismatch { quantity, expected: grid.shape(), actual: (total, 1) })?;
        Ok(InterpolatedField::new(quantity, values))
    }

    /// Weighted average of one neighbor list, nearest first. The result never leaves
    /// the range of the neighbor values.
    fn weighted_value(&self, distances: ArrayView1<f64>, indices: ArrayView1<usize>, values: &[f64]) -> f64 {
        let nearest = distances[0].max(DISTANCE_FLOOR);
        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for (&distance, &index) in distances.iter().zip(indices.iter()) {
            let weight = (nearest / distance.max(DISTANCE_FLOOR)).powf(self.config.power);
            let value = values[index];
            weight_sum += weight;
            value_sum += weight * value;
            lo = lo.min(value);
            hi = hi.max(value);
        }
        (value_sum / weight_sum).clamp(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use geo::{coord, Rect};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use crate::model::sample::Sample;
    use super::*;

    fn grid(min: (f64, f64), max: (f64, f64), rows: usize, cols: usize) -> Grid {
        Grid::new(Rect::new(coord! { x: min.0, y: min.1 }, coord! { x: max.0, y: max.1 }), rows, cols).unwrap()
    }

    fn idw(power: f64, max_neighbors: usize) -> IdwInterpolator {
        IdwInterpolator::new(IdwConfig { power, max_neighbors }).unwrap()
    }

    fn random_samples(seed: u64, n: usize) -> SampleSet {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let samples = (0..n).map(|_| Sample::new(
            rng.gen_range(0.0..200.0),
            rng.gen_range(0.0..100.0),
            rng.gen_range(0.0..40.0),
            rng.gen_range(0.0..80.0),
        )).collect();
        SampleSet::new(samples).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(IdwInterpolator::new(IdwConfig { power: 0.0, max_neighbors: 8 }).is_err());
        assert!(IdwInterpolator::new(IdwConfig { power: 2.0, max_neighbors: 0 }).is_err());
    }

    #[test]
    fn test_midpoint_of_two_samples() {
        let samples = SampleSet::new(vec![Sample::new(0.0, 0.0, 0.0, 0.0), Sample::new(2.0, 0.0, 10.0, 0.0)]).unwrap();
        // Single cell centered on (1, 0)
        let field = idw(2.0, 8).interpolate(&samples, Quantity::Density, &grid((0.0, -1.0), (2.0, 1.0), 1, 1), &None).unwrap();
        assert_relative_eq!(field.values()[[0, 0]], 5.0);
    }

    #[test]
    fn test_power_concentrates_weight() {
        let samples = SampleSet::new(vec![Sample::new(0.0, 0.0, 0.0, 0.0), Sample::new(4.0, 0.0, 10.0, 0.0)]).unwrap();
        // Single cell centered on (1, 0)
        let cell = grid((0.0, -1.0), (2.0, 1.0), 1, 1);
        let p1 = idw(1.0, 8).interpolate(&samples, Quantity::Density, &cell, &None).unwrap().values()[[0, 0]];
        let p4 = idw(4.0, 8).interpolate(&samples, Quantity::Density, &cell, &None).unwrap().values()[[0, 0]];
        assert_relative_eq!(p1, 2.5);
        assert!(p4 < p1);
    }

    #[test]
    fn test_max_neighbors_limits_influence() {
        let samples = SampleSet::new(vec![
            Sample::new(0.0, 0.0, 1.0, 0.0),
            Sample::new(3.0, 0.0, 1.0, 0.0),
            Sample::new(50.0, 0.0, 1000.0, 0.0),
        ]).unwrap();
        let cell = grid((0.0, -1.0), (2.0, 1.0), 1, 1);
        let two = idw(2.0, 2).interpolate(&samples, Quantity::Density, &cell, &None).unwrap();
        assert_eq!(two.values()[[0, 0]], 1.0);
        let three = idw(2.0, 3).interpolate(&samples, Quantity::Density, &cell, &None).unwrap();
        assert!(three.values()[[0, 0]] > 1.0);
    }

    #[test]
    fn test_single_sample_is_reproduced_everywhere() {
        let samples = SampleSet::new(vec![Sample::new(5.0, 5.0, 50.0, 10.0)]).unwrap();
        let cells = grid((-45.0, -45.0), (55.0, 55.0), 7, 9);
        let field = idw(2.0, 8).interpolate(&samples, Quantity::Density, &cells, &None).unwrap();
        assert!(field.values().iter().all(|&v| v == 50.0));
        let field = idw(2.0, 8).interpolate(&samples, Quantity::Distance, &cells, &None).unwrap();
        assert!(field.values().iter().all(|&v| v == 10.0));
    }

    #[test]
    fn test_coincident_query_is_dominated_by_sample() {
        let samples = SampleSet::new(vec![Sample::new(1.0, 0.0, 7.0, 0.0), Sample::new(5.0, 0.0, 100.0, 0.0)]).unwrap();
        // Single cell centered exactly on the first sample
        let field = idw(2.0, 8).interpolate(&samples, Quantity::Density, &grid((0.0, -1.0), (2.0, 1.0), 1, 1), &None).unwrap();
        assert_relative_eq!(field.values()[[0, 0]], 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_huge_power_stays_finite() {
        let samples = SampleSet::new(vec![Sample::new(0.0, 0.0, 3.0, 0.0), Sample::new(1e6, 0.0, 9.0, 0.0)]).unwrap();
        let field = idw(200.0, 8).interpolate(&samples, Quantity::Density, &grid((0.0, -1.0), (2.0, 1.0), 1, 1), &None).unwrap();
        assert_eq!(field.values()[[0, 0]], 3.0);
    }

    #[test]
    fn test_convexity() {
        let samples = random_samples(11, 60);
        let cells = grid((-50.0, -50.0), (250.0, 150.0), 40, 60);
        let interpolator = idw(2.0, 8);
        let index = SpatialIndex::new(&samples.coords()).unwrap();
        let values = samples.values(Quantity::Density);
        let field = interpolator.interpolate_values(&index, &values, Quantity::Density, &cells, &None).unwrap();
        for ((row, col), &v) in field.values().indexed_iter() {
            let c = cells.cell_center(row, col);
            let neighbors = index.nearest([c.x, c.y], 8);
            let lo = neighbors.iter().map(|n| values[n.0]).fold(f64::INFINITY, f64::min);
            let hi = neighbors.iter().map(|n| values[n.0]).fold(f64::NEG_INFINITY, f64::max);
            assert!(lo <= v && v <= hi, "cell ({}, {}) = {} outside [{}, {}]", row, col, v, lo, hi);
        }
    }

    #[test]
    fn test_chunk_size_does_not_change_result() {
        let samples = random_samples(3, 40);
        let cells = grid((-50.0, -50.0), (250.0, 150.0), 37, 41);
        let interpolator = idw(2.0, 8);
        let index = SpatialIndex::new(&samples.coords()).unwrap();
        let values = samples.values(Quantity::Distance);
        let reference = interpolator.interpolate_chunked(&index, &values, Quantity::Distance, &cells, &None, cells.len()).unwrap();
        for chunk_size in [1, 7, 1000] {
            let field = interpolator.interpolate_chunked(&index, &values, Quantity::Distance, &cells, &None, chunk_size).unwrap();
            assert_eq!(field, reference);
        }
    }

    #[test]
    fn test_deterministic() {
        let samples = random_samples(5, 30);
        let cells = grid((0.0, 0.0), (200.0, 100.0), 20, 30);
        let a = idw(2.0, 8).interpolate(&samples, Quantity::Density, &cells, &None).unwrap();
        let b = idw(2.0, 8).interpolate(&samples, Quantity::Density, &cells, &None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_value_count_mismatch() {
        let index = SpatialIndex::new(&[[0.0, 0.0], [1.0, 1.0]]).unwrap();
        let err = idw(2.0, 8).interpolate_values(&index, &[1.0], Quantity::Density, &grid((0.0, 0.0), (1.0, 1.0), 1, 1), &None).unwrap_err();
        assert_eq!(err, PrescriptionError::ValueCountMismatch { coords: 2, values: 1 });
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let index = SpatialIndex::new(&[[0.0, 0.0]]).unwrap();
        let grid = grid((0.0, 0.0), (1.0, 1.0), 2, 2);
        let err = idw(2.0, 8).interpolate_values(&index, &[f64::NAN], Quantity::Density, &grid, &None).unwrap_err();
        assert_eq!(err, PrescriptionError::InvalidSamples { fields: vec!["density_value".to_string()] });

        let index = SpatialIndex::new(&[[0.0, 0.0], [1.0, 1.0]]).unwrap();
        let err = idw(2.0, 8).interpolate_values(&index, &[3.0, f64::INFINITY], Quantity::Distance, &grid, &None).unwrap_err();
        assert_eq!(err, PrescriptionError::InvalidSamples { fields: vec!["distance_value".to_string()] });
    }
}
