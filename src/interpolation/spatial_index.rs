//! Nearest-neighbor lookup over sample coordinates.
//!
//! Samples live in an R-tree. Neighbor lists are ordered by Euclidean distance,
//! equal distances by the order the samples were given in.

use ndarray::Array2;
use ordered_float::OrderedFloat;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use crate::error::{PrescriptionError, Result};

#[derive(Clone, Debug)]
struct IndexedSample {
    point: [f64; 2],
    index: usize,
}

impl RTreeObject for IndexedSample {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for IndexedSample {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Result of a batched query: row `i` holds the neighbors of query point `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborBatch {
    pub indices: Array2<usize>,
    pub distances: Array2<f64>,
}

impl NeighborBatch {
    pub fn k(&self) -> usize {
        self.indices.ncols()
    }
}

#[derive(Clone)]
pub struct SpatialIndex {
    tree: RTree<IndexedSample>,
    len: usize,
}

impl SpatialIndex {
    pub fn new(coords: &[[f64; 2]]) -> Result<Self> {
        if coords.is_empty() {
            return Err(PrescriptionError::InsufficientSamples { found: 0, required: 1 });
        }
        let indexed = coords.iter()
            .enumerate()
            .map(|(index, &point)| IndexedSample { point, index })
            .collect();
        Ok(SpatialIndex {
            tree: RTree::bulk_load(indexed),
            len: coords.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Neighbors actually returned for a requested `k`.
    pub fn effective_k(&self, k: usize) -> usize {
        k.min(self.len)
    }

    /// The `k` nearest samples to `query` as `(sample index, distance)`, nearest first.
    pub fn nearest(&self, query: [f64; 2], k: usize) -> Vec<(usize, f64)> {
        let k = self.effective_k(k);
        if k == 0 {
            return vec![];
        }
        let mut found: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
        for (sample, distance_2) in self.tree.nearest_neighbor_iter_with_distance_2(&query) {
            // Keep going past k while the distance still ties the k-th one
            if found.len() >= k && distance_2 > found[k - 1].0 {
                break;
            }
            found.push((distance_2, sample.index));
        }
        found.sort_by_key(|&(distance_2, index)| (OrderedFloat(distance_2), index));
        found.truncate(k);
        found.into_iter().map(|(distance_2, index)| (index, distance_2.sqrt())).collect()
    }

    pub fn query(&self, queries: &[[f64; 2]], k: usize) -> NeighborBatch {
        let k = self.effective_k(k);
        let mut indices = Array2::<usize>::zeros((queries.len(), k));
        let mut distances = Array2::<f64>::zeros((queries.len(), k));
        for (row, &query) in queries.iter().enumerate() {
            for (col, (index, distance)) in self.nearest(query, k).into_iter().enumerate() {
                indices[[row, col]] = index;
                distances[[row, col]] = distance;
            }
        }
        NeighborBatch { indices, distances }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use super::*;

    #[test]
    fn test_empty_index() {
        let err = SpatialIndex::new(&[]).err().unwrap();
        assert_eq!(err, PrescriptionError::InsufficientSamples { found: 0, required: 1 });
    }

    #[test]
    fn test_nearest_sorted() {
        let index = SpatialIndex::new(&[[0.0, 0.0], [10.0, 0.0], [0.0, 3.0], [4.0, 0.0]]).unwrap();
        let neighbors = index.nearest([0.0, 0.0], 3);
        assert_eq!(neighbors.iter().map(|n| n.0).collect::<Vec<_>>(), vec![0, 2, 3]);
        assert_relative_eq!(neighbors[0].1, 0.0);
        assert_relative_eq!(neighbors[1].1, 3.0);
        assert_relative_eq!(neighbors[2].1, 4.0);
    }

    #[test]
    fn test_k_is_clamped() {
        let index = SpatialIndex::new(&[[0.0, 0.0], [1.0, 1.0]]).unwrap();
        assert_eq!(index.nearest([5.0, 5.0], 10).len(), 2);
        let batch = index.query(&[[0.0, 0.0], [3.0, 3.0], [-1.0, 0.0]], 8);
        assert_eq!(batch.k(), 2);
        assert_eq!(batch.indices.dim(), (3, 2));
        assert_eq!(batch.indices, array![[0, 1], [1, 0], [0, 1]]);
    }

    #[test]
    fn test_ties_follow_insertion_order() {
        // Four samples at the same distance from the origin, plus coincident duplicates
        let coords = [[0.0, 1.0], [1.0, 0.0], [0.0, -1.0], [-1.0, 0.0], [1.0, 0.0]];
        let index = SpatialIndex::new(&coords).unwrap();
        let neighbors = index.nearest([0.0, 0.0], 2);
        assert_eq!(neighbors.iter().map(|n| n.0).collect::<Vec<_>>(), vec![0, 1]);
        let neighbors = index.nearest([0.0, 0.0], 5);
        assert_eq!(neighbors.iter().map(|n| n.0).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        let neighbors = index.nearest([1.0, 0.0], 2);
        assert_eq!(neighbors, vec![(1, 0.0), (4, 0.0)]);
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let coords: Vec<[f64; 2]> = (0..200).map(|_| [rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)]).collect();
        let index = SpatialIndex::new(&coords).unwrap();
        for _ in 0..50 {
            let query = [rng.gen_range(-20.0..120.0), rng.gen_range(-20.0..120.0)];
            let mut expected: Vec<(f64, usize)> = coords.iter().enumerate()
                .map(|(i, p)| ((p[0] - query[0]).powi(2) + (p[1] - query[1]).powi(2), i))
                .collect();
            expected.sort_by_key(|&(d, i)| (OrderedFloat(d), i));
            let found = index.nearest(query, 8);
            assert_eq!(found.iter().map(|n| n.0).collect::<Vec<_>>(), expected[..8].iter().map(|e| e.1).collect::<Vec<_>>());
            for (n, e) in found.iter().zip(&expected) {
                assert_relative_eq!(n.1, e.0.sqrt());
            }
        }
    }
}
