pub mod idw;
pub mod spatial_index;

pub use idw::{IdwInterpolator, DISTANCE_FLOOR};
pub use spatial_index::{NeighborBatch, SpatialIndex};
