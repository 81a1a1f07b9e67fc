pub mod field;
pub mod grid;
pub mod sample;

pub use field::{FieldSummary, InterpolatedField, Quantity};
pub use grid::{Grid, GridBuilder, GridDescriptor};
pub use sample::{Sample, SampleSet};
