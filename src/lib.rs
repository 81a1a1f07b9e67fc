pub mod config;
pub mod error;
pub mod stream;
pub mod model;
pub mod interpolation;
pub mod prescription;
pub mod pipeline;
pub mod io;

pub use config::PrescriptionConfig;
pub use error::{PrescriptionError, Result};
pub use pipeline::{PrescriptionPipeline, PrescriptionRun};
