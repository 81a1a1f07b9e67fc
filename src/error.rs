use thiserror::Error;
use crate::model::field::Quantity;

pub type Result<T> = std::result::Result<T, PrescriptionError>;

/// Everything that can abort a prescription run. No variant is ever paired with a
/// partially computed field or map.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrescriptionError {
    #[error("insufficient samples: found {found}, at least {required} required")]
    InsufficientSamples {
        found: usize,
        required: usize,
    },

    #[error("degenerate extent: padded sample extent is {width} x {height}")]
    DegenerateExtent {
        width: f64,
        height: f64,
    },

    #[error("invalid configuration: {key}={value} ({reason})")]
    InvalidConfiguration {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// Field names of samples that carry non-finite values.
    #[error("invalid samples, non-numeric fields: {}", fields.join(", "))]
    InvalidSamples {
        fields: Vec<String>,
    },

    #[error("sample at ({x}, {y}) has no counterpart in the {missing} collection")]
    UnpairedSample {
        x: f64,
        y: f64,
        missing: Quantity,
    },

    #[error("{values} values supplied for {coords} sample coordinates")]
    ValueCountMismatch {
        coords: usize,
        values: usize,
    },

    #[error("shape mismatch: expected {expected:?}, got {actual:?} for {quantity}")]
    ShapeMismatch {
        quantity: Quantity,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("non-finite {quantity} value at cell ({row}, {col})")]
    NonFiniteField {
        quantity: Quantity,
        row: usize,
        col: usize,
    },
}

impl PrescriptionError {
    pub(crate) fn invalid_config(key: &'static str, value: impl ToString, reason: &str) -> Self {
        PrescriptionError::InvalidConfiguration {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
