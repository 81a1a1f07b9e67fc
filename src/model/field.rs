use std::fmt;
use ndarray::Array2;
use ndarray_stats::QuantileExt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Density,
    Distance,
}

impl Quantity {
    pub fn name(&self) -> &'static str {
        match self {
            Quantity::Density => "density",
            Quantity::Distance => "distance",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Continuous values of one quantity over a grid. Row 0 is the northern edge.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedField {
    quantity: Quantity,
    values: Array2<f64>,
}

impl InterpolatedField {
    pub(crate) fn new(quantity: Quantity, values: Array2<f64>) -> Self {
        InterpolatedField { quantity, values }
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// `None` for an empty field or one containing NaN.
    pub fn summary(&self) -> Option<FieldSummary> {
        let min = *self.values.min().ok()?;
        let max = *self.values.max().ok()?;
        let mean = self.values.mean()?;
        Some(FieldSummary { min, max, mean })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;
    use super::*;

    #[test]
    fn test_summary() {
        let field = InterpolatedField::new(Quantity::Density, array![[1.0, 2.0], [3.0, 6.0]]);
        let summary = field.summary().unwrap();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 6.0);
        assert_relative_eq!(summary.mean, 3.0);
        assert_eq!(field.shape(), (2, 2));
    }

    #[test]
    fn test_summary_with_nan() {
        let field = InterpolatedField::new(Quantity::Distance, array![[1.0, f64::NAN]]);
        assert!(field.summary().is_none());
    }

    #[test]
    fn test_quantity_names() {
        assert_eq!(Quantity::Density.to_string(), "density");
        assert_eq!(serde_json::to_string(&Quantity::Distance).unwrap(), "\"distance\"");
    }
}
