use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use crate::config::RuleThresholds;
use crate::error::{PrescriptionError, Result};
use crate::model::field::{InterpolatedField, Quantity};
use crate::prescription::statistics::TierStatistics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    NoAction = 0,
    Light = 1,
    Heavy = 2,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::NoAction, Tier::Light, Tier::Heavy];

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u8) -> Option<Tier> {
        Tier::ALL.into_iter().find(|tier| tier.code() == code)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::NoAction => "no_action",
            Tier::Light => "light_treatment",
            Tier::Heavy => "heavy_treatment",
        }
    }
}

/// Why a cell ended up in its tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    /// Too close to the crop; density was not consulted.
    Protected,
    LowDensity,
    MediumDensity,
    HighDensity,
}

impl CellClass {
    pub fn tier(&self) -> Tier {
        match self {
            CellClass::Protected | CellClass::LowDensity => Tier::NoAction,
            CellClass::MediumDensity => Tier::Light,
            CellClass::HighDensity => Tier::Heavy,
        }
    }
}

/// Tier codes per grid cell, co-registered with the fields it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct PrescriptionMap {
    tiers: Array2<u8>,
}

impl PrescriptionMap {
    pub fn tiers(&self) -> &Array2<u8> {
        &self.tiers
    }

    pub fn into_tiers(self) -> Array2<u8> {
        self.tiers
    }

    pub fn shape(&self) -> (usize, usize) {
        self.tiers.dim()
    }

    pub fn tier_at(&self, row: usize, col: usize) -> Option<Tier> {
        self.tiers.get((row, col)).copied().and_then(Tier::from_code)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub map: PrescriptionMap,
    pub statistics: TierStatistics,
}

#[derive(Debug, Clone)]
pub struct RuleClassifier {
    thresholds: RuleThresholds,
}

impl RuleClassifier {
    pub fn new(thresholds: RuleThresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(RuleClassifier { thresholds })
    }

    pub fn thresholds(&self) -> &RuleThresholds {
        &self.thresholds
    }

    /// Protection first, then density bands. A value equal to a threshold falls
    /// into the higher class.
    pub fn classify_cell(&self, density: f64, distance: f64) -> CellClass {
        let t = &self.thresholds;
        if distance < t.distance_protect {
            CellClass::Protected
        } else if density < t.density_low {
            CellClass::LowDensity
        } else if density < t.density_high {
            CellClass::MediumDensity
        } else {
            CellClass::HighDensity
        }
    }

    pub fn classify(&self, density: &InterpolatedField, distance: &InterpolatedField) -> Result<Classification> {
        let shape = density.shape();
        if distance.shape() != shape {
            return Err(PrescriptionError::ShapeMismatch { quantity: Quantity::Distance, expected: shape, actual: distance.shape() });
        }
        check_finite(density)?;
        check_finite(distance)?;

        let mut tiers = Array2::<u8>::zeros(shape);
        let mut classes = Vec::with_capacity(tiers.len());
        Zip::from(&mut tiers)
            .and(density.values())
            .and(distance.values())
            .for_each(|tier, &d, &c| {
                let class = self.classify_cell(d, c);
                *tier = class.tier().code();
                classes.push(class);
            });

        let statistics = TierStatistics::from_classes(&classes);
        Ok(Classification { map: PrescriptionMap { tiers }, statistics })
    }
}

fn check_finite(field: &InterpolatedField) -> Result<()> {
    match field.values().indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), _)) => Err(PrescriptionError::NonFiniteField { quantity: field.quantity(), row, col }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use super::*;

    fn classifier() -> RuleClassifier {
        RuleClassifier::new(RuleThresholds::default()).unwrap()
    }

    fn fields(density: Array2<f64>, distance: Array2<f64>) -> (InterpolatedField, InterpolatedField) {
        (InterpolatedField::new(Quantity::Density, density), InterpolatedField::new(Quantity::Distance, distance))
    }

    #[test]
    fn test_precedence_and_bands() {
        let c = classifier();
        assert_eq!(c.classify_cell(100.0, 10.0), CellClass::Protected);
        assert_eq!(c.classify_cell(1.0, 10.0), CellClass::Protected);
        assert_eq!(c.classify_cell(1.0, 50.0), CellClass::LowDensity);
        assert_eq!(c.classify_cell(10.0, 50.0), CellClass::MediumDensity);
        assert_eq!(c.classify_cell(20.0, 50.0), CellClass::HighDensity);
    }

    #[test]
    fn test_threshold_boundaries() {
        let c = classifier();
        assert_eq!(c.classify_cell(5.0, 50.0).tier(), Tier::Light);
        assert_eq!(c.classify_cell(15.0, 50.0).tier(), Tier::Heavy);
        assert_eq!(c.classify_cell(20.0, 30.0), CellClass::HighDensity);
        assert_eq!(c.classify_cell(20.0, 29.999), CellClass::Protected);
    }

    #[test]
    fn test_classify_map_and_statistics() {
        let (density, distance) = fields(
            array![[1.0, 5.0, 14.9], [15.0, 40.0, 40.0]],
            array![[50.0, 50.0, 50.0], [50.0, 29.0, 30.0]],
        );
        let result = classifier().classify(&density, &distance).unwrap();
        assert_eq!(result.map.tiers(), &array![[0u8, 1, 1], [2, 0, 2]]);
        assert_eq!(result.map.tier_at(1, 1), Some(Tier::NoAction));
        assert_eq!(result.map.tier_at(5, 5), None);

        let stats = result.statistics;
        assert_eq!(stats.total_cells, 6);
        assert_eq!(stats.count(Tier::NoAction), 2);
        assert_eq!(stats.count(Tier::Light), 2);
        assert_eq!(stats.count(Tier::Heavy), 2);
        assert_eq!(stats.protected_cells, 1);
        assert_eq!(stats.low_density_cells, 1);
    }

    #[test]
    fn test_protection_overrides_any_density() {
        let (density, distance) = fields(
            array![[0.0, 5.0, 15.0, 1e6]],
            array![[0.0, 10.0, 29.0, -5.0]],
        );
        let result = classifier().classify(&density, &distance).unwrap();
        assert!(result.map.tiers().iter().all(|&t| t == 0));
        assert_eq!(result.statistics.protected_cells, 4);
    }

    #[test]
    fn test_shape_mismatch() {
        let (density, distance) = fields(array![[1.0, 2.0]], array![[1.0], [2.0]]);
        let err = classifier().classify(&density, &distance).unwrap_err();
        assert_eq!(err, PrescriptionError::ShapeMismatch { quantity: Quantity::Distance, expected: (1, 2), actual: (2, 1) });
    }

    #[test]
    fn test_non_finite_cell() {
        let (density, distance) = fields(array![[1.0, f64::NAN]], array![[40.0, 40.0]]);
        let err = classifier().classify(&density, &distance).unwrap_err();
        assert_eq!(err, PrescriptionError::NonFiniteField { quantity: Quantity::Density, row: 0, col: 1 });
    }

    #[test]
    fn test_invalid_thresholds() {
        let thresholds = RuleThresholds { density_low: 20.0, ..Default::default() };
        assert!(RuleClassifier::new(thresholds).is_err());
    }

    #[test]
    fn test_tier_codes() {
        assert_eq!(Tier::Heavy.code(), 2);
        assert_eq!(Tier::from_code(1), Some(Tier::Light));
        assert_eq!(Tier::from_code(3), None);
    }
}
