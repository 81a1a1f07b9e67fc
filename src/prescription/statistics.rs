use serde::{Deserialize, Serialize};
use crate::prescription::rules::{CellClass, Tier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierCount {
    pub tier: u8,
    pub label: String,
    pub cells: usize,
    pub percent: f64,
}

/// Cell counts of one prescription map. `protected_cells` and `low_density_cells`
/// partition the no-action tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierStatistics {
    pub total_cells: usize,
    pub tiers: Vec<TierCount>,
    pub protected_cells: usize,
    pub protected_percent: f64,
    pub low_density_cells: usize,
    pub low_density_percent: f64,
}

impl TierStatistics {
    pub fn from_classes(classes: &[CellClass]) -> Self {
        let total_cells = classes.len();
        let mut per_tier = [0_usize; 3];
        let mut protected_cells = 0;
        for class in classes {
            per_tier[class.tier().code() as usize] += 1;
            if *class == CellClass::Protected {
                protected_cells += 1;
            }
        }
        let low_density_cells = per_tier[Tier::NoAction.code() as usize] - protected_cells;

        let tiers = Tier::ALL.iter().map(|tier| {
            let cells = per_tier[tier.code() as usize];
            TierCount { tier: tier.code(), label: tier.label().to_string(), cells, percent: percent(cells, total_cells) }
        }).collect();

        TierStatistics {
            total_cells,
            tiers,
            protected_cells,
            protected_percent: percent(protected_cells, total_cells),
            low_density_cells,
            low_density_percent: percent(low_density_cells, total_cells),
        }
    }

    pub fn count(&self, tier: Tier) -> usize {
        self.tier(tier).map_or(0, |t| t.cells)
    }

    pub fn percent(&self, tier: Tier) -> f64 {
        self.tier(tier).map_or(0.0, |t| t.percent)
    }

    fn tier(&self, tier: Tier) -> Option<&TierCount> {
        self.tiers.iter().find(|t| t.tier == tier.code())
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
