//! RarityClassifier - payout value → presentation tier
//!
//! Two policies:
//! - **Weighted**: the rarer a value is, the higher its tier. Only the three
//!   rarest nonzero values get a named tier above `uncommon`.
//! - **Unweighted**: tiers by percentile of the value among nonzero values.
//!
//! Value `0` is always `common` under either policy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sampler::{distinct_values, valid_weights};

/// Presentation tier of a payout value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarityTier {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl RarityTier {
    pub const ALL: [RarityTier; 5] = [
        Self::Common,
        Self::Uncommon,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Uncommon => "Uncommon",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
        }
    }

    /// Rank, 0 (common) to 4 (legendary)
    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// Visual effect intensity of the winner emphasis (0.0 - 1.0)
    pub fn emphasis_intensity(&self) -> f64 {
        match self {
            Self::Common => 0.2,
            Self::Uncommon => 0.4,
            Self::Rare => 0.6,
            Self::Epic => 0.8,
            Self::Legendary => 1.0,
        }
    }

    /// Tier of a value missing from a map
    pub fn unknown(value: u64) -> Self {
        if value == 0 { Self::Common } else { Self::Uncommon }
    }
}

impl std::fmt::Display for RarityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which classification rule produced a map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPolicy {
    Weighted,
    Unweighted,
}

/// Value → tier lookup for one option set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarityMap {
    pub tiers: BTreeMap<u64, RarityTier>,
    pub policy: ClassificationPolicy,
}

impl RarityMap {
    pub fn tier_of(&self, value: u64) -> RarityTier {
        self.tiers
            .get(&value)
            .copied()
            .unwrap_or_else(|| RarityTier::unknown(value))
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

/// Stateless tier classifier
pub struct RarityClassifier;

impl RarityClassifier {
    /// Classify every distinct value of an option set
    pub fn classify(values: &[u64], weights: Option<&[f64]>) -> RarityMap {
        match valid_weights(values, weights) {
            Some(weights) => Self::weighted(values, weights),
            None => Self::unweighted(values),
        }
    }

    fn weighted(values: &[u64], weights: &[f64]) -> RarityMap {
        let mut aggregated: BTreeMap<u64, f64> = BTreeMap::new();
        for (&value, &weight) in values.iter().zip(weights) {
            *aggregated.entry(value).or_insert(0.0) += weight;
        }

        let mut tiers = BTreeMap::new();
        let mut nonzero: Vec<(u64, f64)> = Vec::with_capacity(aggregated.len());
        for (value, weight) in aggregated {
            if value == 0 {
                tiers.insert(0, RarityTier::Common);
            } else {
                nonzero.push((value, weight));
            }
        }

        // Rarest first; equal weights rank the larger value rarer
        nonzero.sort_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)));

        for (rank, (value, _)) in nonzero.into_iter().enumerate() {
            let tier = match rank {
                0 => RarityTier::Legendary,
                1 => RarityTier::Epic,
                2 => RarityTier::Rare,
                _ => RarityTier::Uncommon,
            };
            tiers.insert(value, tier);
        }

        RarityMap {
            tiers,
            policy: ClassificationPolicy::Weighted,
        }
    }

    fn unweighted(values: &[u64]) -> RarityMap {
        let mut tiers = BTreeMap::new();
        let mut nonzero = Vec::new();
        for value in distinct_values(values) {
            if value == 0 {
                tiers.insert(0, RarityTier::Common);
            } else {
                nonzero.push(value);
            }
        }
        nonzero.sort_unstable();

        let n = nonzero.len();
        for (index, value) in nonzero.into_iter().enumerate() {
            let tier = if n <= 1 {
                RarityTier::Legendary
            } else {
                let p = index as f64 / (n - 1) as f64;
                if p < 0.25 {
                    RarityTier::Uncommon
                } else if p < 0.5 {
                    RarityTier::Rare
                } else if p < 0.75 {
                    RarityTier::Epic
                } else {
                    RarityTier::Legendary
                }
            };
            tiers.insert(value, tier);
        }

        RarityMap {
            tiers,
            policy: ClassificationPolicy::Unweighted,
        }
    }
}
