//! ReelSequenceBuilder - the strip of entries for one spin
//!
//! ```text
//!   index:  0 .. F-1        F         F+1 .. F+T
//!           [ filler ]  [ winner ]  [  tail  ]
//!            sampled     assigned    sampled
//! ```
//!
//! The winner is never drawn: it is the authoritative payout, placed at index
//! `F`. Filler entries are drawn from the option set so the reel looks like
//! the distribution the player is betting on.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sl_protocol::SpinOutcome;

use crate::config::RevealConfig;
use crate::context::PayoutTables;
use crate::error::RevealResult;
use crate::rarity::{ClassificationPolicy, RarityClassifier, RarityMap, RarityTier};
use crate::sampler::{RandomSampler, SamplingMode, distinct_values, valid_weights};
use crate::stage::ReelMetrics;

/// One visible reel item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelEntry {
    pub value: u64,
    pub tier: RarityTier,
    pub position_index: usize,
}

/// Ordered entries for one spin with the winner at `winner_index`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReelSequence {
    pub entries: Vec<ReelEntry>,
    pub winner_index: usize,
    pub sampling: SamplingMode,
    pub policy: ClassificationPolicy,
}

impl ReelSequence {
    pub fn winner(&self) -> &ReelEntry {
        &self.entries[self.winner_index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTION RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Where a spin's option set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionsOrigin {
    /// The outcome's own `payoutOptions`
    Outcome,
    /// The `serverInfo` table row for the bet
    ServerTable,
    /// `{0, betAmount}`
    Fallback,
}

/// Option values and weights used to fill and classify a reel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutSource {
    pub options: Vec<u64>,
    /// Only present when valid for `options`
    pub weights: Option<Vec<f64>>,
    pub origin: OptionsOrigin,
}

impl PayoutSource {
    pub fn new(options: Vec<u64>, weights: Option<Vec<f64>>, origin: OptionsOrigin) -> Self {
        let weights = valid_weights(&options, weights.as_deref()).map(<[f64]>::to_vec);
        Self {
            options,
            weights,
            origin,
        }
    }

    /// Outcome options, else the table row for the bet, else `{0, bet}`
    pub fn resolve(outcome: &SpinOutcome, tables: &PayoutTables) -> Self {
        if !outcome.payout_options.is_empty() {
            return Self::new(
                outcome.payout_options.clone(),
                outcome.payout_weights.clone(),
                OptionsOrigin::Outcome,
            );
        }

        if let Some(row) = tables.options_for(outcome.bet_amount) {
            return Self::new(
                row.to_vec(),
                tables.weights_for(outcome.bet_amount).map(<[f64]>::to_vec),
                OptionsOrigin::ServerTable,
            );
        }

        log::debug!(
            "[Reel] No payout options for bet {}, using {{0, bet}}",
            outcome.bet_amount
        );
        Self::new(
            distinct_values(&[0, outcome.bet_amount]),
            None,
            OptionsOrigin::Fallback,
        )
    }

    pub fn classify(&self) -> RarityMap {
        RarityClassifier::classify(&self.options, self.weights.as_deref())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEQUENCE BUILDER
// ═══════════════════════════════════════════════════════════════════════════════

/// Builds the reel strip for a spin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReelSequenceBuilder {
    /// Entries before the winner
    pub filler_count: usize,
    /// Entries after the winner
    pub tail_count: usize,
}

impl ReelSequenceBuilder {
    pub fn new(filler_count: usize, tail_count: usize) -> Self {
        Self {
            filler_count,
            tail_count,
        }
    }

    pub fn from_config(config: &RevealConfig) -> Self {
        Self::new(config.filler_count, config.tail_count)
    }

    /// Build a strip whose winner is `payout_amount`
    pub fn build<R: Rng + ?Sized>(
        &self,
        source: &PayoutSource,
        payout_amount: u64,
        rng: &mut R,
    ) -> RevealResult<ReelSequence> {
        let sampler = RandomSampler::new(&source.options, source.weights.as_deref())?;
        let offset = rng.random_range(0..sampler.len());
        let sampler = sampler.rotated(offset);
        let rarity = source.classify();

        let total = self.filler_count + 1 + self.tail_count;
        let mut entries = Vec::with_capacity(total);
        for position_index in 0..total {
            let value = if position_index == self.filler_count {
                payout_amount
            } else {
                sampler.sample(rng)
            };
            entries.push(ReelEntry {
                value,
                tier: rarity.tier_of(value),
                position_index,
            });
        }

        Ok(ReelSequence {
            entries,
            winner_index: self.filler_count,
            sampling: sampler.mode(),
            policy: rarity.policy,
        })
    }

    /// Resolve the option set for `outcome` and build its strip
    pub fn build_for<R: Rng + ?Sized>(
        &self,
        outcome: &SpinOutcome,
        tables: &PayoutTables,
        rng: &mut R,
    ) -> RevealResult<ReelSequence> {
        let source = PayoutSource::resolve(outcome, tables);
        self.build(&source, outcome.payout_amount, rng)
    }
}

impl Default for ReelSequenceBuilder {
    fn default() -> Self {
        Self::from_config(&RevealConfig::default())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDLE PREVIEW
// ═══════════════════════════════════════════════════════════════════════════════

/// Looping strip shown while no reveal is in flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlePreview {
    pub entries: Vec<ReelEntry>,
    /// Entries per repetition of the tile
    pub tile_len: usize,
    /// Distance after which the loop repeats seamlessly (px)
    pub loop_distance: f64,
}

impl IdlePreview {
    /// Distinct options ascending, repeated to cover the viewport plus one tile
    pub fn build(options: &[u64], weights: Option<&[f64]>, metrics: ReelMetrics) -> Self {
        let metrics = metrics.sanitized();
        let rarity = RarityClassifier::classify(options, weights);

        let mut tile = distinct_values(options);
        tile.sort_unstable();
        if tile.is_empty() {
            return Self {
                entries: Vec::new(),
                tile_len: 0,
                loop_distance: 0.0,
            };
        }

        let tile_len = tile.len();
        let loop_distance = tile_len as f64 * metrics.item_width;
        let repeats = (metrics.viewport_width / loop_distance).ceil() as usize + 1;

        let entries = tile
            .iter()
            .cycle()
            .take(tile_len * repeats)
            .enumerate()
            .map(|(position_index, &value)| ReelEntry {
                value,
                tier: rarity.tier_of(value),
                position_index,
            })
            .collect();

        Self {
            entries,
            tile_len,
            loop_distance,
        }
    }

    /// Preview for a bet using the session tables (falls back to `{0, bet}`)
    pub fn for_bet(bet: u64, tables: &PayoutTables, metrics: ReelMetrics) -> Self {
        let source = PayoutSource::resolve(&SpinOutcome::new(bet, 0), tables);
        Self::build(&source.options, source.weights.as_deref(), metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn scenario_outcome() -> SpinOutcome {
        SpinOutcome::new(100, 50).with_options(
            vec![0, 20, 50, 80, 100],
            Some(vec![36.0, 50.0, 9.0, 4.0, 1.0]),
        )
    }

    #[test]
    fn test_winner_at_filler_index() {
        let builder = ReelSequenceBuilder::new(28, 8);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let seq = builder
            .build_for(&scenario_outcome(), &PayoutTables::default(), &mut rng)
            .unwrap();

        assert_eq!(seq.len(), 37);
        assert_eq!(seq.winner_index, 28);
        assert_eq!(seq.winner().value, 50);
        assert_eq!(seq.winner().tier, RarityTier::Rare);
        assert_eq!(seq.sampling, SamplingMode::Weighted);
        for (i, entry) in seq.entries.iter().enumerate() {
            assert_eq!(entry.position_index, i);
        }
    }

    #[test]
    fn test_winner_not_in_options() {
        // Authoritative value wins even if it is not one of the options
        let outcome = SpinOutcome::new(20, 777).with_options(vec![0, 10], None);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let seq = ReelSequenceBuilder::new(4, 2)
            .build_for(&outcome, &PayoutTables::default(), &mut rng)
            .unwrap();
        assert_eq!(seq.winner().value, 777);
        assert_eq!(seq.winner().tier, RarityTier::Uncommon);
        for entry in seq.entries.iter().filter(|e| e.position_index != 4) {
            assert!(entry.value == 0 || entry.value == 10);
        }
    }

    #[test]
    fn test_option_resolution_order() {
        let mut tables = PayoutTables::default();
        tables.payout_table.insert(100, vec![0, 40, 400]);
        tables.payout_weights.insert(100, vec![1.0, 1.0]);

        let source = PayoutSource::resolve(&scenario_outcome(), &tables);
        assert_eq!(source.origin, OptionsOrigin::Outcome);

        let source = PayoutSource::resolve(&SpinOutcome::new(100, 40), &tables);
        assert_eq!(source.origin, OptionsOrigin::ServerTable);
        assert_eq!(source.options, vec![0, 40, 400]);
        // Mismatched weights are dropped
        assert!(source.weights.is_none());

        let source = PayoutSource::resolve(&SpinOutcome::new(300, 0), &tables);
        assert_eq!(source.origin, OptionsOrigin::Fallback);
        assert_eq!(source.options, vec![0, 300]);

        let source = PayoutSource::resolve(&SpinOutcome::new(0, 0), &tables);
        assert_eq!(source.options, vec![0]);
    }

    #[test]
    fn test_empty_counts() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let seq = ReelSequenceBuilder::new(0, 0)
            .build_for(&SpinOutcome::new(20, 20), &PayoutTables::default(), &mut rng)
            .unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.winner_index, 0);
        assert_eq!(seq.winner().value, 20);
    }

    #[test]
    fn test_idle_preview_tile() {
        let preview = IdlePreview::build(&[100, 0, 20, 20, 50], None, ReelMetrics::default());
        assert_eq!(preview.tile_len, 4);
        assert_eq!(preview.loop_distance, 480.0);
        // ceil(600 / 480) + 1 = 3 repetitions
        assert_eq!(preview.entries.len(), 12);
        let values: Vec<u64> = preview.entries.iter().take(5).map(|e| e.value).collect();
        assert_eq!(values, vec![0, 20, 50, 100, 0]);
        // Loop distance is a whole number of items
        assert_eq!(preview.loop_distance % 120.0, 0.0);
    }

    #[test]
    fn test_idle_preview_for_bet_fallback() {
        let preview = IdlePreview::for_bet(500, &PayoutTables::default(), ReelMetrics::default());
        assert_eq!(preview.tile_len, 2);
        assert_eq!(preview.entries[0].value, 0);
        assert_eq!(preview.entries[1].value, 500);
    }
}
