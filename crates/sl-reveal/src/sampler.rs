//! RandomSampler - weighted / uniform draw over payout values
//!
//! Pure apart from the random source, which is always passed in so tests can
//! use a seeded generator.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{RevealError, RevealResult};

/// One possible result for a bet size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutOption {
    pub value: u64,
    pub weight: f64,
}

/// How a sampler picks values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// Probability proportional to weight
    Weighted,
    /// Equal probability per distinct value
    Uniform,
}

/// Weights usable for weighted sampling: present, parallel to `values`,
/// finite, non-negative, and with a positive total.
pub fn valid_weights<'a>(values: &[u64], weights: Option<&'a [f64]>) -> Option<&'a [f64]> {
    let weights = weights?;
    if weights.len() != values.len() {
        return None;
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return None;
    }
    let total: f64 = weights.iter().sum();
    (total > 0.0).then_some(weights)
}

/// Distinct values in first-seen order
pub fn distinct_values(values: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(values.len());
    for &value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

/// Discrete sampler over payout values
#[derive(Debug, Clone)]
pub struct RandomSampler {
    options: Vec<PayoutOption>,
    /// Running weight totals, parallel to `options`
    cumulative: Vec<f64>,
    mode: SamplingMode,
}

impl RandomSampler {
    /// Build a sampler. Invalid weights fall back to uniform over distinct values.
    pub fn new(values: &[u64], weights: Option<&[f64]>) -> RevealResult<Self> {
        if values.is_empty() {
            return Err(RevealError::EmptyOptions);
        }

        let sampler = match valid_weights(values, weights) {
            Some(weights) => {
                let options = values
                    .iter()
                    .zip(weights)
                    .map(|(&value, &weight)| PayoutOption { value, weight })
                    .collect();
                Self::from_options(options, SamplingMode::Weighted)
            }
            None => {
                if weights.is_some() {
                    log::debug!("[Sampler] Weights unusable, sampling uniformly");
                }
                let options = distinct_values(values)
                    .into_iter()
                    .map(|value| PayoutOption { value, weight: 1.0 })
                    .collect();
                Self::from_options(options, SamplingMode::Uniform)
            }
        };

        Ok(sampler)
    }

    fn from_options(options: Vec<PayoutOption>, mode: SamplingMode) -> Self {
        let mut total = 0.0;
        let cumulative = options
            .iter()
            .map(|o| {
                total += o.weight;
                total
            })
            .collect();

        Self {
            options,
            cumulative,
            mode,
        }
    }

    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    /// Number of sampling buckets
    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn options(&self) -> &[PayoutOption] {
        &self.options
    }

    fn total_weight(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Same distribution with the option order rotated left by `offset`
    pub fn rotated(&self, offset: usize) -> Self {
        let mut options = self.options.clone();
        if !options.is_empty() {
            let shift = offset % options.len();
            options.rotate_left(shift);
        }
        Self::from_options(options, self.mode)
    }

    /// Draw one value
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let roll = rng.random::<f64>() * self.total_weight();
        let index = self.cumulative.partition_point(|&c| c <= roll);
        self.options[index.min(self.options.len() - 1)].value
    }

    /// Probability of drawing `value`
    pub fn probability(&self, value: u64) -> f64 {
        let total = self.total_weight();
        if total <= 0.0 {
            return 0.0;
        }
        let weight: f64 = self
            .options
            .iter()
            .filter(|o| o.value == value)
            .map(|o| o.weight)
            .sum();
        weight / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_weighted_mode() {
        let sampler = RandomSampler::new(&[0, 20, 50], Some(&[2.0, 1.0, 1.0])).unwrap();
        assert_eq!(sampler.mode(), SamplingMode::Weighted);
        assert_eq!(sampler.probability(0), 0.5);
        assert_eq!(sampler.probability(20), 0.25);
    }

    #[test]
    fn test_large_n_converges_to_weights() {
        let values = [0, 20, 50, 80, 100];
        let weights = [36.0, 50.0, 9.0, 4.0, 1.0];
        let sampler = RandomSampler::new(&values, Some(&weights)).unwrap().rotated(3);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        const DRAWS: usize = 100_000;
        let mut counts = [0usize; 5];
        for _ in 0..DRAWS {
            let v = sampler.sample(&mut rng);
            let i = values.iter().position(|&x| x == v).unwrap();
            counts[i] += 1;
        }

        for (count, weight) in counts.iter().zip(weights) {
            let observed = *count as f64 / DRAWS as f64;
            approx::assert_abs_diff_eq!(observed, weight / 100.0, epsilon = 0.01);
        }
    }

    #[test]
    fn test_uniform_fallbacks() {
        // Missing
        let s = RandomSampler::new(&[0, 20, 20, 50], None).unwrap();
        assert_eq!(s.mode(), SamplingMode::Uniform);
        assert_eq!(s.len(), 3);

        // Length mismatch
        let s = RandomSampler::new(&[0, 20], Some(&[1.0])).unwrap();
        assert_eq!(s.mode(), SamplingMode::Uniform);

        // Zero total
        let s = RandomSampler::new(&[0, 20], Some(&[0.0, 0.0])).unwrap();
        assert_eq!(s.mode(), SamplingMode::Uniform);

        // Negative or non-finite
        let s = RandomSampler::new(&[0, 20], Some(&[-1.0, 3.0])).unwrap();
        assert_eq!(s.mode(), SamplingMode::Uniform);
        let s = RandomSampler::new(&[0, 20], Some(&[f64::NAN, 3.0])).unwrap();
        assert_eq!(s.mode(), SamplingMode::Uniform);
    }

    #[test]
    fn test_empty_values() {
        assert!(matches!(
            RandomSampler::new(&[], None),
            Err(RevealError::EmptyOptions)
        ));
    }

    #[test]
    fn test_zero_weight_never_drawn() {
        let sampler = RandomSampler::new(&[1, 2, 3], Some(&[1.0, 0.0, 1.0])).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..5_000 {
            assert_ne!(sampler.sample(&mut rng), 2);
        }
    }

    #[test]
    fn test_rotation_keeps_distribution() {
        let sampler = RandomSampler::new(&[0, 20, 50, 80], Some(&[4.0, 3.0, 2.0, 1.0])).unwrap();
        let rotated = sampler.rotated(6);
        assert_eq!(rotated.options()[0].value, 50);
        for value in [0, 20, 50, 80] {
            assert!((sampler.probability(value) - rotated.probability(value)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_seeded_draws_repeat() {
        let sampler = RandomSampler::new(&[0, 20, 50, 80, 100], None).unwrap();
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        let first: Vec<u64> = (0..32).map(|_| sampler.sample(&mut a)).collect();
        let second: Vec<u64> = (0..32).map(|_| sampler.sample(&mut b)).collect();
        assert_eq!(first, second);
    }
}
