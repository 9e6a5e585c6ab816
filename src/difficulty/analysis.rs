//! Tier distribution analysis for tuning the difficulty tables.
//!
//! Samples operands for every multiplier and digit count, scores them with
//! real carry counts from the rule engine and reports how the samples fall
//! into tiers.

use super::{tier_label, Difficulty, MAX_TIER, MIN_TIER};
use crate::digits::generate_number;
use crate::error::Result;
use crate::rules::{Multiplier, Rule};
use itertools::Itertools;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

pub const SAMPLED_DIGIT_COUNTS: std::ops::RangeInclusive<u32> = 2..=6;

/// A tier holding less than this share of samples is a dead zone.
pub const LOW_SHARE_PCT: f64 = 5.0;
/// A tier holding more than this share of samples is overcrowded.
pub const HIGH_SHARE_PCT: f64 = 25.0;
pub const MIN_TIERS_PER_MULTIPLIER: usize = 3;
const EXAMPLES_PER_TIER: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierExample {
    pub operand: u64,
    pub multiplier: Multiplier,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Default)]
pub struct TierDistribution {
    pub total: usize,
    pub tier_counts: BTreeMap<u8, usize>,
    pub coverage: BTreeMap<Multiplier, BTreeSet<u8>>,
    pub examples: BTreeMap<u8, Vec<TierExample>>,
}

/// Share of samples in tiers 1–3, 4–7 and 8–10.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandShares {
    pub beginner: f64,
    pub intermediate: f64,
    pub advanced: f64,
}

impl TierDistribution {
    fn record(&mut self, operand: u64, multiplier: Multiplier, difficulty: Difficulty) {
        let tier = difficulty.tier;
        self.total += 1;
        *self.tier_counts.entry(tier).or_insert(0) += 1;
        self.coverage.entry(multiplier).or_default().insert(tier);

        let examples = self.examples.entry(tier).or_default();
        if examples.len() < EXAMPLES_PER_TIER {
            examples.push(TierExample {
                operand,
                multiplier,
                difficulty,
            });
        }
    }

    pub fn count(&self, tier: u8) -> usize {
        self.tier_counts.get(&tier).copied().unwrap_or(0)
    }

    pub fn share(&self, tier: u8) -> f64 {
        self.share_of(tier..=tier)
    }

    fn share_of(&self, tiers: std::ops::RangeInclusive<u8>) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let count: usize = tiers.map(|t| self.count(t)).sum();
        count as f64 / self.total as f64 * 100.0
    }

    pub fn band_shares(&self) -> BandShares {
        BandShares {
            beginner: self.share_of(1..=3),
            intermediate: self.share_of(4..=7),
            advanced: self.share_of(8..=10),
        }
    }

    pub fn underpopulated_tiers(&self) -> Vec<u8> {
        (MIN_TIER..=MAX_TIER)
            .filter(|&t| self.share(t) < LOW_SHARE_PCT)
            .collect()
    }

    pub fn overpopulated_tiers(&self) -> Vec<u8> {
        (MIN_TIER..=MAX_TIER)
            .filter(|&t| self.share(t) > HIGH_SHARE_PCT)
            .collect()
    }

    /// Multipliers whose samples span fewer than three tiers.
    pub fn narrow_multipliers(&self) -> Vec<Multiplier> {
        Multiplier::ALL
            .iter()
            .copied()
            .filter(|m| {
                self.coverage
                    .get(m)
                    .map_or(0, BTreeSet::len)
                    < MIN_TIERS_PER_MULTIPLIER
            })
            .collect()
    }

    pub fn recommendations(&self) -> Vec<String> {
        let mut out = Vec::new();
        let bands = self.band_shares();

        if !self.underpopulated_tiers().is_empty() {
            out.push("Consider adjusting tier boundaries to ensure all tiers are reachable".to_string());
        }
        if !self.overpopulated_tiers().is_empty() {
            out.push("Rebalance tier boundaries to prevent overcrowding in certain tiers".to_string());
        }
        if bands.beginner < 20.0 {
            out.push("Beginner tier range may be too narrow - consider widening Tier 1-3 boundaries".to_string());
        }
        if bands.advanced < 10.0 {
            out.push("Advanced tiers may be too hard to reach - consider lowering Tier 8-10 thresholds".to_string());
        }
        out
    }

    /// Human-readable report, one line per tier and per multiplier.
    pub fn report(&self) -> Vec<String> {
        let mut lines = vec![format!("Total problems analyzed: {}", self.total)];

        for tier in MIN_TIER..=MAX_TIER {
            lines.push(format!(
                "Tier {:>2} [{:<12}]: {:>5.1}% ({:>4} problems)",
                tier,
                tier_label(tier),
                self.share(tier),
                self.count(tier)
            ));
        }

        for (m, tiers) in &self.coverage {
            let (lo, hi) = tiers
                .iter()
                .minmax()
                .into_option()
                .map_or((0, 0), |(lo, hi)| (*lo, *hi));
            lines.push(format!(
                "{:>3}: Tier {}-{} ({} tiers covered) - {}",
                m.to_string(),
                lo,
                hi,
                tiers.len(),
                tiers.iter().join(", ")
            ));
        }
        lines
    }
}

/// Score `samples_per_config` random operands for every multiplier and
/// every digit count in [`SAMPLED_DIGIT_COUNTS`].
pub fn analyze<R: Rng + ?Sized>(rng: &mut R, samples_per_config: usize) -> Result<TierDistribution> {
    let mut distribution = TierDistribution::default();

    for m in Multiplier::ALL {
        for digits in SAMPLED_DIGIT_COUNTS {
            for _ in 0..samples_per_config {
                let operand = generate_number(rng, digits)?;
                let trace = m.show_steps(operand)?;
                let difficulty = Difficulty::finalized(operand, m, &trace.steps);
                distribution.record(operand, m, difficulty);
            }
        }
    }

    tracing::debug!(
        total = distribution.total,
        underpopulated = ?distribution.underpopulated_tiers(),
        "tier distribution sampled"
    );
    Ok(distribution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_analyze_counts_every_sample() {
        let mut rng = StdRng::seed_from_u64(42);
        let dist = analyze(&mut rng, 20).unwrap();
        assert_eq!(dist.total, 10 * 5 * 20);
        let counted: usize = dist.tier_counts.values().sum();
        assert_eq!(counted, dist.total);
        assert_eq!(dist.coverage.len(), Multiplier::ALL.len());
    }

    #[test]
    fn test_band_shares_sum_to_hundred() {
        let mut rng = StdRng::seed_from_u64(3);
        let dist = analyze(&mut rng, 10).unwrap();
        let bands = dist.band_shares();
        let sum = bands.beginner + bands.intermediate + bands.advanced;
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_nine_reaches_top_tiers_and_eleven_stays_low() {
        let mut rng = StdRng::seed_from_u64(11);
        let dist = analyze(&mut rng, 30).unwrap();
        let nine = &dist.coverage[&Multiplier::Nine];
        let eleven = &dist.coverage[&Multiplier::Eleven];
        assert!(nine.iter().all(|&t| t >= 7));
        assert!(eleven.iter().all(|&t| t <= 6));
    }

    #[test]
    fn test_examples_are_bounded() {
        let mut rng = StdRng::seed_from_u64(5);
        let dist = analyze(&mut rng, 10).unwrap();
        for (tier, examples) in &dist.examples {
            assert!(examples.len() <= EXAMPLES_PER_TIER);
            for ex in examples {
                assert_eq!(ex.difficulty.tier, *tier);
            }
        }
    }

    #[test]
    fn test_empty_distribution_report() {
        let dist = TierDistribution::default();
        assert_eq!(dist.share(3), 0.0);
        assert_eq!(dist.underpopulated_tiers().len(), 10);
        assert_eq!(dist.narrow_multipliers().len(), 10);
        assert_eq!(dist.report().len(), 11);
    }
}
