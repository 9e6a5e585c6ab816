pub mod analysis;

use crate::digits::digit_count;
use crate::error::{Result, TrainerError};
use crate::rules::{count_carries, Multiplier, Step};
use serde::{Deserialize, Serialize};

pub const MIN_TIER: u8 = 1;
pub const MAX_TIER: u8 = 10;

/// Tier `i` covers scores in `TIER_BOUNDARIES[i - 1]..TIER_BOUNDARIES[i]`.
pub const TIER_BOUNDARIES: [u32; 11] = [0, 80, 110, 140, 180, 220, 260, 281, 311, 361, 999];

pub const TIER_LABELS: [&str; 11] = [
    "",
    "Beginner",
    "Easy",
    "Basic",
    "Developing",
    "Intermediate",
    "Moderate",
    "Challenging",
    "Advanced",
    "Expert",
    "Master",
];

/// Perceived rule difficulty, not algorithmic cost.
pub const MULTIPLIER_COMPLEXITY: [(Multiplier, u32); 10] = [
    (Multiplier::Two, 1),
    (Multiplier::Three, 2),
    (Multiplier::Four, 3),
    (Multiplier::Five, 4),
    (Multiplier::Six, 5),
    (Multiplier::Seven, 7),
    (Multiplier::Eight, 6),
    (Multiplier::Nine, 10),
    (Multiplier::Eleven, 1),
    (Multiplier::Twelve, 2),
];

pub const MULTIPLIER_WEIGHT: u32 = 25;
pub const DIGIT_WEIGHT: u32 = 15;
pub const CARRY_WEIGHT: u32 = 10;
pub const MAX_COUNTED_CARRIES: u32 = 10;

pub fn complexity(multiplier: Multiplier) -> u32 {
    MULTIPLIER_COMPLEXITY
        .iter()
        .find(|(m, _)| *m == multiplier)
        .map_or(0, |(_, c)| *c)
}

/// Smallest tier whose upper boundary exceeds `score`; saturates at the top tier.
pub fn tier_from_score(score: u32) -> u8 {
    TIER_BOUNDARIES
        .iter()
        .skip(1)
        .position(|&bound| score < bound)
        .map_or(MAX_TIER, |idx| (idx as u8 + 1).min(MAX_TIER))
}

pub fn tier_label(tier: u8) -> &'static str {
    TIER_LABELS.get(usize::from(tier)).copied().unwrap_or("")
}

pub fn check_tier(tier: u8) -> Result<u8> {
    if (MIN_TIER..=MAX_TIER).contains(&tier) {
        Ok(tier)
    } else {
        Err(TrainerError::TierOutOfRange(tier))
    }
}

/// Sanity checks for the tuning tables.
pub fn validate_tables() -> std::result::Result<(), String> {
    if TIER_BOUNDARIES[0] != 0 {
        return Err("tier boundaries must start at 0".into());
    }
    if TIER_BOUNDARIES.windows(2).any(|w| w[0] >= w[1]) {
        return Err("tier boundaries must be strictly ascending".into());
    }
    if TIER_BOUNDARIES.len() != usize::from(MAX_TIER) + 1
        || TIER_LABELS.len() != TIER_BOUNDARIES.len()
    {
        return Err("expected one boundary and one label per tier".into());
    }
    if TIER_LABELS.iter().skip(1).any(|label| label.is_empty()) {
        return Err("every tier needs a label".into());
    }
    for m in Multiplier::ALL {
        let entries = MULTIPLIER_COMPLEXITY
            .iter()
            .filter(|(candidate, _)| *candidate == m)
            .count();
        if entries != 1 {
            return Err(format!("{m} needs exactly one complexity entry, found {entries}"));
        }
        if complexity(m) == 0 {
            return Err(format!("{m} has zero complexity"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub multiplier_score: u32,
    pub digit_score: u32,
    pub carry_score: u32,
    pub carry_count: u32,
}

/// Score and tier of a problem. `tier_label` stays empty until carry
/// information has been folded in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Difficulty {
    pub score: u32,
    pub tier: u8,
    pub tier_label: String,
    pub breakdown: Breakdown,
}

impl Difficulty {
    /// Score from multiplier and digit count only.
    pub fn partial(operand: u64, multiplier: Multiplier) -> Self {
        let multiplier_score = complexity(multiplier) * MULTIPLIER_WEIGHT;
        let digit_score = digit_count(operand) * DIGIT_WEIGHT;
        let score = multiplier_score + digit_score;

        Self {
            score,
            tier: tier_from_score(score),
            tier_label: String::new(),
            breakdown: Breakdown {
                multiplier_score,
                digit_score,
                carry_score: 0,
                carry_count: 0,
            },
        }
    }

    /// Fold in the carry count and re-derive tier and label from the final score.
    /// Calling it again replaces the previous carry contribution.
    pub fn add_carry_info(&mut self, carry_count: usize) {
        let carry_count = u32::try_from(carry_count).unwrap_or(u32::MAX);
        let carry_score = carry_count.min(MAX_COUNTED_CARRIES) * CARRY_WEIGHT;

        self.score = self.breakdown.multiplier_score + self.breakdown.digit_score + carry_score;
        self.tier = tier_from_score(self.score);
        self.tier_label = tier_label(self.tier).to_string();
        self.breakdown.carry_score = carry_score;
        self.breakdown.carry_count = carry_count;
    }

    pub fn add_carry_info_from_steps(&mut self, steps: &[Step]) {
        self.add_carry_info(count_carries(steps));
    }

    /// Partial score finalized with the carries of `steps`.
    pub fn finalized(operand: u64, multiplier: Multiplier, steps: &[Step]) -> Self {
        let mut difficulty = Self::partial(operand, multiplier);
        difficulty.add_carry_info_from_steps(steps);
        difficulty
    }

    pub fn is_finalized(&self) -> bool {
        !self.tier_label.is_empty()
    }
}

pub fn calculate_partial(operand: u64, multiplier: Multiplier) -> Difficulty {
    Difficulty::partial(operand, multiplier)
}
