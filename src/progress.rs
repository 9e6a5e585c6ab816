use crate::difficulty::{tier_label, MAX_TIER, MIN_TIER};
use crate::problem::AnsweredProblem;
use crate::rules::Multiplier;
use crate::session::Session;
use crate::util::percentage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

pub const MASTERY_MIN_ATTEMPTS: u64 = 10;
pub const MASTERY_MIN_ACCURACY_PCT: f64 = 90.0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierStats {
    pub attempts: u64,
    pub correct: u64,
    pub total_time_ms: u64,
}

impl TierStats {
    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.correct as f64 / self.attempts as f64 * 100.0
    }

    pub fn average_time_ms(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.total_time_ms as f64 / self.attempts as f64)
    }

    pub fn is_mastered(&self) -> bool {
        self.attempts >= MASTERY_MIN_ATTEMPTS && self.accuracy() >= MASTERY_MIN_ACCURACY_PCT
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiplierStats {
    pub attempts: u64,
    pub correct: u64,
    pub current_streak: u32,
    pub best_streak: u32,
}

impl MultiplierStats {
    pub fn accuracy(&self) -> u32 {
        percentage(self.correct, self.attempts)
    }
}

/// Fastest correct answer within a tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestTime {
    pub time_ms: u64,
    pub problem_id: Uuid,
    pub operand1: u64,
    pub multiplier: Multiplier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestones {
    pub total_problems: u64,
    pub total_correct: u64,
    pub overall_accuracy: u32,
    pub tiers_unlocked: u8,
    pub tiers_mastered: u8,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl Default for Milestones {
    fn default() -> Self {
        Self {
            total_problems: 0,
            total_correct: 0,
            overall_accuracy: 0,
            tiers_unlocked: MIN_TIER,
            tiers_mastered: 0,
            current_streak: 0,
            longest_streak: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub tiers: BTreeMap<u8, TierStats>,
    pub multipliers: BTreeMap<Multiplier, MultiplierStats>,
    pub best_times: BTreeMap<u8, BestTime>,
    /// Every tier that has met the mastery bar at some point.
    pub mastered_tiers: BTreeSet<u8>,
    pub milestones: Milestones,
}

impl ProgressState {
    /// Fold one answered problem into the aggregate.
    pub fn record(&mut self, answered: &AnsweredProblem) {
        let tier = answered.tier();
        let multiplier = answered.multiplier();
        let correct = answered.is_correct;
        let time_ms = answered.time_taken_ms;

        let tier_stats = self.tiers.entry(tier).or_default();
        tier_stats.attempts += 1;
        tier_stats.total_time_ms += time_ms;
        if correct {
            tier_stats.correct += 1;
        }
        if tier_stats.is_mastered() {
            self.mastered_tiers.insert(tier);
        }

        let mult_stats = self.multipliers.entry(multiplier).or_default();
        mult_stats.attempts += 1;
        if correct {
            mult_stats.correct += 1;
            mult_stats.current_streak += 1;
            mult_stats.best_streak = mult_stats.best_streak.max(mult_stats.current_streak);
        } else {
            mult_stats.current_streak = 0;
        }

        if correct {
            let improves = self
                .best_times
                .get(&tier)
                .map_or(true, |best| time_ms < best.time_ms);
            if improves {
                self.best_times.insert(
                    tier,
                    BestTime {
                        time_ms,
                        problem_id: answered.problem.id,
                        operand1: answered.problem.operand1,
                        multiplier,
                    },
                );
            }
        }

        self.update_milestones(tier, correct);
    }

    fn update_milestones(&mut self, tier: u8, correct: bool) {
        let highest_cleared = self
            .tiers
            .iter()
            .filter(|(_, stats)| stats.correct > 0)
            .map(|(t, _)| *t)
            .max();
        let m = &mut self.milestones;

        m.total_problems += 1;
        if correct {
            m.total_correct += 1;
            m.current_streak += 1;
            m.longest_streak = m.longest_streak.max(m.current_streak);
        } else {
            m.current_streak = 0;
        }
        m.overall_accuracy = m
            .overall_accuracy
            .max(percentage(m.total_correct, m.total_problems));
        if let Some(cleared) = highest_cleared {
            m.tiers_unlocked = m.tiers_unlocked.max((cleared + 1).min(MAX_TIER));
        }
        m.tiers_mastered = self.mastered_tiers.len() as u8;

        tracing::debug!(tier, correct, total = m.total_problems, "progress recorded");
    }

    /// Live share of correct answers. The milestone only keeps its best value.
    pub fn accuracy(&self) -> u32 {
        percentage(self.milestones.total_correct, self.milestones.total_problems)
    }

    pub fn is_tier_unlocked(&self, tier: u8) -> bool {
        (MIN_TIER..=self.milestones.tiers_unlocked).contains(&tier)
    }

    /// Rebuild from stored session history, which is kept newest first.
    pub fn rebuild_from_sessions(sessions: &[Session]) -> Self {
        sessions
            .iter()
            .rev()
            .flat_map(Session::answered)
            .fold(Self::default(), fold)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let tiers = (MIN_TIER..=MAX_TIER)
            .map(|tier| {
                let stats = self.tiers.get(&tier).cloned().unwrap_or_default();
                TierMastery {
                    tier,
                    label: tier_label(tier).to_string(),
                    attempts: stats.attempts,
                    accuracy: percentage(stats.correct, stats.attempts),
                    average_time_ms: stats.average_time_ms(),
                    mastered: stats.is_mastered(),
                    unlocked: self.is_tier_unlocked(tier),
                }
            })
            .collect();

        let multipliers = self
            .multipliers
            .iter()
            .map(|(m, stats)| MultiplierPerformance {
                multiplier: *m,
                attempts: stats.attempts,
                correct: stats.correct,
                accuracy: stats.accuracy(),
                current_streak: stats.current_streak,
                best_streak: stats.best_streak,
            })
            .collect();

        let personal_bests = self
            .best_times
            .iter()
            .map(|(tier, best)| PersonalBest {
                tier: *tier,
                label: tier_label(*tier).to_string(),
                time_ms: best.time_ms,
                operand1: best.operand1,
                multiplier: best.multiplier,
            })
            .collect();

        ProgressSnapshot {
            tiers,
            multipliers,
            personal_bests,
            milestones: self.milestones.clone(),
        }
    }
}

/// Pure form of [`ProgressState::record`].
pub fn fold(mut state: ProgressState, answered: &AnsweredProblem) -> ProgressState {
    state.record(answered);
    state
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierMastery {
    pub tier: u8,
    pub label: String,
    pub attempts: u64,
    pub accuracy: u32,
    pub average_time_ms: Option<f64>,
    pub mastered: bool,
    pub unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiplierPerformance {
    pub multiplier: Multiplier,
    pub attempts: u64,
    pub correct: u64,
    pub accuracy: u32,
    pub current_streak: u32,
    pub best_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalBest {
    pub tier: u8,
    pub label: String,
    pub time_ms: u64,
    pub operand1: u64,
    pub multiplier: Multiplier,
}

/// Outbound view of the aggregate for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub tiers: Vec<TierMastery>,
    pub multipliers: Vec<MultiplierPerformance>,
    pub personal_bests: Vec<PersonalBest>,
    pub milestones: Milestones,
}
