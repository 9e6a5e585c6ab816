use crate::difficulty::{calculate_partial, check_tier, Difficulty};
use crate::digits::{generate_number, random_int, MAX_DIGITS};
use crate::error::{Result, TrainerError};
use crate::problem::Problem;
use crate::rules::{Multiplier, Rule};
use crate::session::{SessionConfig, Target};
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::RangeInclusive;

/// Digit counts tried when sampling for a tier.
pub const TIER_DIGIT_RANGE: RangeInclusive<u32> = 2..=6;
pub const DEFAULT_MAX_ATTEMPTS: usize = 50;

/// Outcome of rejection sampling for a tier.
#[derive(Debug, Clone)]
pub struct TierSample {
    pub problem: Problem,
    pub attempts: usize,
    pub on_target: bool,
}

/// Builds problems from an owned random source.
pub struct ProblemGenerator<R = ThreadRng> {
    rng: R,
    max_attempts: usize,
}

impl ProblemGenerator<ThreadRng> {
    pub fn new() -> Self {
        Self::with_rng(rand::thread_rng())
    }
}

impl Default for ProblemGenerator<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> ProblemGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Attempts used by [`generate_set`](Self::generate_set) when targeting a tier.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// A problem with a uniformly drawn digit count in `min_digits..=max_digits`
    /// and a partial difficulty.
    pub fn generate(
        &mut self,
        multiplier: Multiplier,
        min_digits: u32,
        max_digits: u32,
    ) -> Result<Problem> {
        check_digit_range(min_digits, max_digits)?;
        let digit_count = random_int(&mut self.rng, min_digits.into(), max_digits.into()) as u32;
        let operand = generate_number(&mut self.rng, digit_count)?;
        Problem::new(operand, multiplier, calculate_partial(operand, multiplier))
    }

    /// A problem whose finalized tier matches `target_tier`, or the last
    /// sample once `max_attempts` are used up.
    pub fn generate_for_tier(
        &mut self,
        multiplier: Multiplier,
        target_tier: u8,
        max_attempts: usize,
    ) -> Result<Problem> {
        Ok(self.sample_for_tier(multiplier, target_tier, max_attempts)?.problem)
    }

    /// Like [`generate_for_tier`](Self::generate_for_tier) but reports whether
    /// the tier was hit and how many samples it took.
    pub fn sample_for_tier(
        &mut self,
        multiplier: Multiplier,
        target_tier: u8,
        max_attempts: usize,
    ) -> Result<TierSample> {
        check_tier(target_tier)?;

        let mut problem = self.sample_finalized(multiplier)?;
        let mut attempts = 1;
        while problem.tier() != target_tier && attempts < max_attempts {
            problem = self.sample_finalized(multiplier)?;
            attempts += 1;
        }

        let on_target = problem.tier() == target_tier;
        if on_target {
            tracing::debug!(multiplier = %multiplier, target_tier, attempts, "tier sample accepted");
        } else {
            tracing::warn!(
                multiplier = %multiplier,
                target_tier,
                actual_tier = problem.tier(),
                attempts,
                "tier target missed, keeping last sample"
            );
        }

        Ok(TierSample {
            problem,
            attempts,
            on_target,
        })
    }

    fn sample_finalized(&mut self, multiplier: Multiplier) -> Result<Problem> {
        let digit_count = random_int(
            &mut self.rng,
            (*TIER_DIGIT_RANGE.start()).into(),
            (*TIER_DIGIT_RANGE.end()).into(),
        ) as u32;
        let operand = generate_number(&mut self.rng, digit_count)?;
        let trace = multiplier.show_steps(operand)?;
        let difficulty = Difficulty::finalized(operand, multiplier, &trace.steps);
        Problem::new(operand, multiplier, difficulty)
    }

    /// Problems for a whole session, in generation order.
    pub fn generate_set(&mut self, config: &SessionConfig) -> Result<Vec<Problem>> {
        config.validate()?;

        let mut problems = Vec::with_capacity(config.problem_count);
        for _ in 0..config.problem_count {
            let multiplier = *config
                .multipliers
                .choose(&mut self.rng)
                .ok_or(TrainerError::EmptyMultipliers)?;

            let problem = match config.target {
                Target::Tier(tier) => self.generate_for_tier(multiplier, tier, self.max_attempts)?,
                Target::Digits { min, max } => {
                    let mut problem = self.generate(multiplier, min, max)?;
                    problem.finalize_difficulty()?;
                    problem
                }
            };
            problems.push(problem);
        }

        tracing::debug!(count = problems.len(), "problem set generated");
        Ok(problems)
    }
}

pub fn check_digit_range(min_digits: u32, max_digits: u32) -> Result<()> {
    for count in [min_digits, max_digits] {
        if count == 0 || count > MAX_DIGITS {
            return Err(TrainerError::DigitCountOutOfRange(count));
        }
    }
    if min_digits > max_digits {
        return Err(TrainerError::InvertedDigitRange {
            min: min_digits,
            max: max_digits,
        });
    }
    Ok(())
}
