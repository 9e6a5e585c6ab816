use crate::difficulty::check_tier;
use crate::error::{Result, TrainerError};
use crate::generator::{check_digit_range, ProblemGenerator};
use crate::problem::{AnsweredProblem, Problem};
use crate::rules::Multiplier;
use crate::util::{mean, percentage, std_dev};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Presentation mode; the engine treats every mode the same.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Mode {
    #[default]
    Easy,
    Standard,
    Hard,
    Extreme,
}

/// What a session aims its problems at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Target {
    Tier(u8),
    Digits {
        #[serde(rename = "minDigits")]
        min: u32,
        #[serde(rename = "maxDigits")]
        max: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub multipliers: Vec<Multiplier>,
    pub target: Target,
    #[serde(default)]
    pub mode: Mode,
    pub problem_count: usize,
}

impl SessionConfig {
    /// Build a config from raw multiplier values as entered by a user.
    pub fn from_values(
        multipliers: &[u32],
        target: Target,
        mode: Option<Mode>,
        problem_count: usize,
    ) -> Result<Self> {
        let multipliers = multipliers
            .iter()
            .map(|&v| Multiplier::from_value(v))
            .collect::<Result<Vec<_>>>()?;
        let config = Self {
            multipliers,
            target,
            mode: mode.unwrap_or_default(),
            problem_count,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.multipliers.is_empty() {
            return Err(TrainerError::EmptyMultipliers);
        }
        match self.target {
            Target::Tier(tier) => {
                check_tier(tier)?;
            }
            Target::Digits { min, max } => check_digit_range(min, max)?,
        }
        if self.problem_count == 0 {
            return Err(TrainerError::ZeroProblemCount);
        }
        Ok(())
    }
}

/// A session slot is either still waiting for an answer or answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionProblem {
    Answered(AnsweredProblem),
    Pending(Problem),
}

impl SessionProblem {
    pub fn problem(&self) -> &Problem {
        match self {
            Self::Answered(a) => &a.problem,
            Self::Pending(p) => p,
        }
    }

    pub fn answered(&self) -> Option<&AnsweredProblem> {
        match self {
            Self::Answered(a) => Some(a),
            Self::Pending(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
    pub accuracy: u32,
    pub avg_time_ms: f64,
    pub time_std_dev_ms: f64,
}

/// A pre-generated batch of problems answered in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub config: SessionConfig,
    pub problems: Vec<SessionProblem>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Session {
    pub fn start<R: Rng>(config: SessionConfig, generator: &mut ProblemGenerator<R>) -> Result<Self> {
        let problems = generator.generate_set(&config)?;
        tracing::info!(
            problems = problems.len(),
            mode = %config.mode,
            "session started"
        );
        Ok(Self::from_problems(config, problems))
    }

    pub fn from_problems(config: SessionConfig, problems: Vec<Problem>) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            problems: problems.into_iter().map(SessionProblem::Pending).collect(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        self.problems
            .iter()
            .position(|p| matches!(p, SessionProblem::Pending(_)))
    }

    pub fn current(&self) -> Option<&Problem> {
        self.current_index().map(|idx| self.problems[idx].problem())
    }

    /// Answer the current problem and return the answered record.
    pub fn submit(&mut self, user_answer: u64, time_taken_ms: u64) -> Result<&AnsweredProblem> {
        if self.end_time.is_some() {
            return Err(TrainerError::SessionComplete);
        }
        let idx = self.current_index().ok_or(TrainerError::SessionComplete)?;

        let answered = match &self.problems[idx] {
            SessionProblem::Pending(problem) => problem.clone().submit(user_answer, time_taken_ms),
            SessionProblem::Answered(_) => return Err(TrainerError::SessionComplete),
        };
        self.problems[idx] = SessionProblem::Answered(answered);

        match &self.problems[idx] {
            SessionProblem::Answered(answered) => Ok(answered),
            SessionProblem::Pending(_) => Err(TrainerError::SessionComplete),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current_index().is_none()
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// Stamp the end time, on completion or early termination.
    pub fn finish(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(Utc::now());
            let stats = self.stats();
            tracing::info!(
                answered = stats.answered,
                total = stats.total,
                accuracy = stats.accuracy,
                "session finished"
            );
        }
    }

    pub fn answered(&self) -> impl Iterator<Item = &AnsweredProblem> {
        self.problems.iter().filter_map(SessionProblem::answered)
    }

    pub fn stats(&self) -> SessionStats {
        let times: Vec<f64> = self.answered().map(|a| a.time_taken_ms as f64).collect();
        let answered = times.len();
        let correct = self.answered().filter(|a| a.is_correct).count();

        SessionStats {
            total: self.problems.len(),
            answered,
            correct,
            accuracy: percentage(correct as u64, answered as u64),
            avg_time_ms: mean(&times).unwrap_or(0.0),
            time_std_dev_ms: std_dev(&times).unwrap_or(0.0),
        }
    }
}
