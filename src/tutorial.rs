use crate::error::{Result, TrainerError};
use crate::generator::ProblemGenerator;
use crate::problem::Problem;
use crate::rules::Multiplier;
use crate::util::percentage;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CURRICULUM: [Multiplier; 10] = [
    Multiplier::Eleven,
    Multiplier::Twelve,
    Multiplier::Six,
    Multiplier::Seven,
    Multiplier::Five,
    Multiplier::Eight,
    Multiplier::Nine,
    Multiplier::Four,
    Multiplier::Two,
    Multiplier::Three,
];

pub const INDEPENDENT_MIN_DIGITS: u32 = 2;
pub const INDEPENDENT_MAX_DIGITS: u32 = 4;
pub const INDEPENDENT_PROBLEM_COUNT: usize = 5;

pub const PASS_STREAK: u32 = 3;
pub const PASS_MIN_ATTEMPTS: u32 = 5;
pub const PASS_MIN_ACCURACY_PCT: f64 = 80.0;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LessonStatus {
    #[default]
    Locked,
    Available,
    InProgress,
    Completed,
    Mastered,
}

impl LessonStatus {
    pub fn is_done(self) -> bool {
        matches!(self, Self::Completed | Self::Mastered)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    #[default]
    Intro,
    Theory,
    Guided,
    Independent,
}

impl Phase {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Intro => Some(Self::Theory),
            Self::Theory => Some(Self::Guided),
            Self::Guided => Some(Self::Independent),
            Self::Independent => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            Self::Intro => None,
            Self::Theory => Some(Self::Intro),
            Self::Guided => Some(Self::Theory),
            Self::Independent => Some(Self::Guided),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LessonProgress {
    pub status: LessonStatus,
    pub phase: Phase,
    pub guided_problem: usize,
    pub guided_step: usize,
    pub independent_attempts: u32,
    pub independent_correct: u32,
    pub current_streak: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for LessonProgress {
    fn default() -> Self {
        Self {
            status: LessonStatus::Available,
            phase: Phase::Intro,
            guided_problem: 0,
            guided_step: 0,
            independent_attempts: 0,
            independent_correct: 0,
            current_streak: 0,
            completed_at: None,
        }
    }
}

impl LessonProgress {
    pub fn accuracy(&self) -> f64 {
        if self.independent_attempts == 0 {
            return 0.0;
        }
        self.independent_correct as f64 / self.independent_attempts as f64 * 100.0
    }

    pub fn has_passed(&self) -> bool {
        self.current_streak >= PASS_STREAK
            || (self.independent_attempts >= PASS_MIN_ATTEMPTS
                && self.accuracy() >= PASS_MIN_ACCURACY_PCT)
    }

    fn is_flawless(&self) -> bool {
        self.independent_attempts >= PASS_MIN_ATTEMPTS
            && self.independent_correct == self.independent_attempts
    }
}

/// Result of one independent practice answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndependentOutcome {
    pub is_correct: bool,
    pub passed: bool,
    pub accuracy: u32,
    pub streak: u32,
    pub attempts: u32,
    pub correct: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TutorialProgress {
    pub lessons_completed: Vec<Multiplier>,
    pub current_lesson: Option<Multiplier>,
    pub lessons: BTreeMap<Multiplier, LessonProgress>,
}

impl Default for TutorialProgress {
    fn default() -> Self {
        let mut lessons = BTreeMap::new();
        lessons.insert(CURRICULUM[0], LessonProgress::default());
        Self {
            lessons_completed: Vec::new(),
            current_lesson: None,
            lessons,
        }
    }
}

fn curriculum_position(multiplier: Multiplier) -> Option<usize> {
    CURRICULUM.iter().position(|&m| m == multiplier)
}

impl TutorialProgress {
    pub fn is_unlocked(&self, multiplier: Multiplier) -> bool {
        match curriculum_position(multiplier) {
            Some(0) => true,
            Some(idx) => self
                .lessons
                .get(&CURRICULUM[idx - 1])
                .is_some_and(|prev| prev.status.is_done()),
            None => false,
        }
    }

    pub fn status(&self, multiplier: Multiplier) -> LessonStatus {
        match self.lessons.get(&multiplier) {
            Some(lesson) => lesson.status,
            None if self.is_unlocked(multiplier) => LessonStatus::Available,
            None => LessonStatus::Locked,
        }
    }

    pub fn lesson(&self, multiplier: Multiplier) -> Option<&LessonProgress> {
        self.lessons.get(&multiplier)
    }

    pub fn start_lesson(&mut self, multiplier: Multiplier) -> Result<()> {
        if !self.is_unlocked(multiplier) {
            return Err(TrainerError::LessonLocked(multiplier.value()));
        }

        let lesson = self.lessons.entry(multiplier).or_default();
        lesson.phase = Phase::Intro;
        lesson.guided_problem = 0;
        lesson.guided_step = 0;
        if !lesson.status.is_done() {
            lesson.status = LessonStatus::InProgress;
        }
        self.current_lesson = Some(multiplier);

        tracing::debug!(lesson = %multiplier, "lesson started");
        Ok(())
    }

    fn active_mut(&mut self) -> Result<(Multiplier, &mut LessonProgress)> {
        let multiplier = self.current_lesson.ok_or(TrainerError::NoActiveLesson)?;
        let lesson = self.lessons.entry(multiplier).or_default();
        Ok((multiplier, lesson))
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.current_lesson
            .and_then(|m| self.lessons.get(&m))
            .map(|lesson| lesson.phase)
    }

    /// Move to the next phase; stays put on the last one.
    pub fn advance_phase(&mut self) -> Result<Phase> {
        let (_, lesson) = self.active_mut()?;
        if let Some(next) = lesson.phase.next() {
            lesson.phase = next;
            if next == Phase::Guided {
                lesson.guided_problem = 0;
                lesson.guided_step = 0;
            }
        }
        Ok(lesson.phase)
    }

    pub fn previous_phase(&mut self) -> Result<Phase> {
        let (_, lesson) = self.active_mut()?;
        if let Some(prev) = lesson.phase.previous() {
            lesson.phase = prev;
        }
        Ok(lesson.phase)
    }

    /// Step through guided practice. Finishing the last prompt of the last
    /// problem moves the lesson into independent practice.
    pub fn advance_guided_step(&mut self, prompt_count: usize, problem_count: usize) -> Result<Phase> {
        let (_, lesson) = self.active_mut()?;
        lesson.guided_step += 1;
        if lesson.guided_step >= prompt_count {
            lesson.guided_problem += 1;
            lesson.guided_step = 0;
            if lesson.guided_problem >= problem_count {
                lesson.phase = Phase::Independent;
            }
        }
        Ok(lesson.phase)
    }

    pub fn record_independent(&mut self, is_correct: bool) -> Result<IndependentOutcome> {
        let (multiplier, lesson) = self.active_mut()?;
        lesson.independent_attempts += 1;
        if is_correct {
            lesson.independent_correct += 1;
            lesson.current_streak += 1;
        } else {
            lesson.current_streak = 0;
        }

        let outcome = IndependentOutcome {
            is_correct,
            passed: lesson.has_passed(),
            accuracy: percentage(
                lesson.independent_correct.into(),
                lesson.independent_attempts.into(),
            ),
            streak: lesson.current_streak,
            attempts: lesson.independent_attempts,
            correct: lesson.independent_correct,
        };
        tracing::debug!(lesson = %multiplier, passed = outcome.passed, "independent answer recorded");
        Ok(outcome)
    }

    /// Close the active lesson and unlock the next one. Returns the lesson
    /// that became available, if any.
    pub fn complete_lesson(&mut self) -> Result<Option<Multiplier>> {
        let (multiplier, lesson) = self.active_mut()?;
        lesson.status = if lesson.is_flawless() {
            LessonStatus::Mastered
        } else {
            LessonStatus::Completed
        };
        lesson.completed_at = Some(Utc::now());

        if !self.lessons_completed.contains(&multiplier) {
            self.lessons_completed.push(multiplier);
        }

        let next = curriculum_position(multiplier)
            .and_then(|idx| CURRICULUM.get(idx + 1))
            .copied();
        if let Some(next) = next {
            self.lessons.entry(next).or_default();
        }

        tracing::info!(lesson = %multiplier, "lesson completed");
        Ok(next)
    }

    pub fn return_to_overview(&mut self) {
        self.current_lesson = None;
    }
}

/// Fresh independent practice problems for a lesson.
pub fn independent_problems<R: Rng>(
    generator: &mut ProblemGenerator<R>,
    multiplier: Multiplier,
    count: usize,
) -> Result<Vec<Problem>> {
    (0..count)
        .map(|_| generator.generate(multiplier, INDEPENDENT_MIN_DIGITS, INDEPENDENT_MAX_DIGITS))
        .collect()
}

/// Guided answers are compared as trimmed text.
pub fn guided_answer_matches(user: &str, expected: &str) -> bool {
    user.trim() == expected.trim()
}
