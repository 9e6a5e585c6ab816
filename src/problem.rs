use crate::difficulty::Difficulty;
use crate::error::Result;
use crate::rules::{Multiplier, Rule, WorkedSolution};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A generated problem waiting for an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: Uuid,
    pub operand1: u64,
    pub operand2: Multiplier,
    pub correct_answer: u64,
    pub rule: String,
    pub hint: String,
    pub difficulty: Difficulty,
}

impl Problem {
    /// The answer is the rule's own derivation, which always equals the product.
    pub fn new(operand1: u64, multiplier: Multiplier, difficulty: Difficulty) -> Result<Self> {
        let derived = multiplier.show_steps(operand1)?.result;
        debug_assert_eq!(derived, multiplier.calculate(operand1)?);
        Ok(Self {
            id: Uuid::new_v4(),
            operand1,
            operand2: multiplier,
            correct_answer: derived,
            rule: multiplier.name(),
            hint: multiplier.hint().to_string(),
            difficulty,
        })
    }

    pub fn multiplier(&self) -> Multiplier {
        self.operand2
    }

    pub fn tier(&self) -> u8 {
        self.difficulty.tier
    }

    /// Re-derive the difficulty with carries taken from the rule's own steps.
    pub fn finalize_difficulty(&mut self) -> Result<()> {
        let trace = self.operand2.show_steps(self.operand1)?;
        self.difficulty.add_carry_info_from_steps(&trace.steps);
        Ok(())
    }

    pub fn worked_solution(&self) -> Result<WorkedSolution> {
        WorkedSolution::new(&self.operand2, self.operand1)
    }

    pub fn is_correct(&self, answer: u64) -> bool {
        answer == self.correct_answer
    }

    /// Record the user's answer. Consumes the problem so it can only be answered once.
    /// A partial difficulty is finalized first so the record carries its real tier.
    pub fn submit(mut self, user_answer: u64, time_taken_ms: u64) -> AnsweredProblem {
        if !self.difficulty.is_finalized() {
            self.difficulty = final_difficulty(self.operand1, self.operand2, &self.difficulty);
        }
        let is_correct = self.is_correct(user_answer);
        AnsweredProblem {
            problem: self,
            user_answer,
            is_correct,
            time_taken_ms,
        }
    }
}

/// A problem together with the submitted answer and how long it took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredProblem {
    #[serde(flatten)]
    pub problem: Problem,
    pub user_answer: u64,
    pub is_correct: bool,
    #[serde(rename = "timeTaken")]
    pub time_taken_ms: u64,
}

impl AnsweredProblem {
    pub fn multiplier(&self) -> Multiplier {
        self.problem.operand2
    }

    /// Tier after carries, even for records stored before finalization.
    pub fn tier(&self) -> u8 {
        let difficulty = &self.problem.difficulty;
        if difficulty.is_finalized() {
            return difficulty.tier;
        }
        final_difficulty(self.problem.operand1, self.problem.operand2, difficulty).tier
    }
}

/// `partial` with carries folded in; left as is when the operand has no trace.
fn final_difficulty(operand: u64, multiplier: Multiplier, partial: &Difficulty) -> Difficulty {
    match multiplier.show_steps(operand) {
        Ok(trace) => Difficulty::finalized(operand, multiplier, &trace.steps),
        Err(_) => partial.clone(),
    }
}
