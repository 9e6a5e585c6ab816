//! Error types for the trainer core.

use thiserror::Error;

/// Result type alias using TrainerError.
pub type Result<T> = std::result::Result<T, TrainerError>;

/// Errors surfaced by the rule engine, generator, session flow and stores.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("unsupported multiplier: {0}")]
    UnsupportedMultiplier(u32),

    #[error("operand {operand} is larger than the supported maximum {max}")]
    OperandOutOfRange { operand: u64, max: u64 },

    #[error("at least one multiplier must be selected")]
    EmptyMultipliers,

    #[error("min digits ({min}) cannot be greater than max digits ({max})")]
    InvertedDigitRange { min: u32, max: u32 },

    #[error("digit count {0} is outside the supported range 1..={max}", max = crate::digits::MAX_DIGITS)]
    DigitCountOutOfRange(u32),

    #[error("tier {0} is outside the range 1..=10")]
    TierOutOfRange(u8),

    #[error("problem count must be positive")]
    ZeroProblemCount,

    #[error("session has no unanswered problems left")]
    SessionComplete,

    #[error("lesson ×{0} is locked until the previous lesson is completed")]
    LessonLocked(u32),

    #[error("no tutorial lesson is in progress")]
    NoActiveLesson,

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
