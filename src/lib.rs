// Library surface for embedding the trainer in a front end.
pub mod app_dirs;
pub mod config;
pub mod difficulty;
pub mod digits;
pub mod error;
pub mod generator;
pub mod history;
pub mod problem;
pub mod progress;
pub mod rules;
pub mod session;
pub mod store;
pub mod tutorial;
pub mod util;

pub use difficulty::Difficulty;
pub use error::{Result, TrainerError};
pub use generator::ProblemGenerator;
pub use problem::{AnsweredProblem, Problem};
pub use progress::{ProgressSnapshot, ProgressState};
pub use rules::{Multiplier, Rule, Step, StepTrace, WorkedSolution};
pub use session::{Mode, Session, SessionConfig, Target};
pub use store::{KeyValueStore, MemoryStore, Repository, SqliteStore};
