use crate::error::Result;
use crate::session::{Mode, Session, Target};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::Path;
use uuid::Uuid;

/// One row of session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub elapsed_secs: Option<f64>,
    pub multipliers: String,
    pub target: String,
    pub mode: Mode,
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
    pub accuracy: u32,
    pub avg_time_ms: f64,
}

impl SessionSummary {
    pub fn from_session(session: &Session) -> Self {
        let stats = session.stats();
        let elapsed_secs = session
            .end_time
            .map(|end| (end - session.start_time).num_milliseconds() as f64 / 1000.0);

        Self {
            id: session.id,
            date: session.start_time,
            elapsed_secs,
            multipliers: session.config.multipliers.iter().map(|m| m.value()).join(" "),
            target: describe_target(&session.config.target),
            mode: session.config.mode,
            total: stats.total,
            answered: stats.answered,
            correct: stats.correct,
            accuracy: stats.accuracy,
            avg_time_ms: stats.avg_time_ms,
        }
    }
}

pub fn describe_target(target: &Target) -> String {
    match target {
        Target::Tier(tier) => format!("tier {tier}"),
        Target::Digits { min, max } if min == max => format!("{min} digits"),
        Target::Digits { min, max } => format!("{min}-{max} digits"),
    }
}

pub fn summarize(sessions: &[Session]) -> Vec<SessionSummary> {
    sessions.iter().map(SessionSummary::from_session).collect()
}

/// Write one header row and one row per session, in the order given.
pub fn write_csv<W: io::Write>(writer: W, sessions: &[Session]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for summary in summarize(sessions) {
        wtr.serialize(summary)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_csv<P: AsRef<Path>>(path: P, sessions: &[Session]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_csv(File::create(path)?, sessions)?;
    tracing::info!(path = %path.display(), sessions = sessions.len(), "history exported");
    Ok(())
}
