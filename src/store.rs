use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::problem::AnsweredProblem;
use crate::progress::ProgressState;
use crate::session::Session;
use crate::tutorial::TutorialProgress;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const SESSIONS_KEY: &str = "trach_sessions";
pub const PERSONAL_BESTS_KEY: &str = "trach_personal_bests";
pub const TUTORIAL_PROGRESS_KEY: &str = "trach_tutorial_progress";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Run `f` so that all of its writes land together or not at all.
    /// An error from `f` must leave the store as it was.
    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>;
}

/// In-process store, mostly for tests and ephemeral use.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let snapshot = self.entries.clone();
        let result = f(self);
        if result.is_err() {
            self.entries = snapshot;
        }
        result
    }
}

/// SQLite-backed store with a single `kv` table.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// Open the database at the default state location.
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("trachtrainer.db"));
        Self::open(path)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(err) => {
                self.conn.execute_batch("ROLLBACK")?;
                Err(err)
            }
        }
    }
}

/// Typed access to the persisted trainer state.
#[derive(Debug)]
pub struct Repository<S> {
    store: S,
}

impl<S: KeyValueStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn sessions(&self) -> Result<Vec<Session>> {
        load_or_default(&self.store, SESSIONS_KEY)
    }

    /// Store a finished session in front of the older ones.
    pub fn add_session(&mut self, session: &Session) -> Result<()> {
        self.store.atomically(|store| {
            let mut sessions: Vec<Session> = load_or_default(&*store, SESSIONS_KEY)?;
            sessions.insert(0, session.clone());
            save(store, SESSIONS_KEY, &sessions)?;
            tracing::info!(session = %session.id, stored = sessions.len(), "session saved");
            Ok(())
        })
    }

    pub fn clear_sessions(&mut self) -> Result<()> {
        self.store.remove(SESSIONS_KEY)
    }

    pub fn progress(&self) -> Result<ProgressState> {
        load_or_default(&self.store, PERSONAL_BESTS_KEY)
    }

    pub fn save_progress(&mut self, progress: &ProgressState) -> Result<()> {
        save(&mut self.store, PERSONAL_BESTS_KEY, progress)
    }

    /// Load the aggregate, fold in one answer and save it back in one step.
    pub fn record_answer(&mut self, answered: &AnsweredProblem) -> Result<ProgressState> {
        self.store.atomically(|store| {
            let mut progress: ProgressState = load_or_default(&*store, PERSONAL_BESTS_KEY)?;
            progress.record(answered);
            save(store, PERSONAL_BESTS_KEY, &progress)?;
            Ok(progress)
        })
    }

    /// Replace the stored aggregate with one replayed from session history.
    pub fn rebuild_progress(&mut self) -> Result<ProgressState> {
        self.store.atomically(|store| {
            let sessions: Vec<Session> = load_or_default(&*store, SESSIONS_KEY)?;
            let progress = ProgressState::rebuild_from_sessions(&sessions);
            save(store, PERSONAL_BESTS_KEY, &progress)?;
            tracing::info!(
                sessions = sessions.len(),
                problems = progress.milestones.total_problems,
                "progress rebuilt"
            );
            Ok(progress)
        })
    }

    pub fn tutorial_progress(&self) -> Result<TutorialProgress> {
        load_or_default(&self.store, TUTORIAL_PROGRESS_KEY)
    }

    pub fn save_tutorial_progress(&mut self, progress: &TutorialProgress) -> Result<()> {
        save(&mut self.store, TUTORIAL_PROGRESS_KEY, progress)
    }
}

/// Missing or unreadable documents fall back to the empty value.
fn load_or_default<S, T>(store: &S, key: &str) -> Result<T>
where
    S: KeyValueStore,
    T: DeserializeOwned + Default,
{
    let Some(raw) = store.get(key)? else {
        return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(err) => {
            tracing::warn!(key, %err, "discarding unreadable stored value");
            Ok(T::default())
        }
    }
}

fn save<S, T>(store: &mut S, key: &str, value: &T) -> Result<()>
where
    S: KeyValueStore,
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difficulty::calculate_partial;
    use crate::error::TrainerError;
    use crate::problem::Problem;
    use crate::rules::Multiplier;
    use crate::session::{Mode, SessionConfig, Target};
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn answered(operand: u64, correct: bool) -> AnsweredProblem {
        let m = Multiplier::Eleven;
        let mut problem = Problem::new(operand, m, calculate_partial(operand, m)).unwrap();
        problem.finalize_difficulty().unwrap();
        let answer = if correct { problem.correct_answer } else { 0 };
        problem.submit(answer, 1200)
    }

    fn finished_session(operands: &[u64]) -> Session {
        let config = SessionConfig {
            multipliers: vec![Multiplier::Eleven],
            target: Target::Digits { min: 2, max: 2 },
            mode: Mode::Easy,
            problem_count: operands.len(),
        };
        let problems = operands
            .iter()
            .map(|&n| Problem::new(n, Multiplier::Eleven, calculate_partial(n, Multiplier::Eleven)).unwrap())
            .collect();
        let mut session = Session::from_problems(config, problems);
        while let Some(answer) = session.current().map(|p| p.correct_answer) {
            session.submit(answer, 1000).unwrap();
        }
        session.finish();
        session
    }

    #[test]
    fn test_sqlite_get_set_remove() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("missing").unwrap(), None);
        store.set("k", "1").unwrap();
        store.set("k", "2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("2"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_sqlite_file_persists_between_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("trachtrainer.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.set("k", "kept").unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_sqlite_atomically_rolls_back_on_error() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.set("k", "before").unwrap();
        let result: Result<()> = store.atomically(|s| {
            s.set("k", "during")?;
            Err(TrainerError::SessionComplete)
        });
        assert_matches!(result, Err(TrainerError::SessionComplete));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("before"));
    }

    #[test]
    fn test_memory_atomically_rolls_back_on_error() {
        let mut store = MemoryStore::new();
        let result: Result<()> = store.atomically(|s| {
            s.set("k", "during")?;
            Err(TrainerError::SessionComplete)
        });
        assert!(result.is_err());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_failed_record_leaves_progress_untouched() {
        let mut repo = Repository::new(SqliteStore::open_in_memory().unwrap());
        let kept = repo.record_answer(&answered(34, true)).unwrap();

        let mut store = repo.into_inner();
        let result: Result<()> = store.atomically(|s| {
            s.set(PERSONAL_BESTS_KEY, "{}")?;
            Err(TrainerError::SessionComplete)
        });
        assert!(result.is_err());
        assert_eq!(Repository::new(store).progress().unwrap(), kept);
    }

    #[test]
    fn test_sessions_are_kept_newest_first() {
        let mut repo = Repository::new(MemoryStore::new());
        let older = finished_session(&[12]);
        let newer = finished_session(&[34, 56]);
        repo.add_session(&older).unwrap();
        repo.add_session(&newer).unwrap();

        let sessions = repo.sessions().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, newer.id);
        assert_eq!(sessions[1], older);
    }

    #[test]
    fn test_record_answer_folds_into_stored_progress() {
        let mut repo = Repository::new(SqliteStore::open_in_memory().unwrap());
        repo.record_answer(&answered(34, true)).unwrap();
        let progress = repo.record_answer(&answered(78, false)).unwrap();
        assert_eq!(progress.milestones.total_problems, 2);
        assert_eq!(repo.progress().unwrap(), progress);
    }

    #[test]
    fn test_rebuild_progress_matches_incremental_fold() {
        let mut repo = Repository::new(MemoryStore::new());
        let first = finished_session(&[12, 34]);
        let second = finished_session(&[56]);
        for session in [&first, &second] {
            for a in session.answered() {
                repo.record_answer(a).unwrap();
            }
            repo.add_session(session).unwrap();
        }
        let incremental = repo.progress().unwrap();
        repo.save_progress(&ProgressState::default()).unwrap();
        assert_eq!(repo.rebuild_progress().unwrap(), incremental);
    }

    #[test]
    fn test_corrupt_value_falls_back_to_empty() {
        let mut store = MemoryStore::new();
        store.set(SESSIONS_KEY, "[not json").unwrap();
        let repo = Repository::new(store);
        assert!(repo.sessions().unwrap().is_empty());
        assert_eq!(repo.tutorial_progress().unwrap(), TutorialProgress::default());
    }

    #[test]
    fn test_tutorial_progress_roundtrip() {
        let mut repo = Repository::new(MemoryStore::new());
        let mut tutorial = TutorialProgress::default();
        tutorial.start_lesson(Multiplier::Eleven).unwrap();
        repo.save_tutorial_progress(&tutorial).unwrap();
        assert_eq!(repo.tutorial_progress().unwrap(), tutorial);
    }
}
