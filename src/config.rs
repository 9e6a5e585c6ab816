use crate::error::Result;
use crate::generator::DEFAULT_MAX_ATTEMPTS;
use crate::session::{Mode, SessionConfig, Target};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default session settings remembered between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainerConfig {
    /// Raw multiplier values; validated when a session is built.
    pub multipliers: Vec<u32>,
    pub target: Target,
    pub mode: Mode,
    pub problem_count: usize,
    pub tier_max_attempts: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            multipliers: vec![11],
            target: Target::Tier(1),
            mode: Mode::Easy,
            problem_count: 10,
            tier_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl TrainerConfig {
    pub fn to_session_config(&self) -> Result<SessionConfig> {
        SessionConfig::from_values(
            &self.multipliers,
            self.target,
            Some(self.mode),
            self.problem_count,
        )
    }
}

pub trait ConfigStore {
    fn load(&self) -> TrainerConfig;
    fn save(&self, cfg: &TrainerConfig) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "trachtrainer") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("trachtrainer_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> TrainerConfig {
        let Ok(bytes) = fs::read(&self.path) else {
            return TrainerConfig::default();
        };
        match serde_json::from_slice::<TrainerConfig>(&bytes) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "unreadable config, using defaults");
                TrainerConfig::default()
            }
        }
    }

    fn save(&self, cfg: &TrainerConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrainerError;
    use crate::rules::Multiplier;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = TrainerConfig::default();
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nested").join("config.json"));
        let cfg = TrainerConfig {
            multipliers: vec![6, 7, 12],
            target: Target::Digits { min: 3, max: 5 },
            mode: Mode::Hard,
            problem_count: 25,
            tier_max_attempts: 80,
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn missing_or_corrupt_file_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), TrainerConfig::default());

        fs::write(&path, b"{not json").unwrap();
        assert_eq!(store.load(), TrainerConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{"multipliers":[9],"problemCount":4}"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.multipliers, vec![9]);
        assert_eq!(cfg.problem_count, 4);
        assert_eq!(cfg.mode, Mode::Easy);
    }

    #[test]
    fn converts_into_validated_session_config() {
        let session = TrainerConfig::default().to_session_config().unwrap();
        assert_eq!(session.multipliers, vec![Multiplier::Eleven]);

        let bad = TrainerConfig {
            multipliers: vec![10],
            ..TrainerConfig::default()
        };
        assert_matches!(
            bad.to_session_config(),
            Err(TrainerError::UnsupportedMultiplier(10))
        );
    }
}
