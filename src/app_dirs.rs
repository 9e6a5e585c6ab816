use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "trachtrainer";

/// Where the trainer keeps its on-disk state.
pub struct AppDirs;

impl AppDirs {
    pub fn db_path() -> Option<PathBuf> {
        Self::db_path_from_home(std::env::var_os("HOME").map(PathBuf::from))
    }

    fn db_path_from_home(home: Option<PathBuf>) -> Option<PathBuf> {
        match home {
            Some(home) => Some(
                home.join(".local")
                    .join("state")
                    .join(APP_NAME)
                    .join("trachtrainer.db"),
            ),
            None => ProjectDirs::from("", "", APP_NAME)
                .map(|proj_dirs| proj_dirs.data_local_dir().join("trachtrainer.db")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_path_lives_under_local_state() {
        let path = AppDirs::db_path_from_home(Some(PathBuf::from("/home/ada"))).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/home/ada/.local/state/trachtrainer/trachtrainer.db")
        );
    }
}
