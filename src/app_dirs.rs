use directories::ProjectDirs;
use std::path::PathBuf;

/// Filesystem locations the drill owns.
pub struct AppDirs;

impl AppDirs {
    /// Default attempt store location: `~/.local/state/typedrill` on
    /// systems with a HOME, the platform's local data directory otherwise.
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("typedrill");
            Some(state_dir.join("attempts.db"))
        } else {
            ProjectDirs::from("", "", "typedrill")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("attempts.db"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_path_lands_under_local_state_when_home_is_set() {
        if std::env::var("HOME").is_ok() {
            let path = AppDirs::db_path().unwrap();
            let rendered = path.to_string_lossy();
            assert!(rendered.contains(".local"));
            assert!(rendered.ends_with("typedrill/attempts.db"));
        }
    }
}
