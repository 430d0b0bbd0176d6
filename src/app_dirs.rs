use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/sceneplay`, or the platform data dir without `HOME`.
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(PathBuf::from(home).join(".local").join("state").join("sceneplay"))
        } else {
            ProjectDirs::from("", "", "sceneplay").map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn history_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("history.db"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("sceneplay.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_in_the_state_dir() {
        if let Some(dir) = AppDirs::state_dir() {
            assert_eq!(AppDirs::history_path().unwrap(), dir.join("history.db"));
            assert_eq!(AppDirs::log_path().unwrap(), dir.join("sceneplay.log"));
        }
    }
}
