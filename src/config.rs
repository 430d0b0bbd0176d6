use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Presentation constants for playback pacing. All durations in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackTimings {
    pub progress_tick_ms: u64,
    pub subtitle_poll_ms: u64,
    pub correct_choice_delay_ms: u64,
    pub reveal_complete_delay_ms: u64,
    pub key_takeaway_dwell_ms: u64,
    pub narration_budget_ratio: f64,
    pub max_seconds_per_word: f64,
    pub subtitle_lines: usize,
    pub subtitle_words_per_line: usize,
    pub min_scene_seconds: f64,
}

impl Default for PlaybackTimings {
    fn default() -> Self {
        Self {
            progress_tick_ms: 100,
            subtitle_poll_ms: 50,
            correct_choice_delay_ms: 1_500,
            reveal_complete_delay_ms: 1_000,
            key_takeaway_dwell_ms: 3_000,
            narration_budget_ratio: 0.85,
            max_seconds_per_word: 0.35,
            subtitle_lines: 3,
            subtitle_words_per_line: 8,
            min_scene_seconds: crate::lesson::DEFAULT_MIN_SCENE_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VoiceSetting {
    /// Use a system speech program if one is installed, otherwise simulate speech
    #[default]
    Auto,
    /// No voice; scenes are paced by their duration only
    Off,
    /// Simulated speech so subtitles still play without audio
    Paced,
    /// Always use `voice_command`
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub muted: bool,
    pub voice: VoiceSetting,
    /// Program and arguments; the narration text is appended as the final argument.
    pub voice_command: Option<String>,
    pub timings: PlaybackTimings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            muted: false,
            voice: VoiceSetting::Auto,
            voice_command: None,
            timings: PlaybackTimings::default(),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "sceneplay") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("sceneplay_config.json")
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
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => tracing::warn!(path = %self.path.display(), "ignoring unreadable config: {e}"),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(std::io::Error::other)?;
        fs::write(&self.path, data)
    }
}
