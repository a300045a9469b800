use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::playback::DEFAULT_RESOLVE_TIMEOUT;
use crate::resolver::Quality;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Resolver executable, looked up on `PATH` when not absolute.
    pub resolver: PathBuf,
    /// Arguments placed before the channel reference, for wrappers like `python -m`.
    pub resolver_args: Vec<String>,
    pub player: PathBuf,
    pub player_args: Vec<String>,
    pub quality: Quality,
    pub resolve_timeout_secs: u64,
    pub show_chat: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resolver: PathBuf::from("streamlink"),
            resolver_args: Vec::new(),
            player: PathBuf::from("mpv"),
            player_args: Vec::new(),
            quality: Quality::Best,
            resolve_timeout_secs: DEFAULT_RESOLVE_TIMEOUT.as_secs(),
            show_chat: false,
        }
    }
}

impl Settings {
    pub fn file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vidlive").join("settings.json"))
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs.max(1))
    }

    /**
        Load settings from the default location. A missing or unreadable file
        gives the defaults.
    */
    pub fn load() -> Self {
        match Self::file_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(path = %path.display(), "using default settings: {}", e);
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), "ignoring invalid settings file: {}", e);
                Self::default()
            }
        }
    }

    /// Write to the default location. Returns the path written, if any.
    pub fn save(&self) -> Result<Option<PathBuf>, std::io::Error> {
        let Some(path) = Self::file_path() else {
            return Ok(None);
        };
        self.save_to(&path)?;
        Ok(Some(path))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.resolve_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"quality":"720p60","show_chat":true}"#).unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.quality, Quality::Specific("720p60".to_string()));
        assert!(settings.show_chat);
        assert_eq!(settings.resolver, PathBuf::from("streamlink"));
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "[1, 2").unwrap();

        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_save_creates_parent_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            resolver_args: vec!["-m".to_string(), "streamlink".to_string()],
            resolver: PathBuf::from("python3"),
            quality: Quality::Worst,
            ..Default::default()
        };

        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let settings = Settings {
            resolve_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(settings.resolve_timeout(), Duration::from_secs(1));
    }
}
