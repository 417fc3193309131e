//! Daemon configuration.
//!
//! Settings are read from `config.json` in the data directory. Every field
//! is optional in the file; missing fields take their defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::firing::DEFAULT_SNOOZE_MINUTES;

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "FOCUSCLOCK_HOME";

/// Data directory name under the user's home.
const DATA_DIR_NAME: &str = ".focusclock";

/// Configuration file name inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

const SOCKET_FILE_NAME: &str = "focusclock.sock";

/// Resolves the data directory: `$FOCUSCLOCK_HOME`, else `~/.focusclock`.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(DATA_DIR_NAME)
}

fn default_snooze_minutes() -> u32 {
    DEFAULT_SNOOZE_MINUTES
}

/// Daemon configuration.
///
/// # Example
///
/// ```
/// use focusclock::config::AppConfig;
///
/// let config = AppConfig::default().with_data_dir("/tmp/focusclock");
/// assert_eq!(config.snooze_minutes, 5);
/// assert!(config.socket_path().ends_with("focusclock.sock"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Directory holding the stores, the socket and this file.
    #[serde(skip)]
    pub data_dir: PathBuf,

    /// Socket path; defaults to `focusclock.sock` in the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<PathBuf>,

    /// Snooze length in minutes (1-60).
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,

    /// Sound file for ringing alarms; the built-in tone when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_sound: Option<PathBuf>,

    /// Disables audio output entirely.
    #[serde(default)]
    pub mute: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            socket: None,
            snooze_minutes: default_snooze_minutes(),
            alarm_sound: None,
            mute: false,
        }
    }
}

impl AppConfig {
    /// Loads `config.json` from `data_dir`, or defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let path = data_dir.join(CONFIG_FILE_NAME);

        let mut config = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<Self>(&bytes)
                .with_context(|| format!("Failed to parse config: {:?}", path))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config: {:?}", path));
            }
        };
        config.data_dir = data_dir;
        Ok(config)
    }

    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_snooze_minutes(mut self, minutes: u32) -> Self {
        self.snooze_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_alarm_sound(mut self, path: impl Into<PathBuf>) -> Self {
        self.alarm_sound = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_mute(mut self, mute: bool) -> Self {
        self.mute = mute;
        self
    }

    /// Socket the daemon listens on.
    #[must_use]
    pub fn socket_path(&self) -> PathBuf {
        self.socket
            .clone()
            .unwrap_or_else(|| self.data_dir.join(SOCKET_FILE_NAME))
    }

    /// Directory of the alarm store.
    #[must_use]
    pub fn alarms_dir(&self) -> PathBuf {
        self.data_dir.join("alarms")
    }

    /// Directory of the countdown store.
    #[must_use]
    pub fn countdown_dir(&self) -> PathBuf {
        self.data_dir.join("countdown")
    }

    #[must_use]
    pub fn alarm_sound_path(&self) -> Option<&Path> {
        self.alarm_sound.as_deref()
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.snooze_minutes < 1 || self.snooze_minutes > 60 {
            return Err("スヌーズ時間は1-60分の範囲で指定してください".to_string());
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err("データディレクトリが指定されていません".to_string());
        }
        Ok(())
    }
}
