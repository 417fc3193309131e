//! Alert sound sources.

use std::path::{Path, PathBuf};

/// Frequency of the built-in alarm tone.
pub const TONE_FREQUENCY_HZ: f32 = 880.0;

/// Represents the source of a sound to be played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundSource {
    /// An audio file on disk.
    File {
        /// The full path to the sound file.
        path: PathBuf,
    },
    /// The generated beep tone.
    Tone,
}

impl SoundSource {
    /// Creates a file sound source.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    /// Returns a short name for logs and display.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::File { path } => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::Tone => "tone".to_string(),
        }
    }

    /// Returns the file path if this is a file source.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path } => Some(path),
            Self::Tone => None,
        }
    }
}

/// Chooses the alarm sound: the configured file if it exists, otherwise the tone.
#[must_use]
pub fn resolve_sound(configured: Option<&Path>) -> SoundSource {
    match configured {
        Some(path) if path.is_file() => SoundSource::file(path),
        Some(path) => {
            tracing::warn!(
                "Alarm sound {} not found, using built-in tone",
                path.display()
            );
            SoundSource::Tone
        }
        None => SoundSource::Tone,
    }
}
