//! Alert presentation error types.
//!
//! Alert failures never block alarm or countdown state transitions; callers
//! log them and carry on.

use thiserror::Error;

/// Errors that can occur while presenting an alert.
#[derive(Debug, Error)]
pub enum AlertError {
    /// No output device, or audio is disabled for this presenter.
    #[error("アラーム音の出力先がありません: {0}")]
    DeviceNotAvailable(String),

    /// Configured alarm sound is missing.
    #[error("アラーム音ファイルが見つかりません: {0}")]
    FileNotFound(String),

    /// Configured alarm sound is not a supported audio file.
    #[error("アラーム音ファイルを読み込めません: {0}")]
    DecodeError(String),

    /// The audio thread could not open its output.
    #[error("音声出力を開けません: {0}")]
    StreamError(String),

    /// Vibration hardware rejected the pattern.
    #[error("バイブレーションに失敗しました: {0}")]
    VibrationFailed(String),

    /// The audio thread stopped answering.
    #[error("アラートを開始できません: {0}")]
    PlaybackError(String),
}

impl AlertError {
    /// Returns true for output hardware problems.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotAvailable(_) | Self::StreamError(_) | Self::VibrationFailed(_)
        )
    }

    /// Returns true for problems with the configured sound file.
    #[must_use]
    pub fn is_file_error(&self) -> bool {
        matches!(self, Self::FileNotFound(_) | Self::DecodeError(_))
    }

    /// Returns true if playback should fall back to the built-in tone.
    #[must_use]
    pub fn should_fallback_to_tone(&self) -> bool {
        self.is_file_error()
    }

    /// Short hint shown next to the error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::DeviceNotAvailable(_) => "スピーカーを接続するか --mute で起動してください",
            Self::FileNotFound(_) => "内蔵トーンで鳴らします",
            Self::DecodeError(_) => "config.json の alarmSound に WAV/MP3/FLAC/OGG を指定してください",
            Self::StreamError(_) => "音声出力の設定を確認してください",
            Self::VibrationFailed(_) => "バイブレーション設定を確認してください",
            Self::PlaybackError(_) => "デーモンを再起動してください",
        }
    }
}
