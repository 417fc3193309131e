//! Persistence error types.

use thiserror::Error;

use crate::types::AlarmId;

/// Errors that can occur while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The data directory could not be created.
    #[error("データディレクトリの作成に失敗しました: {0}")]
    DirectoryCreation(String),

    /// A stored value could not be read.
    #[error("データの読み込みに失敗しました: {0}")]
    ReadFailed(String),

    /// A value could not be written.
    #[error("データの書き込みに失敗しました: {0}")]
    WriteFailed(String),

    /// A value could not be encoded.
    #[error("データの変換に失敗しました: {0}")]
    Serialization(String),

    /// No alarm with the given id exists.
    #[error("アラームが見つかりません: ID {0}")]
    AlarmNotFound(AlarmId),
}

impl StoreError {
    /// Returns true if this error came from the filesystem.
    #[must_use]
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            Self::DirectoryCreation(_) | Self::ReadFailed(_) | Self::WriteFailed(_)
        )
    }

    /// Returns true if the requested alarm does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AlarmNotFound(_))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::DirectoryCreation(_) | Self::WriteFailed(_) => {
                "データディレクトリの書き込み権限を確認してください"
            }
            Self::ReadFailed(_) => "データファイルのアクセス権を確認してください",
            Self::Serialization(_) => "アプリケーションを再起動してください",
            Self::AlarmNotFound(_) => "focusclock alarm list でIDを確認してください",
        }
    }
}
