//! Countdown error types.

use thiserror::Error;

use crate::store::StoreError;
use crate::types::TaskId;

/// Errors returned by countdown commands.
#[derive(Debug, Error)]
pub enum CountdownError {
    /// `start` while already counting down.
    #[error("タイマーは既に実行中です")]
    AlreadyRunning,

    /// `pause` while not counting down.
    #[error("タイマーは実行されていません")]
    NotRunning,

    /// `resume` while not paused.
    #[error("タイマーは一時停止していません")]
    NotPaused,

    /// Settings failed validation.
    #[error("無効な設定: {0}")]
    InvalidSettings(String),

    /// No task with this id.
    #[error("タスクが見つかりません: #{0}")]
    TaskNotFound(TaskId),

    /// Task title or estimate failed validation.
    #[error("無効なタスク: {0}")]
    InvalidTask(String),

    /// The new state could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CountdownError {
    /// Returns true if the command does not apply to the current phase.
    #[must_use]
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::NotRunning | Self::NotPaused)
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "focusclock timer pause で一時停止できます",
            Self::NotRunning => "focusclock timer start で開始してください",
            Self::NotPaused => "focusclock timer status で状態を確認してください",
            Self::InvalidSettings(_) => "集中時間は1-120分で指定してください",
            Self::TaskNotFound(_) => "focusclock timer task list でIDを確認してください",
            Self::InvalidTask(_) => "タスク名と1以上の見積もりを指定してください",
            Self::Store(e) => e.suggestion(),
        }
    }
}
