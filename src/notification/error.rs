//! Notification system error types.

use thiserror::Error;

/// Errors that can occur in the notification system.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Failed to post a notification.
    #[error("通知の送信に失敗しました: {0}")]
    SendFailed(String),

    /// Notification permission was denied by the user.
    #[error("通知許可が拒否されています")]
    PermissionDenied,

    /// Invalid input provided to the notification system.
    #[error("無効な入力: {0}")]
    InvalidInput(String),

    /// No notification service is available.
    #[error("通知サービスが利用できません")]
    NotAvailable,
}

impl NotificationError {
    /// Returns true if this error is related to permissions.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::SendFailed(_) => "通知設定を確認してください",
            Self::PermissionDenied => "システム設定でアプリの通知を許可してください",
            Self::InvalidInput(_) => "入力値を確認してください",
            Self::NotAvailable => "通知デーモンが起動しているか確認してください",
        }
    }
}
