//! Wake-up scheduling error types.

use thiserror::Error;

/// Errors returned when registering a wake-up fails.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The wake-scheduler refused the registration.
    #[error("アラームの登録が拒否されました: {0}")]
    Rejected(String),

    /// No wake-scheduler is running to accept the registration.
    #[error("スケジューラが利用できません: {0}")]
    Unavailable(String),
}

impl SchedulerError {
    /// Returns true if retrying later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "アラームの権限設定を確認してください",
            Self::Unavailable(_) => "focusclock daemon を起動してください",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchedulerError::Rejected("permission denied".to_string());
        assert!(err.to_string().contains("permission denied"));
        assert!(err.to_string().contains("拒否"));
    }

    #[test]
    fn test_is_transient() {
        assert!(SchedulerError::Unavailable("x".into()).is_transient());
        assert!(!SchedulerError::Rejected("x".into()).is_transient());
    }

    #[test]
    fn test_suggestion() {
        assert!(SchedulerError::Unavailable("x".into())
            .suggestion()
            .contains("daemon"));
    }
}
