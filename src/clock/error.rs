//! Alarm operation error types.

use thiserror::Error;

use crate::scheduler::SchedulerError;
use crate::store::StoreError;

/// Errors returned by alarm add/edit/toggle/delete.
#[derive(Debug, Error)]
pub enum ClockError {
    /// A field failed validation.
    #[error("無効な入力: {0}")]
    InvalidInput(String),

    /// Persisting the change failed or the alarm does not exist.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The wake-up registration was rejected.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl ClockError {
    /// Returns true if the alarm does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }

    /// Returns true if the input was rejected before anything changed.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "focusclock alarm --help で指定方法を確認してください",
            Self::Store(e) => e.suggestion(),
            Self::Scheduler(e) => e.suggestion(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let err: ClockError = StoreError::AlarmNotFound(4).into();
        assert!(err.is_not_found());
        assert!(!err.is_invalid_input());

        let err = ClockError::InvalidInput("時は0-23の範囲で指定してください".into());
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("0-23"));
        assert!(err.suggestion().contains("--help"));
    }
}
