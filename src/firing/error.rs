//! Firing handler error types.

use thiserror::Error;

use crate::scheduler::SchedulerError;
use crate::store::StoreError;

/// Errors returned by stop and snooze.
#[derive(Debug, Error)]
pub enum FiringError {
    /// The switched-off state could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The snoozed wake-up could not be registered.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl FiringError {
    /// Returns true if the snoozed wake-up was rejected.
    #[must_use]
    pub fn is_scheduler_error(&self) -> bool {
        matches!(self, Self::Scheduler(_))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Store(e) => e.suggestion(),
            Self::Scheduler(e) => e.suggestion(),
        }
    }
}
