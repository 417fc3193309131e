//! Alarm wake-up registration.
//!
//! [`AlarmScheduler`] resolves an alarm's next fire time and keeps exactly
//! one pending registration per alarm id with a [`WakeScheduler`].
//! Registering again for the same id replaces the previous registration.

mod error;
mod tokio_wake;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use error::SchedulerError;
pub use tokio_wake::TokioWakeScheduler;

use crate::recurrence::next_fire_for;
use crate::types::{AlarmId, AlarmRecord};

/// Label carried by snoozed fires in place of the time of day.
pub const SNOOZE_LABEL: &str = "Snooze";

/// Data delivered back when a wake-up fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WakePayload {
    /// Alarm that registered the wake-up
    pub alarm_id: AlarmId,
    /// Alarm label at registration time
    pub alarm_name: String,
    /// Time label, or `Snooze` for snoozed fires
    pub label: String,
}

impl WakePayload {
    /// Payload for a regular fire of `alarm`.
    #[must_use]
    pub fn for_alarm(alarm: &AlarmRecord) -> Self {
        Self {
            alarm_id: alarm.id,
            alarm_name: alarm.alarm_name.clone(),
            label: alarm.time_label(),
        }
    }

    /// Payload for a snoozed fire.
    #[must_use]
    pub fn snooze(alarm_id: AlarmId, alarm_name: impl Into<String>) -> Self {
        Self {
            alarm_id,
            alarm_name: alarm_name.into(),
            label: SNOOZE_LABEL.to_string(),
        }
    }

    /// Returns true if this fire comes from a snooze.
    #[must_use]
    pub fn is_snooze(&self) -> bool {
        self.label == SNOOZE_LABEL
    }
}

/// External facility that fires a callback at an absolute time.
pub trait WakeScheduler: Send + Sync {
    /// Registers a one-shot wake-up for `id`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration is refused.
    fn register_one_shot(
        &self,
        id: AlarmId,
        when: DateTime<Utc>,
        payload: WakePayload,
    ) -> Result<(), SchedulerError>;

    /// Removes the registration for `id`. No-op if absent.
    fn cancel(&self, id: AlarmId);
}

// ============================================================================
// AlarmScheduler
// ============================================================================

/// Keeps one pending wake-up per alarm id.
///
/// Never mutates the alarm store; callers flip `is_active` only after
/// [`AlarmScheduler::schedule`] succeeds.
#[derive(Clone)]
pub struct AlarmScheduler {
    wake: Arc<dyn WakeScheduler>,
}

impl AlarmScheduler {
    pub fn new(wake: Arc<dyn WakeScheduler>) -> Self {
        Self { wake }
    }

    /// Registers the next occurrence of `alarm` relative to `now`.
    ///
    /// Returns the registered fire time.
    ///
    /// # Errors
    ///
    /// Returns an error if the wake-scheduler rejects the registration.
    pub fn schedule<Tz: TimeZone>(
        &self,
        alarm: &AlarmRecord,
        now: &DateTime<Tz>,
    ) -> Result<DateTime<Utc>, SchedulerError> {
        let fire_at = next_fire_for(alarm, now).with_timezone(&Utc);
        self.schedule_at(alarm.id, fire_at, WakePayload::for_alarm(alarm))?;
        info!(
            "Scheduled alarm {} ({}) for {}",
            alarm.id, alarm.alarm_name, fire_at
        );
        Ok(fire_at)
    }

    /// Registers a wake-up at an explicit instant.
    ///
    /// # Errors
    ///
    /// Returns an error if the wake-scheduler rejects the registration.
    pub fn schedule_at(
        &self,
        id: AlarmId,
        when: DateTime<Utc>,
        payload: WakePayload,
    ) -> Result<(), SchedulerError> {
        self.wake.register_one_shot(id, when, payload)
    }

    /// Cancels the pending wake-up for `id`, if any.
    pub fn cancel(&self, id: AlarmId) {
        self.wake.cancel(id);
        debug!("Cancelled wake-up for alarm {}", id);
    }
}

impl std::fmt::Debug for AlarmScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmScheduler").finish_non_exhaustive()
    }
}

// ============================================================================
// Mock
// ============================================================================

/// Mock wake-scheduler for testing.
#[derive(Debug, Default)]
pub struct MockWakeScheduler {
    registrations: Mutex<HashMap<AlarmId, (DateTime<Utc>, WakePayload)>>,
    register_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
    should_fail: AtomicBool,
}

impl MockWakeScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Active registration for `id`.
    #[must_use]
    pub fn registration(&self, id: AlarmId) -> Option<(DateTime<Utc>, WakePayload)> {
        self.registrations.lock().unwrap().get(&id).cloned()
    }

    #[must_use]
    pub fn is_registered(&self, id: AlarmId) -> bool {
        self.registrations.lock().unwrap().contains_key(&id)
    }

    /// Number of active registrations.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    #[must_use]
    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

impl WakeScheduler for MockWakeScheduler {
    fn register_one_shot(
        &self,
        id: AlarmId,
        when: DateTime<Utc>,
        payload: WakePayload,
    ) -> Result<(), SchedulerError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SchedulerError::Rejected("Mock failure".to_string()));
        }
        self.registrations
            .lock()
            .unwrap()
            .insert(id, (when, payload));
        Ok(())
    }

    fn cancel(&self, id: AlarmId) {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.registrations.lock().unwrap().remove(&id);
    }
}
