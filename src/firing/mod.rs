//! Reaction to fired alarms.
//!
//! Each fire moves an alarm through `Idle → Ringing → (Stopped | Snoozed)`.
//! While ringing, the handler owns the alarm's [`AlertSession`] and its
//! notification. Stop and snooze persist `is_active = false` straight to the
//! store and publish an [`AlarmTurnedOff`] hint for any live client.

mod error;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub use error::FiringError;

use crate::alert::{AlertPresenter, AlertSession, AlertSpec, SoundSource};
use crate::notification::{create_alarm_content, NotificationPresenter};
use crate::scheduler::{AlarmScheduler, WakePayload};
use crate::store::AlarmStore;
use crate::types::{AlarmId, DEFAULT_ALARM_NAME};

/// Default snooze length in minutes.
pub const DEFAULT_SNOOZE_MINUTES: u32 = 5;

const SIGNAL_CAPACITY: usize = 16;

/// Ringing state of one alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingState {
    /// Not ringing
    #[default]
    Idle,
    /// Alert is being presented
    Ringing,
    /// Stopped by the user
    Stopped,
    /// Snoozed by the user
    Snoozed,
}

impl RingState {
    /// Returns the string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            RingState::Idle => "idle",
            RingState::Ringing => "ringing",
            RingState::Stopped => "stopped",
            RingState::Snoozed => "snoozed",
        }
    }
}

/// Published when stop or snooze switches an alarm off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmTurnedOff {
    /// Alarm that was switched off
    pub alarm_id: AlarmId,
}

struct Ringing {
    session: Option<AlertSession>,
    payload: WakePayload,
}

/// Handles fired alarms and the stop/snooze actions on them.
pub struct AlarmFiringHandler {
    presenter: Arc<dyn AlertPresenter>,
    notifier: Arc<dyn NotificationPresenter>,
    scheduler: AlarmScheduler,
    sound: SoundSource,
    snooze: Duration,
    ringing: HashMap<AlarmId, Ringing>,
    states: HashMap<AlarmId, RingState>,
    signals: broadcast::Sender<AlarmTurnedOff>,
}

impl AlarmFiringHandler {
    pub fn new(
        presenter: Arc<dyn AlertPresenter>,
        notifier: Arc<dyn NotificationPresenter>,
        scheduler: AlarmScheduler,
        sound: SoundSource,
    ) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            presenter,
            notifier,
            scheduler,
            sound,
            snooze: Duration::minutes(i64::from(DEFAULT_SNOOZE_MINUTES)),
            ringing: HashMap::new(),
            states: HashMap::new(),
            signals,
        }
    }

    /// Sets the snooze length.
    #[must_use]
    pub fn with_snooze_minutes(mut self, minutes: u32) -> Self {
        self.snooze = Duration::minutes(i64::from(minutes));
        self
    }

    /// Subscribes to turned-off signals. Delivery is best-effort.
    pub fn subscribe(&self) -> broadcast::Receiver<AlarmTurnedOff> {
        self.signals.subscribe()
    }

    /// Current ringing state of `id`.
    #[must_use]
    pub fn state(&self, id: AlarmId) -> RingState {
        self.states.get(&id).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn is_ringing(&self, id: AlarmId) -> bool {
        self.ringing.contains_key(&id)
    }

    /// Ids of alarms currently ringing, in ascending order.
    #[must_use]
    pub fn ringing_ids(&self) -> Vec<AlarmId> {
        let mut ids: Vec<AlarmId> = self.ringing.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Starts ringing for a fired wake-up.
    ///
    /// Returns false, without starting a second alert, if the alarm is
    /// already ringing. Alert and notification failures are logged only.
    pub fn fire(&mut self, payload: &WakePayload) -> bool {
        let id = payload.alarm_id;
        if self.ringing.contains_key(&id) {
            debug!("Alarm {} is already ringing", id);
            return false;
        }

        let spec = AlertSpec::alarm(self.sound.clone());
        let session = match AlertSession::start(self.presenter.clone(), &spec) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Alarm {} alert failed: {} ({})", id, e, e.suggestion());
                None
            }
        };

        let content = create_alarm_content(&payload.alarm_name, &payload.label);
        if let Err(e) = self.notifier.show(id, &content) {
            warn!("Alarm {} notification failed: {}", id, e);
        }

        info!("Alarm {} ({}) ringing", id, payload.alarm_name);
        self.ringing.insert(
            id,
            Ringing {
                session,
                payload: payload.clone(),
            },
        );
        self.states.insert(id, RingState::Ringing);
        true
    }

    /// Stops alarm `id` and switches it off.
    ///
    /// Always ends the alert and notification, whether or not the alarm was
    /// ringing or its alert ever started.
    ///
    /// # Errors
    ///
    /// Returns an error if the switched-off state cannot be persisted.
    pub fn stop(&mut self, store: &mut AlarmStore, id: AlarmId) -> Result<(), FiringError> {
        self.silence(id);
        self.scheduler.cancel(id);
        self.switch_off(store, id)?;
        self.states.insert(id, RingState::Stopped);
        info!("Alarm {} stopped", id);
        Ok(())
    }

    /// Stops alarm `id` and fires it again after the snooze length.
    ///
    /// The record's repeat rule is left untouched; the snoozed fire keeps
    /// the alarm name. Returns the snoozed fire time.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted or the snoozed
    /// wake-up is rejected.
    pub fn snooze<Tz: TimeZone>(
        &mut self,
        store: &mut AlarmStore,
        id: AlarmId,
        now: &DateTime<Tz>,
    ) -> Result<DateTime<Utc>, FiringError> {
        let ringing_name = self.silence(id).map(|payload| payload.alarm_name);
        let name = store
            .get(id)
            .map(|alarm| alarm.alarm_name.clone())
            .or(ringing_name)
            .unwrap_or_else(|| DEFAULT_ALARM_NAME.to_string());

        self.scheduler.cancel(id);
        self.switch_off(store, id)?;

        let fire_at = now.with_timezone(&Utc) + self.snooze;
        self.scheduler
            .schedule_at(id, fire_at, WakePayload::snooze(id, name))?;

        self.states.insert(id, RingState::Snoozed);
        info!("Alarm {} snoozed until {}", id, fire_at);
        Ok(fire_at)
    }

    /// Drops everything held for a deleted alarm, silencing it if it rings.
    pub fn forget(&mut self, id: AlarmId) {
        if self.silence(id).is_some() {
            info!("Deleted alarm {} silenced", id);
        }
        self.states.remove(&id);
    }

    /// Ends the alert and notification for `id`, returning what was ringing.
    fn silence(&mut self, id: AlarmId) -> Option<WakePayload> {
        self.notifier.dismiss(id);
        self.ringing.remove(&id).map(|ringing| {
            if let Some(session) = ringing.session {
                session.release();
            }
            ringing.payload
        })
    }

    fn switch_off(&self, store: &mut AlarmStore, id: AlarmId) -> Result<(), FiringError> {
        match store.set_active(id, false) {
            Ok(_) => {}
            Err(e) if e.is_not_found() => debug!("Alarm {} no longer exists", id),
            Err(e) => return Err(e.into()),
        }
        // No subscribers is fine.
        let _ = self.signals.send(AlarmTurnedOff { alarm_id: id });
        Ok(())
    }
}

impl std::fmt::Debug for AlarmFiringHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmFiringHandler")
            .field("ringing", &self.ringing_ids())
            .field("snooze", &self.snooze)
            .finish_non_exhaustive()
    }
}
