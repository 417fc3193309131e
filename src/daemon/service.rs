//! Alarm side of the daemon: editing operations plus the ringing state.

use chrono::{DateTime, TimeZone, Utc};
use tracing::{info, warn};

use crate::clock::{AlarmClock, ClockError, RestoreReport};
use crate::firing::{AlarmFiringHandler, FiringError, RingState};
use crate::scheduler::WakePayload;
use crate::types::{AlarmId, AlarmParams, AlarmRecord, AlarmSummary};

/// Alarm clock and firing handler sharing one store.
///
/// The daemon keeps this behind a single lock so a fire, a stop and an
/// edit of the same alarm never interleave.
#[derive(Debug)]
pub struct AlarmService {
    clock: AlarmClock,
    firing: AlarmFiringHandler,
}

impl AlarmService {
    pub fn new(clock: AlarmClock, firing: AlarmFiringHandler) -> Self {
        Self { clock, firing }
    }

    /// Seeds the default alarms on first use and registers active alarms.
    pub fn start_up<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> RestoreReport {
        match self.clock.seed_defaults() {
            Ok(true) => info!("Seeded default alarms"),
            Ok(false) => {}
            Err(e) => warn!("Could not seed default alarms: {}", e),
        }
        self.clock.restore_active(now)
    }

    /// Handles a delivered wake-up.
    ///
    /// Wake-ups for alarms deleted in the meantime are ignored, except
    /// snoozed fires, which ring even if the record is gone.
    pub fn fire(&mut self, payload: &WakePayload) -> bool {
        let known = self.clock.store().get(payload.alarm_id).is_some();
        if !known && !payload.is_snooze() {
            warn!("Ignoring wake-up for unknown alarm {}", payload.alarm_id);
            return false;
        }
        self.firing.fire(payload)
    }

    /// # Errors
    ///
    /// Returns an error if the input is invalid or persisting fails.
    pub fn add<Tz: TimeZone>(
        &mut self,
        params: &AlarmParams,
        now: &DateTime<Tz>,
    ) -> Result<(AlarmRecord, Option<DateTime<Utc>>), ClockError> {
        let alarm = self.clock.add(params, now)?;
        if params.activate.unwrap_or(false) {
            return self.clock.set_active(alarm.id, true, now);
        }
        Ok((alarm, None))
    }

    /// # Errors
    ///
    /// Returns an error if the alarm does not exist, the input is invalid,
    /// persisting fails or the registration is rejected.
    pub fn edit<Tz: TimeZone>(
        &mut self,
        id: AlarmId,
        params: &AlarmParams,
        now: &DateTime<Tz>,
    ) -> Result<AlarmRecord, ClockError> {
        self.clock.edit(id, params, now)
    }

    /// # Errors
    ///
    /// Returns an error if the alarm does not exist, the registration is
    /// rejected or persisting fails.
    pub fn set_active<Tz: TimeZone>(
        &mut self,
        id: AlarmId,
        active: bool,
        now: &DateTime<Tz>,
    ) -> Result<(AlarmRecord, Option<DateTime<Utc>>), ClockError> {
        self.clock.set_active(id, active, now)
    }

    /// Deletes an alarm, silencing it first if it is ringing.
    ///
    /// # Errors
    ///
    /// Returns an error if the alarm does not exist or persisting fails.
    pub fn delete(&mut self, id: AlarmId) -> Result<AlarmRecord, ClockError> {
        let removed = self.clock.delete(id)?;
        self.firing.forget(id);
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns an error if the switched-off state cannot be persisted.
    pub fn stop(&mut self, id: AlarmId) -> Result<(), FiringError> {
        self.firing.stop(self.clock.store_mut(), id)
    }

    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted or the snoozed
    /// wake-up is rejected.
    pub fn snooze<Tz: TimeZone>(
        &mut self,
        id: AlarmId,
        now: &DateTime<Tz>,
    ) -> Result<DateTime<Utc>, FiringError> {
        self.firing.snooze(self.clock.store_mut(), id, now)
    }

    pub fn summaries<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Vec<AlarmSummary> {
        self.clock.summaries(now)
    }

    #[must_use]
    pub fn ring_state(&self, id: AlarmId) -> RingState {
        self.firing.state(id)
    }

    #[must_use]
    pub fn ringing_ids(&self) -> Vec<AlarmId> {
        self.firing.ringing_ids()
    }

    #[must_use]
    pub fn clock(&self) -> &AlarmClock {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Local, TimeZone};

    use super::*;
    use crate::alert::{MockAlertPresenter, SoundSource};
    use crate::notification::MockNotificationPresenter;
    use crate::scheduler::{AlarmScheduler, MockWakeScheduler};
    use crate::store::{AlarmStore, MemoryStore};

    fn create_service() -> (Arc<MockWakeScheduler>, Arc<MockAlertPresenter>, AlarmService) {
        let wake = Arc::new(MockWakeScheduler::new());
        let presenter = Arc::new(MockAlertPresenter::new());
        let scheduler = AlarmScheduler::new(wake.clone());
        let clock = AlarmClock::new(
            AlarmStore::load(Arc::new(MemoryStore::new())),
            scheduler.clone(),
        );
        let firing = AlarmFiringHandler::new(
            presenter.clone(),
            Arc::new(MockNotificationPresenter::new()),
            scheduler,
            SoundSource::Tone,
        );
        (wake, presenter, AlarmService::new(clock, firing))
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 13, 8, 0, 0).earliest().unwrap()
    }

    fn params(hour: u32, minute: u32) -> AlarmParams {
        AlarmParams {
            hour: Some(hour),
            minute: Some(minute),
            ..AlarmParams::default()
        }
    }

    #[test]
    fn test_start_up_seeds_defaults_once() {
        let (wake, _, mut service) = create_service();
        let report = service.start_up(&now());
        assert!(report.restored.is_empty());
        assert_eq!(service.summaries(&now()).len(), 3);
        assert_eq!(wake.active_count(), 0);

        service.start_up(&now());
        assert_eq!(service.summaries(&now()).len(), 3);
    }

    #[test]
    fn test_add_with_activate_registers() {
        let (wake, _, mut service) = create_service();
        let (alarm, fire_at) = service
            .add(
                &AlarmParams {
                    activate: Some(true),
                    ..params(9, 0)
                },
                &now(),
            )
            .unwrap();

        assert!(alarm.is_active);
        assert!(fire_at.is_some());
        assert!(wake.is_registered(alarm.id));
    }

    #[test]
    fn test_fire_ignores_deleted_alarm() {
        let (_, presenter, mut service) = create_service();
        let (alarm, _) = service.add(&params(9, 0), &now()).unwrap();
        service.delete(alarm.id).unwrap();

        assert!(!service.fire(&WakePayload::for_alarm(&alarm)));
        assert_eq!(presenter.start_count(), 0);
    }

    #[test]
    fn test_snoozed_fire_rings_without_record() {
        let (_, _, mut service) = create_service();
        assert!(service.fire(&WakePayload::snooze(42, "Nap")));
        assert_eq!(service.ringing_ids(), vec![42]);
    }

    #[test]
    fn test_delete_silences_ringing_alarm() {
        let (_, presenter, mut service) = create_service();
        let (alarm, _) = service.add(&params(9, 0), &now()).unwrap();
        service.fire(&WakePayload::for_alarm(&alarm));

        service.delete(alarm.id).unwrap();
        assert!(service.ringing_ids().is_empty());
        assert_eq!(presenter.active_count(), 0);
        assert_eq!(service.ring_state(alarm.id), RingState::Idle);
    }

    #[test]
    fn test_delete_drops_stopped_state() {
        let (_, _, mut service) = create_service();
        let (alarm, _) = service.add(&params(9, 0), &now()).unwrap();
        service.fire(&WakePayload::for_alarm(&alarm));
        service.stop(alarm.id).unwrap();
        assert_eq!(service.ring_state(alarm.id), RingState::Stopped);

        service.delete(alarm.id).unwrap();
        assert_eq!(service.ring_state(alarm.id), RingState::Idle);
    }

    #[test]
    fn test_stop_and_snooze_switch_off() {
        let (wake, _, mut service) = create_service();
        let (alarm, _) = service
            .add(
                &AlarmParams {
                    activate: Some(true),
                    ..params(9, 0)
                },
                &now(),
            )
            .unwrap();
        service.fire(&WakePayload::for_alarm(&alarm));

        let fire_at = service.snooze(alarm.id, &now()).unwrap();
        assert_eq!(service.ring_state(alarm.id), RingState::Snoozed);
        assert_eq!(wake.registration(alarm.id).unwrap().0, fire_at);
        assert!(!service.clock().store().get(alarm.id).unwrap().is_active);

        service.stop(alarm.id).unwrap();
        assert_eq!(service.ring_state(alarm.id), RingState::Stopped);
        assert!(!wake.is_registered(alarm.id));
    }
}
