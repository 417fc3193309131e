//! User-level alarm operations.
//!
//! [`AlarmClock`] keeps the alarm store and the wake-up registrations in
//! step: an alarm is marked active only after its registration succeeds,
//! edits to active alarms re-register them, and deletes cancel first.

mod error;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tracing::{info, warn};

pub use error::ClockError;

use crate::recurrence::next_fire_for;
use crate::scheduler::AlarmScheduler;
use crate::store::{AlarmStore, StoreError};
use crate::types::{validate_time, AlarmId, AlarmParams, AlarmRecord, AlarmSummary, RepeatMode};

/// Outcome of re-registering active alarms after a restart.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// Alarms registered again, with their fire times
    pub restored: Vec<(AlarmId, DateTime<Utc>)>,
    /// Alarms switched off because registration failed
    pub switched_off: Vec<AlarmId>,
}

/// Alarm store plus scheduler.
#[derive(Debug)]
pub struct AlarmClock {
    store: AlarmStore,
    scheduler: AlarmScheduler,
}

impl AlarmClock {
    pub fn new(store: AlarmStore, scheduler: AlarmScheduler) -> Self {
        Self { store, scheduler }
    }

    #[must_use]
    pub fn store(&self) -> &AlarmStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AlarmStore {
        &mut self.store
    }

    #[must_use]
    pub fn scheduler(&self) -> &AlarmScheduler {
        &self.scheduler
    }

    /// Creates the default alarms on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn seed_defaults(&mut self) -> Result<bool, ClockError> {
        Ok(self.store.seed_defaults_if_empty()?)
    }

    /// Creates an inactive alarm from `params`. Hour and minute are required.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is invalid or persisting fails.
    pub fn add<Tz: TimeZone>(
        &mut self,
        params: &AlarmParams,
        now: &DateTime<Tz>,
    ) -> Result<AlarmRecord, ClockError> {
        let (hour, minute) = match (params.hour, params.minute) {
            (Some(hour), Some(minute)) => (hour, minute),
            _ => {
                return Err(ClockError::InvalidInput(
                    "時刻を指定してください".to_string(),
                ))
            }
        };

        let mut draft = AlarmRecord::new(self.store.next_id(), hour, minute);
        apply_params(&mut draft, params, &now.timezone())?;

        let alarm = self.store.add(hour, minute, |alarm| *alarm = draft)?;
        info!("Added alarm {} at {}", alarm.id, alarm.time_label());
        Ok(alarm)
    }

    /// Changes an alarm. Active alarms are registered again for their new rule.
    ///
    /// If the new registration is rejected the alarm is switched off and the
    /// rejection returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the alarm does not exist, the input is invalid,
    /// persisting fails, or the registration is rejected.
    pub fn edit<Tz: TimeZone>(
        &mut self,
        id: AlarmId,
        params: &AlarmParams,
        now: &DateTime<Tz>,
    ) -> Result<AlarmRecord, ClockError> {
        let mut draft = self
            .store
            .get(id)
            .cloned()
            .ok_or(StoreError::AlarmNotFound(id))?;
        apply_params(&mut draft, params, &now.timezone())?;

        let alarm = self.store.update(id, |alarm| *alarm = draft)?;
        if alarm.is_active {
            if let Err(e) = self.scheduler.schedule(&alarm, now) {
                warn!("Rescheduling alarm {} failed: {}", id, e);
                self.scheduler.cancel(id);
                self.store.set_active(id, false)?;
                return Err(e.into());
            }
        }
        Ok(alarm)
    }

    /// Switches an alarm on or off.
    ///
    /// Switching on registers the wake-up first and only then persists
    /// `is_active`. Returns the record and, when switched on, its fire time.
    ///
    /// # Errors
    ///
    /// Returns an error if the alarm does not exist, the registration is
    /// rejected, or persisting fails.
    pub fn set_active<Tz: TimeZone>(
        &mut self,
        id: AlarmId,
        active: bool,
        now: &DateTime<Tz>,
    ) -> Result<(AlarmRecord, Option<DateTime<Utc>>), ClockError> {
        let alarm = self
            .store
            .get(id)
            .cloned()
            .ok_or(StoreError::AlarmNotFound(id))?;

        if !active {
            self.scheduler.cancel(id);
            let alarm = self.store.set_active(id, false)?;
            return Ok((alarm, None));
        }

        let fire_at = self.scheduler.schedule(&alarm, now)?;
        match self.store.set_active(id, true) {
            Ok(alarm) => Ok((alarm, Some(fire_at))),
            Err(e) => {
                self.scheduler.cancel(id);
                Err(e.into())
            }
        }
    }

    /// Cancels and removes an alarm.
    ///
    /// # Errors
    ///
    /// Returns an error if the alarm does not exist or persisting fails.
    pub fn delete(&mut self, id: AlarmId) -> Result<AlarmRecord, ClockError> {
        if self.store.get(id).is_none() {
            return Err(StoreError::AlarmNotFound(id).into());
        }
        self.scheduler.cancel(id);
        let removed = self.store.remove(id)?;
        info!("Deleted alarm {}", id);
        Ok(removed)
    }

    /// Registers every active alarm again, switching off those that fail.
    pub fn restore_active<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> RestoreReport {
        let mut report = RestoreReport::default();
        let active: Vec<AlarmRecord> = self
            .store
            .list()
            .iter()
            .filter(|alarm| alarm.is_active)
            .cloned()
            .collect();

        for alarm in active {
            match self.scheduler.schedule(&alarm, now) {
                Ok(fire_at) => report.restored.push((alarm.id, fire_at)),
                Err(e) => {
                    warn!("Could not restore alarm {}: {}", alarm.id, e);
                    if let Err(e) = self.store.set_active(alarm.id, false) {
                        warn!("Could not switch off alarm {}: {}", alarm.id, e);
                    }
                    report.switched_off.push(alarm.id);
                }
            }
        }

        info!(
            "Restored {} alarm(s), switched off {}",
            report.restored.len(),
            report.switched_off.len()
        );
        report
    }

    /// Re-reads the store and summarizes every alarm.
    pub fn summaries<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Vec<AlarmSummary> {
        self.store.reload();
        self.store
            .list()
            .iter()
            .map(|alarm| summarize(alarm, now))
            .collect()
    }
}

/// Summarizes one alarm; the next fire time is included for active alarms.
pub fn summarize<Tz: TimeZone>(alarm: &AlarmRecord, now: &DateTime<Tz>) -> AlarmSummary {
    let next_fire = alarm
        .is_active
        .then(|| next_fire_for(alarm, now).fixed_offset());
    AlarmSummary::from_record(alarm, next_fire)
}

/// Applies the present fields of `params` to `alarm`.
fn apply_params<Tz: TimeZone>(
    alarm: &mut AlarmRecord,
    params: &AlarmParams,
    tz: &Tz,
) -> Result<(), ClockError> {
    if params.hour.is_some() || params.minute.is_some() {
        let hour = params.hour.unwrap_or(alarm.hour);
        let minute = params.minute.unwrap_or(alarm.minute);
        validate_time(hour, minute).map_err(ClockError::InvalidInput)?;
        alarm.hour = hour;
        alarm.minute = minute;
    }

    if let Some(name) = &params.name {
        alarm.rename(name.as_str());
    }

    let mode = match (params.repeat, params.days, params.date) {
        (Some(mode), _, _) => Some(mode),
        (None, Some(_), _) => Some(RepeatMode::Custom),
        (None, None, Some(_)) => Some(RepeatMode::SpecificDate),
        (None, None, None) => None,
    };

    if let Some(mode) = mode {
        let days = params.days.unwrap_or(alarm.repeat_days);
        let specific_date = match (mode, params.date) {
            (RepeatMode::SpecificDate, Some(date)) => Some(start_of_day_millis(date, tz)?),
            (RepeatMode::SpecificDate, None) => Some(alarm.specific_date.ok_or_else(|| {
                ClockError::InvalidInput("日付を指定してください".to_string())
            })?),
            _ => None,
        };
        alarm.set_repeat(mode, days, specific_date);
    }

    Ok(())
}

fn start_of_day_millis<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<i64, ClockError> {
    tz.from_local_datetime(&date.and_time(chrono::NaiveTime::MIN))
        .earliest()
        .map(|start| start.timestamp_millis())
        .ok_or_else(|| ClockError::InvalidInput(format!("無効な日付です: {date}")))
}
