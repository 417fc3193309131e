//! Durable collection of alarm definitions.
//!
//! The record list and the id counter are written together as one envelope
//! on every mutation, so the stored state is never half-updated.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{read_versioned, write_versioned, KeyValueStore, StoreError};
use crate::types::{AlarmId, AlarmRecord};

/// Key under which the alarm envelope is stored.
pub const ALARMS_KEY: &str = "alarms";

/// Times of the inactive alarms created on first use.
pub const DEFAULT_ALARM_TIMES: [(u32, u32); 3] = [(9, 30), (13, 30), (20, 45)];

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlarmSet {
    #[serde(default)]
    next_id: AlarmId,
    #[serde(default)]
    alarms: Vec<AlarmRecord>,
}

/// Ordered alarm records keyed by id.
pub struct AlarmStore {
    backend: Arc<dyn KeyValueStore>,
    state: AlarmSet,
}

impl AlarmStore {
    /// Loads the stored alarms. Malformed data yields an empty store.
    pub fn load(backend: Arc<dyn KeyValueStore>) -> Self {
        let state: AlarmSet = read_versioned(backend.as_ref(), ALARMS_KEY).unwrap_or_default();
        debug!("Loaded {} alarm(s)", state.alarms.len());
        Self { backend, state }
    }

    /// Re-reads the backing store, discarding in-memory state.
    pub fn reload(&mut self) {
        self.state = read_versioned(self.backend.as_ref(), ALARMS_KEY).unwrap_or_default();
    }

    /// Returns all alarms in insertion order.
    #[must_use]
    pub fn list(&self) -> &[AlarmRecord] {
        &self.state.alarms
    }

    /// Returns the alarm with the given id.
    #[must_use]
    pub fn get(&self, id: AlarmId) -> Option<&AlarmRecord> {
        self.state.alarms.iter().find(|alarm| alarm.id == id)
    }

    /// The id the next added alarm will receive.
    #[must_use]
    pub fn next_id(&self) -> AlarmId {
        self.state.next_id
    }

    /// Number of stored alarms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.alarms.len()
    }

    /// Returns true if no alarms are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.alarms.is_empty()
    }

    /// Creates an alarm with the next id, lets `configure` fill it in, and persists.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails; the store is left unchanged.
    pub fn add(
        &mut self,
        hour: u32,
        minute: u32,
        configure: impl FnOnce(&mut AlarmRecord),
    ) -> Result<AlarmRecord, StoreError> {
        let id = self.state.next_id;
        let mut alarm = AlarmRecord::new(id, hour, minute);
        configure(&mut alarm);
        alarm.id = id;

        self.state.alarms.push(alarm.clone());
        self.state.next_id = id.saturating_add(1);

        if let Err(e) = self.persist() {
            self.state.alarms.pop();
            self.state.next_id = id;
            return Err(e);
        }
        Ok(alarm)
    }

    /// Applies `change` to an alarm and persists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlarmNotFound` for unknown ids, or an error if
    /// persisting fails; the store is then left unchanged.
    pub fn update(
        &mut self,
        id: AlarmId,
        change: impl FnOnce(&mut AlarmRecord),
    ) -> Result<AlarmRecord, StoreError> {
        let index = self.index_of(id)?;

        let mut updated = self.state.alarms[index].clone();
        change(&mut updated);
        updated.id = id;

        let previous = std::mem::replace(&mut self.state.alarms[index], updated.clone());
        if let Err(e) = self.persist() {
            self.state.alarms[index] = previous;
            return Err(e);
        }
        Ok(updated)
    }

    /// Sets the active flag of an alarm and persists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlarmNotFound` for unknown ids, or an error if persisting fails.
    pub fn set_active(&mut self, id: AlarmId, active: bool) -> Result<AlarmRecord, StoreError> {
        self.update(id, |alarm| alarm.is_active = active)
    }

    /// Removes an alarm and persists. The id is never handed out again.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlarmNotFound` for unknown ids, or an error if
    /// persisting fails; the alarm is then kept.
    pub fn remove(&mut self, id: AlarmId) -> Result<AlarmRecord, StoreError> {
        let index = self.index_of(id)?;

        let removed = self.state.alarms.remove(index);
        if let Err(e) = self.persist() {
            self.state.alarms.insert(index, removed);
            return Err(e);
        }
        Ok(removed)
    }

    /// Seeds the default inactive alarms on first use.
    ///
    /// Does nothing once any alarm has ever been created. Returns true if
    /// defaults were added.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn seed_defaults_if_empty(&mut self) -> Result<bool, StoreError> {
        if !self.state.alarms.is_empty() || self.state.next_id != 0 {
            return Ok(false);
        }

        for (hour, minute) in DEFAULT_ALARM_TIMES {
            let id = self.state.next_id;
            self.state.alarms.push(AlarmRecord::new(id, hour, minute));
            self.state.next_id = id + 1;
        }
        if let Err(e) = self.persist() {
            self.state = AlarmSet::default();
            return Err(e);
        }

        info!("Created {} default alarms", DEFAULT_ALARM_TIMES.len());
        Ok(true)
    }

    /// Wipes every alarm and the id counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be cleared.
    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        self.backend.clear()?;
        self.state = AlarmSet::default();
        Ok(())
    }

    fn index_of(&self, id: AlarmId) -> Result<usize, StoreError> {
        self.state
            .alarms
            .iter()
            .position(|alarm| alarm.id == id)
            .ok_or(StoreError::AlarmNotFound(id))
    }

    fn persist(&self) -> Result<(), StoreError> {
        write_versioned(self.backend.as_ref(), ALARMS_KEY, &self.state)
    }
}

impl std::fmt::Debug for AlarmStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmStore")
            .field("alarms", &self.state.alarms.len())
            .field("next_id", &self.state.next_id)
            .finish_non_exhaustive()
    }
}
