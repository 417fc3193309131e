//! Persisted countdown state and settings.

use std::sync::Arc;

use tracing::warn;

use super::{read_versioned, write_versioned, KeyValueStore, StoreError};
use crate::types::{CountdownSettings, CountdownState, TaskList};

/// Key under which the countdown state is stored.
pub const STATE_KEY: &str = "countdown_state";

/// Key under which the countdown settings are stored.
pub const SETTINGS_KEY: &str = "countdown_settings";

/// Key under which the pomodoro task list is stored.
pub const TASKS_KEY: &str = "countdown_tasks";

/// Store for the single active countdown.
#[derive(Clone)]
pub struct CountdownStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CountdownStore {
    /// Creates a store over the given backend.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Loads the settings, falling back to defaults for missing or invalid data.
    #[must_use]
    pub fn load_settings(&self) -> CountdownSettings {
        let settings: CountdownSettings =
            read_versioned(self.backend.as_ref(), SETTINGS_KEY).unwrap_or_default();
        match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                warn!("Stored countdown settings are invalid ({}), using defaults", e);
                CountdownSettings::default()
            }
        }
    }

    /// Persists the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be written.
    pub fn save_settings(&self, settings: &CountdownSettings) -> Result<(), StoreError> {
        write_versioned(self.backend.as_ref(), SETTINGS_KEY, settings)
    }

    /// Loads the last persisted state.
    ///
    /// Missing or malformed data yields a fresh state of `default_interval_millis`.
    #[must_use]
    pub fn load_state(&self, default_interval_millis: u64) -> CountdownState {
        read_versioned(self.backend.as_ref(), STATE_KEY)
            .unwrap_or_else(|| CountdownState::new(default_interval_millis))
    }

    /// Persists the state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    pub fn save_state(&self, state: &CountdownState) -> Result<(), StoreError> {
        write_versioned(self.backend.as_ref(), STATE_KEY, state)
    }

    /// Loads the task list. Missing or malformed data yields an empty list.
    ///
    /// A selection pointing at a task that no longer exists is dropped.
    #[must_use]
    pub fn load_tasks(&self) -> TaskList {
        let mut list: TaskList =
            read_versioned(self.backend.as_ref(), TASKS_KEY).unwrap_or_default();
        if list.selected_id.is_some() && list.selected().is_none() {
            warn!("Selected task no longer exists, clearing selection");
            list.selected_id = None;
        }
        if let Some(max_id) = list.tasks.iter().map(|task| task.id).max() {
            list.next_id = list.next_id.max(max_id.saturating_add(1));
        }
        list
    }

    /// Persists the task list with its selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be written.
    pub fn save_tasks(&self, tasks: &TaskList) -> Result<(), StoreError> {
        write_versioned(self.backend.as_ref(), TASKS_KEY, tasks)
    }

    /// Wipes the state, settings and tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be cleared.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.clear()
    }
}

impl std::fmt::Debug for CountdownStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownStore").finish_non_exhaustive()
    }
}
