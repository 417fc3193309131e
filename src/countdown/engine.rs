//! Countdown state machine.
//!
//! This module provides the synchronous core of the focus countdown:
//! - State transitions (Stopped → Running ⇄ Paused, Running → Finished → Stopped)
//! - One-second ticks that persist after every decrement
//! - Tick/finish events for live clients
//! - The pomodoro task list, whose selected task is credited on finish
//!
//! Timing lives in [`super::CountdownTimer`]; the engine only reacts to calls.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::CountdownError;
use crate::alert::{AlertPresenter, AlertSession, AlertSpec, SoundSource};
use crate::store::CountdownStore;
use crate::types::{
    validate_task, CountdownPhase, CountdownSettings, CountdownState, PomodoroTask,
    SettingsParams, TaskId, TaskList, TimerSummary,
};

/// Milliseconds removed by one tick.
pub const TICK_MILLIS: u64 = 1000;

const EVENT_CAPACITY: usize = 64;

// ============================================================================
// CountdownEvent
// ============================================================================

/// Countdown events for live clients. Delivery is best-effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// One tick elapsed
    Tick {
        /// Time left after the tick
        remaining_millis: u64,
    },
    /// An interval reached zero
    Finished,
}

// ============================================================================
// CountdownEngine
// ============================================================================

/// Owns the countdown state and persists every change.
pub struct CountdownEngine {
    store: CountdownStore,
    settings: CountdownSettings,
    state: CountdownState,
    phase: CountdownPhase,
    tasks: TaskList,
    presenter: Arc<dyn AlertPresenter>,
    sound: SoundSource,
    alert: Option<AlertSession>,
    events: broadcast::Sender<CountdownEvent>,
}

impl CountdownEngine {
    /// Loads settings and the last persisted state.
    ///
    /// A state saved while running comes back as `Running` with its saved
    /// remaining time; a part-used interval comes back as `Paused`.
    pub fn restore(
        store: CountdownStore,
        presenter: Arc<dyn AlertPresenter>,
        sound: SoundSource,
    ) -> Self {
        let settings = store.load_settings();
        let state = store.load_state(settings.interval_millis());
        let tasks = store.load_tasks();
        let phase = if state.is_running {
            CountdownPhase::Running
        } else if state.remaining_millis != settings.interval_millis() {
            CountdownPhase::Paused
        } else {
            CountdownPhase::Stopped
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        debug!(
            "Restored countdown: {} with {} ms left",
            phase.as_str(),
            state.remaining_millis
        );

        Self {
            store,
            settings,
            state,
            phase,
            tasks,
            presenter,
            sound,
            alert: None,
            events,
        }
    }

    /// Starts a new interval of `initial_millis`, or the configured
    /// interval when `initial_millis <= 0`.
    ///
    /// # Errors
    ///
    /// Returns an error if already running or the state cannot be persisted.
    pub fn start(&mut self, initial_millis: i64) -> Result<(), CountdownError> {
        if self.phase == CountdownPhase::Running {
            return Err(CountdownError::AlreadyRunning);
        }

        self.release_alert();
        self.state.remaining_millis = u64::try_from(initial_millis)
            .ok()
            .filter(|millis| *millis > 0)
            .unwrap_or_else(|| self.settings.interval_millis());
        self.state.is_running = true;
        self.phase = CountdownPhase::Running;
        self.persist()?;

        info!("Countdown started: {} ms", self.state.remaining_millis);
        Ok(())
    }

    /// Continues a paused interval.
    ///
    /// # Errors
    ///
    /// Returns an error if not paused or the state cannot be persisted.
    pub fn resume(&mut self) -> Result<(), CountdownError> {
        if self.phase != CountdownPhase::Paused {
            return Err(CountdownError::NotPaused);
        }

        self.state.is_running = true;
        self.phase = CountdownPhase::Running;
        self.persist()?;

        info!("Countdown resumed: {} ms", self.state.remaining_millis);
        Ok(())
    }

    /// Removes one second, persists and publishes the new remaining time.
    ///
    /// Reaching zero runs the finish sequence. Does nothing unless running.
    /// Returns the phase after the tick.
    pub fn tick(&mut self) -> CountdownPhase {
        if self.phase != CountdownPhase::Running {
            return self.phase;
        }

        self.state.remaining_millis = self.state.remaining_millis.saturating_sub(TICK_MILLIS);
        if let Err(e) = self.persist() {
            warn!("Failed to persist tick: {}", e);
        }
        let _ = self.events.send(CountdownEvent::Tick {
            remaining_millis: self.state.remaining_millis,
        });
        debug!("Tick: {} ms left", self.state.remaining_millis);

        if self.state.remaining_millis == 0 {
            self.finish();
        }
        self.phase
    }

    /// Counts the cycle, credits the selected task, alerts, publishes
    /// `Finished` and resets to `Stopped`.
    fn finish(&mut self) {
        self.phase = CountdownPhase::Finished;
        self.state.completed_cycles = self.state.completed_cycles.saturating_add(1);
        self.credit_selected_task();

        let sound = self.settings.sound_enabled.then(|| self.sound.clone());
        let spec = AlertSpec::countdown_finished(sound, self.settings.vibration_enabled);
        if !spec.is_silent() {
            self.release_alert();
            match AlertSession::start(self.presenter.clone(), &spec) {
                Ok(session) => self.alert = Some(session),
                Err(e) => warn!("Countdown alert failed: {} ({})", e, e.suggestion()),
            }
        }

        let _ = self.events.send(CountdownEvent::Finished);
        info!(
            "Countdown finished, {} cycle(s) completed",
            self.state.completed_cycles
        );

        self.state.remaining_millis = self.settings.interval_millis();
        self.state.is_running = false;
        if let Err(e) = self.persist() {
            warn!("Failed to persist finished countdown: {}", e);
        }
        self.phase = CountdownPhase::Stopped;
    }

    /// Halts the interval, keeping its remaining time.
    ///
    /// # Errors
    ///
    /// Returns an error if not running or the state cannot be persisted.
    pub fn pause(&mut self) -> Result<(), CountdownError> {
        if self.phase != CountdownPhase::Running {
            return Err(CountdownError::NotRunning);
        }

        self.state.is_running = false;
        self.phase = CountdownPhase::Paused;
        self.persist()?;

        info!("Countdown paused: {} ms left", self.state.remaining_millis);
        Ok(())
    }

    /// Ends any alert and resets to a full, stopped interval. Valid in any phase.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub fn stop(&mut self) -> Result<(), CountdownError> {
        self.release_alert();
        self.state.remaining_millis = self.settings.interval_millis();
        self.state.is_running = false;
        self.phase = CountdownPhase::Stopped;
        self.persist()?;

        info!("Countdown stopped");
        Ok(())
    }

    /// Sets the completed-cycle counter back to zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub fn reset_cycles(&mut self) -> Result<(), CountdownError> {
        self.state.completed_cycles = 0;
        self.persist()?;
        Ok(())
    }

    /// Applies settings changes.
    ///
    /// A stopped countdown picks up a new interval length immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or cannot be persisted.
    pub fn configure(&mut self, params: &SettingsParams) -> Result<&CountdownSettings, CountdownError> {
        let mut settings = self.settings.clone();
        if let Some(minutes) = params.focus_minutes {
            settings.focus_minutes = minutes;
        }
        if let Some(enabled) = params.sound_enabled {
            settings.sound_enabled = enabled;
        }
        if let Some(enabled) = params.vibration_enabled {
            settings.vibration_enabled = enabled;
        }
        settings
            .validate()
            .map_err(CountdownError::InvalidSettings)?;

        self.store.save_settings(&settings)?;
        self.settings = settings;

        if self.phase == CountdownPhase::Stopped {
            self.state.remaining_millis = self.settings.interval_millis();
            self.persist()?;
        }
        Ok(&self.settings)
    }

    // ------------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------------

    /// Adds a task with an estimate of `estimated_pomodoros` intervals.
    ///
    /// # Errors
    ///
    /// Returns an error if the title or estimate is invalid, or the list
    /// cannot be persisted.
    pub fn add_task(
        &mut self,
        title: &str,
        estimated_pomodoros: u32,
    ) -> Result<PomodoroTask, CountdownError> {
        let title = validate_task(title, estimated_pomodoros).map_err(CountdownError::InvalidTask)?;
        let task = self.update_tasks(|tasks| Ok(tasks.push(title, estimated_pomodoros)))?;
        info!("Added task {} ({})", task.id, task.title);
        Ok(task)
    }

    /// Selects the task credited with finished intervals, or clears the
    /// selection with `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the task does not exist or the list cannot be persisted.
    pub fn select_task(&mut self, id: Option<TaskId>) -> Result<Option<PomodoroTask>, CountdownError> {
        self.update_tasks(|tasks| {
            let selected = match id {
                Some(id) => Some(tasks.get(id).cloned().ok_or(CountdownError::TaskNotFound(id))?),
                None => None,
            };
            tasks.selected_id = id;
            Ok(selected)
        })
    }

    /// Marks a task done or not done by hand.
    ///
    /// # Errors
    ///
    /// Returns an error if the task does not exist or the list cannot be persisted.
    pub fn set_task_completed(
        &mut self,
        id: TaskId,
        completed: bool,
    ) -> Result<PomodoroTask, CountdownError> {
        self.update_tasks(|tasks| {
            tasks
                .set_completed(id, completed)
                .cloned()
                .ok_or(CountdownError::TaskNotFound(id))
        })
    }

    /// Deletes a task, clearing the selection if it was selected.
    ///
    /// # Errors
    ///
    /// Returns an error if the task does not exist or the list cannot be persisted.
    pub fn delete_task(&mut self, id: TaskId) -> Result<PomodoroTask, CountdownError> {
        let removed =
            self.update_tasks(|tasks| tasks.remove(id).ok_or(CountdownError::TaskNotFound(id)))?;
        info!("Deleted task {}", id);
        Ok(removed)
    }

    #[must_use]
    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    fn credit_selected_task(&mut self) {
        let result = self.update_tasks(|tasks| Ok(tasks.credit_selected().cloned()));
        match result {
            Ok(Some(task)) => info!(
                "Task {} at {}/{} pomodoro(s)",
                task.id, task.completed_pomodoros, task.estimated_pomodoros
            ),
            Ok(None) => {}
            Err(e) => warn!("Failed to credit selected task: {}", e),
        }
    }

    /// Applies `change` to a copy of the task list and keeps it once persisted.
    fn update_tasks<T>(
        &mut self,
        change: impl FnOnce(&mut TaskList) -> Result<T, CountdownError>,
    ) -> Result<T, CountdownError> {
        let mut tasks = self.tasks.clone();
        let value = change(&mut tasks)?;
        if tasks != self.tasks {
            self.store.save_tasks(&tasks)?;
            self.tasks = tasks;
        }
        Ok(value)
    }

    /// Subscribes to tick and finish events.
    pub fn subscribe(&self) -> broadcast::Receiver<CountdownEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn phase(&self) -> CountdownPhase {
        self.phase
    }

    #[must_use]
    pub fn state(&self) -> &CountdownState {
        &self.state
    }

    #[must_use]
    pub fn settings(&self) -> &CountdownSettings {
        &self.settings
    }

    /// Returns true while a finish alert is held.
    #[must_use]
    pub fn is_alerting(&self) -> bool {
        self.alert.is_some()
    }

    #[must_use]
    pub fn summary(&self) -> TimerSummary {
        TimerSummary::new(self.phase, &self.state)
    }

    fn release_alert(&mut self) {
        if let Some(session) = self.alert.take() {
            session.release();
        }
    }

    fn persist(&self) -> Result<(), CountdownError> {
        self.store.save_state(&self.state)?;
        Ok(())
    }
}

impl std::fmt::Debug for CountdownEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownEngine")
            .field("phase", &self.phase)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
