//! Once-per-second driver for the countdown engine.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{CountdownEngine, CountdownError, CountdownEvent};
use crate::types::{
    CountdownPhase, CountdownSettings, PomodoroTask, SettingsParams, TaskId, TaskSummary,
    TimerSummary,
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

struct Ticker {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Ticker {
    fn stop(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// Shared countdown handle that ticks the engine while it is running.
///
/// At most one ticker task exists at a time. Every command runs under the
/// engine lock, so ticks never interleave with a transition.
#[derive(Clone)]
pub struct CountdownTimer {
    engine: Arc<AsyncMutex<CountdownEngine>>,
    ticker: Arc<Mutex<Option<Ticker>>>,
}

impl CountdownTimer {
    pub fn new(engine: CountdownEngine) -> Self {
        Self {
            engine: Arc::new(AsyncMutex::new(engine)),
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    /// Wraps a restored engine and resumes ticking if it was running.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn recover(engine: CountdownEngine) -> Self {
        let timer = Self::new(engine);
        if timer.engine.lock().await.phase() == CountdownPhase::Running {
            debug!("Resuming countdown ticks after restart");
            timer.spawn_ticker();
        }
        timer
    }

    /// # Errors
    ///
    /// Returns an error if already running or the state cannot be persisted.
    pub async fn start(&self, initial_millis: i64) -> Result<TimerSummary, CountdownError> {
        let mut engine = self.engine.lock().await;
        engine.start(initial_millis)?;
        self.spawn_ticker();
        Ok(engine.summary())
    }

    /// # Errors
    ///
    /// Returns an error if not paused or the state cannot be persisted.
    pub async fn resume(&self) -> Result<TimerSummary, CountdownError> {
        let mut engine = self.engine.lock().await;
        engine.resume()?;
        self.spawn_ticker();
        Ok(engine.summary())
    }

    /// # Errors
    ///
    /// Returns an error if not running or the state cannot be persisted.
    pub async fn pause(&self) -> Result<TimerSummary, CountdownError> {
        let mut engine = self.engine.lock().await;
        engine.pause()?;
        self.cancel_ticker();
        Ok(engine.summary())
    }

    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub async fn stop(&self) -> Result<TimerSummary, CountdownError> {
        let mut engine = self.engine.lock().await;
        self.cancel_ticker();
        engine.stop()?;
        Ok(engine.summary())
    }

    pub async fn status(&self) -> TimerSummary {
        self.engine.lock().await.summary()
    }

    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub async fn reset_cycles(&self) -> Result<TimerSummary, CountdownError> {
        let mut engine = self.engine.lock().await;
        engine.reset_cycles()?;
        Ok(engine.summary())
    }

    /// # Errors
    ///
    /// Returns an error if the settings are invalid or cannot be persisted.
    pub async fn configure(
        &self,
        params: &SettingsParams,
    ) -> Result<(CountdownSettings, TimerSummary), CountdownError> {
        let mut engine = self.engine.lock().await;
        let settings = engine.configure(params)?.clone();
        Ok((settings, engine.summary()))
    }

    /// Lists the pomodoro tasks.
    pub async fn tasks(&self) -> Vec<TaskSummary> {
        TaskSummary::all(self.engine.lock().await.tasks())
    }

    /// Adds a task. Returns it with the updated list.
    ///
    /// # Errors
    ///
    /// Returns an error if the task is invalid or cannot be persisted.
    pub async fn add_task(
        &self,
        title: &str,
        estimated_pomodoros: u32,
    ) -> Result<(PomodoroTask, Vec<TaskSummary>), CountdownError> {
        let mut engine = self.engine.lock().await;
        let task = engine.add_task(title, estimated_pomodoros)?;
        Ok((task, TaskSummary::all(engine.tasks())))
    }

    /// # Errors
    ///
    /// Returns an error if the task does not exist or cannot be persisted.
    pub async fn select_task(
        &self,
        id: Option<TaskId>,
    ) -> Result<(Option<PomodoroTask>, Vec<TaskSummary>), CountdownError> {
        let mut engine = self.engine.lock().await;
        let task = engine.select_task(id)?;
        Ok((task, TaskSummary::all(engine.tasks())))
    }

    /// # Errors
    ///
    /// Returns an error if the task does not exist or cannot be persisted.
    pub async fn set_task_completed(
        &self,
        id: TaskId,
        completed: bool,
    ) -> Result<(PomodoroTask, Vec<TaskSummary>), CountdownError> {
        let mut engine = self.engine.lock().await;
        let task = engine.set_task_completed(id, completed)?;
        Ok((task, TaskSummary::all(engine.tasks())))
    }

    /// # Errors
    ///
    /// Returns an error if the task does not exist or cannot be persisted.
    pub async fn delete_task(
        &self,
        id: TaskId,
    ) -> Result<(PomodoroTask, Vec<TaskSummary>), CountdownError> {
        let mut engine = self.engine.lock().await;
        let task = engine.delete_task(id)?;
        Ok((task, TaskSummary::all(engine.tasks())))
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<CountdownEvent> {
        self.engine.lock().await.subscribe()
    }

    /// Stops the ticker without touching the persisted state.
    pub fn shutdown(&self) {
        self.cancel_ticker();
    }

    /// Returns true while a ticker task is alive.
    pub fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|ticker| !ticker.task.is_finished())
    }

    fn spawn_ticker(&self) {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_ticks(self.engine.clone(), cancel.clone()));
        let previous = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Ticker { cancel, task });
        if let Some(previous) = previous {
            previous.stop();
        }
    }

    fn cancel_ticker(&self) {
        let current = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(ticker) = current {
            ticker.stop();
        }
    }
}

impl std::fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("ticking", &self.is_ticking())
            .finish_non_exhaustive()
    }
}

async fn run_ticks(engine: Arc<AsyncMutex<CountdownEngine>>, cancel: CancellationToken) {
    let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let mut engine = engine.lock().await;
                // A pause or stop may have won the lock first.
                if cancel.is_cancelled() {
                    break;
                }
                if engine.tick() != CountdownPhase::Running {
                    break;
                }
            }
        }
    }
    debug!("Countdown ticker exited");
}

// ============================================================================
// Tests
// ============================================================================
