//! In-process wake-scheduler backed by tokio timers.
//!
//! Each registration is a spawned task sleeping until its fire time, then
//! delivering the payload on an unbounded channel. The pending table is
//! locked while delivering, so once `cancel` returns the registration can
//! no longer fire.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{SchedulerError, WakePayload, WakeScheduler};
use crate::types::AlarmId;

struct Registration {
    generation: u64,
    fire_at: DateTime<Utc>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Pending {
    next_generation: u64,
    entries: HashMap<AlarmId, Registration>,
}

/// Wake-scheduler running inside the daemon's tokio runtime.
pub struct TokioWakeScheduler {
    sender: mpsc::UnboundedSender<WakePayload>,
    pending: Arc<Mutex<Pending>>,
}

impl TokioWakeScheduler {
    /// Creates the scheduler and the receiver on which fired payloads arrive.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WakePayload>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            sender,
            pending: Arc::new(Mutex::new(Pending::default())),
        };
        (scheduler, receiver)
    }

    /// Returns the pending fire time for `id`.
    #[must_use]
    pub fn pending_fire_time(&self, id: AlarmId) -> Option<DateTime<Utc>> {
        self.lock().entries.get(&id).map(|entry| entry.fire_at)
    }

    /// Number of pending registrations.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WakeScheduler for TokioWakeScheduler {
    fn register_one_shot(
        &self,
        id: AlarmId,
        when: DateTime<Utc>,
        payload: WakePayload,
    ) -> Result<(), SchedulerError> {
        let handle = Handle::try_current()
            .map_err(|e| SchedulerError::Unavailable(e.to_string()))?;
        if self.sender.is_closed() {
            return Err(SchedulerError::Unavailable(
                "wake receiver dropped".to_string(),
            ));
        }

        let delay = (when - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        // Held across spawn + insert so the task cannot fire before its entry exists.
        let mut pending = self.lock();
        let generation = pending.next_generation;
        pending.next_generation += 1;

        let table = Arc::clone(&self.pending);
        let sender = self.sender.clone();
        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;

            let mut pending = table.lock().unwrap_or_else(PoisonError::into_inner);
            let current = pending
                .entries
                .get(&id)
                .is_some_and(|entry| entry.generation == generation);
            if !current {
                return;
            }
            pending.entries.remove(&id);
            if sender.send(payload).is_err() {
                warn!("Wake-up for alarm {} fired with no receiver", id);
            }
        });

        let replaced = pending.entries.insert(
            id,
            Registration {
                generation,
                fire_at: when,
                task,
            },
        );
        if let Some(old) = replaced {
            old.task.abort();
            debug!("Replaced wake-up for alarm {}", id);
        }

        debug!("Wake-up for alarm {} in {:?}", id, delay);
        Ok(())
    }

    fn cancel(&self, id: AlarmId) {
        if let Some(entry) = self.lock().entries.remove(&id) {
            entry.task.abort();
        }
    }
}

impl Drop for TokioWakeScheduler {
    fn drop(&mut self) {
        for (_, entry) in self.lock().entries.drain() {
            entry.task.abort();
        }
    }
}

impl std::fmt::Debug for TokioWakeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioWakeScheduler")
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}
