//! Alarm notifications.
//!
//! The daemon posts one notification per ringing alarm, keyed by alarm id,
//! offering stop/snooze/open actions. [`TracingNotificationPresenter`]
//! writes notifications to the log for headless machines.

mod content;
pub mod error;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::info;

pub use self::content::{
    action_ids, create_alarm_content, validate_alarm_name, NotificationAction,
    NotificationContent, NotificationContentBuilder,
};
pub use self::error::NotificationError;

use crate::types::AlarmId;

/// Posts and dismisses user-visible notifications.
pub trait NotificationPresenter: Send + Sync {
    /// Shows a notification, replacing any existing one with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification could not be posted.
    fn show(&self, id: AlarmId, content: &NotificationContent) -> Result<(), NotificationError>;

    /// Removes the notification with `id`. No-op if absent.
    fn dismiss(&self, id: AlarmId);
}

/// Notification presenter that writes to the log.
#[derive(Debug, Default)]
pub struct TracingNotificationPresenter;

impl NotificationPresenter for TracingNotificationPresenter {
    fn show(&self, id: AlarmId, content: &NotificationContent) -> Result<(), NotificationError> {
        let actions: Vec<&str> = content.actions.iter().map(|a| a.label()).collect();
        info!(
            "Notification {}: {} - {} [{}]",
            id,
            content.title,
            content.body,
            actions.join(", ")
        );
        Ok(())
    }

    fn dismiss(&self, id: AlarmId) {
        info!("Notification {} dismissed", id);
    }
}

/// Mock notification presenter for testing.
#[derive(Debug, Default)]
pub struct MockNotificationPresenter {
    visible: Mutex<HashMap<AlarmId, NotificationContent>>,
    show_calls: Mutex<usize>,
    should_fail: AtomicBool,
}

impl MockNotificationPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Currently visible notification for `id`.
    #[must_use]
    pub fn visible(&self, id: AlarmId) -> Option<NotificationContent> {
        self.visible.lock().unwrap().get(&id).cloned()
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible.lock().unwrap().len()
    }

    #[must_use]
    pub fn show_calls(&self) -> usize {
        *self.show_calls.lock().unwrap()
    }
}

impl NotificationPresenter for MockNotificationPresenter {
    fn show(&self, id: AlarmId, content: &NotificationContent) -> Result<(), NotificationError> {
        *self.show_calls.lock().unwrap() += 1;
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotificationError::SendFailed("Mock failure".to_string()));
        }
        self.visible.lock().unwrap().insert(id, content.clone());
        Ok(())
    }

    fn dismiss(&self, id: AlarmId) {
        self.visible.lock().unwrap().remove(&id);
    }
}
