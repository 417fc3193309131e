//! Notification content construction.
//!
//! This module provides a builder for creating notification content
//! with a fluent API.

use serde::{Deserialize, Serialize};

/// Maximum length for alarm names in notifications.
const MAX_NAME_LENGTH: usize = 100;

/// Notification action identifiers.
pub mod action_ids {
    /// Action ID for stopping a ringing alarm.
    pub const STOP: &str = "STOP_ALARM";
    /// Action ID for snoozing a ringing alarm.
    pub const SNOOZE: &str = "SNOOZE_ALARM";
    /// Action ID for opening the alarm list.
    pub const OPEN: &str = "OPEN_APP";
}

/// Buttons offered on an alarm notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    /// Stop the alarm
    Stop,
    /// Snooze the alarm
    Snooze,
    /// Open the alarm list
    Open,
}

impl NotificationAction {
    /// Returns the action identifier.
    pub fn id(&self) -> &'static str {
        match self {
            NotificationAction::Stop => action_ids::STOP,
            NotificationAction::Snooze => action_ids::SNOOZE,
            NotificationAction::Open => action_ids::OPEN,
        }
    }

    /// Returns the button label.
    pub fn label(&self) -> &'static str {
        match self {
            NotificationAction::Stop => "Stop",
            NotificationAction::Snooze => "Snooze",
            NotificationAction::Open => "Open",
        }
    }

    /// Parses an action identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            action_ids::STOP => Some(NotificationAction::Stop),
            action_ids::SNOOZE => Some(NotificationAction::Snooze),
            action_ids::OPEN => Some(NotificationAction::Open),
            _ => None,
        }
    }
}

/// A posted notification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationContent {
    /// Title line
    pub title: String,
    /// Body text
    pub body: String,
    /// Action buttons
    pub actions: Vec<NotificationAction>,
}

/// Builder for constructing notification content.
#[derive(Debug, Default)]
pub struct NotificationContentBuilder {
    content: NotificationContent,
}

impl NotificationContentBuilder {
    /// Creates a new notification content builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the notification title.
    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.content.title = title.to_string();
        self
    }

    /// Sets the notification body text.
    #[must_use]
    pub fn body(mut self, body: &str) -> Self {
        self.content.body = body.to_string();
        self
    }

    /// Adds an action button.
    #[must_use]
    pub fn action(mut self, action: NotificationAction) -> Self {
        if !self.content.actions.contains(&action) {
            self.content.actions.push(action);
        }
        self
    }

    /// Builds and returns the notification content.
    #[must_use]
    pub fn build(self) -> NotificationContent {
        self.content
    }
}

/// Sanitizes an alarm name for display in a notification.
///
/// Returns None if nothing printable remains.
pub fn validate_alarm_name(name: &str) -> Option<String> {
    let sanitized: String = name
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_LENGTH)
        .collect();

    if sanitized.trim().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Creates the notification for a ringing alarm.
///
/// `label` is the time of day, or `Snooze` for snoozed fires.
#[must_use]
pub fn create_alarm_content(alarm_name: &str, label: &str) -> NotificationContent {
    let name = validate_alarm_name(alarm_name)
        .unwrap_or_else(|| crate::types::DEFAULT_ALARM_NAME.to_string());

    NotificationContentBuilder::new()
        .title(&format!("⏰ {name}"))
        .body(label)
        .action(NotificationAction::Stop)
        .action(NotificationAction::Snooze)
        .action(NotificationAction::Open)
        .build()
}
