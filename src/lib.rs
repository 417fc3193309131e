//! focusclock library
//!
//! This library provides the core functionality behind the focusclock
//! daemon and CLI. It includes:
//! - Recurrence resolution for repeating alarms
//! - Persistent alarm and countdown stores
//! - Wake-up scheduling, alarm firing and stop/snooze handling
//! - The focus countdown engine and its tick loop
//! - Alert playback (sound and vibration) and notifications
//! - IPC server/client for daemon-CLI communication
//! - CLI command parsing and display utilities

pub mod alert;
pub mod cli;
pub mod clock;
pub mod config;
pub mod countdown;
pub mod daemon;
pub mod firing;
pub mod notification;
pub mod recurrence;
pub mod scheduler;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    AlarmId, AlarmParams, AlarmRecord, AlarmSummary, CountdownPhase, CountdownSettings,
    CountdownState, IpcRequest, IpcResponse, RepeatMode, ResponseData, SettingsParams,
    TimerSummary, WeekdaySet,
};

pub use alert::{
    AlertError, AlertPresenter, AlertSession, AlertSpec, MockAlertPresenter,
    MockVibrationService, SoundSource, VibrationPattern, VibrationService,
};
pub use clock::{AlarmClock, ClockError};
pub use config::AppConfig;
pub use countdown::{CountdownEngine, CountdownError, CountdownEvent, CountdownTimer};
pub use firing::{AlarmFiringHandler, FiringError, RingState};
pub use notification::{MockNotificationPresenter, NotificationError, NotificationPresenter};
pub use recurrence::{next_fire_for, next_fire_time, RecurrenceRule};
pub use scheduler::{
    AlarmScheduler, MockWakeScheduler, SchedulerError, TokioWakeScheduler, WakePayload,
    WakeScheduler,
};
pub use store::{AlarmStore, CountdownStore, FileStore, KeyValueStore, MemoryStore, StoreError};
