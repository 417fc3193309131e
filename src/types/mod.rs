//! Core data types for the alarm clock and focus countdown.
//!
//! This module defines the data structures used for:
//! - Alarm definitions and their repeat rules
//! - Countdown state and settings with validation
//! - IPC request/response serialization

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

/// Identifier of an alarm. Assigned from a monotonically increasing counter.
pub type AlarmId = u32;

/// Default label for alarms created without a name.
pub const DEFAULT_ALARM_NAME: &str = "Alarm";

/// `(colorOff, colorOn)` palette, indexed by `id % len`.
pub const ALARM_COLORS: [(&str, &str); 4] = [
    ("#9B8AB8", "#D4C5E3"),
    ("#8B7BA8", "#C8B8DC"),
    ("#7A6A98", "#B4A5C7"),
    ("#6A5A88", "#A495B7"),
];

// ============================================================================
// RepeatMode
// ============================================================================

/// Repeat policy of an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepeatMode {
    /// Fires once at the next occurrence of its time of day
    #[default]
    Once,
    /// Fires on one calendar date
    SpecificDate,
    /// Every day of the week
    Daily,
    /// Monday to Friday
    Weekdays,
    /// Saturday and Sunday
    Weekends,
    /// A user-selected set of days
    Custom,
}

impl RepeatMode {
    /// Returns the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Once => "once",
            RepeatMode::SpecificDate => "date",
            RepeatMode::Daily => "daily",
            RepeatMode::Weekdays => "weekdays",
            RepeatMode::Weekends => "weekends",
            RepeatMode::Custom => "custom",
        }
    }

    /// Returns true if the mode repeats on a day-of-week basis.
    pub fn is_recurring(&self) -> bool {
        matches!(
            self,
            RepeatMode::Daily | RepeatMode::Weekdays | RepeatMode::Weekends | RepeatMode::Custom
        )
    }
}

// ============================================================================
// WeekdaySet
// ============================================================================

/// Set of days of the week, persisted as Sunday-first numbers (1 = Sunday, 7 = Saturday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Days in Sunday-first order.
    const ORDER: [Weekday; 7] = [
        Weekday::Sun,
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ];

    /// Creates an empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// All seven days.
    pub const fn all() -> Self {
        Self(0b111_1111)
    }

    /// Monday to Friday.
    pub fn weekdays() -> Self {
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ]
        .into_iter()
        .collect()
    }

    /// Saturday and Sunday.
    pub fn weekends() -> Self {
        [Weekday::Sat, Weekday::Sun].into_iter().collect()
    }

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_sunday()
    }

    /// Adds a day to the set.
    pub fn insert(&mut self, day: Weekday) {
        self.0 |= Self::bit(day);
    }

    /// Removes a day from the set.
    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !Self::bit(day);
    }

    /// Returns true if the day is a member of the set.
    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    /// Returns true if no day is selected.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of selected days.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates over the selected days in Sunday-first order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        Self::ORDER.into_iter().filter(|day| self.contains(*day))
    }

    /// Converts a Sunday-first day number (1-7) into a weekday.
    pub fn day_from_number(number: u8) -> Option<Weekday> {
        match number {
            1..=7 => Some(Self::ORDER[usize::from(number - 1)]),
            _ => None,
        }
    }

    /// Parses a day name such as `mon`, `Tuesday` or `sat`.
    pub fn parse_day(name: &str) -> Option<Weekday> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sun" | "sunday" => Some(Weekday::Sun),
            "mon" | "monday" => Some(Weekday::Mon),
            "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
            "wed" | "wednesday" => Some(Weekday::Wed),
            "thu" | "thurs" | "thursday" => Some(Weekday::Thu),
            "fri" | "friday" => Some(Weekday::Fri),
            "sat" | "saturday" => Some(Weekday::Sat),
            _ => None,
        }
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = String;

    fn try_from(numbers: Vec<u8>) -> Result<Self, Self::Error> {
        numbers
            .into_iter()
            .map(|n| Self::day_from_number(n).ok_or_else(|| format!("invalid day number: {n}")))
            .collect()
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.iter()
            .map(|day| day.number_from_sunday() as u8)
            .collect()
    }
}

// ============================================================================
// AlarmRecord
// ============================================================================

/// A user-defined alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmRecord {
    /// Unique identifier, never reused
    pub id: AlarmId,
    /// Hour of day (0-23)
    pub hour: u32,
    /// Minute of hour (0-59)
    pub minute: u32,
    /// Whether the alarm has a pending wake-up registration
    pub is_active: bool,
    /// Presentation color when switched off
    pub color_off: String,
    /// Presentation color when switched on
    pub color_on: String,
    /// Days the alarm repeats on (authoritative for the recurring modes)
    #[serde(default)]
    pub repeat_days: WeekdaySet,
    /// Repeat policy
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    /// Free-text label
    #[serde(default = "default_alarm_name")]
    pub alarm_name: String,
    /// Epoch milliseconds of the chosen date (only for `SpecificDate`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_date: Option<i64>,
}

fn default_alarm_name() -> String {
    DEFAULT_ALARM_NAME.to_string()
}

impl AlarmRecord {
    /// Creates an inactive one-shot alarm with the palette colors for `id`.
    pub fn new(id: AlarmId, hour: u32, minute: u32) -> Self {
        let (color_off, color_on) = ALARM_COLORS[id as usize % ALARM_COLORS.len()];
        Self {
            id,
            hour,
            minute,
            is_active: false,
            color_off: color_off.to_string(),
            color_on: color_on.to_string(),
            repeat_days: WeekdaySet::empty(),
            repeat_mode: RepeatMode::Once,
            alarm_name: default_alarm_name(),
            specific_date: None,
        }
    }

    /// Sets the alarm name, falling back to the default for blank input.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.rename(name);
        self
    }

    /// Renames the alarm. Blank names fall back to the default label.
    pub fn rename(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.alarm_name = if name.trim().is_empty() {
            default_alarm_name()
        } else {
            name
        };
    }

    /// Changes the time of day.
    ///
    /// # Errors
    ///
    /// Returns an error message if the time is out of range.
    pub fn set_time(&mut self, hour: u32, minute: u32) -> Result<(), String> {
        validate_time(hour, minute)?;
        self.hour = hour;
        self.minute = minute;
        Ok(())
    }

    /// Applies a repeat rule, materializing the day set for the fixed modes.
    ///
    /// `days` is only read for `Custom`; `specific_date` only for `SpecificDate`.
    pub fn set_repeat(&mut self, mode: RepeatMode, days: WeekdaySet, specific_date: Option<i64>) {
        self.repeat_mode = mode;
        self.specific_date = None;
        self.repeat_days = match mode {
            RepeatMode::Once => WeekdaySet::empty(),
            RepeatMode::SpecificDate => {
                self.specific_date = specific_date;
                WeekdaySet::empty()
            }
            RepeatMode::Daily => WeekdaySet::all(),
            RepeatMode::Weekdays => WeekdaySet::weekdays(),
            RepeatMode::Weekends => WeekdaySet::weekends(),
            RepeatMode::Custom => days,
        };
    }

    /// Returns the 12-hour clock label, e.g. `09 : 30 AM`.
    pub fn time_label(&self) -> String {
        format_time_label(self.hour, self.minute)
    }

    /// Returns the human-readable repeat description using the local time zone.
    pub fn repeat_label(&self) -> String {
        self.repeat_label_in(&chrono::Local)
    }

    /// Returns the human-readable repeat description, rendering dates in `tz`.
    pub fn repeat_label_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: fmt::Display,
    {
        match self.repeat_mode {
            RepeatMode::Once => "Once".to_string(),
            RepeatMode::SpecificDate => self
                .specific_date
                .and_then(|millis| tz.timestamp_millis_opt(millis).single())
                .map(|date| date.format("%d %b %Y").to_string())
                .unwrap_or_else(|| "Once".to_string()),
            RepeatMode::Daily => "Every day".to_string(),
            RepeatMode::Weekdays => "Mon - Fri".to_string(),
            RepeatMode::Weekends => "Sat - Sun".to_string(),
            RepeatMode::Custom => {
                if self.repeat_days.is_empty() {
                    "Once".to_string()
                } else {
                    self.repeat_days
                        .iter()
                        .map(|day| day.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                }
            }
        }
    }
}

/// Validates a wall-clock time of day.
///
/// # Errors
///
/// Returns an error message if the hour or minute is out of range.
pub fn validate_time(hour: u32, minute: u32) -> Result<(), String> {
    if hour > 23 {
        return Err("時は0-23の範囲で指定してください".to_string());
    }
    if minute > 59 {
        return Err("分は0-59の範囲で指定してください".to_string());
    }
    Ok(())
}

/// Formats a time of day as a 12-hour label.
pub fn format_time_label(hour: u32, minute: u32) -> String {
    let am_pm = if hour >= 12 { "PM" } else { "AM" };
    let hour12 = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    format!("{hour12:02} : {minute:02} {am_pm}")
}

// ============================================================================
// Countdown
// ============================================================================

/// Represents the current phase of the focus countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownPhase {
    /// Not counting; remaining time is the full interval
    #[default]
    Stopped,
    /// Counting down once per second
    Running,
    /// Halted part-way through an interval
    Paused,
    /// Reached zero; transient before the automatic reset
    Finished,
}

impl CountdownPhase {
    /// Returns the string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            CountdownPhase::Stopped => "stopped",
            CountdownPhase::Running => "running",
            CountdownPhase::Paused => "paused",
            CountdownPhase::Finished => "finished",
        }
    }
}

/// Persisted state of the focus countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownState {
    /// Time left in the current interval
    pub remaining_millis: u64,
    /// Whether the countdown was ticking at the last save
    pub is_running: bool,
    /// Completed intervals since the last manual reset
    pub completed_cycles: u32,
}

impl CountdownState {
    /// Creates a stopped state holding a full interval.
    pub fn new(interval_millis: u64) -> Self {
        Self {
            remaining_millis: interval_millis,
            is_running: false,
            completed_cycles: 0,
        }
    }
}

/// User settings for the focus countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownSettings {
    /// Focus interval length in minutes (1-120)
    pub focus_minutes: u32,
    /// Whether to play a sound when an interval finishes
    pub sound_enabled: bool,
    /// Whether to vibrate when an interval finishes
    pub vibration_enabled: bool,
}

impl Default for CountdownSettings {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            sound_enabled: true,
            vibration_enabled: true,
        }
    }
}

impl CountdownSettings {
    /// Creates new settings with the specified focus duration.
    pub fn with_focus_minutes(mut self, minutes: u32) -> Self {
        self.focus_minutes = minutes;
        self
    }

    /// Length of one interval in milliseconds.
    pub fn interval_millis(&self) -> u64 {
        u64::from(self.focus_minutes) * 60 * 1000
    }

    /// Validates the settings.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.focus_minutes < 1 || self.focus_minutes > 120 {
            return Err("集中時間は1-120分の範囲で指定してください".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Pomodoro Tasks
// ============================================================================

/// Identifier of a pomodoro task. Never reused within one task list.
pub type TaskId = u32;

/// Longest accepted task title, in characters.
pub const MAX_TASK_TITLE_CHARS: usize = 80;

/// A piece of work measured in finished focus intervals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroTask {
    /// Task identifier
    pub id: TaskId,
    /// What the user is working on
    pub title: String,
    /// Intervals the user expects to spend
    pub estimated_pomodoros: u32,
    /// Intervals finished while the task was selected
    #[serde(default)]
    pub completed_pomodoros: u32,
    /// Set when the estimate is reached, or by hand
    #[serde(default)]
    pub is_completed: bool,
}

impl PomodoroTask {
    /// Creates an unstarted task.
    pub fn new(id: TaskId, title: impl Into<String>, estimated_pomodoros: u32) -> Self {
        Self {
            id,
            title: title.into(),
            estimated_pomodoros,
            completed_pomodoros: 0,
            is_completed: false,
        }
    }

    /// Counts one finished interval. Stops counting at the estimate.
    ///
    /// Returns true if the interval was counted.
    pub fn increment_completed(&mut self) -> bool {
        if self.completed_pomodoros >= self.estimated_pomodoros {
            return false;
        }
        self.completed_pomodoros += 1;
        if self.completed_pomodoros >= self.estimated_pomodoros {
            self.is_completed = true;
        }
        true
    }

    /// Share of the estimate already finished, in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        if self.estimated_pomodoros == 0 {
            return 0.0;
        }
        self.completed_pomodoros as f32 / self.estimated_pomodoros as f32
    }
}

/// Validates a new task's title and estimate, returning the trimmed title.
pub fn validate_task(title: &str, estimated_pomodoros: u32) -> Result<String, String> {
    let title = title.trim();
    if title.is_empty() {
        return Err("タスク名を入力してください".to_string());
    }
    if title.chars().count() > MAX_TASK_TITLE_CHARS {
        return Err(format!(
            "タスク名は{MAX_TASK_TITLE_CHARS}文字以内で指定してください"
        ));
    }
    if estimated_pomodoros < 1 {
        return Err("見積もりは1以上で指定してください".to_string());
    }
    Ok(title.to_string())
}

/// Persisted task list with the selected task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    /// Id the next added task will receive
    #[serde(default)]
    pub next_id: TaskId,
    /// Tasks in insertion order
    #[serde(default)]
    pub tasks: Vec<PomodoroTask>,
    /// Task credited with finished intervals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_id: Option<TaskId>,
}

impl TaskList {
    /// Returns the task with the given id.
    pub fn get(&self, id: TaskId) -> Option<&PomodoroTask> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Returns the selected task, if it still exists.
    pub fn selected(&self) -> Option<&PomodoroTask> {
        self.selected_id.and_then(|id| self.get(id))
    }

    fn get_mut(&mut self, id: TaskId) -> Option<&mut PomodoroTask> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    /// Appends a task under the next id and returns it.
    pub fn push(&mut self, title: String, estimated_pomodoros: u32) -> PomodoroTask {
        let task = PomodoroTask::new(self.next_id, title, estimated_pomodoros);
        self.next_id = self.next_id.saturating_add(1);
        self.tasks.push(task.clone());
        task
    }

    /// Removes a task, clearing the selection if it pointed at it.
    pub fn remove(&mut self, id: TaskId) -> Option<PomodoroTask> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        if self.selected_id == Some(id) {
            self.selected_id = None;
        }
        Some(self.tasks.remove(index))
    }

    /// Marks a task done or not done by hand.
    pub fn set_completed(&mut self, id: TaskId, completed: bool) -> Option<&PomodoroTask> {
        let task = self.get_mut(id)?;
        task.is_completed = completed;
        Some(task)
    }

    /// Credits the selected task with one finished interval.
    ///
    /// Returns the task if it was credited.
    pub fn credit_selected(&mut self) -> Option<&PomodoroTask> {
        let id = self.selected_id?;
        let task = self.get_mut(id)?;
        if task.increment_completed() {
            Some(task)
        } else {
            None
        }
    }
}

// ============================================================================
// IPC Types
// ============================================================================

/// Alarm fields supplied by add/edit commands. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmParams {
    /// Hour of day
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    /// Minute of hour
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    /// Alarm label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Repeat policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<RepeatMode>,
    /// Days for the custom policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<WeekdaySet>,
    /// Calendar date for the specific-date policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Switch the alarm on right away (add only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activate: Option<bool>,
}

/// Countdown settings changes. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsParams {
    /// Focus interval in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_minutes: Option<u32>,
    /// Sound toggle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_enabled: Option<bool>,
    /// Vibration toggle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibration_enabled: Option<bool>,
}

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Create a new alarm
    AlarmAdd {
        /// Alarm fields
        #[serde(flatten)]
        params: AlarmParams,
    },
    /// Modify an existing alarm
    AlarmEdit {
        /// Target alarm
        id: AlarmId,
        /// Fields to change
        #[serde(flatten)]
        params: AlarmParams,
    },
    /// List all alarms
    AlarmList,
    /// Switch an alarm on or off
    AlarmSetActive {
        /// Target alarm
        id: AlarmId,
        /// New state
        active: bool,
    },
    /// Delete an alarm
    AlarmDelete {
        /// Target alarm
        id: AlarmId,
    },
    /// Stop a ringing alarm
    AlarmStop {
        /// Target alarm
        id: AlarmId,
    },
    /// Snooze a ringing alarm
    AlarmSnooze {
        /// Target alarm
        id: AlarmId,
    },
    /// Start (or resume) the countdown
    TimerStart {
        /// Initial duration; the configured interval is used when absent or non-positive
        #[serde(default, skip_serializing_if = "Option::is_none")]
        millis: Option<i64>,
    },
    /// Pause the countdown
    TimerPause,
    /// Resume a paused countdown
    TimerResume,
    /// Stop and reset the countdown
    TimerStop,
    /// Query the countdown
    TimerStatus,
    /// Reset the completed-cycle counter
    TimerResetCycles,
    /// Change countdown settings
    TimerConfigure {
        /// Settings changes
        #[serde(flatten)]
        params: SettingsParams,
    },
    /// Add a pomodoro task
    TaskAdd {
        /// Task title
        title: String,
        /// Expected number of intervals
        estimated_pomodoros: u32,
    },
    /// List pomodoro tasks
    TaskList,
    /// Select the task credited with finished intervals; `None` clears it
    TaskSelect {
        /// Target task
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<TaskId>,
    },
    /// Mark a task done or not done
    TaskComplete {
        /// Target task
        id: TaskId,
        /// New state
        completed: bool,
    },
    /// Delete a pomodoro task
    TaskDelete {
        /// Target task
        id: TaskId,
    },
}

/// Alarm as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmSummary {
    /// Alarm identifier
    pub id: AlarmId,
    /// Alarm label
    pub name: String,
    /// 12-hour time label
    pub time: String,
    /// Repeat description
    pub repeat: String,
    /// Whether the alarm is switched on
    pub active: bool,
    /// Next computed fire time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fire: Option<DateTime<FixedOffset>>,
}

impl AlarmSummary {
    /// Creates a summary from a record and its resolved next fire time.
    pub fn from_record(record: &AlarmRecord, next_fire: Option<DateTime<FixedOffset>>) -> Self {
        Self {
            id: record.id,
            name: record.alarm_name.clone(),
            time: record.time_label(),
            repeat: record.repeat_label(),
            active: record.is_active,
            next_fire,
        }
    }
}

/// Countdown as presented to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSummary {
    /// Current phase
    pub phase: CountdownPhase,
    /// Time left in the current interval
    pub remaining_millis: u64,
    /// Completed intervals
    pub completed_cycles: u32,
}

impl TimerSummary {
    /// Creates a summary from the engine phase and persisted state.
    pub fn new(phase: CountdownPhase, state: &CountdownState) -> Self {
        Self {
            phase,
            remaining_millis: state.remaining_millis,
            completed_cycles: state.completed_cycles,
        }
    }
}

/// Task as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    /// Task identifier
    pub id: TaskId,
    /// Task title
    pub title: String,
    /// Expected intervals
    pub estimated_pomodoros: u32,
    /// Finished intervals
    pub completed_pomodoros: u32,
    /// Whether the task is done
    pub completed: bool,
    /// Whether finished intervals are credited to this task
    pub selected: bool,
}

impl TaskSummary {
    /// Creates a summary of `task` within `list`.
    pub fn new(task: &PomodoroTask, list: &TaskList) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            estimated_pomodoros: task.estimated_pomodoros,
            completed_pomodoros: task.completed_pomodoros,
            completed: task.is_completed,
            selected: list.selected_id == Some(task.id),
        }
    }

    /// Summarizes every task in `list`.
    pub fn all(list: &TaskList) -> Vec<Self> {
        list.tasks.iter().map(|task| Self::new(task, list)).collect()
    }
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    /// Alarms affected by or listed in the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarms: Option<Vec<AlarmSummary>>,
    /// Countdown status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerSummary>,
    /// Countdown settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<CountdownSettings>,
    /// Pomodoro tasks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<TaskSummary>>,
}

impl ResponseData {
    /// Creates response data carrying alarms.
    pub fn with_alarms(alarms: Vec<AlarmSummary>) -> Self {
        Self {
            alarms: Some(alarms),
            ..Self::default()
        }
    }

    /// Creates response data carrying the countdown status.
    pub fn with_timer(timer: TimerSummary) -> Self {
        Self {
            timer: Some(timer),
            ..Self::default()
        }
    }

    /// Creates response data carrying tasks.
    pub fn with_tasks(tasks: Vec<TaskSummary>) -> Self {
        Self {
            tasks: Some(tasks),
            ..Self::default()
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true for success responses.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // WeekdaySet Tests
    // ------------------------------------------------------------------------

    mod weekday_set_tests {
        use super::*;

        #[test]
        fn test_fixed_sets() {
            assert_eq!(WeekdaySet::all().len(), 7);
            assert_eq!(WeekdaySet::weekdays().len(), 5);
            assert!(!WeekdaySet::weekdays().contains(Weekday::Sat));
            assert!(WeekdaySet::weekends().contains(Weekday::Sun));
            assert!(WeekdaySet::empty().is_empty());
        }

        #[test]
        fn test_serializes_sunday_first_numbers() {
            let set: WeekdaySet = [Weekday::Sat, Weekday::Sun, Weekday::Mon]
                .into_iter()
                .collect();
            let json = serde_json::to_string(&set).unwrap();
            assert_eq!(json, "[1,2,7]");
        }

        #[test]
        fn test_rejects_out_of_range_numbers() {
            assert!(serde_json::from_str::<WeekdaySet>("[0]").is_err());
            assert!(serde_json::from_str::<WeekdaySet>("[8]").is_err());
            let set: WeekdaySet = serde_json::from_str("[2,6]").unwrap();
            assert!(set.contains(Weekday::Mon));
            assert!(set.contains(Weekday::Fri));
        }

        #[test]
        fn test_insert_remove() {
            let mut set = WeekdaySet::empty();
            set.insert(Weekday::Wed);
            set.insert(Weekday::Wed);
            assert_eq!(set.len(), 1);
            set.remove(Weekday::Wed);
            assert!(set.is_empty());
        }

        #[test]
        fn test_parse_day() {
            assert_eq!(WeekdaySet::parse_day("Mon"), Some(Weekday::Mon));
            assert_eq!(WeekdaySet::parse_day(" thursday "), Some(Weekday::Thu));
            assert_eq!(WeekdaySet::parse_day("funday"), None);
        }

        #[test]
        fn test_iter_is_sunday_first() {
            let days: Vec<_> = WeekdaySet::weekends().iter().collect();
            assert_eq!(days, vec![Weekday::Sun, Weekday::Sat]);
        }
    }

    // ------------------------------------------------------------------------
    // AlarmRecord Tests
    // ------------------------------------------------------------------------

    mod alarm_record_tests {
        use super::*;
        use chrono::Utc;

        #[test]
        fn test_new_uses_palette_and_defaults() {
            let alarm = AlarmRecord::new(5, 7, 15);
            assert_eq!(alarm.color_off, "#8B7BA8");
            assert_eq!(alarm.color_on, "#C8B8DC");
            assert_eq!(alarm.alarm_name, "Alarm");
            assert_eq!(alarm.repeat_mode, RepeatMode::Once);
            assert!(!alarm.is_active);
        }

        #[test]
        fn test_blank_name_falls_back_to_default() {
            let alarm = AlarmRecord::new(0, 7, 0).with_name("   ");
            assert_eq!(alarm.alarm_name, "Alarm");
        }

        #[test]
        fn test_set_repeat_materializes_days() {
            let mut alarm = AlarmRecord::new(0, 7, 0);

            alarm.set_repeat(RepeatMode::Weekdays, WeekdaySet::empty(), Some(1));
            assert_eq!(alarm.repeat_days, WeekdaySet::weekdays());
            assert_eq!(alarm.specific_date, None);

            alarm.set_repeat(RepeatMode::SpecificDate, WeekdaySet::all(), Some(42));
            assert!(alarm.repeat_days.is_empty());
            assert_eq!(alarm.specific_date, Some(42));

            alarm.set_repeat(RepeatMode::Once, WeekdaySet::all(), None);
            assert!(alarm.repeat_days.is_empty());
            assert_eq!(alarm.specific_date, None);
        }

        #[test]
        fn test_set_time_validates() {
            let mut alarm = AlarmRecord::new(0, 7, 0);
            assert!(alarm.set_time(24, 0).is_err());
            assert!(alarm.set_time(23, 60).is_err());
            assert!(alarm.set_time(23, 59).is_ok());
            assert_eq!((alarm.hour, alarm.minute), (23, 59));
        }

        #[test]
        fn test_time_label() {
            assert_eq!(format_time_label(0, 5), "12 : 05 AM");
            assert_eq!(format_time_label(12, 0), "12 : 00 PM");
            assert_eq!(format_time_label(20, 45), "08 : 45 PM");
            assert_eq!(format_time_label(9, 30), "09 : 30 AM");
        }

        #[test]
        fn test_repeat_labels() {
            let mut alarm = AlarmRecord::new(0, 7, 0);
            assert_eq!(alarm.repeat_label_in(&Utc), "Once");

            alarm.set_repeat(RepeatMode::Daily, WeekdaySet::empty(), None);
            assert_eq!(alarm.repeat_label_in(&Utc), "Every day");

            alarm.set_repeat(RepeatMode::Weekends, WeekdaySet::empty(), None);
            assert_eq!(alarm.repeat_label_in(&Utc), "Sat - Sun");

            let days = [Weekday::Fri, Weekday::Mon].into_iter().collect();
            alarm.set_repeat(RepeatMode::Custom, days, None);
            assert_eq!(alarm.repeat_label_in(&Utc), "Mon, Fri");

            alarm.set_repeat(RepeatMode::Custom, WeekdaySet::empty(), None);
            assert_eq!(alarm.repeat_label_in(&Utc), "Once");

            // 2026-03-15T12:00:00Z
            alarm.set_repeat(RepeatMode::SpecificDate, WeekdaySet::empty(), Some(1_773_576_000_000));
            assert_eq!(alarm.repeat_label_in(&Utc), "15 Mar 2026");

            alarm.set_repeat(RepeatMode::SpecificDate, WeekdaySet::empty(), None);
            assert_eq!(alarm.repeat_label_in(&Utc), "Once");
        }

        #[test]
        fn test_deserialize_applies_defaults() {
            let json = r##"{"id":3,"hour":6,"minute":0,"isActive":true,"colorOff":"#000","colorOn":"#fff"}"##;
            let alarm: AlarmRecord = serde_json::from_str(json).unwrap();
            assert_eq!(alarm.alarm_name, "Alarm");
            assert_eq!(alarm.repeat_mode, RepeatMode::Once);
            assert!(alarm.repeat_days.is_empty());
            assert_eq!(alarm.specific_date, None);
        }

        #[test]
        fn test_serialized_field_names() {
            let mut alarm = AlarmRecord::new(1, 6, 0).with_name("Study");
            alarm.set_repeat(RepeatMode::Custom, WeekdaySet::weekends(), None);
            let value = serde_json::to_value(&alarm).unwrap();
            assert_eq!(value["alarmName"], "Study");
            assert_eq!(value["repeatMode"], "CUSTOM");
            assert_eq!(value["repeatDays"], serde_json::json!([1, 7]));
            assert!(value.get("specificDate").is_none());
        }
    }

    // ------------------------------------------------------------------------
    // Countdown Tests
    // ------------------------------------------------------------------------

    mod countdown_tests {
        use super::*;

        #[test]
        fn test_default_settings() {
            let settings = CountdownSettings::default();
            assert_eq!(settings.focus_minutes, 25);
            assert_eq!(settings.interval_millis(), 1_500_000);
            assert!(settings.sound_enabled);
            assert!(settings.vibration_enabled);
        }

        #[test]
        fn test_validate_boundaries() {
            assert!(CountdownSettings::default().with_focus_minutes(1).validate().is_ok());
            assert!(CountdownSettings::default().with_focus_minutes(120).validate().is_ok());
            assert!(CountdownSettings::default().with_focus_minutes(0).validate().is_err());
            assert!(CountdownSettings::default().with_focus_minutes(121).validate().is_err());
        }

        #[test]
        fn test_state_new() {
            let state = CountdownState::new(60_000);
            assert_eq!(state.remaining_millis, 60_000);
            assert!(!state.is_running);
            assert_eq!(state.completed_cycles, 0);
        }

        #[test]
        fn test_phase_as_str() {
            assert_eq!(CountdownPhase::default(), CountdownPhase::Stopped);
            assert_eq!(CountdownPhase::Running.as_str(), "running");
            assert_eq!(CountdownPhase::Finished.as_str(), "finished");
        }
    }

    mod task_tests {
        use super::*;

        #[test]
        fn test_increment_completes_at_estimate() {
            let mut task = PomodoroTask::new(0, "Write report", 2);
            assert!(task.increment_completed());
            assert!(!task.is_completed);
            assert!(task.increment_completed());
            assert!(task.is_completed);

            assert!(!task.increment_completed());
            assert_eq!(task.completed_pomodoros, 2);
            assert!((task.progress() - 1.0).abs() < f32::EPSILON);
        }

        #[test]
        fn test_progress_of_zero_estimate() {
            let task = PomodoroTask::new(0, "x", 0);
            assert_eq!(task.progress(), 0.0);
        }

        #[test]
        fn test_validate_task() {
            assert_eq!(validate_task("  Read  ", 3).unwrap(), "Read");
            assert!(validate_task("   ", 1).is_err());
            assert!(validate_task("Read", 0).is_err());
            assert!(validate_task(&"a".repeat(MAX_TASK_TITLE_CHARS + 1), 1).is_err());
        }

        #[test]
        fn test_remove_selected_clears_selection() {
            let mut list = TaskList::default();
            let a = list.push("A".to_string(), 1);
            let b = list.push("B".to_string(), 1);
            list.selected_id = Some(a.id);

            list.remove(b.id);
            assert_eq!(list.selected().unwrap().id, a.id);

            list.remove(a.id);
            assert!(list.selected_id.is_none());
            assert_eq!(list.next_id, 2);
        }

        #[test]
        fn test_credit_selected() {
            let mut list = TaskList::default();
            assert!(list.credit_selected().is_none());

            let task = list.push("A".to_string(), 1);
            list.selected_id = Some(task.id);
            assert_eq!(list.credit_selected().unwrap().completed_pomodoros, 1);
            assert!(list.credit_selected().is_none());
            assert!(list.get(task.id).unwrap().is_completed);
        }

        #[test]
        fn test_task_list_defaults_missing_fields() {
            let list: TaskList =
                serde_json::from_str(r#"{"tasks":[{"id":4,"title":"A","estimatedPomodoros":2}]}"#)
                    .unwrap();
            assert_eq!(list.next_id, 0);
            assert_eq!(list.tasks[0].completed_pomodoros, 0);
            assert!(list.selected_id.is_none());
        }
    }

    // ------------------------------------------------------------------------
    // IPC Types Tests
    // ------------------------------------------------------------------------

    mod ipc_types_tests {
        use super::*;

        #[test]
        fn test_request_tagging() {
            let request = IpcRequest::AlarmSetActive { id: 4, active: true };
            let json = serde_json::to_string(&request).unwrap();
            assert_eq!(json, r#"{"command":"alarm_set_active","id":4,"active":true}"#);
        }

        #[test]
        fn test_flattened_params_round_trip() {
            let json = r#"{"command":"alarm_edit","id":2,"hour":7,"repeat":"CUSTOM","days":[2,6]}"#;
            let request: IpcRequest = serde_json::from_str(json).unwrap();
            match request {
                IpcRequest::AlarmEdit { id, params } => {
                    assert_eq!(id, 2);
                    assert_eq!(params.hour, Some(7));
                    assert_eq!(params.minute, None);
                    assert_eq!(params.repeat, Some(RepeatMode::Custom));
                    assert!(params.days.unwrap().contains(Weekday::Fri));
                }
                other => panic!("Expected AlarmEdit, got {:?}", other),
            }
        }

        #[test]
        fn test_timer_start_without_millis() {
            let request: IpcRequest = serde_json::from_str(r#"{"command":"timer_start"}"#).unwrap();
            assert!(matches!(request, IpcRequest::TimerStart { millis: None }));
        }

        #[test]
        fn test_task_select_without_id_clears() {
            let request: IpcRequest = serde_json::from_str(r#"{"command":"task_select"}"#).unwrap();
            assert!(matches!(request, IpcRequest::TaskSelect { id: None }));

            let json = serde_json::to_string(&IpcRequest::TaskAdd {
                title: "Read".to_string(),
                estimated_pomodoros: 3,
            })
            .unwrap();
            assert_eq!(
                json,
                r#"{"command":"task_add","title":"Read","estimated_pomodoros":3}"#
            );
        }

        #[test]
        fn test_response_constructors() {
            let ok = IpcResponse::success("done", None);
            assert!(ok.is_success());
            let err = IpcResponse::error("bad");
            assert!(!err.is_success());
            assert_eq!(err.status, "error");

            let json = serde_json::to_string(&ok).unwrap();
            assert!(!json.contains("data"));
        }
    }
}
