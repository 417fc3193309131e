//! Command definitions for the focusclock CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{
    AlarmId, AlarmParams, RepeatMode, SettingsParams, TaskId, WeekdaySet, MAX_TASK_TITLE_CHARS,
};

// ============================================================================
// CLI Structure
// ============================================================================

/// focusclock - alarms and a focus countdown from the terminal
#[derive(Parser, Debug)]
#[command(
    name = "focusclock",
    version,
    about = "アラームと集中タイマーのCLI",
    long_about = "繰り返しアラームと集中用カウントダウンを管理します。\n\
                  'focusclock daemon' を起動してから各コマンドを使用してください。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Socket path of the daemon
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage alarms
    #[command(subcommand)]
    Alarm(AlarmCommand),

    /// Control the focus countdown
    #[command(subcommand)]
    Timer(TimerCommand),

    /// Run the daemon in the foreground
    Daemon(DaemonArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Alarm subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AlarmCommand {
    /// Add a new alarm (switched off unless --on is given)
    Add(AddArgs),

    /// List all alarms
    List,

    /// Change an alarm
    Edit(EditArgs),

    /// Switch an alarm on
    On {
        /// Alarm id
        id: AlarmId,
    },

    /// Switch an alarm off
    Off {
        /// Alarm id
        id: AlarmId,
    },

    /// Delete an alarm
    Delete {
        /// Alarm id
        id: AlarmId,
    },

    /// Stop a ringing alarm
    Stop {
        /// Alarm id
        id: AlarmId,
    },

    /// Snooze a ringing alarm
    Snooze {
        /// Alarm id
        id: AlarmId,
    },
}

/// Countdown subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TimerCommand {
    /// Start a new interval
    Start(TimerStartArgs),

    /// Pause the countdown
    Pause,

    /// Resume a paused countdown
    Resume,

    /// Stop and reset the countdown
    Stop,

    /// Show the countdown status
    Status,

    /// Reset the completed-cycle counter
    ResetCycles,

    /// Change countdown settings
    Config(TimerConfigArgs),

    /// Manage the pomodoro task list
    #[command(subcommand)]
    Task(TaskCommand),
}

/// Pomodoro task subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// Add a task
    Add(TaskAddArgs),

    /// List tasks
    List,

    /// Credit finished intervals to a task
    Select {
        /// Task id
        id: TaskId,
    },

    /// Stop crediting any task
    Unselect,

    /// Mark a task done
    Done {
        /// Task id
        id: TaskId,

        /// Mark the task not done again
        #[arg(long)]
        undo: bool,
    },

    /// Delete a task
    Delete {
        /// Task id
        id: TaskId,
    },
}

// ============================================================================
// Arguments
// ============================================================================

/// Repeat policy as accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatArg {
    Once,
    Daily,
    Weekdays,
    Weekends,
    Custom,
    Date,
}

impl From<RepeatArg> for RepeatMode {
    fn from(arg: RepeatArg) -> Self {
        match arg {
            RepeatArg::Once => RepeatMode::Once,
            RepeatArg::Daily => RepeatMode::Daily,
            RepeatArg::Weekdays => RepeatMode::Weekdays,
            RepeatArg::Weekends => RepeatMode::Weekends,
            RepeatArg::Custom => RepeatMode::Custom,
            RepeatArg::Date => RepeatMode::SpecificDate,
        }
    }
}

/// Repeat options shared by add and edit
#[derive(Args, Debug, Clone, Default)]
pub struct RepeatArgs {
    /// Repeat policy
    #[arg(short, long, value_enum)]
    pub repeat: Option<RepeatArg>,

    /// Days for a custom repeat, e.g. mon,wed,fri
    #[arg(short, long, value_parser = parse_days)]
    pub days: Option<WeekdaySet>,

    /// Calendar date (YYYY-MM-DD) for a one-date alarm
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

/// Arguments for `alarm add`
#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Time of day (HH:MM, 24-hour)
    #[arg(value_parser = parse_time)]
    pub time: (u32, u32),

    /// Alarm label
    #[arg(short, long, value_parser = validate_alarm_name)]
    pub name: Option<String>,

    #[command(flatten)]
    pub repeat: RepeatArgs,

    /// Switch the alarm on right away
    #[arg(long)]
    pub on: bool,
}

impl AddArgs {
    /// Converts the arguments into request parameters.
    pub fn to_params(&self) -> AlarmParams {
        let (hour, minute) = self.time;
        AlarmParams {
            hour: Some(hour),
            minute: Some(minute),
            name: self.name.clone(),
            repeat: self.repeat.repeat.map(RepeatMode::from),
            days: self.repeat.days,
            date: self.repeat.date,
            activate: self.on.then_some(true),
        }
    }
}

/// Arguments for `alarm edit`
#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Alarm id
    pub id: AlarmId,

    /// New time of day (HH:MM, 24-hour)
    #[arg(short, long, value_parser = parse_time)]
    pub time: Option<(u32, u32)>,

    /// New label
    #[arg(short, long, value_parser = validate_alarm_name)]
    pub name: Option<String>,

    #[command(flatten)]
    pub repeat: RepeatArgs,
}

impl EditArgs {
    /// Converts the arguments into request parameters.
    pub fn to_params(&self) -> AlarmParams {
        AlarmParams {
            hour: self.time.map(|(hour, _)| hour),
            minute: self.time.map(|(_, minute)| minute),
            name: self.name.clone(),
            repeat: self.repeat.repeat.map(RepeatMode::from),
            days: self.repeat.days,
            date: self.repeat.date,
            activate: None,
        }
    }
}

/// Arguments for `timer start`
#[derive(Args, Debug, Clone, Default)]
pub struct TimerStartArgs {
    /// Interval length in minutes; the configured length when omitted
    #[arg(
        short,
        long,
        value_parser = clap::value_parser!(u32).range(1..=120),
        conflicts_with = "seconds"
    )]
    pub minutes: Option<u32>,

    /// Interval length in seconds
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=7200))]
    pub seconds: Option<u32>,
}

impl TimerStartArgs {
    /// Initial duration to request; `None` uses the configured interval.
    pub fn to_millis(&self) -> Option<i64> {
        self.minutes
            .map(|minutes| i64::from(minutes) * 60 * 1000)
            .or_else(|| self.seconds.map(|seconds| i64::from(seconds) * 1000))
    }
}

/// Arguments for `timer config`
#[derive(Args, Debug, Clone, Default)]
pub struct TimerConfigArgs {
    /// Focus interval in minutes (1-120)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=120))]
    pub focus: Option<u32>,

    /// Play a sound when an interval finishes
    #[arg(long)]
    pub sound: Option<bool>,

    /// Vibrate when an interval finishes
    #[arg(long)]
    pub vibration: Option<bool>,
}

impl TimerConfigArgs {
    /// Converts the arguments into request parameters.
    pub fn to_params(&self) -> SettingsParams {
        SettingsParams {
            focus_minutes: self.focus,
            sound_enabled: self.sound,
            vibration_enabled: self.vibration,
        }
    }
}

/// Arguments for `timer task add`
#[derive(Args, Debug, Clone)]
pub struct TaskAddArgs {
    /// What you are working on
    #[arg(value_parser = validate_task_title)]
    pub title: String,

    /// Expected number of focus intervals
    #[arg(
        short,
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..=99)
    )]
    pub estimate: u32,
}

/// Arguments for `daemon`
#[derive(Args, Debug, Clone, Default)]
pub struct DaemonArgs {
    /// Data directory (defaults to $FOCUSCLOCK_HOME or ~/.focusclock)
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Disable audio output
    #[arg(long)]
    pub mute: bool,
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Parses `HH:MM` in 24-hour form.
fn parse_time(s: &str) -> Result<(u32, u32), String> {
    let (hour, minute) = s
        .split_once(':')
        .ok_or_else(|| "時刻は HH:MM 形式で指定してください".to_string())?;
    let hour: u32 = hour
        .trim()
        .parse()
        .map_err(|_| "時は0-23の範囲で指定してください".to_string())?;
    let minute: u32 = minute
        .trim()
        .parse()
        .map_err(|_| "分は0-59の範囲で指定してください".to_string())?;
    crate::types::validate_time(hour, minute)?;
    Ok((hour, minute))
}

/// Parses a comma-separated list of day names.
fn parse_days(s: &str) -> Result<WeekdaySet, String> {
    let days: WeekdaySet = s
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            WeekdaySet::parse_day(part).ok_or_else(|| format!("不明な曜日です: {}", part.trim()))
        })
        .collect::<Result<_, _>>()?;
    if days.is_empty() {
        return Err("曜日を1つ以上指定してください".to_string());
    }
    Ok(days)
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| "日付は YYYY-MM-DD 形式で指定してください".to_string())
}

/// Validates the alarm name.
///
/// - Must not be empty
/// - Must not exceed 100 characters
fn validate_alarm_name(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("アラーム名は空にできません".to_string());
    }
    if s.chars().count() > 100 {
        return Err("アラーム名は100文字以内にしてください".to_string());
    }
    Ok(s.to_string())
}

fn validate_task_title(s: &str) -> Result<String, String> {
    let title = s.trim();
    if title.is_empty() {
        return Err("タスク名は空にできません".to_string());
    }
    if title.chars().count() > MAX_TASK_TITLE_CHARS {
        return Err(format!(
            "タスク名は{MAX_TASK_TITLE_CHARS}文字以内にしてください"
        ));
    }
    Ok(title.to_string())
}

// ============================================================================
// Tests
// ============================================================================
