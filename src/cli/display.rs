//! Display utilities for the focusclock CLI.
//!
//! This module provides formatted output for:
//! - Success messages
//! - Error messages
//! - Alarm lists
//! - Countdown status
//! - Pomodoro tasks

use crate::types::{
    AlarmSummary, CountdownPhase, CountdownSettings, IpcResponse, TaskSummary, TimerSummary,
};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the daemon's message and the affected alarm, if any.
    pub fn show_alarm_result(response: &IpcResponse) {
        println!("* {}", response.message);

        let alarms = response.data.as_ref().and_then(|data| data.alarms.as_deref());
        if let Some(alarm) = alarms.and_then(|alarms| alarms.first()) {
            println!("  {}", Self::alarm_line(alarm));
        }
    }

    /// Shows all alarms.
    pub fn show_alarm_list(response: &IpcResponse) {
        let alarms = response
            .data
            .as_ref()
            .and_then(|data| data.alarms.as_deref())
            .unwrap_or_default();

        if alarms.is_empty() {
            println!("アラームはありません");
            return;
        }

        println!("アラーム一覧");
        println!("─────────────────────────────");
        for alarm in alarms {
            println!("{}", Self::alarm_line(alarm));
        }
    }

    /// Shows the daemon's message and the countdown state it returned.
    pub fn show_timer_result(response: &IpcResponse) {
        println!("* {}", response.message);

        if let Some(timer) = response.data.as_ref().and_then(|data| data.timer) {
            if timer.phase != CountdownPhase::Stopped {
                println!("  残り時間: {}", Self::format_remaining(timer.remaining_millis));
            }
        }
    }

    /// Shows the current countdown status.
    pub fn show_timer_status(response: &IpcResponse) {
        println!("集中タイマー ステータス");
        println!("─────────────────────────────");

        match response.data.as_ref().and_then(|data| data.timer) {
            Some(timer) => Self::print_timer(&timer),
            None => println!("タイマーの状態を取得できませんでした"),
        }
    }

    /// Shows updated countdown settings.
    pub fn show_settings(response: &IpcResponse) {
        println!("* {}", response.message);

        if let Some(settings) = response.data.as_ref().and_then(|data| data.settings.as_ref()) {
            Self::print_settings(settings);
        }
    }

    /// Shows the daemon's message after a task change.
    pub fn show_task_result(response: &IpcResponse) {
        println!("* {}", response.message);
    }

    /// Shows all tasks, marking the selected one.
    pub fn show_task_list(response: &IpcResponse) {
        let tasks = response
            .data
            .as_ref()
            .and_then(|data| data.tasks.as_deref())
            .unwrap_or_default();

        if tasks.is_empty() {
            println!("タスクはありません");
            return;
        }

        println!("タスク一覧");
        println!("─────────────────────────────");
        for task in tasks {
            println!("{}", Self::task_line(task));
        }
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    fn print_timer(timer: &TimerSummary) {
        let state_display = match timer.phase {
            CountdownPhase::Running => "実行中",
            CountdownPhase::Paused => "一時停止中",
            CountdownPhase::Stopped => "停止中",
            CountdownPhase::Finished => "完了",
        };
        println!("状態: {}", state_display);
        println!("残り時間: {}", Self::format_remaining(timer.remaining_millis));
        println!("完了サイクル: {}", timer.completed_cycles);
    }

    fn print_settings(settings: &CountdownSettings) {
        println!("  集中時間: {}分", settings.focus_minutes);
        println!("  サウンド: {}", Self::on_off(settings.sound_enabled));
        println!("  バイブレーション: {}", Self::on_off(settings.vibration_enabled));
    }

    fn alarm_line(alarm: &AlarmSummary) -> String {
        let mut line = format!(
            "[{}] #{} {}  {}  ({})",
            if alarm.active { "on " } else { "off" },
            alarm.id,
            alarm.time,
            alarm.name,
            alarm.repeat
        );
        if let Some(next) = alarm.next_fire {
            line.push_str(&format!("  次回: {}", next.format("%m/%d %H:%M")));
        }
        line
    }

    fn task_line(task: &TaskSummary) -> String {
        format!(
            "{} [{}] #{} {}  {}/{}",
            if task.selected { ">" } else { " " },
            if task.completed { "x" } else { " " },
            task.id,
            task.title,
            task.completed_pomodoros,
            task.estimated_pomodoros
        )
    }

    fn on_off(enabled: bool) -> &'static str {
        if enabled {
            "オン"
        } else {
            "オフ"
        }
    }

    /// Formats remaining milliseconds as `m:ss`, rounding partial seconds up.
    fn format_remaining(millis: u64) -> String {
        let total_seconds = millis.div_ceil(1000);
        format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
    }
}

// ============================================================================
// Tests
// ============================================================================
