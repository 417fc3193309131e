//! End-to-End Tests for the focusclock CLI.
//!
//! These tests run the built binary:
//! - TC-E-001: Help and completions
//! - TC-E-002: Argument validation
//! - TC-E-003: Daemon not running
//! - TC-E-004: Alarm workflow against a live daemon
//! - TC-E-005: Countdown workflow against a live daemon
//! - TC-E-006: Pomodoro task workflow against a live daemon

use std::path::{Path, PathBuf};
use std::process::{Child, Command as StdCommand, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command;
use predicates::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

/// Command for the focusclock binary, isolated from the user's data directory.
fn focusclock(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("focusclock").unwrap();
    cmd.env("FOCUSCLOCK_HOME", home).env_remove("RUST_LOG");
    cmd
}

/// Daemon process that is killed when dropped.
struct DaemonGuard {
    child: Child,
    socket: PathBuf,
}

impl DaemonGuard {
    /// Starts a muted daemon in `data_dir` and waits for its socket.
    fn start(data_dir: &Path) -> Self {
        let socket = data_dir.join("e2e.sock");
        let child = StdCommand::cargo_bin("focusclock")
            .unwrap()
            .args(["daemon", "--mute", "--data-dir"])
            .arg(data_dir)
            .arg("--socket")
            .arg(&socket)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while !socket.exists() {
            assert!(Instant::now() < deadline, "daemon did not create its socket");
            thread::sleep(Duration::from_millis(50));
        }

        Self { child, socket }
    }

    fn socket(&self) -> &Path {
        &self.socket
    }
}

impl Drop for DaemonGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// ============================================================================
// TC-E-001: Help and Completions
// ============================================================================

/// TC-E-001: ヘルプとシェル補完の出力
///
/// 期待結果: サブコマンドが一覧され、補完スクリプトが出力される
#[test]
fn tc_e_001_help_and_completions() {
    let home = tempfile::tempdir().unwrap();

    focusclock(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("alarm"))
        .stdout(predicate::str::contains("timer"))
        .stdout(predicate::str::contains("daemon"));

    focusclock(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("focusclock"));
}

// ============================================================================
// TC-E-002: Argument Validation
// ============================================================================

/// TC-E-002: 不正な引数は Daemon に送られる前に拒否される
#[test]
fn tc_e_002_invalid_arguments_are_rejected() {
    let home = tempfile::tempdir().unwrap();

    focusclock(home.path())
        .args(["alarm", "add", "25:00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("0-23"));

    focusclock(home.path())
        .args(["alarm", "add", "07:00", "--repeat", "custom", "--days", "funday"])
        .assert()
        .failure();

    focusclock(home.path())
        .args(["timer", "start", "--minutes", "0"])
        .assert()
        .failure();
}

// ============================================================================
// TC-E-003: Daemon Not Running
// ============================================================================

/// TC-E-003: Daemon未起動時はエラーを表示して終了コード1
#[test]
fn tc_e_003_daemon_not_running() {
    let home = tempfile::tempdir().unwrap();

    focusclock(home.path())
        .args(["alarm", "list", "--socket"])
        .arg(home.path().join("missing.sock"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("エラー"))
        .stderr(predicate::str::contains("focusclock daemon"));
}

// ============================================================================
// TC-E-004: Alarm Workflow
// ============================================================================

/// TC-E-004: アラームの追加・一覧・オン・削除
///
/// 前提条件: 空のデータディレクトリで Daemon を起動
/// テスト手順:
/// 1. `alarm list` で既定アラームを確認
/// 2. `alarm add 06:30 --name Gym --repeat weekdays --on`
/// 3. `alarm off 3` と `alarm delete 3`
/// 期待結果: 各コマンドが成功し、一覧に反映される
#[test]
fn tc_e_004_alarm_workflow() {
    let data_dir = tempfile::tempdir().unwrap();
    let daemon = DaemonGuard::start(data_dir.path());
    let run = |args: &[&str]| {
        let mut cmd = focusclock(data_dir.path());
        cmd.args(args).arg("--socket").arg(daemon.socket());
        cmd.assert()
    };

    run(&["alarm", "list"])
        .success()
        .stdout(predicate::str::contains("#0 09 : 30 AM"))
        .stdout(predicate::str::contains("#2 08 : 45 PM"));

    run(&["alarm", "add", "06:30", "--name", "Gym", "--repeat", "weekdays", "--on"])
        .success()
        .stdout(predicate::str::contains("アラームを追加しました"))
        .stdout(predicate::str::contains("次回"));

    run(&["alarm", "list"])
        .success()
        .stdout(predicate::str::contains("[on ] #3 06 : 30 AM  Gym  (Mon - Fri)"));

    run(&["alarm", "off", "3"])
        .success()
        .stdout(predicate::str::contains("アラームをオフにしました"));

    run(&["alarm", "delete", "3"])
        .success()
        .stdout(predicate::str::contains("アラームを削除しました"));

    run(&["alarm", "list"])
        .success()
        .stdout(predicate::str::contains("Gym").not());

    run(&["alarm", "on", "42"])
        .code(1)
        .stderr(predicate::str::contains("エラー"));
}

// ============================================================================
// TC-E-005: Countdown Workflow
// ============================================================================

/// TC-E-005: カウントダウンの開始・一時停止・停止と設定変更
#[test]
fn tc_e_005_countdown_workflow() {
    let data_dir = tempfile::tempdir().unwrap();
    let daemon = DaemonGuard::start(data_dir.path());
    let run = |args: &[&str]| {
        let mut cmd = focusclock(data_dir.path());
        cmd.args(args).arg("--socket").arg(daemon.socket());
        cmd.assert()
    };

    run(&["timer", "status"])
        .success()
        .stdout(predicate::str::contains("停止中"))
        .stdout(predicate::str::contains("25:00"));

    run(&["timer", "start", "--minutes", "10"])
        .success()
        .stdout(predicate::str::contains("タイマーを開始しました"));

    run(&["timer", "start"])
        .code(1)
        .stderr(predicate::str::contains("既に実行中"));

    run(&["timer", "pause"])
        .success()
        .stdout(predicate::str::contains("タイマーを一時停止しました"));

    run(&["timer", "status"])
        .success()
        .stdout(predicate::str::contains("一時停止中"));

    run(&["timer", "stop"]).success();

    run(&["timer", "config", "--focus", "40", "--vibration", "false"])
        .success()
        .stdout(predicate::str::contains("集中時間: 40分"))
        .stdout(predicate::str::contains("バイブレーション: オフ"));

    run(&["timer", "status"])
        .success()
        .stdout(predicate::str::contains("40:00"));
}

// ============================================================================
// TC-E-006: Pomodoro Task Workflow
// ============================================================================

/// TC-E-006: タスクの追加・選択・完了・削除
///
/// 前提条件: 空のデータディレクトリで Daemon を起動
/// テスト手順:
/// 1. `timer task add "Write report" --estimate 4`
/// 2. `timer task select 0` と `timer task list`
/// 3. `timer task done 0`、`timer task delete 0`
/// 期待結果: 選択中のタスクに印が付き、削除後は一覧が空になる
#[test]
fn tc_e_006_task_workflow() {
    let data_dir = tempfile::tempdir().unwrap();
    let daemon = DaemonGuard::start(data_dir.path());
    let run = |args: &[&str]| {
        let mut cmd = focusclock(data_dir.path());
        cmd.args(args).arg("--socket").arg(daemon.socket());
        cmd.assert()
    };

    run(&["timer", "task", "list"])
        .success()
        .stdout(predicate::str::contains("タスクはありません"));

    run(&["timer", "task", "add", "Write report", "--estimate", "4"])
        .success()
        .stdout(predicate::str::contains("タスクを追加しました: #0 Write report"));

    run(&["timer", "task", "select", "0"])
        .success()
        .stdout(predicate::str::contains("タスクを選択しました"));

    run(&["timer", "task", "list"])
        .success()
        .stdout(predicate::str::contains("> [ ] #0 Write report  0/4"));

    run(&["timer", "task", "done", "0"])
        .success()
        .stdout(predicate::str::contains("タスクを完了にしました"));

    run(&["timer", "task", "select", "9"])
        .code(1)
        .stderr(predicate::str::contains("タスクが見つかりません"));

    run(&["timer", "task", "delete", "0"]).success();

    run(&["timer", "task", "list"])
        .success()
        .stdout(predicate::str::contains("タスクはありません"));
}
