//! Integration tests for Daemon-CLI IPC communication.
//!
//! These tests drive a real socket server with the CLI client:
//! - TC-I-001: Alarm add and list via IPC
//! - TC-I-002: Alarm on/off via IPC
//! - TC-I-003: Alarm stop and snooze via IPC
//! - TC-I-004: Countdown start, pause, resume, stop via IPC
//! - TC-I-005: Countdown settings via IPC
//! - TC-I-006: Connection and error handling

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};

use focusclock::alert::{MockAlertPresenter, SoundSource};
use focusclock::cli::IpcClient;
use focusclock::clock::AlarmClock;
use focusclock::countdown::{CountdownEngine, CountdownTimer};
use focusclock::daemon::{AlarmService, IpcServer, RequestHandler};
use focusclock::firing::AlarmFiringHandler;
use focusclock::notification::MockNotificationPresenter;
use focusclock::scheduler::{AlarmScheduler, MockWakeScheduler};
use focusclock::store::{AlarmStore, CountdownStore, MemoryStore};
use focusclock::types::{AlarmParams, CountdownPhase, SettingsParams};

// ============================================================================
// Test Helpers
// ============================================================================

struct Fixture {
    _dir: tempfile::TempDir,
    socket_path: PathBuf,
    wake: Arc<MockWakeScheduler>,
    handler: Arc<RequestHandler>,
}

/// Creates a handler over in-memory stores and mock collaborators.
fn create_fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("integration_test.sock");

    let wake = Arc::new(MockWakeScheduler::new());
    let presenter = Arc::new(MockAlertPresenter::new());
    let scheduler = AlarmScheduler::new(wake.clone());
    let clock = AlarmClock::new(
        AlarmStore::load(Arc::new(MemoryStore::new())),
        scheduler.clone(),
    );
    let firing = AlarmFiringHandler::new(
        presenter.clone(),
        Arc::new(MockNotificationPresenter::new()),
        scheduler,
        SoundSource::Tone,
    );
    let engine = CountdownEngine::restore(
        CountdownStore::new(Arc::new(MemoryStore::new())),
        presenter,
        SoundSource::Tone,
    );
    let handler = Arc::new(RequestHandler::new(
        Arc::new(Mutex::new(AlarmService::new(clock, firing))),
        CountdownTimer::new(engine),
    ));

    Fixture {
        _dir: dir,
        socket_path,
        wake,
        handler,
    }
}

/// Serves `count` request-response cycles in the background.
fn spawn_server(fixture: &Fixture, count: usize) -> tokio::task::JoinHandle<()> {
    let server = IpcServer::new(&fixture.socket_path).unwrap();
    let handler = fixture.handler.clone();
    tokio::spawn(async move {
        for _ in 0..count {
            if let Ok(mut stream) = server.accept().await {
                if let Ok(request) = IpcServer::receive_request(&mut stream).await {
                    let response = handler.handle(request).await;
                    let _ = IpcServer::send_response(&mut stream, &response).await;
                }
            }
        }
    })
}

fn alarm_at(hour: u32, minute: u32) -> AlarmParams {
    AlarmParams {
        hour: Some(hour),
        minute: Some(minute),
        ..AlarmParams::default()
    }
}

// ============================================================================
// TC-I-001: Alarm Add and List via IPC
// ============================================================================

/// TC-I-001: アラーム追加と一覧（IPC経由）
///
/// 前提条件: Daemon起動中
/// テスト手順:
/// 1. CLIから `alarm add` を2回送信
/// 2. `alarm list` を送信
/// 期待結果: 追加順のIDで2件のアラームが返り、どちらもオフ
#[tokio::test]
async fn tc_i_001_alarm_add_and_list_via_ipc() {
    let fixture = create_fixture();
    let server = spawn_server(&fixture, 3);
    let client = IpcClient::with_socket_path(fixture.socket_path.clone());

    let first = client.alarm_add(alarm_at(7, 0)).await.unwrap();
    assert_eq!(first.message, "アラームを追加しました");
    client
        .alarm_add(AlarmParams {
            name: Some("Lunch".to_string()),
            ..alarm_at(12, 15)
        })
        .await
        .unwrap();

    let list = client.alarm_list().await.unwrap();
    let alarms = list.data.unwrap().alarms.unwrap();
    assert_eq!(alarms.len(), 2);
    assert_eq!(alarms[0].id, 0);
    assert_eq!(alarms[1].id, 1);
    assert_eq!(alarms[1].name, "Lunch");
    assert_eq!(alarms[1].time, "12 : 15 PM");
    assert!(alarms.iter().all(|alarm| !alarm.active));
    assert_eq!(fixture.wake.active_count(), 0);

    timeout(Duration::from_secs(1), server).await.unwrap().unwrap();
}

// ============================================================================
// TC-I-002: Alarm On/Off via IPC
// ============================================================================

/// TC-I-002: アラームのオン/オフ（IPC経由）
///
/// 期待結果: オンで起床登録され次回時刻が返る。オフで登録が取り消される
#[tokio::test]
async fn tc_i_002_alarm_on_off_via_ipc() {
    let fixture = create_fixture();
    let server = spawn_server(&fixture, 3);
    let client = IpcClient::with_socket_path(fixture.socket_path.clone());

    client.alarm_add(alarm_at(6, 30)).await.unwrap();

    let on = client.alarm_set_active(0, true).await.unwrap();
    let summary = &on.data.unwrap().alarms.unwrap()[0];
    assert!(summary.active);
    assert!(summary.next_fire.is_some());
    assert!(fixture.wake.is_registered(0));

    let off = client.alarm_set_active(0, false).await.unwrap();
    assert_eq!(off.message, "アラームをオフにしました");
    assert!(!fixture.wake.is_registered(0));

    timeout(Duration::from_secs(1), server).await.unwrap().unwrap();
}

/// TC-I-002b: 登録拒否時はオンにならない
#[tokio::test]
async fn tc_i_002b_rejected_registration_keeps_alarm_off() {
    let fixture = create_fixture();
    let server = spawn_server(&fixture, 3);
    let client = IpcClient::with_socket_path(fixture.socket_path.clone());

    client.alarm_add(alarm_at(6, 30)).await.unwrap();
    fixture.wake.set_should_fail(true);

    assert!(client.alarm_set_active(0, true).await.is_err());

    let list = client.alarm_list().await.unwrap();
    assert!(!list.data.unwrap().alarms.unwrap()[0].active);

    timeout(Duration::from_secs(1), server).await.unwrap().unwrap();
}

// ============================================================================
// TC-I-003: Alarm Stop and Snooze via IPC
// ============================================================================

/// TC-I-003: アラームの停止とスヌーズ（IPC経由）
///
/// 期待結果: スヌーズで5分後の起床が登録され、アラームはオフになる。
/// 停止で登録が取り消される
#[tokio::test]
async fn tc_i_003_alarm_stop_and_snooze_via_ipc() {
    let fixture = create_fixture();
    let server = spawn_server(&fixture, 5);
    let client = IpcClient::with_socket_path(fixture.socket_path.clone());

    client
        .alarm_add(AlarmParams {
            activate: Some(true),
            name: Some("Wake".to_string()),
            ..alarm_at(7, 0)
        })
        .await
        .unwrap();

    let before = chrono::Utc::now();
    client.alarm_snooze(0).await.unwrap();
    let (fire_at, payload) = fixture.wake.registration(0).unwrap();
    assert!(payload.is_snooze());
    assert_eq!(payload.alarm_name, "Wake");
    let offset = fire_at - before;
    assert!(offset >= chrono::Duration::minutes(5));
    assert!(offset < chrono::Duration::minutes(5) + chrono::Duration::seconds(30));

    let list = client.alarm_list().await.unwrap();
    assert!(!list.data.unwrap().alarms.unwrap()[0].active);

    let stopped = client.alarm_stop(0).await.unwrap();
    assert_eq!(stopped.message, "アラームを停止しました");
    assert!(!fixture.wake.is_registered(0));

    client.alarm_delete(0).await.unwrap();

    timeout(Duration::from_secs(1), server).await.unwrap().unwrap();
}

// ============================================================================
// TC-I-004: Countdown Control via IPC
// ============================================================================

/// TC-I-004: カウントダウン操作（IPC経由）
///
/// 期待結果: 開始→一時停止→再開→停止の各状態が返る
#[tokio::test]
async fn tc_i_004_countdown_control_via_ipc() {
    let fixture = create_fixture();
    let server = spawn_server(&fixture, 5);
    let client = IpcClient::with_socket_path(fixture.socket_path.clone());

    let started = client.timer_start(Some(600_000)).await.unwrap();
    let timer = started.data.unwrap().timer.unwrap();
    assert_eq!(timer.phase, CountdownPhase::Running);
    assert!(timer.remaining_millis <= 600_000);

    let paused = client.timer_pause().await.unwrap();
    assert_eq!(
        paused.data.unwrap().timer.unwrap().phase,
        CountdownPhase::Paused
    );

    client.timer_resume().await.unwrap();

    let stopped = client.timer_stop().await.unwrap();
    let timer = stopped.data.unwrap().timer.unwrap();
    assert_eq!(timer.phase, CountdownPhase::Stopped);
    assert_eq!(timer.remaining_millis, 25 * 60 * 1000);

    let status = client.timer_status().await.unwrap();
    assert_eq!(
        status.data.unwrap().timer.unwrap().phase,
        CountdownPhase::Stopped
    );

    timeout(Duration::from_secs(1), server).await.unwrap().unwrap();
}

/// TC-I-004b: 実行中の再開始はエラー
#[tokio::test]
async fn tc_i_004b_start_while_running_is_rejected() {
    let fixture = create_fixture();
    let server = spawn_server(&fixture, 2);
    let client = IpcClient::with_socket_path(fixture.socket_path.clone());

    client.timer_start(None).await.unwrap();
    let err = client.timer_start(None).await.unwrap_err();
    assert!(err.to_string().contains("既に実行中"));

    timeout(Duration::from_secs(1), server).await.unwrap().unwrap();
}

// ============================================================================
// TC-I-005: Countdown Settings via IPC
// ============================================================================

/// TC-I-005: 集中時間の設定（IPC経由）
///
/// 期待結果: 停止中のカウントダウンに新しい集中時間が反映される
#[tokio::test]
async fn tc_i_005_countdown_settings_via_ipc() {
    let fixture = create_fixture();
    let server = spawn_server(&fixture, 2);
    let client = IpcClient::with_socket_path(fixture.socket_path.clone());

    let response = client
        .timer_configure(SettingsParams {
            focus_minutes: Some(40),
            vibration_enabled: Some(false),
            ..SettingsParams::default()
        })
        .await
        .unwrap();
    let settings = response.data.unwrap().settings.unwrap();
    assert_eq!(settings.focus_minutes, 40);
    assert!(!settings.vibration_enabled);
    assert!(settings.sound_enabled);

    let status = client.timer_status().await.unwrap();
    assert_eq!(
        status.data.unwrap().timer.unwrap().remaining_millis,
        40 * 60 * 1000
    );

    timeout(Duration::from_secs(1), server).await.unwrap().unwrap();
}

// ============================================================================
// TC-I-006: Connection and Error Handling
// ============================================================================

/// TC-I-006: Daemon未起動時の接続エラー
///
/// 期待結果: 再試行の後、起動を促すエラーが返る
#[tokio::test]
async fn tc_i_006_connection_error_when_daemon_not_running() {
    let dir = tempfile::tempdir().unwrap();
    let client = IpcClient::with_socket_path(dir.path().join("missing.sock"));

    let err = client.alarm_list().await.unwrap_err();
    assert!(format!("{:#}", err).contains("focusclock daemon"));
}

/// TC-I-006b: 存在しないアラームの操作はエラー
#[tokio::test]
async fn tc_i_006b_unknown_alarm_is_an_error() {
    let fixture = create_fixture();
    let server = spawn_server(&fixture, 2);
    let client = IpcClient::with_socket_path(fixture.socket_path.clone());

    assert!(client.alarm_delete(42).await.is_err());
    assert!(client.alarm_set_active(42, true).await.is_err());

    timeout(Duration::from_secs(1), server).await.unwrap().unwrap();
}
