//! IPC client for communicating with the focusclock daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::types::{AlarmId, AlarmParams, IpcRequest, IpcResponse, SettingsParams, TaskId};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: u64 = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
#[derive(Debug, Clone)]
pub struct IpcClient {
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn alarm_add(&self, params: AlarmParams) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::AlarmAdd { params })
            .await
    }

    pub async fn alarm_edit(&self, id: AlarmId, params: AlarmParams) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::AlarmEdit { id, params })
            .await
    }

    pub async fn alarm_list(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::AlarmList).await
    }

    pub async fn alarm_set_active(&self, id: AlarmId, active: bool) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::AlarmSetActive { id, active })
            .await
    }

    pub async fn alarm_delete(&self, id: AlarmId) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::AlarmDelete { id })
            .await
    }

    pub async fn alarm_stop(&self, id: AlarmId) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::AlarmStop { id })
            .await
    }

    pub async fn alarm_snooze(&self, id: AlarmId) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::AlarmSnooze { id })
            .await
    }

    /// Sends a start command; `None` uses the configured interval.
    pub async fn timer_start(&self, millis: Option<i64>) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::TimerStart { millis })
            .await
    }

    pub async fn timer_pause(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::TimerPause).await
    }

    pub async fn timer_resume(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::TimerResume).await
    }

    pub async fn timer_stop(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::TimerStop).await
    }

    pub async fn timer_status(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::TimerStatus).await
    }

    pub async fn timer_reset_cycles(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::TimerResetCycles)
            .await
    }

    pub async fn timer_configure(&self, params: SettingsParams) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::TimerConfigure { params })
            .await
    }

    pub async fn task_add(&self, title: String, estimated_pomodoros: u32) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::TaskAdd {
            title,
            estimated_pomodoros,
        })
        .await
    }

    pub async fn task_list(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::TaskList).await
    }

    /// Selects a task; `None` clears the selection.
    pub async fn task_select(&self, id: Option<TaskId>) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::TaskSelect { id })
            .await
    }

    pub async fn task_complete(&self, id: TaskId, completed: bool) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::TaskComplete { id, completed })
            .await
    }

    pub async fn task_delete(&self, id: TaskId) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::TaskDelete { id })
            .await
    }

    /// Sends a request to the daemon with retry logic.
    ///
    /// Only transport failures are retried; an error response from the
    /// daemon is returned as is.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut attempt = 1;
        let response = loop {
            match self.send_request(request).await {
                Ok(response) => break response,
                Err(e) if attempt < MAX_RETRIES => {
                    tracing::warn!("リクエスト失敗 (試行 {}/{}): {:#}", attempt, MAX_RETRIES, e);
                    let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        if !response.is_success() {
            anyhow::bail!("{}", response.message);
        }
        Ok(response)
    }

    /// Sends a single request to the daemon.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("接続がタイムアウトしました")?
            .context("Daemonに接続できません。'focusclock daemon' を起動してください")?;

        let request_json =
            serde_json::to_vec(request).context("リクエストのシリアライズに失敗しました")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(&request_json),
        )
        .await
        .context("書き込みがタイムアウトしました")?
        .context("リクエストの送信に失敗しました")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("シャットダウンに失敗しました")?;

        let mut buffer = Vec::new();
        let mut reader = (&mut stream).take(MAX_RESPONSE_SIZE);
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            reader.read_to_end(&mut buffer),
        )
        .await
        .context("読み込みがタイムアウトしました")?
        .context("レスポンスの受信に失敗しました")?;

        if buffer.is_empty() {
            anyhow::bail!("Daemonからの応答がありませんでした");
        }

        let response: IpcResponse =
            serde_json::from_slice(&buffer).context("レスポンスのパースに失敗しました")?;
        Ok(response)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CountdownPhase, ResponseData, TimerSummary};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::net::UnixListener;

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn create_temp_socket_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        (dir, path)
    }

    /// Accepts one connection, returns the decoded request and answers it.
    async fn answer_once(listener: &UnixListener, response: &IpcResponse) -> IpcRequest {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await.unwrap();
        let request: IpcRequest = serde_json::from_slice(&buffer).unwrap();

        let json = serde_json::to_vec(response).unwrap();
        stream.write_all(&json).await.unwrap();
        stream.flush().await.unwrap();
        request
    }

    fn timer_response(message: &str, phase: CountdownPhase, remaining_millis: u64) -> IpcResponse {
        IpcResponse::success(
            message,
            Some(ResponseData::with_timer(TimerSummary {
                phase,
                remaining_millis,
                completed_cycles: 0,
            })),
        )
    }

    // ------------------------------------------------------------------------
    // IpcClient Tests
    // ------------------------------------------------------------------------

    mod client_tests {
        use super::*;

        #[test]
        fn test_with_socket_path() {
            let path = PathBuf::from("/tmp/test.sock");
            let client = IpcClient::with_socket_path(path.clone());
            assert_eq!(client.socket_path(), path);
        }

        #[tokio::test(start_paused = true)]
        async fn test_connection_failure() {
            let (_dir, socket_path) = create_temp_socket_path();
            let client = IpcClient::with_socket_path(socket_path);

            let result = client.timer_status().await;
            assert!(result.is_err());
            assert!(result.unwrap_err().to_string().contains("接続できません"));
        }

        #[tokio::test]
        async fn test_send_timer_status_request() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();

            let server_handle = tokio::spawn(async move {
                let response = timer_response("", CountdownPhase::Stopped, 1_500_000);
                answer_once(&listener, &response).await
            });

            let client = IpcClient::with_socket_path(socket_path);
            let response = client.timer_status().await.unwrap();

            assert!(response.is_success());
            let timer = response.data.unwrap().timer.unwrap();
            assert_eq!(timer.phase, CountdownPhase::Stopped);
            assert_eq!(timer.remaining_millis, 1_500_000);

            let request = server_handle.await.unwrap();
            assert!(matches!(request, IpcRequest::TimerStatus));
        }

        #[tokio::test]
        async fn test_send_timer_start_request() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();

            let server_handle = tokio::spawn(async move {
                let response =
                    timer_response("タイマーを開始しました", CountdownPhase::Running, 90_000);
                answer_once(&listener, &response).await
            });

            let client = IpcClient::with_socket_path(socket_path);
            let response = client.timer_start(Some(90_000)).await.unwrap();
            assert_eq!(response.message, "タイマーを開始しました");

            match server_handle.await.unwrap() {
                IpcRequest::TimerStart { millis } => assert_eq!(millis, Some(90_000)),
                other => panic!("Expected TimerStart request, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_send_task_add_request() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();

            let server_handle = tokio::spawn(async move {
                let response = IpcResponse::success("タスクを追加しました: #0 Read", None);
                answer_once(&listener, &response).await
            });

            let client = IpcClient::with_socket_path(socket_path);
            let response = client.task_add("Read".to_string(), 3).await.unwrap();
            assert!(response.is_success());

            match server_handle.await.unwrap() {
                IpcRequest::TaskAdd {
                    title,
                    estimated_pomodoros,
                } => {
                    assert_eq!(title, "Read");
                    assert_eq!(estimated_pomodoros, 3);
                }
                other => panic!("Expected TaskAdd request, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_send_alarm_add_request() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();

            let server_handle = tokio::spawn(async move {
                let response = IpcResponse::success("アラームを追加しました", None);
                answer_once(&listener, &response).await
            });

            let client = IpcClient::with_socket_path(socket_path);
            let params = AlarmParams {
                hour: Some(6),
                minute: Some(30),
                name: Some("Run".to_string()),
                ..AlarmParams::default()
            };
            client.alarm_add(params.clone()).await.unwrap();

            match server_handle.await.unwrap() {
                IpcRequest::AlarmAdd { params: received } => assert_eq!(received, params),
                other => panic!("Expected AlarmAdd request, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_send_alarm_set_active_request() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();

            let server_handle = tokio::spawn(async move {
                let response = IpcResponse::success("アラームをオフにしました", None);
                answer_once(&listener, &response).await
            });

            let client = IpcClient::with_socket_path(socket_path);
            client.alarm_set_active(2, false).await.unwrap();

            assert!(matches!(
                server_handle.await.unwrap(),
                IpcRequest::AlarmSetActive {
                    id: 2,
                    active: false
                }
            ));
        }

        #[tokio::test]
        async fn test_error_response_is_not_retried() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let connections = Arc::new(AtomicU32::new(0));
            let counter = connections.clone();

            let server_handle = tokio::spawn(async move {
                loop {
                    let response = IpcResponse::error("タイマーは既に実行中です");
                    answer_once(&listener, &response).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });

            let client = IpcClient::with_socket_path(socket_path);
            let result = client.timer_start(None).await;

            let error_msg = result.unwrap_err().to_string();
            assert!(
                error_msg.contains("既に実行中"),
                "Expected error message to contain '既に実行中', got: {}",
                error_msg
            );
            tokio::task::yield_now().await;
            assert_eq!(connections.load(Ordering::SeqCst), 1);

            server_handle.abort();
        }
    }
}
