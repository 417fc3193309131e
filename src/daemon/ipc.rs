//! IPC server for the focusclock daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for alarm and countdown commands
//! - Dispatch into the alarm service and the countdown timer

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::clock::summarize;
use crate::countdown::{CountdownError, CountdownTimer};
use crate::types::{
    AlarmId, AlarmParams, AlarmRecord, IpcRequest, IpcResponse, ResponseData, SettingsParams,
    TaskSummary, TimerSummary,
};

use super::AlarmService;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
pub const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,

    /// The client closed the connection without sending a request
    #[error("Connection closed by client")]
    ConnectionClosed,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Reads until the client shuts down its write half, the buffer holds a
    /// complete JSON document, or the size limit is hit.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, oversize input, or malformed JSON.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let read = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            read_document(stream),
        )
        .await
        .map_err(|_| IpcError::Timeout)??;

        let request: IpcRequest =
            serde_json::from_slice(&read).with_context(|| "Failed to deserialize IPC request")?;
        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

async fn read_document(stream: &mut UnixStream) -> Result<Vec<u8>, IpcError> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| IpcError::ReadError(e.to_string()))?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if buffer.len() > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge);
        }
        if serde_json::from_slice::<serde::de::IgnoredAny>(&buffer).is_ok() {
            break;
        }
    }

    if buffer.is_empty() {
        return Err(IpcError::ConnectionClosed);
    }
    Ok(buffer)
}

/// Serves one request on an accepted connection.
pub async fn serve_connection(mut stream: UnixStream, handler: Arc<RequestHandler>) {
    let response = match IpcServer::receive_request(&mut stream).await {
        Ok(request) => handler.handle(request).await,
        Err(e) => {
            debug!("Rejected request: {:#}", e);
            IpcResponse::error(format!("不正なリクエストです: {}", e))
        }
    };
    if let Err(e) = IpcServer::send_response(&mut stream, &response).await {
        debug!("Failed to send response: {:#}", e);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to the alarm service and countdown.
pub struct RequestHandler {
    alarms: Arc<Mutex<AlarmService>>,
    timer: CountdownTimer,
}

impl RequestHandler {
    pub fn new(alarms: Arc<Mutex<AlarmService>>, timer: CountdownTimer) -> Self {
        Self { alarms, timer }
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        let now = Local::now();
        match request {
            IpcRequest::AlarmAdd { params } => self.handle_alarm_add(&params, now).await,
            IpcRequest::AlarmEdit { id, params } => self.handle_alarm_edit(id, &params, now).await,
            IpcRequest::AlarmList => self.handle_alarm_list(now).await,
            IpcRequest::AlarmSetActive { id, active } => {
                self.handle_alarm_set_active(id, active, now).await
            }
            IpcRequest::AlarmDelete { id } => self.handle_alarm_delete(id, now).await,
            IpcRequest::AlarmStop { id } => self.handle_alarm_stop(id).await,
            IpcRequest::AlarmSnooze { id } => self.handle_alarm_snooze(id, now).await,
            IpcRequest::TimerStart { millis } => {
                timer_response(self.timer.start(millis.unwrap_or(0)).await, "タイマーを開始しました")
            }
            IpcRequest::TimerPause => {
                timer_response(self.timer.pause().await, "タイマーを一時停止しました")
            }
            IpcRequest::TimerResume => {
                timer_response(self.timer.resume().await, "タイマーを再開しました")
            }
            IpcRequest::TimerStop => {
                timer_response(self.timer.stop().await, "タイマーを停止しました")
            }
            IpcRequest::TimerStatus => timer_response(Ok(self.timer.status().await), ""),
            IpcRequest::TimerResetCycles => timer_response(
                self.timer.reset_cycles().await,
                "完了サイクル数をリセットしました",
            ),
            IpcRequest::TimerConfigure { params } => self.handle_timer_configure(&params).await,
            IpcRequest::TaskAdd {
                title,
                estimated_pomodoros,
            } => task_response(
                self.timer.add_task(&title, estimated_pomodoros).await,
                |task| format!("タスクを追加しました: #{} {}", task.id, task.title),
            ),
            IpcRequest::TaskList => IpcResponse::success(
                "",
                Some(ResponseData::with_tasks(self.timer.tasks().await)),
            ),
            IpcRequest::TaskSelect { id } => task_response(
                self.timer.select_task(id).await,
                |task| match task {
                    Some(task) => format!("タスクを選択しました: #{} {}", task.id, task.title),
                    None => "タスクの選択を解除しました".to_string(),
                },
            ),
            IpcRequest::TaskComplete { id, completed } => task_response(
                self.timer.set_task_completed(id, completed).await,
                |task| {
                    if task.is_completed {
                        format!("タスクを完了にしました: #{} {}", task.id, task.title)
                    } else {
                        format!("タスクを未完了に戻しました: #{} {}", task.id, task.title)
                    }
                },
            ),
            IpcRequest::TaskDelete { id } => task_response(
                self.timer.delete_task(id).await,
                |task| format!("タスクを削除しました: #{} {}", task.id, task.title),
            ),
        }
    }

    async fn handle_alarm_add(&self, params: &AlarmParams, now: DateTime<Local>) -> IpcResponse {
        let mut alarms = self.alarms.lock().await;
        match alarms.add(params, &now) {
            Ok((alarm, fire_at)) => {
                let message = match fire_at {
                    Some(at) => format!(
                        "アラームを追加しました (次回: {})",
                        format_fire_time(at)
                    ),
                    None => "アラームを追加しました".to_string(),
                };
                alarm_response(message, &alarm, now)
            }
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_alarm_edit(
        &self,
        id: AlarmId,
        params: &AlarmParams,
        now: DateTime<Local>,
    ) -> IpcResponse {
        let mut alarms = self.alarms.lock().await;
        match alarms.edit(id, params, &now) {
            Ok(alarm) => alarm_response("アラームを更新しました", &alarm, now),
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_alarm_list(&self, now: DateTime<Local>) -> IpcResponse {
        let summaries = self.alarms.lock().await.summaries(&now);
        IpcResponse::success("", Some(ResponseData::with_alarms(summaries)))
    }

    async fn handle_alarm_set_active(
        &self,
        id: AlarmId,
        active: bool,
        now: DateTime<Local>,
    ) -> IpcResponse {
        let mut alarms = self.alarms.lock().await;
        match alarms.set_active(id, active, &now) {
            Ok((alarm, Some(at))) => alarm_response(
                format!("アラームをオンにしました (次回: {})", format_fire_time(at)),
                &alarm,
                now,
            ),
            Ok((alarm, None)) => alarm_response("アラームをオフにしました", &alarm, now),
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_alarm_delete(&self, id: AlarmId, now: DateTime<Local>) -> IpcResponse {
        let mut alarms = self.alarms.lock().await;
        match alarms.delete(id) {
            Ok(alarm) => alarm_response("アラームを削除しました", &alarm, now),
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_alarm_stop(&self, id: AlarmId) -> IpcResponse {
        let mut alarms = self.alarms.lock().await;
        match alarms.stop(id) {
            Ok(()) => IpcResponse::success("アラームを停止しました", None),
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_alarm_snooze(&self, id: AlarmId, now: DateTime<Local>) -> IpcResponse {
        let mut alarms = self.alarms.lock().await;
        match alarms.snooze(id, &now) {
            Ok(at) => IpcResponse::success(
                format!("アラームをスヌーズしました (次回: {})", format_fire_time(at)),
                None,
            ),
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_timer_configure(&self, params: &SettingsParams) -> IpcResponse {
        match self.timer.configure(params).await {
            Ok((settings, timer)) => IpcResponse::success(
                "設定を更新しました",
                Some(ResponseData {
                    timer: Some(timer),
                    settings: Some(settings),
                    ..ResponseData::default()
                }),
            ),
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }
}

fn alarm_response(
    message: impl Into<String>,
    alarm: &AlarmRecord,
    now: DateTime<Local>,
) -> IpcResponse {
    IpcResponse::success(
        message,
        Some(ResponseData::with_alarms(vec![summarize(alarm, &now)])),
    )
}

fn timer_response(result: Result<TimerSummary, CountdownError>, message: &str) -> IpcResponse {
    match result {
        Ok(summary) => IpcResponse::success(message, Some(ResponseData::with_timer(summary))),
        Err(e) => IpcResponse::error(e.to_string()),
    }
}

fn task_response<T>(
    result: Result<(T, Vec<TaskSummary>), CountdownError>,
    message: impl FnOnce(&T) -> String,
) -> IpcResponse {
    match result {
        Ok((task, tasks)) => {
            IpcResponse::success(message(&task), Some(ResponseData::with_tasks(tasks)))
        }
        Err(e) => IpcResponse::error(e.to_string()),
    }
}

fn format_fire_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%m/%d %H:%M").to_string()
}

// ============================================================================
// Tests
// ============================================================================
