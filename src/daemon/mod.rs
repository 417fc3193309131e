//! Daemon for focusclock.
//!
//! This module contains the long-running side of the tool:
//! - `ipc`: Unix socket server and request dispatch
//! - `service`: alarm editing plus the ringing state, behind one lock
//! - [`run`]: wires the stores, wake scheduler, alerts and countdown together

pub mod ipc;
mod service;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub use ipc::{serve_connection, IpcServer, RequestHandler};
pub use service::AlarmService;

use crate::alert::{resolve_sound, AlertPresenter, DeviceAlertPresenter, TracingVibrationService};
use crate::clock::AlarmClock;
use crate::config::AppConfig;
use crate::countdown::{CountdownEngine, CountdownTimer};
use crate::firing::AlarmFiringHandler;
use crate::notification::TracingNotificationPresenter;
use crate::scheduler::{AlarmScheduler, TokioWakeScheduler};
use crate::store::{AlarmStore, CountdownStore, FileStore};

/// Runs the daemon until Ctrl-C.
///
/// On startup the default alarms are seeded on first use, every active
/// alarm is registered again and a countdown that was running resumes.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a store directory
/// cannot be created, or the socket cannot be bound.
pub async fn run(config: AppConfig) -> Result<()> {
    config.validate().map_err(anyhow::Error::msg)?;

    let alarm_backend = FileStore::open(config.alarms_dir())
        .context("Failed to open the alarm store")?;
    let countdown_backend = FileStore::open(config.countdown_dir())
        .context("Failed to open the countdown store")?;

    let (wake, mut wake_rx) = TokioWakeScheduler::new();
    let scheduler = AlarmScheduler::new(Arc::new(wake));

    let presenter: Arc<dyn AlertPresenter> = Arc::new(DeviceAlertPresenter::new(
        Arc::new(TracingVibrationService),
        config.mute,
    ));
    let sound = resolve_sound(config.alarm_sound_path());

    let clock = AlarmClock::new(AlarmStore::load(Arc::new(alarm_backend)), scheduler.clone());
    let firing = AlarmFiringHandler::new(
        presenter.clone(),
        Arc::new(TracingNotificationPresenter),
        scheduler,
        sound.clone(),
    )
    .with_snooze_minutes(config.snooze_minutes);

    let mut service = AlarmService::new(clock, firing);
    let report = service.start_up(&Local::now());
    for id in &report.switched_off {
        warn!("Alarm {} was switched off because it could not be registered", id);
    }
    let alarms = Arc::new(Mutex::new(service));

    let engine = CountdownEngine::restore(
        CountdownStore::new(Arc::new(countdown_backend)),
        presenter,
        sound,
    );
    let timer = CountdownTimer::recover(engine).await;

    let handler = Arc::new(RequestHandler::new(alarms.clone(), timer.clone()));
    let server = IpcServer::new(&config.socket_path())?;
    info!("Daemon listening on {:?}", server.socket_path());

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    tokio::spawn(serve_connection(stream, handler.clone()));
                }
                Err(e) => warn!("{:#}", e),
            },
            Some(payload) = wake_rx.recv() => {
                alarms.lock().await.fire(&payload);
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Shutting down");
                break;
            }
        }
    }

    timer.shutdown();
    Ok(())
}
