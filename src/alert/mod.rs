//! Sound and vibration alerts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   AlertSession   │ ← owned by whoever started the alert
//! └────────┬─────────┘
//!          │ start_alert / stop_alert
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │  AlertPresenter  │────▶│   audio thread   │ (rodio)
//! │                  │     ├──────────────────┤
//! │                  │────▶│ VibrationService │
//! └──────────────────┘     └──────────────────┘
//! ```
//!
//! An [`AlertSession`] stops its alert when released or dropped, so a
//! ringing alarm never outlives the state that owns it.

mod device;
mod error;
mod source;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

pub use device::{DeviceAlertPresenter, TracingVibrationService};
pub use error::AlertError;
pub use source::{resolve_sound, SoundSource, TONE_FREQUENCY_HZ};

// ============================================================================
// Alert description
// ============================================================================

/// On/off vibration timings in milliseconds, starting with a delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VibrationPattern {
    /// Alternating wait/vibrate durations
    pub timings_ms: Vec<u64>,
    /// Whether the pattern loops until cancelled
    pub repeat: bool,
}

impl VibrationPattern {
    /// Repeating pattern used while an alarm rings.
    #[must_use]
    pub fn alarm() -> Self {
        Self {
            timings_ms: vec![0, 1000, 500, 1000, 500, 1000, 500, 1000],
            repeat: true,
        }
    }

    /// Single burst used when a countdown finishes.
    #[must_use]
    pub fn countdown_finished() -> Self {
        Self {
            timings_ms: vec![0, 500, 200, 500, 200, 500],
            repeat: false,
        }
    }

    /// Length of one pass through the pattern.
    #[must_use]
    pub fn cycle_millis(&self) -> u64 {
        self.timings_ms.iter().sum()
    }
}

/// What an alert should present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSpec {
    /// Sound to play, if any
    pub sound: Option<SoundSource>,
    /// Whether the sound loops until stopped
    pub loop_sound: bool,
    /// Vibration to play, if any
    pub vibration: Option<VibrationPattern>,
}

impl AlertSpec {
    /// Looping sound and repeating vibration for a ringing alarm.
    #[must_use]
    pub fn alarm(sound: SoundSource) -> Self {
        Self {
            sound: Some(sound),
            loop_sound: true,
            vibration: Some(VibrationPattern::alarm()),
        }
    }

    /// One-shot sound and vibration for a finished countdown.
    #[must_use]
    pub fn countdown_finished(sound: Option<SoundSource>, vibrate: bool) -> Self {
        Self {
            sound,
            loop_sound: false,
            vibration: vibrate.then(VibrationPattern::countdown_finished),
        }
    }

    /// Drops the sound part.
    #[must_use]
    pub fn muted(mut self) -> Self {
        self.sound = None;
        self
    }

    /// Returns true if the alert presents nothing.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.sound.is_none() && self.vibration.is_none()
    }
}

/// Identifies a running alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlertHandle(Uuid);

impl AlertHandle {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AlertHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AlertHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Presents sound and vibration alerts.
pub trait AlertPresenter: Send + Sync {
    /// Starts an alert and returns a handle for stopping it.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert could not be started.
    fn start_alert(&self, spec: &AlertSpec) -> Result<AlertHandle, AlertError>;

    /// Stops a running alert. Unknown handles are ignored.
    fn stop_alert(&self, handle: AlertHandle);
}

/// Device vibration capability.
pub trait VibrationService: Send + Sync {
    /// Plays a timing pattern, looping it if `repeat` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the device rejects the pattern.
    fn play_pattern(&self, timings_ms: &[u64], repeat: bool) -> Result<(), AlertError>;

    /// Stops any vibration in progress.
    fn cancel(&self);
}

// ============================================================================
// AlertSession
// ============================================================================

/// An alert that is stopped when the session is released or dropped.
pub struct AlertSession {
    presenter: Arc<dyn AlertPresenter>,
    handle: Option<AlertHandle>,
}

impl AlertSession {
    /// Starts `spec` on `presenter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the presenter could not start the alert.
    pub fn start(presenter: Arc<dyn AlertPresenter>, spec: &AlertSpec) -> Result<Self, AlertError> {
        let handle = presenter.start_alert(spec)?;
        Ok(Self {
            presenter,
            handle: Some(handle),
        })
    }

    /// Handle of the running alert.
    #[must_use]
    pub fn handle(&self) -> Option<AlertHandle> {
        self.handle
    }

    /// Stops the alert.
    pub fn release(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.presenter.stop_alert(handle);
        }
    }
}

impl Drop for AlertSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for AlertSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertSession")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Mocks
// ============================================================================

/// Mock alert presenter for testing.
#[derive(Debug, Default)]
pub struct MockAlertPresenter {
    started: Mutex<Vec<(AlertHandle, AlertSpec)>>,
    stopped: Mutex<Vec<AlertHandle>>,
    should_fail: AtomicBool,
}

impl MockAlertPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn start_count(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.stopped.lock().unwrap().len()
    }

    /// Alerts started and not yet stopped.
    #[must_use]
    pub fn active_count(&self) -> usize {
        let stopped = self.stopped.lock().unwrap();
        self.started
            .lock()
            .unwrap()
            .iter()
            .filter(|(handle, _)| !stopped.contains(handle))
            .count()
    }

    #[must_use]
    pub fn started_specs(&self) -> Vec<AlertSpec> {
        self.started
            .lock()
            .unwrap()
            .iter()
            .map(|(_, spec)| spec.clone())
            .collect()
    }
}

impl AlertPresenter for MockAlertPresenter {
    fn start_alert(&self, spec: &AlertSpec) -> Result<AlertHandle, AlertError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(AlertError::DeviceNotAvailable("Mock failure".to_string()));
        }
        let handle = AlertHandle::new();
        self.started.lock().unwrap().push((handle, spec.clone()));
        Ok(handle)
    }

    fn stop_alert(&self, handle: AlertHandle) {
        self.stopped.lock().unwrap().push(handle);
    }
}

/// Mock vibration service for testing.
#[derive(Debug, Default)]
pub struct MockVibrationService {
    patterns: Mutex<Vec<(Vec<u64>, bool)>>,
    cancel_calls: Mutex<usize>,
    should_fail: AtomicBool,
}

impl MockVibrationService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn played(&self) -> Vec<(Vec<u64>, bool)> {
        self.patterns.lock().unwrap().clone()
    }

    #[must_use]
    pub fn cancel_calls(&self) -> usize {
        *self.cancel_calls.lock().unwrap()
    }
}

impl VibrationService for MockVibrationService {
    fn play_pattern(&self, timings_ms: &[u64], repeat: bool) -> Result<(), AlertError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(AlertError::VibrationFailed("Mock failure".to_string()));
        }
        self.patterns
            .lock()
            .unwrap()
            .push((timings_ms.to_vec(), repeat));
        Ok(())
    }

    fn cancel(&self) {
        *self.cancel_calls.lock().unwrap() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod spec_tests {
        use super::*;

        #[test]
        fn test_alarm_spec_loops_and_repeats() {
            let spec = AlertSpec::alarm(SoundSource::Tone);
            assert!(spec.loop_sound);
            let vibration = spec.vibration.unwrap();
            assert!(vibration.repeat);
            assert_eq!(vibration.timings_ms, vec![0, 1000, 500, 1000, 500, 1000, 500, 1000]);
        }

        #[test]
        fn test_countdown_spec_plays_once() {
            let spec = AlertSpec::countdown_finished(Some(SoundSource::Tone), true);
            assert!(!spec.loop_sound);
            let vibration = spec.vibration.unwrap();
            assert!(!vibration.repeat);
            assert_eq!(vibration.cycle_millis(), 1900);
        }

        #[test]
        fn test_silent_spec() {
            assert!(AlertSpec::countdown_finished(None, false).is_silent());
            assert!(!AlertSpec::alarm(SoundSource::Tone).muted().is_silent());
            assert!(AlertSpec::alarm(SoundSource::Tone).muted().sound.is_none());
        }
    }

    mod session_tests {
        use super::*;

        #[test]
        fn test_release_stops_alert() {
            let presenter = Arc::new(MockAlertPresenter::new());
            let session =
                AlertSession::start(presenter.clone(), &AlertSpec::alarm(SoundSource::Tone))
                    .unwrap();
            assert_eq!(presenter.active_count(), 1);

            session.release();
            assert_eq!(presenter.active_count(), 0);
            assert_eq!(presenter.stop_count(), 1);
        }

        #[test]
        fn test_drop_stops_alert_once() {
            let presenter = Arc::new(MockAlertPresenter::new());
            {
                let _session =
                    AlertSession::start(presenter.clone(), &AlertSpec::alarm(SoundSource::Tone))
                        .unwrap();
            }
            assert_eq!(presenter.stop_count(), 1);
        }

        #[test]
        fn test_failed_start_has_no_session() {
            let presenter = Arc::new(MockAlertPresenter::new());
            presenter.set_should_fail(true);
            let result = AlertSession::start(presenter.clone(), &AlertSpec::alarm(SoundSource::Tone));
            assert!(result.unwrap_err().is_device_error());
            assert_eq!(presenter.start_count(), 0);
        }
    }

    #[test]
    fn test_handles_are_unique() {
        assert_ne!(AlertHandle::new(), AlertHandle::new());
    }
}
