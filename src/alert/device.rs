//! Alert presenter for the local machine.
//!
//! rodio's output stream cannot move between threads, so playback lives on
//! a dedicated audio thread that owns the stream and one `Sink` per alert.
//! The presenter talks to it over crossbeam channels.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use rodio::source::SineWave;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, info, warn};

use super::error::AlertError;
use super::source::{SoundSource, TONE_FREQUENCY_HZ};
use super::{AlertHandle, AlertPresenter, AlertSpec, VibrationPattern, VibrationService};

const TONE_ON: Duration = Duration::from_millis(600);
const TONE_GAP: Duration = Duration::from_millis(400);
const TONE_ONE_SHOT: Duration = Duration::from_secs(3);
const TONE_VOLUME: f32 = 0.25;

/// Time to wait for the audio thread to answer a command.
const AUDIO_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

enum AudioCommand {
    Play {
        handle: AlertHandle,
        source: SoundSource,
        looped: bool,
        reply: Sender<Result<(), AlertError>>,
    },
    Stop(AlertHandle),
}

/// Presents alerts through rodio and a [`VibrationService`].
///
/// The vibration motor plays one pattern at a time: the newest alert owns
/// it. When the owner stops, the newest surviving repeating pattern takes
/// over again.
pub struct DeviceAlertPresenter {
    audio: Option<Sender<AudioCommand>>,
    vibration: Arc<dyn VibrationService>,
    vibrating: Mutex<Vec<(AlertHandle, VibrationPattern)>>,
}

impl DeviceAlertPresenter {
    /// Creates a presenter, starting the audio thread unless `muted`.
    ///
    /// A missing audio device is not an error: the presenter then skips
    /// the sound part of every alert and only vibrates.
    pub fn new(vibration: Arc<dyn VibrationService>, muted: bool) -> Self {
        let audio = if muted {
            debug!("Alert sound muted");
            None
        } else {
            match spawn_audio_thread() {
                Ok(sender) => Some(sender),
                Err(e) => {
                    warn!("Audio not available, alarms will be silent: {}", e);
                    None
                }
            }
        };
        Self {
            audio,
            vibration,
            vibrating: Mutex::new(Vec::new()),
        }
    }

    /// Returns true if sound playback is available.
    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    fn play_sound(
        &self,
        handle: AlertHandle,
        source: &SoundSource,
        looped: bool,
    ) -> Result<(), AlertError> {
        let audio = self
            .audio
            .as_ref()
            .ok_or_else(|| AlertError::DeviceNotAvailable("audio disabled".to_string()))?;

        let (reply, response) = bounded(1);
        audio
            .send(AudioCommand::Play {
                handle,
                source: source.clone(),
                looped,
                reply,
            })
            .map_err(|e| AlertError::PlaybackError(e.to_string()))?;

        match response.recv_timeout(AUDIO_REPLY_TIMEOUT) {
            Ok(result) => result,
            Err(e) => {
                // The audio thread may still start this sink later.
                let _ = audio.send(AudioCommand::Stop(handle));
                Err(AlertError::PlaybackError(e.to_string()))
            }
        }
    }

    fn lock_vibrating(&self) -> MutexGuard<'_, Vec<(AlertHandle, VibrationPattern)>> {
        self.vibrating.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Releases the motor held by `handle`.
    fn release_vibration(&self, handle: AlertHandle) {
        let resume = {
            let mut vibrating = self.lock_vibrating();
            let Some(position) = vibrating.iter().position(|(owner, _)| *owner == handle) else {
                return;
            };
            let owned_motor = position + 1 == vibrating.len();
            vibrating.remove(position);
            if !owned_motor {
                return;
            }
            vibrating
                .iter()
                .rev()
                .find(|(_, pattern)| pattern.repeat)
                .map(|(_, pattern)| pattern.clone())
        };

        self.vibration.cancel();
        if let Some(pattern) = resume {
            if let Err(e) = self.vibration.play_pattern(&pattern.timings_ms, pattern.repeat) {
                warn!("Resuming vibration failed: {}", e);
            }
        }
    }
}

impl AlertPresenter for DeviceAlertPresenter {
    fn start_alert(&self, spec: &AlertSpec) -> Result<AlertHandle, AlertError> {
        let handle = AlertHandle::new();

        if let Some(source) = spec.sound.as_ref().filter(|_| self.has_audio()) {
            match self.play_sound(handle, source, spec.loop_sound) {
                Ok(()) => {}
                Err(e) if e.should_fallback_to_tone() => {
                    warn!(
                        "Failed to play '{}': {}, falling back to tone",
                        source.name(),
                        e
                    );
                    self.play_sound(handle, &SoundSource::Tone, spec.loop_sound)?;
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(pattern) = &spec.vibration {
            match self.vibration.play_pattern(&pattern.timings_ms, pattern.repeat) {
                Ok(()) => self.lock_vibrating().push((handle, pattern.clone())),
                Err(e) => warn!("Vibration failed: {}", e),
            }
        }

        debug!("Alert {} started", handle);
        Ok(handle)
    }

    fn stop_alert(&self, handle: AlertHandle) {
        if let Some(audio) = &self.audio {
            // A closed channel means the audio thread is gone and nothing is playing.
            let _ = audio.send(AudioCommand::Stop(handle));
        }
        self.release_vibration(handle);
        debug!("Alert {} stopped", handle);
    }
}

impl std::fmt::Debug for DeviceAlertPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAlertPresenter")
            .field("has_audio", &self.has_audio())
            .finish_non_exhaustive()
    }
}

fn spawn_audio_thread() -> Result<Sender<AudioCommand>, AlertError> {
    let (commands_tx, commands_rx) = unbounded();
    let (ready_tx, ready_rx) = bounded(1);

    thread::Builder::new()
        .name("focusclock-audio".to_string())
        .spawn(move || run_audio_thread(commands_rx, ready_tx))
        .map_err(|e| AlertError::StreamError(e.to_string()))?;

    ready_rx
        .recv_timeout(AUDIO_REPLY_TIMEOUT)
        .map_err(|e| AlertError::DeviceNotAvailable(e.to_string()))??;

    Ok(commands_tx)
}

fn run_audio_thread(commands: Receiver<AudioCommand>, ready: Sender<Result<(), AlertError>>) {
    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(output) => output,
        Err(e) => {
            let _ = ready.send(Err(AlertError::DeviceNotAvailable(e.to_string())));
            return;
        }
    };
    let _ = ready.send(Ok(()));
    info!("Audio output stream initialized");

    let mut sinks: HashMap<AlertHandle, Sink> = HashMap::new();

    // Exits when the presenter (the only sender) is dropped.
    for command in commands.iter() {
        match command {
            AudioCommand::Play {
                handle,
                source,
                looped,
                reply,
            } => {
                let result = start_sink(&stream_handle, &source, looped).map(|sink| {
                    sinks.insert(handle, sink);
                });
                let _ = reply.send(result);
            }
            AudioCommand::Stop(handle) => {
                if let Some(sink) = sinks.remove(&handle) {
                    sink.stop();
                }
            }
        }
        sinks.retain(|_, sink| !sink.empty());
    }
}

fn start_sink(
    stream: &OutputStreamHandle,
    source: &SoundSource,
    looped: bool,
) -> Result<Sink, AlertError> {
    let sink = Sink::try_new(stream).map_err(|e| AlertError::StreamError(e.to_string()))?;

    match source {
        SoundSource::File { path } => {
            let file = File::open(path)
                .map_err(|e| AlertError::FileNotFound(format!("{}: {}", path.display(), e)))?;
            let decoder = Decoder::new(BufReader::new(file))
                .map_err(|e| AlertError::DecodeError(e.to_string()))?;
            if looped {
                sink.append(decoder.repeat_infinite());
            } else {
                sink.append(decoder);
            }
        }
        SoundSource::Tone => {
            let beep = SineWave::new(TONE_FREQUENCY_HZ)
                .take_duration(TONE_ON)
                .amplify(TONE_VOLUME)
                .delay(TONE_GAP)
                .repeat_infinite();
            if looped {
                sink.append(beep);
            } else {
                sink.append(beep.take_duration(TONE_ONE_SHOT));
            }
        }
    }

    debug!("Playing {} (looped: {})", source.name(), looped);
    Ok(sink)
}

// ============================================================================
// Vibration
// ============================================================================

/// Vibration service for machines without a vibration motor.
///
/// Records patterns in the log so alerts remain traceable.
#[derive(Debug, Default)]
pub struct TracingVibrationService;

impl VibrationService for TracingVibrationService {
    fn play_pattern(&self, timings_ms: &[u64], repeat: bool) -> Result<(), AlertError> {
        info!("Vibrate {:?} (repeat: {})", timings_ms, repeat);
        Ok(())
    }

    fn cancel(&self) {
        debug!("Vibration cancelled");
    }
}
