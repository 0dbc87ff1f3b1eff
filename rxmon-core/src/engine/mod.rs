//! `MonitorEngine` — top-level lifecycle controller and control surface.
//!
//! ## Lifecycle
//!
//! ```text
//! MonitorEngine::new()          → session state built, status = Idle
//!     └─► start()               → duplex stream open, status = Running
//!         └─► stop()            → running=false, streams dropped, status = Stopped
//! ```
//!
//! `start()`/`stop()` are guarded: calling them in the wrong state returns
//! an error rather than panicking.
//!
//! ## Threading
//!
//! `cpal::Stream` is `!Send` on Windows/macOS (COM / CoreAudio thread
//! affinity). The duplex pair is therefore created *inside* `spawn_blocking`
//! and the hosting thread parks until the running flag drops, so the streams
//! are created and dropped on the same OS thread. A sync channel propagates
//! open-device errors back to the `start()` caller.
//!
//! The session state itself outlives start/stop cycles: gain, arbitration
//! counters and interpolation ramps deliberately carry across restarts.

pub mod callback;

pub use callback::{MonitorSettings, SessionState};

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::info;

use crate::{
    audio::DuplexAudio,
    decoder::{ProtocolSet, VoiceDecoder},
    error::{Result, RxmonError},
    ipc::events::{MonitorSnapshot, SessionStatus, SessionStatusEvent},
};

/// Status broadcast capacity — lifecycle transitions are rare.
const BROADCAST_CAP: usize = 64;

/// Poll interval of the thread hosting the `!Send` streams.
const STREAM_HOST_POLL: Duration = Duration::from_millis(50);

/// Construction-time configuration. Runtime toggles live in
/// [`MonitorSettings`].
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Operating sample rate for both directions (Hz).
    pub sample_rate: u32,
    /// Playout buffer depth in samples. Default: 24 000 (0.5 s at 48 kHz) —
    /// small enough that toggling passthrough off empties audibly fast.
    pub playout_capacity: usize,
    /// Callbacks analog stays muted after the last digital sync (~300 ms).
    pub sync_hold_callbacks: u32,
    /// Callbacks the decoding status stays shown after the last voice burst.
    pub voice_hold_callbacks: u32,
    /// Scope snapshot depth in (decimated) samples.
    pub scope_capacity: usize,
    /// Scope decimation: record every n-th conditioned sample.
    pub scope_stride: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            playout_capacity: 24_000,
            sync_hold_callbacks: 20,
            voice_hold_callbacks: 30,
            scope_capacity: 200,
            scope_stride: 20,
        }
    }
}

/// The top-level engine handle.
///
/// `MonitorEngine` is `Send + Sync` — all fields use interior mutability.
/// Wrap in `Arc<MonitorEngine>` to share between the hosting application's
/// control surface and any event-forwarding tasks.
pub struct MonitorEngine {
    config: MonitorConfig,
    /// Everything the audio callback touches, behind the session mutex.
    session: Arc<Mutex<SessionState>>,
    /// `true` while the duplex stream pair is active.
    running: Arc<AtomicBool>,
    /// Canonical lifecycle status.
    status: Arc<Mutex<SessionStatus>>,
    /// Broadcast sender for lifecycle events.
    status_tx: broadcast::Sender<SessionStatusEvent>,
}

impl MonitorEngine {
    /// Create the engine around a decoder backend. Does not touch any audio
    /// device — call `start()` for that.
    pub fn new(config: MonitorConfig, decoder: Box<dyn VoiceDecoder>) -> Self {
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let session = Arc::new(Mutex::new(SessionState::new(&config, decoder)));
        Self {
            config,
            session,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(SessionStatus::Idle)),
            status_tx,
        }
    }

    /// Start the duplex session on the default devices.
    pub fn start(&self) -> Result<()> {
        self.start_with_devices(None, None)
    }

    /// Start the duplex session using preferred device names.
    ///
    /// Blocks until the devices are confirmed open (or have failed), then
    /// returns; the callback pipeline keeps running on the device threads.
    ///
    /// # Errors
    /// - `RxmonError::AlreadyRunning` if already started.
    /// - Device/stream errors from the audio backend; in that case no
    ///   partial session is left running.
    pub fn start_with_devices(
        &self,
        preferred_input: Option<String>,
        preferred_output: Option<String>,
    ) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RxmonError::AlreadyRunning);
        }

        // Freshly swapped decoder backends must see the active protocol set.
        self.session.lock().apply_decoder_settings();

        self.running.store(true, Ordering::SeqCst);
        self.set_status(SessionStatus::Running, None);

        let session = Arc::clone(&self.session);
        let running = Arc::clone(&self.running);
        let sample_rate = self.config.sample_rate;

        // Sync oneshot: the stream-hosting thread reports open success or
        // failure back to this caller.
        let (open_tx, open_rx) = std::sync::mpsc::channel::<Result<u32>>();

        tokio::task::spawn_blocking(move || {
            // ── Open the duplex pair (on THIS thread — streams are !Send) ──
            let audio = match DuplexAudio::open_with_preference(
                session,
                Arc::clone(&running),
                sample_rate,
                preferred_input.as_deref(),
                preferred_output.as_deref(),
            ) {
                Ok(a) => {
                    let _ = open_tx.send(Ok(a.sample_rate));
                    a
                }
                Err(e) => {
                    let _ = open_tx.send(Err(e));
                    running.store(false, Ordering::SeqCst);
                    return;
                }
            };

            // Park until stop; all audio work happens in the device
            // callbacks.
            while running.load(Ordering::Relaxed) {
                std::thread::sleep(STREAM_HOST_POLL);
            }

            // Streams drop here, releasing the devices on this thread.
            drop(audio);
            info!("duplex streams closed");
        });

        match open_rx.recv() {
            Ok(Ok(rate)) => {
                info!(sample_rate = rate, "monitor session started");
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                self.set_status(SessionStatus::Error, Some(e.to_string()));
                Err(e)
            }
            Err(_) => {
                // Channel closed before a message was sent — host thread died.
                self.running.store(false, Ordering::SeqCst);
                self.set_status(SessionStatus::Error, Some("audio host thread died".into()));
                Err(RxmonError::Other(anyhow::anyhow!(
                    "audio host thread died before confirming device open"
                )))
            }
        }
    }

    /// Stop the duplex session.
    ///
    /// # Errors
    /// - `RxmonError::NotRunning` if not currently running.
    pub fn stop(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(RxmonError::NotRunning);
        }
        self.running.store(false, Ordering::SeqCst);
        self.set_status(SessionStatus::Stopped, None);
        info!("monitor session stop requested");
        Ok(())
    }

    /// Current lifecycle status (snapshot).
    pub fn status(&self) -> SessionStatus {
        *self.status.lock()
    }

    /// Coherent display snapshot, taken under the session lock.
    pub fn snapshot(&self) -> MonitorSnapshot {
        let session_status = *self.status.lock();
        self.session.lock().snapshot(session_status)
    }

    /// Drain the scope display buffer.
    pub fn take_scope(&self) -> Vec<f32> {
        self.session.lock().take_scope()
    }

    /// Subscribe to lifecycle transition events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<SessionStatusEvent> {
        self.status_tx.subscribe()
    }

    // ── Control surface ──────────────────────────────────────────────────

    pub fn set_passthrough(&self, enabled: bool) {
        info!(enabled, "analog passthrough");
        self.session.lock().set_passthrough(enabled);
    }

    pub fn set_agc(&self, enabled: bool) {
        info!(enabled, "automatic gain control");
        self.session.lock().set_agc(enabled);
    }

    pub fn set_manual_gain(&self, gain: f32) {
        self.session.lock().set_manual_gain(gain);
    }

    pub fn set_polarity_invert(&self, invert: bool) {
        info!(invert, "polarity invert");
        self.session.lock().set_polarity_invert(invert);
    }

    pub fn set_protocols(&self, protocols: ProtocolSet) {
        info!(?protocols, "protocol hunt set changed");
        self.session.lock().set_protocols(protocols);
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn set_status(&self, new_status: SessionStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.status_tx.send(SessionStatusEvent {
            status: new_status,
            detail,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::StubDecoder;

    fn engine() -> MonitorEngine {
        MonitorEngine::new(MonitorConfig::default(), Box::new(StubDecoder::new()))
    }

    #[test]
    fn starts_idle_with_default_settings() {
        let engine = engine();
        assert_eq!(engine.status(), SessionStatus::Idle);

        let snap = engine.snapshot();
        assert_eq!(snap.status, "WAITING");
        assert_eq!(snap.active_slot, "--");
        assert!(snap.settings.agc);
        assert!(!snap.settings.passthrough);
    }

    #[test]
    fn stop_without_start_is_an_error() {
        let engine = engine();
        assert!(matches!(engine.stop(), Err(RxmonError::NotRunning)));
    }

    #[test]
    fn control_surface_mutations_show_in_snapshot() {
        let engine = engine();
        engine.set_passthrough(true);
        engine.set_agc(false);
        engine.set_manual_gain(3.0);
        engine.set_polarity_invert(true);
        engine.set_protocols(ProtocolSet {
            dmr: true,
            nxdn: true,
            dpmr: false,
            p25: false,
        });

        let snap = engine.snapshot();
        assert!(snap.settings.passthrough);
        assert!(!snap.settings.agc);
        assert!(snap.settings.polarity_invert);
        assert!(snap.settings.protocols.nxdn);
        assert!((snap.input_gain - 3.0).abs() < 1e-6);
    }

    #[test]
    fn status_events_are_broadcast() {
        let engine = engine();
        let mut rx = engine.subscribe_status();
        engine.set_status(SessionStatus::Running, None);
        let event = rx.try_recv().expect("status event pending");
        assert_eq!(event.status, SessionStatus::Running);
        assert!(event.detail.is_none());
    }
}
