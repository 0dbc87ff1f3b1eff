//! Per-frame callback pipeline.
//!
//! ## Stages (one audio-device period)
//!
//! ```text
//! capture frame
//!   └─► per sample: AGC → polarity → scope record → i16 → decoder.feed
//!         └─► once per frame: sync → voice bursts → interpolate → settle
//!               └─► analog passthrough into playout (when permitted)
//!                     └─► playout.read_into(playback frame)
//! ```
//!
//! `process_frame` is the hot path: O(frame) work, no locking (the caller
//! already holds or try-held the session mutex), no logging, and no
//! allocation beyond the one conditioned-input scratch buffer, which reaches
//! the device frame size on the first callback and is reused after that.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::arbiter::PrecedenceArbiter;
use crate::buffering::playout::PlayoutBuffer;
use crate::decoder::{ProtocolSet, TimeSlot, VoiceDecoder};
use crate::dsp::{agc::GainControl, interp::VoiceInterpolator};
use crate::engine::MonitorConfig;
use crate::ipc::events::{MonitorSnapshot, SessionStatus};
use crate::scope::ScopeBuffer;

/// Full-scale factor for the decoder's i16 input domain. Kept slightly under
/// `i16::MAX` so a nominally full-scale float cannot wrap on conversion.
const DECODER_FULL_SCALE: f32 = 32_000.0;

/// Runtime-togglable settings, mutated through the engine's control surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSettings {
    /// Play raw conditioned input when no digital activity is present.
    pub passthrough: bool,
    /// Adaptive gain; when off, the manual gain applies statically.
    pub agc: bool,
    /// Flip input polarity before decoding (some discriminator taps invert).
    pub polarity_invert: bool,
    /// Digital protocols the decoder hunts for.
    pub protocols: ProtocolSet,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            passthrough: false,
            agc: true,
            polarity_invert: false,
            protocols: ProtocolSet::default(),
        }
    }
}

/// All state shared between the audio callback and the control surface.
///
/// Owned behind a single `parking_lot::Mutex`: the audio side acquires it
/// with `try_lock` and degrades to a silent frame on contention; the control
/// side blocks. Constructed once and kept across session restarts, so gain,
/// arbitration counters and ramp state carry over.
pub struct SessionState {
    settings: MonitorSettings,
    gain: GainControl,
    arbiter: PrecedenceArbiter,
    interp: VoiceInterpolator,
    playout: PlayoutBuffer,
    scope: ScopeBuffer,
    decoder: Box<dyn VoiceDecoder>,
    /// Conditioned-input scratch, reused every frame.
    conditioned: Vec<f32>,
}

impl SessionState {
    pub fn new(config: &MonitorConfig, decoder: Box<dyn VoiceDecoder>) -> Self {
        let mut decoder = decoder;
        let settings = MonitorSettings::default();
        decoder.set_protocols(settings.protocols);
        Self {
            settings,
            gain: GainControl::new(),
            arbiter: PrecedenceArbiter::new(config.sync_hold_callbacks, config.voice_hold_callbacks),
            interp: VoiceInterpolator::new(),
            playout: PlayoutBuffer::new(config.playout_capacity),
            scope: ScopeBuffer::new(config.scope_capacity, config.scope_stride),
            decoder,
            conditioned: Vec::new(),
        }
    }

    /// Run one audio-device period: condition and decode `input`, arbitrate,
    /// and fill `output` from the playout buffer.
    pub fn process_frame(&mut self, input: &[f32], output: &mut [f32]) {
        // ── 1. Condition the capture frame and feed the decoder ──────────
        self.conditioned.clear();
        self.conditioned.reserve(input.len());
        for &raw in input {
            let mut sample = self.gain.apply(raw, self.settings.agc);
            if self.settings.polarity_invert {
                sample = -sample;
            }
            self.conditioned.push(sample);
            self.scope.record(sample);
            self.decoder
                .feed((sample.clamp(-1.0, 1.0) * DECODER_FULL_SCALE) as i16);
        }

        // ── 2. Arbitrate, exactly once per frame ─────────────────────────
        let sync = self.decoder.sync();
        self.arbiter.observe_sync(sync);

        let mut got_voice = false;
        for slot in TimeSlot::ALL {
            let burst = self.decoder.voice_frame(slot);
            if burst.is_empty() {
                continue;
            }
            got_voice = true;
            self.arbiter.voice_active(slot);
            self.interp.smooth_into(slot, burst, &mut self.playout);
            self.decoder.clear_voice(slot);
        }

        let analog_permitted = self.arbiter.settle(got_voice, sync, self.settings.passthrough);
        if analog_permitted && self.settings.passthrough {
            self.playout.write(&self.conditioned);
        }

        // ── 3. Drain playout into the playback frame ─────────────────────
        self.playout.read_into(output);
    }

    // ── Control surface (called under a blocking lock) ───────────────────

    pub fn settings(&self) -> MonitorSettings {
        self.settings
    }

    pub fn set_passthrough(&mut self, enabled: bool) {
        self.settings.passthrough = enabled;
    }

    pub fn set_agc(&mut self, enabled: bool) {
        self.settings.agc = enabled;
    }

    /// Manual gain override. Ignored (with a warning) while AGC is active —
    /// the smoother would overwrite it within a few samples anyway.
    pub fn set_manual_gain(&mut self, gain: f32) {
        if self.settings.agc {
            warn!(gain, "manual gain ignored while AGC is enabled");
            return;
        }
        self.gain.set_gain(gain);
    }

    pub fn set_polarity_invert(&mut self, invert: bool) {
        self.settings.polarity_invert = invert;
    }

    /// Update the protocol hunt set and push it to the decoder.
    pub fn set_protocols(&mut self, protocols: ProtocolSet) {
        self.settings.protocols = protocols;
        self.decoder.set_protocols(protocols);
    }

    /// Re-push the current configuration to the decoder (done at session
    /// start so a freshly swapped decoder backend sees the active set).
    pub fn apply_decoder_settings(&mut self) {
        self.decoder.set_protocols(self.settings.protocols);
    }

    pub fn snapshot(&self, session: SessionStatus) -> MonitorSnapshot {
        MonitorSnapshot {
            session,
            status: self.arbiter.status().to_string(),
            active_slot: self.arbiter.active_slot_label().to_string(),
            input_gain: self.gain.gain(),
            input_peak: self.gain.peak(),
            settings: self.settings,
        }
    }

    /// Drain the scope snapshot for display.
    pub fn take_scope(&mut self) -> Vec<f32> {
        self.scope.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{StubDecoder, SyncKind};

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            playout_capacity: 4_096,
            ..MonitorConfig::default()
        }
    }

    /// Decoder fake scripted per frame: after every `frame_len` fed samples
    /// it advances to the next scripted frame's sync/bursts.
    pub(crate) struct ScriptedDecoder {
        frame_len: usize,
        fed: usize,
        pub script: Vec<ScriptFrame>,
    }

    #[derive(Default, Clone)]
    pub(crate) struct ScriptFrame {
        pub sync: Option<SyncKind>,
        pub voice: [Vec<i16>; 2],
    }

    impl ScriptedDecoder {
        pub fn new(frame_len: usize, script: Vec<ScriptFrame>) -> Self {
            Self {
                frame_len,
                fed: 0,
                script,
            }
        }

        fn current(&self) -> usize {
            (self.fed / self.frame_len)
                .saturating_sub(1)
                .min(self.script.len().saturating_sub(1))
        }
    }

    impl VoiceDecoder for ScriptedDecoder {
        fn feed(&mut self, _sample: i16) {
            self.fed += 1;
        }

        fn sync(&self) -> SyncKind {
            self.script
                .get(self.current())
                .and_then(|f| f.sync)
                .unwrap_or(SyncKind::None)
        }

        fn voice_frame(&self, slot: TimeSlot) -> &[i16] {
            self.script
                .get(self.current())
                .map(|f| f.voice[slot.index()].as_slice())
                .unwrap_or(&[])
        }

        fn clear_voice(&mut self, slot: TimeSlot) {
            let idx = self.current();
            if let Some(frame) = self.script.get_mut(idx) {
                frame.voice[slot.index()].clear();
            }
        }

        fn set_protocols(&mut self, _protocols: ProtocolSet) {}
    }

    #[test]
    fn analog_passthrough_round_trips_the_frame() {
        let mut state = SessionState::new(&test_config(), Box::new(StubDecoder::new()));
        state.set_agc(false);
        state.set_manual_gain(1.0);
        state.set_passthrough(true);

        let input: Vec<f32> = (0..480).map(|i| (i as f32 / 480.0) - 0.5).collect();
        let mut output = vec![0.0f32; 480];
        state.process_frame(&input, &mut output);

        assert_eq!(output, input);
        assert_eq!(
            state.snapshot(SessionStatus::Running).status,
            "ANALOG MONITOR (NFM)"
        );
    }

    #[test]
    fn passthrough_off_produces_silence_and_searching() {
        let mut state = SessionState::new(&test_config(), Box::new(StubDecoder::new()));
        state.set_agc(false);
        state.set_manual_gain(1.0);

        let input = vec![0.25f32; 480];
        let mut output = vec![1.0f32; 480];
        state.process_frame(&input, &mut output);

        assert!(output.iter().all(|&s| s == 0.0));
        assert_eq!(state.snapshot(SessionStatus::Running).status, "Searching...");
    }

    #[test]
    fn polarity_invert_flips_the_passthrough_signal() {
        let mut state = SessionState::new(&test_config(), Box::new(StubDecoder::new()));
        state.set_agc(false);
        state.set_manual_gain(1.0);
        state.set_passthrough(true);
        state.set_polarity_invert(true);

        let input = vec![0.5f32; 64];
        let mut output = vec![0.0f32; 64];
        state.process_frame(&input, &mut output);

        assert!(output.iter().all(|&s| (s + 0.5).abs() < 1e-6));
    }

    #[test]
    fn voice_burst_mutes_analog_and_plays_interpolated_audio() {
        let frame_len = 64;
        let script = vec![ScriptFrame {
            sync: Some(SyncKind::DmrVoice),
            // 11 decoded samples × 6 sub-samples fill most of the 64-sample
            // playback frame with non-silence.
            voice: [vec![5_000; 11], vec![]],
        }];
        let decoder = ScriptedDecoder::new(frame_len, script);

        let mut state = SessionState::new(&test_config(), Box::new(decoder));
        state.set_agc(false);
        state.set_manual_gain(1.0);
        state.set_passthrough(true);

        let input = vec![0.5f32; frame_len];
        let mut output = vec![0.0f32; frame_len];
        state.process_frame(&input, &mut output);

        let snap = state.snapshot(SessionStatus::Running);
        assert_eq!(snap.status, "DECODING VOICE!");
        assert_eq!(snap.active_slot, "SLOT 1 / CH 1");
        // 66 interpolated samples were queued; the frame drained 64 of them,
        // none of which are the raw analog 0.5s.
        assert!(output.iter().any(|&s| s != 0.0));
        assert!(output.iter().all(|&s| (s - 0.5).abs() > 1e-2));
    }

    #[test]
    fn manual_gain_rejected_while_agc_enabled() {
        let mut state = SessionState::new(&test_config(), Box::new(StubDecoder::new()));
        assert!(state.settings().agc);
        state.set_manual_gain(7.0);
        // The follower's default applied gain is untouched.
        assert!((state.snapshot(SessionStatus::Idle).input_gain - 1.0).abs() < 1e-6);
    }

    #[test]
    fn scope_fills_with_decimated_samples_and_drains_once() {
        let mut cfg = test_config();
        cfg.scope_capacity = 10;
        cfg.scope_stride = 20;
        let mut state = SessionState::new(&cfg, Box::new(StubDecoder::new()));
        state.set_agc(false);
        state.set_manual_gain(1.0);

        let input = vec![0.1f32; 400];
        let mut output = vec![0.0f32; 400];
        state.process_frame(&input, &mut output);

        let scope = state.take_scope();
        assert_eq!(scope.len(), 10, "400 samples / stride 20 = 20, capped at 10");
        assert!(state.take_scope().is_empty());
    }
}
