//! Digital/analog precedence arbitration.
//!
//! A small state machine evaluated exactly once per audio callback, after
//! the frame has been fed to the decoder. The states are derived from two
//! countdown counters rather than an explicit enum:
//!
//! - `precedence_timer` — armed to `sync_hold` callbacks by *any* digital
//!   frame sync (data or voice, any protocol). While non-zero, analog
//!   passthrough is forbidden. This is the debounce that stops marginal
//!   signals flapping between analog and digital; data bursts arm it too,
//!   since they often precede voice.
//! - `status_hold` — armed to `voice_hold` callbacks by a decoded voice
//!   burst. While non-zero the "decoding" status and active slot stay
//!   visible, bridging the short gaps inside a transmission.
//!
//! Evaluation order matters: sync is observed before the passthrough
//! decision, and the voice hold outranks the sync hold, so a trailing voice
//! tail is never interrupted by a searching flicker.

use std::fmt;

use crate::decoder::{SyncKind, TimeSlot};

/// Default precedence hold: ~300 ms of analog muting after the last sync.
pub const DEFAULT_SYNC_HOLD: u32 = 20;

/// Default status hold after the last decoded voice burst.
pub const DEFAULT_VOICE_HOLD: u32 = 30;

/// What the decoder front-end is currently doing, for display.
///
/// The display string is derived from this state; nothing stores formatted
/// text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderStatus {
    /// Session created, nothing heard yet.
    Waiting,
    /// Voice frames are being decoded (or were, within the hold window).
    DecodingVoice,
    /// Digital sync seen recently; analog muted while waiting for voice.
    SyncHold(SyncKind),
    /// No digital activity; raw input is being played through.
    AnalogMonitor,
    /// No digital activity and passthrough is off.
    Searching,
}

impl fmt::Display for DecoderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderStatus::Waiting => f.write_str("WAITING"),
            DecoderStatus::DecodingVoice => f.write_str("DECODING VOICE!"),
            DecoderStatus::SyncHold(sync) => {
                write!(f, "SYNC: {} (Muting Analog)", sync.protocol_label())
            }
            DecoderStatus::AnalogMonitor => f.write_str("ANALOG MONITOR (NFM)"),
            DecoderStatus::Searching => f.write_str("Searching..."),
        }
    }
}

/// Per-callback digital/analog arbiter.
pub struct PrecedenceArbiter {
    sync_hold: u32,
    voice_hold: u32,
    /// Callbacks until analog passthrough is permitted again.
    precedence_timer: u32,
    /// Callbacks until the voice status stops being shown.
    status_hold: u32,
    status: DecoderStatus,
    active_slot: Option<TimeSlot>,
}

impl PrecedenceArbiter {
    pub fn new(sync_hold: u32, voice_hold: u32) -> Self {
        Self {
            sync_hold,
            voice_hold,
            precedence_timer: 0,
            status_hold: 0,
            status: DecoderStatus::Waiting,
            active_slot: None,
        }
    }

    /// Step 1: fold the decoder's sync classification into the precedence
    /// timer. Call once per callback, before any passthrough decision.
    pub fn observe_sync(&mut self, sync: SyncKind) {
        if sync.is_some() {
            self.precedence_timer = self.sync_hold;
        } else {
            self.precedence_timer = self.precedence_timer.saturating_sub(1);
        }
    }

    /// Step 2: a decoded voice burst arrived on `slot` this callback.
    pub fn voice_active(&mut self, slot: TimeSlot) {
        self.active_slot = Some(slot);
        self.status = DecoderStatus::DecodingVoice;
        self.status_hold = self.voice_hold;
    }

    /// Step 3: close out the callback. Returns whether analog passthrough is
    /// permitted *this* callback.
    ///
    /// Priority: decoded voice > voice hold > sync hold > analog/searching.
    pub fn settle(&mut self, got_voice: bool, sync: SyncKind, passthrough_enabled: bool) -> bool {
        if got_voice {
            // Digital voice owned this callback; counters were armed above.
            return false;
        }
        if self.status_hold > 0 {
            self.status_hold -= 1;
            if self.status_hold > 0 {
                // Keep the decoding status (and slot) visible through the gap.
                return false;
            }
            // Hold just drained: fall through and re-decide this callback.
        }
        if self.precedence_timer > 0 {
            self.active_slot = None;
            self.status = DecoderStatus::SyncHold(sync);
            return false;
        }
        self.active_slot = None;
        self.status = if passthrough_enabled {
            DecoderStatus::AnalogMonitor
        } else {
            DecoderStatus::Searching
        };
        true
    }

    pub fn status(&self) -> DecoderStatus {
        self.status
    }

    /// Display label of the slot currently carrying voice, `"--"` when none.
    pub fn active_slot_label(&self) -> &'static str {
        self.active_slot.map(TimeSlot::label).unwrap_or("--")
    }
}

impl Default for PrecedenceArbiter {
    fn default() -> Self {
        Self::new(DEFAULT_SYNC_HOLD, DEFAULT_VOICE_HOLD)
    }
}
