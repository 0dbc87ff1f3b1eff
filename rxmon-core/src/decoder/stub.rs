//! `StubDecoder` — placeholder backend with no digital decoding.
//!
//! Never reports sync and never produces voice, so a session built on it
//! behaves as a pure analog monitor (or shows `Searching...` with
//! passthrough off). Lets the full pipeline, control surface and replay
//! tool run without linking a protocol decoder.

use tracing::debug;

use crate::decoder::{ProtocolSet, SyncKind, TimeSlot, VoiceDecoder};

/// Inert decoder backend.
pub struct StubDecoder {
    protocols: ProtocolSet,
    samples_fed: u64,
}

impl StubDecoder {
    pub fn new() -> Self {
        Self {
            protocols: ProtocolSet::default(),
            samples_fed: 0,
        }
    }

    /// Total samples consumed since construction.
    pub fn samples_fed(&self) -> u64 {
        self.samples_fed
    }
}

impl Default for StubDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceDecoder for StubDecoder {
    fn feed(&mut self, _sample: i16) {
        self.samples_fed += 1;
    }

    fn sync(&self) -> SyncKind {
        SyncKind::None
    }

    fn voice_frame(&self, _slot: TimeSlot) -> &[i16] {
        &[]
    }

    fn clear_voice(&mut self, _slot: TimeSlot) {}

    fn set_protocols(&mut self, protocols: ProtocolSet) {
        debug!(?protocols, "StubDecoder::set_protocols — stored, unused");
        self.protocols = protocols;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_counts_samples_and_stays_silent() {
        let mut dec = StubDecoder::new();
        for s in 0..480i16 {
            dec.feed(s);
        }
        assert_eq!(dec.samples_fed(), 480);
        assert_eq!(dec.sync(), SyncKind::None);
        assert!(dec.voice_frame(TimeSlot::Slot1).is_empty());
        assert!(dec.voice_frame(TimeSlot::Slot2).is_empty());
    }
}
