//! Digital voice decoder abstraction.
//!
//! The `VoiceDecoder` trait is the seam between the audio pipeline and
//! whatever decodes the digital protocols (DMR, NXDN, dPMR, P25). The
//! pipeline only ever pushes conditioned i16 samples in and pulls sync
//! classification + decoded voice bursts out; symbol recovery, FEC and
//! vocoder internals all live behind this trait.
//!
//! `&mut self` on `feed` intentionally expresses that decoders are stateful
//! (symbol clocks, frame assemblers). All mutation is serialised through the
//! session mutex that owns the `Box<dyn VoiceDecoder>`.

pub mod stub;

pub use stub::StubDecoder;

use serde::{Deserialize, Serialize};

/// Frame synchronisation currently reported by the decoder.
///
/// A closed set: concrete decoder backends map their native sync variants
/// onto these. `OtherData` covers any recognised-but-unmapped sync pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    /// No frame sync detected.
    None,
    /// DMR data burst sync (base station or mobile).
    DmrData,
    /// DMR voice burst sync.
    DmrVoice,
    /// NXDN sync, either polarity.
    Nxdn,
    /// P25 Phase 1 sync.
    P25,
    /// dPMR sync.
    Dpmr,
    /// Some other recognised digital sync.
    OtherData,
}

impl SyncKind {
    /// True when any digital frame sync is present.
    pub fn is_some(self) -> bool {
        self != SyncKind::None
    }

    /// Short protocol name used in status lines ("DATA" for unmapped kinds).
    pub fn protocol_label(self) -> &'static str {
        match self {
            SyncKind::DmrData | SyncKind::DmrVoice => "DMR",
            SyncKind::Nxdn => "NXDN",
            SyncKind::P25 => "P25",
            SyncKind::Dpmr => "dPMR",
            SyncKind::None | SyncKind::OtherData => "DATA",
        }
    }
}

/// One of the decoder's independent voice output channels.
///
/// Two-slot protocols (DMR) use both; single-channel protocols only ever
/// produce on `Slot1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSlot {
    Slot1,
    Slot2,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 2] = [TimeSlot::Slot1, TimeSlot::Slot2];

    /// Display label for the activity readout.
    pub fn label(self) -> &'static str {
        match self {
            TimeSlot::Slot1 => "SLOT 1 / CH 1",
            TimeSlot::Slot2 => "SLOT 2",
        }
    }

    /// Dense index for per-slot state arrays.
    pub fn index(self) -> usize {
        match self {
            TimeSlot::Slot1 => 0,
            TimeSlot::Slot2 => 1,
        }
    }
}

/// Which digital protocols the decoder should hunt for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSet {
    pub dmr: bool,
    pub nxdn: bool,
    pub dpmr: bool,
    pub p25: bool,
}

impl Default for ProtocolSet {
    /// DMR-only, matching the monitor's stock configuration.
    fn default() -> Self {
        Self {
            dmr: true,
            nxdn: false,
            dpmr: false,
            p25: false,
        }
    }
}

impl ProtocolSet {
    pub fn none_enabled(&self) -> bool {
        !(self.dmr || self.nxdn || self.dpmr || self.p25)
    }
}

/// Contract for digital voice decoder backends.
///
/// The pipeline drives it strictly per audio callback: `feed` once per
/// conditioned input sample, then one read of `sync()`, then for each slot a
/// `voice_frame` read followed by `clear_voice` once the burst has been
/// consumed. A burst stays readable until explicitly cleared so a contended
/// callback never loses audio.
pub trait VoiceDecoder: Send + 'static {
    /// Push one conditioned input sample (decoder-native i16 domain).
    fn feed(&mut self, sample: i16);

    /// Current frame-sync classification.
    fn sync(&self) -> SyncKind;

    /// Decoded voice samples pending on `slot`; empty when there are none.
    ///
    /// The returned burst is 16-bit vocoder output at the decoder's native
    /// rate, not yet normalised or rate-matched.
    fn voice_frame(&self, slot: TimeSlot) -> &[i16];

    /// Acknowledge the pending burst on `slot` so it is not re-read.
    fn clear_voice(&mut self, slot: TimeSlot);

    /// Reconfigure which protocols are hunted. Takes effect on the next
    /// `feed`; an in-flight frame may still complete under the old set.
    fn set_protocols(&mut self, protocols: ProtocolSet);
}
