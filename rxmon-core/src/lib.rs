//! # rxmon-core
//!
//! Audio engine for a mixed analog/digital radio monitor.
//!
//! ## Architecture
//!
//! ```text
//! Capture device → cpal input callback → SPSC ring
//!                                           │
//!                              cpal output callback (try_lock session)
//!                                           │
//!                         AGC/polarity → VoiceDecoder::feed
//!                                           │
//!                         PrecedenceArbiter (digital vs. analog)
//!                              │                        │
//!                    VoiceInterpolator           analog passthrough
//!                              └──────► PlayoutBuffer ◄─┘
//!                                           │
//!                                    playback frame
//! ```
//!
//! All per-frame work runs to completion inside the output callback: no
//! blocking, no allocation after warm-up, bounded by the frame size. The
//! control surface (settings, status snapshot, scope) shares one mutex with
//! the callback; the callback side only ever `try_lock`s it and plays a
//! silent frame when contended.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod arbiter;
pub mod audio;
pub mod buffering;
pub mod decoder;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod scope;

// Convenience re-exports for downstream crates
pub use arbiter::{DecoderStatus, PrecedenceArbiter};
pub use decoder::{stub::StubDecoder, ProtocolSet, SyncKind, TimeSlot, VoiceDecoder};
pub use engine::{MonitorConfig, MonitorEngine, MonitorSettings};
pub use error::RxmonError;
pub use ipc::events::{MonitorSnapshot, SessionStatus, SessionStatusEvent};
