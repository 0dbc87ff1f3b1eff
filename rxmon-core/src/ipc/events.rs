//! Display/control surface types.
//!
//! The display contract is poll-based: the hosting application calls
//! `MonitorEngine::snapshot()` / `take_scope()` at its own cadence and gets
//! a coherent view taken under the session lock. Only session lifecycle
//! transitions are pushed, over the status broadcast channel — those
//! originate on the control side, never inside the audio callback.

use serde::{Deserialize, Serialize};

use crate::engine::MonitorSettings;

/// Lifecycle state of the monitor session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Engine created, `start()` not yet called.
    Idle,
    /// Duplex stream open, callback pipeline active.
    Running,
    /// Stream closed; the engine may be restarted.
    Stopped,
    /// Device or stream failure — see the event detail.
    Error,
}

/// Pushed on the status broadcast channel when the session state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusEvent {
    pub status: SessionStatus,
    /// Optional human-readable detail (e.g. the device error).
    pub detail: Option<String>,
}

/// Point-in-time view of the monitor for the display side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    /// Session lifecycle state.
    pub session: SessionStatus,
    /// Decoder front-end status line (e.g. `DECODING VOICE!`).
    pub status: String,
    /// Label of the slot currently carrying voice, `--` when none.
    pub active_slot: String,
    /// Gain multiplier currently applied to the input.
    pub input_gain: f32,
    /// Decaying peak estimate of the raw input, for level metering.
    pub input_peak: f32,
    /// Current runtime settings, echoed for the control surface.
    pub settings: MonitorSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_with_camel_case_fields() {
        let snap = MonitorSnapshot {
            session: SessionStatus::Running,
            status: "ANALOG MONITOR (NFM)".into(),
            active_slot: "--".into(),
            input_gain: 2.5,
            input_peak: 0.31,
            settings: MonitorSettings::default(),
        };

        let json = serde_json::to_value(&snap).expect("serialize snapshot");
        assert_eq!(json["session"], "running");
        assert_eq!(json["status"], "ANALOG MONITOR (NFM)");
        assert_eq!(json["activeSlot"], "--");
        let gain = json["inputGain"].as_f64().expect("gain is a number");
        assert!((gain - 2.5).abs() < 1e-6);
        assert_eq!(json["settings"]["protocols"]["dmr"], true);

        let round_trip: MonitorSnapshot =
            serde_json::from_value(json).expect("deserialize snapshot");
        assert_eq!(round_trip.session, SessionStatus::Running);
        assert_eq!(round_trip.active_slot, "--");
    }

    #[test]
    fn status_event_serializes_with_lowercase_status() {
        let event = SessionStatusEvent {
            status: SessionStatus::Error,
            detail: Some("no default input device found".into()),
        };

        let json = serde_json::to_value(&event).expect("serialize status event");
        assert_eq!(json["status"], "error");
        assert_eq!(json["detail"], "no default input device found");

        let round_trip: SessionStatusEvent =
            serde_json::from_value(json).expect("deserialize status event");
        assert_eq!(round_trip.status, SessionStatus::Error);
    }

    #[test]
    fn session_status_rejects_non_lowercase_values() {
        let err = serde_json::from_str::<SessionStatus>(r#""Running""#);
        assert!(err.is_err(), "expected invalid casing to fail");
    }
}
