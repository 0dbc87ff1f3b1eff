//! Automatic gain control: decaying peak follower + smoothed makeup gain.
//!
//! ## Algorithm (per sample, auto mode)
//!
//! 1. Decay the peak estimate by `PEAK_DECAY`, then raise it to `|sample|`
//!    if larger — instant attack, slow release.
//! 2. If the peak is above `PEAK_FLOOR`, derive `target = HEADROOM / peak`
//!    and blend it into the applied gain at 5 % per sample, so the gain
//!    never jumps audibly.
//! 3. Scale the sample by the applied gain.
//!
//! The floor keeps near-silence from collapsing the peak estimate and
//! driving the gain unbounded. In manual mode the follower still tracks the
//! peak (level metering stays live) but the gain is whatever the control
//! surface last set.

/// Per-sample decay applied to the peak estimate (~70 ms half-life at 48 kHz).
const PEAK_DECAY: f32 = 0.999;

/// Peak level below which the gain stops adapting.
const PEAK_FLOOR: f32 = 0.001;

/// Target peak after gain — leaves headroom before the i16 conversion.
const HEADROOM: f32 = 0.8;

/// Smoothing: 95 % previous gain, 5 % new target, per sample.
const GAIN_SMOOTH: f32 = 0.95;

/// Peak-follower gain stage.
#[derive(Debug, Clone)]
pub struct GainControl {
    peak: f32,
    gain: f32,
}

impl GainControl {
    pub fn new() -> Self {
        // Peak starts slightly above the floor so the first samples of a
        // session do not see a huge transient gain target.
        Self {
            peak: 0.01,
            gain: 1.0,
        }
    }

    /// Condition one sample. `auto` selects adaptive gain; when false the
    /// manually-set gain is applied unchanged.
    #[inline]
    pub fn apply(&mut self, sample: f32, auto: bool) -> f32 {
        let abs = sample.abs();
        self.peak *= PEAK_DECAY;
        if abs > self.peak {
            self.peak = abs;
        }
        if auto && self.peak > PEAK_FLOOR {
            let target = HEADROOM / self.peak;
            self.gain = self.gain * GAIN_SMOOTH + target * (1.0 - GAIN_SMOOTH);
        }
        sample * self.gain
    }

    /// Currently applied multiplier.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Decaying peak estimate of the raw input, for level metering.
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Manual override; only meaningful while auto mode is off.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }
}

impl Default for GainControl {
    fn default() -> Self {
        Self::new()
    }
}
