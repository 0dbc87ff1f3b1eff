//! Sub-sample smoothing interpolator for decoded voice bursts.
//!
//! Decoded voice arrives in sparse bursts at the vocoder's native rate, well
//! below the playback rate. Zero-order hold produces audible stair-stepping,
//! so each decoded sample becomes `UPSAMPLE` sub-samples linearly ramping
//! from the previous emitted value — smoothing the waveform and performing
//! the rate match in one pass, with no filter state.
//!
//! Ramp continuity is tracked per slot: interleaved bursts from the two
//! voice channels never corrupt each other's starting point.

use crate::buffering::playout::PlayoutBuffer;
use crate::decoder::TimeSlot;

/// Sub-samples emitted per decoded sample.
const UPSAMPLE: usize = 6;

/// Makeup gain applied to vocoder output before clipping; vocoder frames
/// come out quiet relative to full-scale.
const MAKEUP_GAIN: f32 = 3.5;

/// Per-slot linear ramp interpolator.
#[derive(Debug, Clone)]
pub struct VoiceInterpolator {
    /// Most recently emitted (post-interpolation) sample per slot, in [-1, 1].
    last: [f32; 2],
}

impl VoiceInterpolator {
    pub fn new() -> Self {
        Self { last: [0.0; 2] }
    }

    /// Normalise `burst`, ramp each sample from the slot's carried value and
    /// write every sub-sample into `out`. Allocation-free.
    pub fn smooth_into(&mut self, slot: TimeSlot, burst: &[i16], out: &mut PlayoutBuffer) {
        let last = &mut self.last[slot.index()];
        for &raw in burst {
            let target = (raw as f32 / 32_768.0 * MAKEUP_GAIN).clamp(-1.0, 1.0);
            for step in 1..=UPSAMPLE {
                let t = step as f32 / UPSAMPLE as f32;
                out.push(*last + (target - *last) * t);
            }
            *last = target;
        }
    }
}

impl Default for VoiceInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn drain(out: &mut PlayoutBuffer) -> Vec<f32> {
        let mut v = vec![0.0; out.available()];
        out.read_into(&mut v);
        v
    }

    #[test]
    fn ramp_from_zero_to_full_scale_is_exact_sixths() {
        let mut interp = VoiceInterpolator::new();
        let mut out = PlayoutBuffer::new(64);

        // 32767/32768 × 3.5 clips to exactly 1.0.
        interp.smooth_into(TimeSlot::Slot1, &[32_767], &mut out);

        let emitted = drain(&mut out);
        assert_eq!(emitted.len(), 6);
        for (i, &s) in emitted.iter().enumerate() {
            assert_relative_eq!(s, (i + 1) as f32 / 6.0, max_relative = 1e-6);
        }
    }

    #[test]
    fn ramp_carries_across_calls() {
        let mut interp = VoiceInterpolator::new();
        let mut out = PlayoutBuffer::new(64);

        interp.smooth_into(TimeSlot::Slot1, &[32_767], &mut out);
        drain(&mut out);

        // Next burst ramps down from the carried 1.0, not from zero.
        interp.smooth_into(TimeSlot::Slot1, &[0], &mut out);
        let emitted = drain(&mut out);
        assert_eq!(emitted.len(), 6);
        assert_relative_eq!(emitted[0], 5.0 / 6.0, max_relative = 1e-6);
        assert_relative_eq!(emitted[5], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn slots_keep_independent_ramp_state() {
        let mut interp = VoiceInterpolator::new();
        let mut out = PlayoutBuffer::new(128);

        interp.smooth_into(TimeSlot::Slot1, &[32_767], &mut out);
        drain(&mut out);

        // Slot 2 has never emitted: its ramp still starts from zero.
        interp.smooth_into(TimeSlot::Slot2, &[32_767], &mut out);
        let emitted = drain(&mut out);
        assert_relative_eq!(emitted[0], 1.0 / 6.0, max_relative = 1e-6);
    }

    #[test]
    fn makeup_gain_hard_clips_to_unit_range() {
        let mut interp = VoiceInterpolator::new();
        let mut out = PlayoutBuffer::new(256);

        interp.smooth_into(TimeSlot::Slot1, &[i16::MAX, i16::MIN, 20_000, -20_000], &mut out);
        for s in drain(&mut out) {
            assert!((-1.0..=1.0).contains(&s), "sample escaped clip range: {s}");
        }
    }

    #[test]
    fn each_decoded_sample_expands_to_upsample_outputs() {
        let mut interp = VoiceInterpolator::new();
        let mut out = PlayoutBuffer::new(256);

        interp.smooth_into(TimeSlot::Slot1, &[100, 200, 300, 400], &mut out);
        assert_eq!(out.available(), 4 * 6);
    }
}
