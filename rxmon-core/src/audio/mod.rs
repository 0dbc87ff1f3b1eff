//! Duplex audio via the cpal backend.
//!
//! # Design constraints
//!
//! Both cpal callbacks run on OS audio threads at elevated priority. They
//! **must not**:
//! - Allocate heap memory (scratch buffers reach their working size on the
//!   first callback and are reused)
//! - Block on a mutex or condvar (the session mutex is only ever
//!   `try_lock`ed here; contention degrades to one silent frame)
//! - Perform I/O or logging
//!
//! cpal exposes separate input and output streams rather than one duplex
//! callback, so the bridge works like this: the input callback mixes capture
//! down to mono f32 and pushes it into a wait-free SPSC ring; the output
//! callback pops the matching number of capture samples (zero-filling any
//! shortfall), runs the whole per-frame pipeline, and fans the mono result
//! out to the device's channel count. Both devices are opened at the same
//! requested rate, so the pairing needs no rate conversion.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). `DuplexAudio` must be created and dropped on the same thread; the
//! engine does both inside one `spawn_blocking` closure.

pub mod device;

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, StreamConfig,
};

#[cfg(feature = "audio-cpal")]
use crate::buffering::{create_capture_ring, Consumer, Producer};
use crate::{
    engine::SessionState,
    error::{Result, RxmonError},
};

use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
#[cfg(feature = "audio-cpal")]
use tracing::{error, info, warn};

/// Handle to an active duplex stream pair.
///
/// **Not `Send`** — both streams are bound to their creation thread on
/// Windows/macOS. Create and drop this type on the same OS thread.
pub struct DuplexAudio {
    /// Kept alive so the capture stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _input: Stream,
    /// Kept alive so the playback stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _output: Stream,
    /// Shared flag — set to `false` to make both callbacks no-op.
    running: Arc<AtomicBool>,
    /// Sample rate both streams were opened at (Hz).
    pub sample_rate: u32,
}

impl DuplexAudio {
    /// Open capture + playback by preferred name, otherwise fall back to the
    /// default device and then the first available one, on each side.
    ///
    /// Both streams are requested at `sample_rate`; a device that cannot run
    /// it fails the open (reported as a stream error — the caller treats it
    /// as a session-start failure).
    #[cfg(feature = "audio-cpal")]
    pub fn open_with_preference(
        session: Arc<Mutex<SessionState>>,
        running: Arc<AtomicBool>,
        sample_rate: u32,
        preferred_input: Option<&str>,
        preferred_output: Option<&str>,
    ) -> Result<Self> {
        use cpal::traits::HostTrait;

        let host = cpal::default_host();

        // ── Resolve capture device ───────────────────────────────────────
        let mut input_device = None;
        if let Some(name) = preferred_input {
            match host.input_devices() {
                Ok(mut devices) => {
                    input_device =
                        devices.find(|d| d.name().map(|n| n == name).unwrap_or(false));
                    if input_device.is_none() {
                        warn!("preferred input device '{name}' not found, falling back");
                    }
                }
                Err(e) => warn!("failed to list input devices while resolving preference: {e}"),
            }
        }
        let input_device = match input_device.or_else(|| host.default_input_device()) {
            Some(d) => d,
            None => {
                let mut devices = host
                    .input_devices()
                    .map_err(|e| RxmonError::AudioDevice(e.to_string()))?;
                let fallback = devices.next().ok_or(RxmonError::NoDefaultInputDevice)?;
                warn!("no default input device, falling back to first available input");
                fallback
            }
        };

        // ── Resolve playback device ──────────────────────────────────────
        let mut output_device = None;
        if let Some(name) = preferred_output {
            match host.output_devices() {
                Ok(mut devices) => {
                    output_device =
                        devices.find(|d| d.name().map(|n| n == name).unwrap_or(false));
                    if output_device.is_none() {
                        warn!("preferred output device '{name}' not found, falling back");
                    }
                }
                Err(e) => warn!("failed to list output devices while resolving preference: {e}"),
            }
        }
        let output_device = match output_device.or_else(|| host.default_output_device()) {
            Some(d) => d,
            None => {
                let mut devices = host
                    .output_devices()
                    .map_err(|e| RxmonError::AudioDevice(e.to_string()))?;
                let fallback = devices.next().ok_or(RxmonError::NoDefaultOutputDevice)?;
                warn!("no default output device, falling back to first available output");
                fallback
            }
        };

        info!(
            input = input_device.name().unwrap_or_default().as_str(),
            output = output_device.name().unwrap_or_default().as_str(),
            sample_rate,
            "opening duplex devices"
        );

        let (producer, consumer) = create_capture_ring();

        let input_stream = build_input_stream(
            &input_device,
            sample_rate,
            producer,
            Arc::clone(&running),
        )?;
        let output_stream = build_output_stream(
            &output_device,
            sample_rate,
            consumer,
            session,
            Arc::clone(&running),
        )?;

        input_stream
            .play()
            .map_err(|e| RxmonError::AudioStream(e.to_string()))?;
        output_stream
            .play()
            .map_err(|e| RxmonError::AudioStream(e.to_string()))?;

        Ok(Self {
            _input: input_stream,
            _output: output_stream,
            running,
            sample_rate,
        })
    }

    /// Stop: signal both callbacks to no-op on their next invocation.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Build the capture stream: mix down to mono f32 and push into the SPSC
/// transport. Overflow drops the newest samples silently — the output side
/// treats missing capture as silence, which is the monitor's stated
/// degradation mode.
#[cfg(feature = "audio-cpal")]
fn build_input_stream(
    device: &cpal::Device,
    sample_rate: u32,
    mut producer: crate::buffering::CaptureProducer,
    running: Arc<AtomicBool>,
) -> Result<Stream> {
    let supported = device
        .default_input_config()
        .map_err(|e| RxmonError::AudioDevice(e.to_string()))?;
    let channels = supported.channels();
    let config = StreamConfig {
        channels,
        sample_rate: SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };
    let ch = channels as usize;

    let stream = match supported.sample_format() {
        SampleFormat::F32 => {
            let mut mix_buf: Vec<f32> = Vec::new();
            device.build_input_stream(
                &config,
                move |data: &[f32], _info| {
                    if !running.load(Ordering::Relaxed) {
                        return;
                    }
                    if ch == 1 {
                        producer.push_slice(data);
                        return;
                    }
                    let frames = data.len() / ch;
                    mix_buf.resize(frames, 0.0);
                    for f in 0..frames {
                        let base = f * ch;
                        let mut sum = 0f32;
                        for c in 0..ch {
                            sum += data[base + c];
                        }
                        mix_buf[f] = sum / ch as f32;
                    }
                    producer.push_slice(&mix_buf);
                },
                |err| error!("capture stream error: {err}"),
                None,
            )
        }

        SampleFormat::I16 => {
            let mut mix_buf: Vec<f32> = Vec::new();
            device.build_input_stream(
                &config,
                move |data: &[i16], _info| {
                    if !running.load(Ordering::Relaxed) {
                        return;
                    }
                    let frames = data.len() / ch;
                    mix_buf.resize(frames, 0.0);
                    if ch == 1 {
                        for (idx, sample) in data.iter().take(frames).enumerate() {
                            mix_buf[idx] = *sample as f32 / 32768.0;
                        }
                    } else {
                        for f in 0..frames {
                            let base = f * ch;
                            let mut sum = 0f32;
                            for c in 0..ch {
                                sum += data[base + c] as f32 / 32768.0;
                            }
                            mix_buf[f] = sum / ch as f32;
                        }
                    }
                    producer.push_slice(&mix_buf);
                },
                |err| error!("capture stream error: {err}"),
                None,
            )
        }

        SampleFormat::U8 => {
            let mut mix_buf: Vec<f32> = Vec::new();
            device.build_input_stream(
                &config,
                move |data: &[u8], _info| {
                    if !running.load(Ordering::Relaxed) {
                        return;
                    }
                    let frames = data.len() / ch;
                    mix_buf.resize(frames, 0.0);
                    if ch == 1 {
                        for (idx, sample) in data.iter().take(frames).enumerate() {
                            mix_buf[idx] = (*sample as f32 - 128.0) / 128.0;
                        }
                    } else {
                        for f in 0..frames {
                            let base = f * ch;
                            let mut sum = 0f32;
                            for c in 0..ch {
                                sum += (data[base + c] as f32 - 128.0) / 128.0;
                            }
                            mix_buf[f] = sum / ch as f32;
                        }
                    }
                    producer.push_slice(&mix_buf);
                },
                |err| error!("capture stream error: {err}"),
                None,
            )
        }

        fmt => {
            return Err(RxmonError::AudioStream(format!(
                "unsupported capture sample format: {fmt:?}"
            )))
        }
    }
    .map_err(|e| RxmonError::AudioStream(e.to_string()))?;

    Ok(stream)
}

/// Build the playback stream: pop the matching capture samples, run the
/// per-frame pipeline under a non-blocking lock, fan mono out to the
/// device's channels. On lock contention the frame is pure silence — a
/// missed device deadline would be worse.
#[cfg(feature = "audio-cpal")]
fn build_output_stream(
    device: &cpal::Device,
    sample_rate: u32,
    mut consumer: crate::buffering::CaptureConsumer,
    session: Arc<Mutex<SessionState>>,
    running: Arc<AtomicBool>,
) -> Result<Stream> {
    let supported = device
        .default_output_config()
        .map_err(|e| RxmonError::AudioDevice(e.to_string()))?;
    let channels = supported.channels();
    let config = StreamConfig {
        channels,
        sample_rate: SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };
    let ch = channels as usize;

    let stream = match supported.sample_format() {
        SampleFormat::F32 => {
            let mut capture_buf: Vec<f32> = Vec::new();
            let mut render_buf: Vec<f32> = Vec::new();
            device.build_output_stream(
                &config,
                move |data: &mut [f32], _info| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    let frames = data.len() / ch;
                    capture_buf.resize(frames, 0.0);
                    render_buf.resize(frames, 0.0);

                    let popped = consumer.pop_slice(&mut capture_buf[..frames]);
                    capture_buf[popped..frames].fill(0.0);

                    match session.try_lock() {
                        Some(mut state) => {
                            state.process_frame(&capture_buf[..frames], &mut render_buf[..frames]);
                        }
                        None => {
                            // Contended by the control thread: one silent
                            // frame instead of a missed deadline.
                            data.fill(0.0);
                            return;
                        }
                    }

                    for f in 0..frames {
                        let base = f * ch;
                        for c in 0..ch {
                            data[base + c] = render_buf[f];
                        }
                    }
                },
                |err| error!("playback stream error: {err}"),
                None,
            )
        }

        SampleFormat::I16 => {
            let mut capture_buf: Vec<f32> = Vec::new();
            let mut render_buf: Vec<f32> = Vec::new();
            device.build_output_stream(
                &config,
                move |data: &mut [i16], _info| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0);
                        return;
                    }
                    let frames = data.len() / ch;
                    capture_buf.resize(frames, 0.0);
                    render_buf.resize(frames, 0.0);

                    let popped = consumer.pop_slice(&mut capture_buf[..frames]);
                    capture_buf[popped..frames].fill(0.0);

                    match session.try_lock() {
                        Some(mut state) => {
                            state.process_frame(&capture_buf[..frames], &mut render_buf[..frames]);
                        }
                        None => {
                            data.fill(0);
                            return;
                        }
                    }

                    for f in 0..frames {
                        let sample = (render_buf[f].clamp(-1.0, 1.0) * 32767.0) as i16;
                        let base = f * ch;
                        for c in 0..ch {
                            data[base + c] = sample;
                        }
                    }
                },
                |err| error!("playback stream error: {err}"),
                None,
            )
        }

        fmt => {
            return Err(RxmonError::AudioStream(format!(
                "unsupported playback sample format: {fmt:?}"
            )))
        }
    }
    .map_err(|e| RxmonError::AudioStream(e.to_string()))?;

    Ok(stream)
}

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl DuplexAudio {
    pub fn open_with_preference(
        _session: Arc<Mutex<SessionState>>,
        _running: Arc<AtomicBool>,
        _sample_rate: u32,
        _preferred_input: Option<&str>,
        _preferred_output: Option<&str>,
    ) -> Result<Self> {
        Err(RxmonError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }
}
