//! Offline replay: feed a WAV capture through the monitor pipeline frame by
//! frame and report what the arbitration/AGC chain did with it.
//!
//! Useful for tuning against recorded discriminator audio without touching
//! a sound device. Runs the stub decoder, so digital frames never decode —
//! the interesting outputs are gain convergence, passthrough behaviour and
//! status transitions.

fn main() {
    if let Err(e) = run() {
        eprintln!("replay failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    use rxmon_core::engine::{MonitorConfig, SessionState};
    use rxmon_core::ipc::events::SessionStatus;
    use rxmon_core::StubDecoder;
    use serde::Serialize;
    use std::path::{Path, PathBuf};

    #[derive(Debug)]
    struct Args {
        wav: PathBuf,
        frame_size: usize,
        passthrough: bool,
        agc: bool,
        gain: f32,
        invert: bool,
        output: Option<PathBuf>,
    }

    #[derive(Debug, Clone, Serialize)]
    struct StatusChange {
        frame: usize,
        status: String,
    }

    #[derive(Debug, Clone, Serialize)]
    struct Report {
        file: String,
        sample_rate: u32,
        frame_size: usize,
        frames: usize,
        duration_secs: f64,
        final_gain: f32,
        final_peak: f32,
        /// Fraction of playback frames containing any non-zero sample.
        nonsilent_output_ratio: f64,
        status_transitions: Vec<StatusChange>,
    }

    fn parse_args() -> Result<Args, String> {
        let mut wav: Option<PathBuf> = None;
        let mut frame_size = 960usize; // 20 ms at 48 kHz
        let mut passthrough = false;
        let mut agc = true;
        let mut gain = 1.0f32;
        let mut invert = false;
        let mut output: Option<PathBuf> = None;

        let mut it = std::env::args().skip(1);
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--wav" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --wav".into());
                    };
                    wav = Some(PathBuf::from(v));
                }
                "--frame-size" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --frame-size".into());
                    };
                    frame_size = v
                        .parse::<usize>()
                        .map_err(|_| "invalid value for --frame-size".to_string())?
                        .clamp(64, 48_000);
                }
                "--passthrough" => passthrough = true,
                "--no-agc" => agc = false,
                "--gain" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --gain".into());
                    };
                    gain = v
                        .parse::<f32>()
                        .map_err(|_| "invalid value for --gain".to_string())?;
                }
                "--invert" => invert = true,
                "--output" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --output".into());
                    };
                    output = Some(PathBuf::from(v));
                }
                "--help" | "-h" => {
                    println!(
                        "Usage: cargo run -p rxmon-core --bin replay -- \\
  --wav <file.wav> [--frame-size <n>] [--passthrough] [--no-agc] \\
  [--gain <g>] [--invert] [--output <report.json>]"
                    );
                    std::process::exit(0);
                }
                other => return Err(format!("unknown argument: {other}")),
            }
        }

        let wav = wav.ok_or("missing required --wav <file>")?;
        Ok(Args {
            wav,
            frame_size,
            passthrough,
            agc,
            gain,
            invert,
            output,
        })
    }

    fn read_wav_mono_f32(path: &Path) -> Result<(Vec<f32>, u32), String> {
        let mut reader = hound::WavReader::open(path).map_err(|e| e.to_string())?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.map_err(|e| e.to_string()))
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                if spec.bits_per_sample <= 16 {
                    reader
                        .samples::<i16>()
                        .map(|s| {
                            s.map(|v| (v as f32) / (i16::MAX as f32))
                                .map_err(|e| e.to_string())
                        })
                        .collect::<Result<Vec<_>, _>>()?
                } else {
                    let max = ((1_i64 << (spec.bits_per_sample - 1)) - 1) as f32;
                    reader
                        .samples::<i32>()
                        .map(|s| s.map(|v| (v as f32) / max).map_err(|e| e.to_string()))
                        .collect::<Result<Vec<_>, _>>()?
                }
            }
        };

        if channels == 1 {
            return Ok((interleaved, spec.sample_rate));
        }

        let mut mono = Vec::with_capacity(interleaved.len() / channels);
        for frame in interleaved.chunks(channels) {
            let sum = frame.iter().copied().sum::<f32>();
            mono.push(sum / channels as f32);
        }
        Ok((mono, spec.sample_rate))
    }

    let args = parse_args()?;
    let (samples, sample_rate) = read_wav_mono_f32(&args.wav)?;
    if samples.is_empty() {
        return Err(format!("no samples in {}", args.wav.display()));
    }

    let mut state = SessionState::new(&MonitorConfig::default(), Box::new(StubDecoder::new()));
    state.set_passthrough(args.passthrough);
    state.set_agc(args.agc);
    if !args.agc {
        state.set_manual_gain(args.gain);
    }
    state.set_polarity_invert(args.invert);

    let mut output_frame = vec![0.0f32; args.frame_size];
    let mut frames = 0usize;
    let mut nonsilent_frames = 0usize;
    let mut status_transitions: Vec<StatusChange> = Vec::new();
    let mut last_status = String::new();

    for frame in samples.chunks(args.frame_size) {
        // The pipeline expects full device periods; pad the WAV tail.
        let input: Vec<f32> = if frame.len() == args.frame_size {
            frame.to_vec()
        } else {
            let mut padded = frame.to_vec();
            padded.resize(args.frame_size, 0.0);
            padded
        };

        state.process_frame(&input, &mut output_frame);
        frames += 1;

        if output_frame.iter().any(|&s| s != 0.0) {
            nonsilent_frames += 1;
        }

        let status = state.snapshot(SessionStatus::Running).status;
        if status != last_status {
            status_transitions.push(StatusChange {
                frame: frames - 1,
                status: status.clone(),
            });
            last_status = status;
        }
    }

    let snap = state.snapshot(SessionStatus::Running);
    let report = Report {
        file: args.wav.display().to_string(),
        sample_rate,
        frame_size: args.frame_size,
        frames,
        duration_secs: samples.len() as f64 / sample_rate as f64,
        final_gain: snap.input_gain,
        final_peak: snap.input_peak,
        nonsilent_output_ratio: if frames == 0 {
            0.0
        } else {
            nonsilent_frames as f64 / frames as f64
        },
        status_transitions,
    };

    println!(
        "Replayed {} frames ({:.1} s) — final gain {:.2}x, {} status transitions",
        report.frames,
        report.duration_secs,
        report.final_gain,
        report.status_transitions.len()
    );

    let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
    if let Some(out) = args.output {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(&out, json).map_err(|e| e.to_string())?;
        println!("Wrote replay report: {}", out.display());
    } else {
        println!("{json}");
    }

    Ok(())
}
