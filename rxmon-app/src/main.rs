//! rxmon — headless monitor shell.
//!
//! Wires the monitor engine to the terminal: device listing, session
//! start/stop, runtime toggles from the command line, and a status line
//! whenever the decoder front-end changes state. A GUI (or any other host)
//! would sit on exactly the same engine surface.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rxmon_core::audio::device::{list_input_devices, list_output_devices};
use rxmon_core::{MonitorConfig, MonitorEngine, ProtocolSet, StubDecoder};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Args {
    list_devices: bool,
    input: Option<String>,
    output: Option<String>,
    passthrough: bool,
    agc: bool,
    gain: f32,
    invert: bool,
    protocols: ProtocolSet,
}

fn parse_protocols(list: &str) -> Result<ProtocolSet> {
    let mut protocols = ProtocolSet {
        dmr: false,
        nxdn: false,
        dpmr: false,
        p25: false,
    };
    for name in list.split(',').filter(|s| !s.is_empty()) {
        match name.to_ascii_lowercase().as_str() {
            "dmr" => protocols.dmr = true,
            "nxdn" => protocols.nxdn = true,
            "dpmr" => protocols.dpmr = true,
            "p25" => protocols.p25 = true,
            other => bail!("unknown protocol: {other} (expected dmr, nxdn, dpmr, p25)"),
        }
    }
    if protocols.none_enabled() {
        bail!("--protocols selected nothing");
    }
    Ok(protocols)
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        list_devices: false,
        input: None,
        output: None,
        passthrough: false,
        agc: true,
        gain: 1.0,
        invert: false,
        protocols: ProtocolSet::default(),
    };

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--list-devices" => args.list_devices = true,
            "--input" => args.input = Some(it.next().context("missing value for --input")?),
            "--output" => args.output = Some(it.next().context("missing value for --output")?),
            "--passthrough" => args.passthrough = true,
            "--no-agc" => args.agc = false,
            "--gain" => {
                let v = it.next().context("missing value for --gain")?;
                args.gain = v.parse().context("invalid value for --gain")?;
            }
            "--invert" => args.invert = true,
            "--protocols" => {
                let v = it.next().context("missing value for --protocols")?;
                args.protocols = parse_protocols(&v)?;
            }
            "--help" | "-h" => {
                println!(
                    "Usage: rxmon [--list-devices] [--input <name>] [--output <name>] \\
  [--passthrough] [--no-agc] [--gain <g>] [--invert] [--protocols dmr,nxdn,dpmr,p25]"
                );
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn print_devices() {
    println!("Capture devices:");
    for d in list_input_devices() {
        println!("  {}{}", d.name, if d.is_default { "  (default)" } else { "" });
    }
    println!("Playback devices:");
    for d in list_output_devices() {
        println!("  {}{}", d.name, if d.is_default { "  (default)" } else { "" });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args()?;

    if args.list_devices {
        print_devices();
        return Ok(());
    }

    // The stub backend decodes nothing; drop in any `VoiceDecoder`
    // implementation here to hunt the digital protocols for real.
    let engine = Arc::new(MonitorEngine::new(
        MonitorConfig::default(),
        Box::new(StubDecoder::new()),
    ));

    engine.set_passthrough(args.passthrough);
    engine.set_agc(args.agc);
    if !args.agc {
        engine.set_manual_gain(args.gain);
    }
    engine.set_polarity_invert(args.invert);
    engine.set_protocols(args.protocols);

    engine
        .start_with_devices(args.input.clone(), args.output.clone())
        .context("failed to start the monitor session")?;
    info!("monitoring — press Ctrl-C to stop");

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut last_line = String::new();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snap = engine.snapshot();
                let line = format!("{} | activity: {}", snap.status, snap.active_slot);
                if line != last_line {
                    info!(
                        gain = format_args!("{:.2}x", snap.input_gain),
                        peak = format_args!("{:.3}", snap.input_peak),
                        "{line}"
                    );
                    last_line = line;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    engine.stop().context("failed to stop the monitor session")?;
    info!("stopped");
    Ok(())
}
