//! PiControl: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │  SimulatedHardware   CurlHttp / CommandAudio   LogEventSink  │
//! │  (HardwarePort)      (HttpPort / AudioPort)    (EventSink)   │
//! │                                                              │
//! │  ────────────────── Port Trait Boundary ──────────────────   │
//! │                                                              │
//! │   ┌──────────────────────────────────────────────────────┐   │
//! │   │  Panel: inputs · action table · outputs · polling    │   │
//! │   └──────────────────────────────────────────────────────┘   │
//! │                                                              │
//! │  Console (stdin) drives the simulated lines                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};
use tracing_subscriber::filter::LevelFilter;

use picontrol::adapters::simulated_ports;
use picontrol::adapters::sim::SimulatedHardware;
use picontrol::app::panel::Panel;
use picontrol::app::ports::Rotation;
use picontrol::config::PanelConfig;
use picontrol::device::Device;

/// Syslog-style level used when no `-v` is given (warning).
const DEFAULT_LOG_LEVEL: u8 = 4;

#[derive(Debug, Parser)]
#[command(name = "picontrol", version, about = "Configuration-driven control panel")]
struct Cli {
    /// Panel configuration (YAML).
    #[arg(default_value = "/opt/control/control.yml")]
    config: PathBuf,

    /// Panel name used in logs and events.
    #[arg(long, default_value = "panel")]
    name: String,

    /// Log HTTP requests and sounds instead of running curl / players.
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Raise verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Map a syslog-style level (0 emerg … 7 debug) to a filter.
fn level_filter(level: u8) -> LevelFilter {
    match level {
        0..=3 => LevelFilter::ERROR,
        4 => LevelFilter::WARN,
        5 | 6 => LevelFilter::INFO,
        7 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = DEFAULT_LOG_LEVEL.saturating_add(cli.verbose);
    tracing_subscriber::fmt()
        .with_max_level(level_filter(level))
        .with_target(true)
        .init();

    info!("PiControl v{}", env!("CARGO_PKG_VERSION"));

    let config = PanelConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let hardware = Arc::new(SimulatedHardware::new());
    let ports = simulated_ports(Arc::clone(&hardware), cli.dry_run);
    let panel = Panel::new(&cli.name, &config, &ports).context("building panel")?;
    panel.start().context("starting panel")?;

    let result = console(&panel, &hardware);
    panel.shutdown();
    result
}

/// Read commands from stdin until `quit` or end of input.
fn console(panel: &Panel, hardware: &SimulatedHardware) -> Result<()> {
    println!("commands: press PIN | release PIN | cw PIN | ccw PIN | adc CHIP CHANNEL VALUE | status | quit");
    for line in std::io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => {}
            ["quit" | "exit"] => break,
            ["status"] => print_status(panel),
            [cmd, args @ ..] => {
                if let Err(e) = run(hardware, cmd, args) {
                    warn!("{}", e);
                    println!("error: {e}");
                }
            }
        }
    }
    Ok(())
}

fn run(hardware: &SimulatedHardware, cmd: &str, args: &[&str]) -> Result<()> {
    let known = match (cmd, args) {
        ("press", [pin]) => hardware.press(pin.parse().context("pin")?),
        ("release", [pin]) => hardware.release(pin.parse().context("pin")?),
        ("cw", [pin]) => hardware.rotate(pin.parse().context("pin")?, Rotation::Clockwise),
        ("ccw", [pin]) => hardware.rotate(pin.parse().context("pin")?, Rotation::CounterClockwise),
        ("adc", [chip, channel, value]) => {
            let value: f32 = value.parse().context("value")?;
            hardware.set_analog(chip, channel.parse().context("channel")?, value);
            true
        }
        _ => bail!("unrecognised command '{cmd}'"),
    };
    if !known {
        bail!("no device is attached to that pin");
    }
    Ok(())
}

fn print_status(panel: &Panel) {
    for device in panel.devices() {
        let state = device.state();
        println!(
            "{:<20} {:<16} status={:<10} value={}",
            device.name(),
            device.kind().as_str(),
            state.last_status.as_ref().map_or("-", |s| s.as_str()),
            state.last_value.map_or_else(|| "-".to_owned(), |v| format!("{v:.2}"))
        );
    }
}
