//! Glitch Player - live and offline front end for the glitch engine
//!
//! - `live` (default): capture → glitch engine → playback, pads driven from stdin
//! - `render`: run a WAV file through the engine with a timed pad schedule
//! - `modes` / `devices`: print the mode table or the audio devices
//!
//! Set RUST_LOG=debug for verbose output.

mod cli;
mod control;

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Command, LiveArgs, RenderArgs};
use control::{mode_table, parse_line, Control};
use glitch_core::audio::{self, AudioConfig, BufferSize, DeviceId, Direction};
use glitch_core::config::{self, GlitchConfig};
use glitch_core::render::{self, ModeSchedule};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run() {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);

    match cli.into_command() {
        Command::Modes => {
            print!("{}", mode_table());
            Ok(())
        }
        Command::Devices => {
            print_devices();
            Ok(())
        }
        Command::Render(args) => {
            let config: GlitchConfig = config::load_config(&config_path);
            run_render(&args, &config)
        }
        Command::Live(options) => {
            let config: GlitchConfig = config::load_config(&config_path);
            run_live(&options, &config)
        }
    }
}

fn run_render(args: &RenderArgs, config: &GlitchConfig) -> Result<()> {
    let (input, output) = (args.input.as_path(), args.output.as_path());
    let schedule = ModeSchedule::parse(args.events.as_slice())?;
    log::info!(
        "Rendering {:?} -> {:?} with {} event(s)",
        input,
        output,
        schedule.events().len()
    );

    let summary = render::render_file(input, output, &schedule, &config.engine)
        .with_context(|| format!("Failed to render {:?}", input))?;

    println!(
        "Wrote {} frames at {}Hz ({:.2}s, peak {:.3}, {} event(s) applied)",
        summary.frames,
        summary.sample_rate,
        summary.frames as f64 / summary.sample_rate as f64,
        summary.peak,
        summary.events_applied
    );
    Ok(())
}

/// Merge command line overrides into the configured audio settings
fn audio_config(options: &LiveArgs, config: &GlitchConfig) -> AudioConfig {
    let mut audio = config.audio.clone();
    if let Some(name) = &options.input {
        audio.input_device = Some(DeviceId::new(name.as_str()));
    }
    if let Some(name) = &options.output {
        audio.output_device = Some(DeviceId::new(name.as_str()));
    }
    if let Some(frames) = options.buffer {
        audio.buffer_size = BufferSize::Fixed(frames);
    }
    audio
}

fn run_live(options: &LiveArgs, config: &GlitchConfig) -> Result<()> {
    let audio_settings = audio_config(options, config);
    let result = audio::start_audio_system(&audio_settings, &config.engine)
        .context("Could not start the live audio host")?;
    let pads = result.mode_handle;

    println!(
        "Live: {}Hz, {} frames (~{:.1}ms round trip)",
        result.sample_rate, result.buffer_size, result.latency_ms
    );
    println!("Type a mode id or name to hold it, 0 to release, s for status, q to quit.");
    print!("{}", mode_table());

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let control = match parse_line(&line) {
            Ok(Some(control)) => control,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match control {
            Control::Press(mode) => {
                pads.press(mode);
                println!("> {}", mode);
            }
            Control::Release => {
                pads.release();
                println!("> {}", glitch_core::GlitchMode::Clean);
            }
            Control::Status => println!(
                "active: {}, requested: {}, freeze: {}, write: {}, underruns: {}",
                pads.active_mode(),
                pads.requested_mode(),
                pads.freeze_point(),
                pads.write_pos(),
                result.handle.underruns()
            ),
            Control::Help => print!("{}", mode_table()),
            Control::Quit => break,
        }
        std::io::stdout().flush().ok();
    }

    pads.release();
    log::info!("glitch-player: shutting down");
    Ok(())
}

fn print_devices() {
    for direction in [Direction::Input, Direction::Output] {
        println!("{:?} devices:", direction);
        match audio::get_devices(direction) {
            Ok(devices) => {
                for device in devices {
                    println!(
                        "  {} ({} ch, {:?})",
                        device, device.max_channels, device.sample_rates
                    );
                }
            }
            Err(e) => println!("  {}", e),
        }
    }
}
