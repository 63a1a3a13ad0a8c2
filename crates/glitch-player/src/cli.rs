//! Command line interface
//!
//! ```text
//! glitch-player [--config PATH] [live] [--input NAME] [--output NAME] [--buffer FRAMES]
//! glitch-player [--config PATH] render IN.wav OUT.wav [SECONDS:MODE ...]
//! glitch-player modes
//! glitch-player devices
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Glitch Player - live and offline front end for the glitch engine
#[derive(Debug, Parser)]
#[command(name = "glitch-player")]
#[command(about = "Momentary stutter, reverse, tape-stop and gate effects over a live ring buffer")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to <config dir>/glitch/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Live options when no subcommand is given
    #[command(flatten)]
    pub live: LiveArgs,
}

impl Cli {
    /// The command to run; no subcommand means live
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Live(self.live))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the live host and drive pads from stdin (default)
    Live(LiveArgs),

    /// Render a WAV file through the engine with timed pad presses
    Render(RenderArgs),

    /// List the glitch modes
    Modes,

    /// List audio input and output devices
    Devices,
}

/// Device overrides for the live host
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct LiveArgs {
    /// Capture device name
    #[arg(short, long)]
    pub input: Option<String>,

    /// Playback device name
    #[arg(short, long)]
    pub output: Option<String>,

    /// Buffer size in frames
    #[arg(short, long)]
    pub buffer: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct RenderArgs {
    /// Source WAV file
    pub input: PathBuf,

    /// Destination WAV file (32-bit float stereo)
    pub output: PathBuf,

    /// Pad events as SECONDS:MODE, e.g. 1.5:tape-stop 3:0
    ///
    /// MODE is an id (0-11), a slug (stutter-half) or a pad label ("REPEAT 1/2").
    pub events: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("glitch-player").chain(args.iter().copied()))
    }

    #[test]
    fn test_no_args_is_live() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.config, None);
        assert_eq!(cli.into_command(), Command::Live(LiveArgs::default()));
    }

    #[test]
    fn test_live_options() {
        let cli = parse(&["live", "--input", "mic", "-o", "speakers", "--buffer", "256"]).unwrap();
        assert_eq!(
            cli.into_command(),
            Command::Live(LiveArgs {
                input: Some("mic".into()),
                output: Some("speakers".into()),
                buffer: Some(256),
            })
        );

        // Options without the subcommand imply live
        let cli = parse(&["--buffer", "128"]).unwrap();
        assert!(matches!(
            cli.into_command(),
            Command::Live(LiveArgs { buffer: Some(128), .. })
        ));

        assert!(parse(&["live", "--buffer", "lots"]).is_err());
        assert!(parse(&["live", "--input"]).is_err());
        assert!(parse(&["live", "--volume", "11"]).is_err());
    }

    #[test]
    fn test_render_args() {
        let cli = parse(&["--config", "/tmp/g.yaml", "render", "in.wav", "out.wav", "1:3", "2:0"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/g.yaml")));
        assert_eq!(
            cli.into_command(),
            Command::Render(RenderArgs {
                input: PathBuf::from("in.wav"),
                output: PathBuf::from("out.wav"),
                events: vec!["1:3".into(), "2:0".into()],
            })
        );

        assert!(parse(&["render", "in.wav"]).is_err());
    }

    #[test]
    fn test_config_is_accepted_after_the_subcommand() {
        let cli = parse(&["render", "in.wav", "out.wav", "-c", "/tmp/g.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/g.yaml")));
    }

    #[test]
    fn test_other_commands() {
        assert_eq!(parse(&["modes"]).unwrap().into_command(), Command::Modes);
        assert_eq!(parse(&["devices"]).unwrap().into_command(), Command::Devices);
        assert_eq!(
            parse(&["render", "-h"]).unwrap_err().kind(),
            ErrorKind::DisplayHelp
        );
        assert!(parse(&["dance"]).is_err());
    }
}
