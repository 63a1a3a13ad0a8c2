//! Glitch mode enumeration
//!
//! Twelve closed variants, identified on the control surface and in saved
//! state by their index (0 = Clean).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of glitch modes (including Clean)
pub const NUM_MODES: usize = 12;

/// Read-head trajectory selected by the performer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum GlitchMode {
    /// Pass-through: read head follows the write cursor
    #[default]
    Clean = 0,
    /// Repeat a one-beat window
    StutterHalf = 1,
    /// Repeat a half-beat window
    StutterQuarter = 2,
    /// Repeat a quarter-beat window
    StutterEighth = 3,
    /// Repeat an eighth-beat window
    StutterSixteenth = 4,
    /// Play backwards from the freeze point
    Reverse = 5,
    /// Loop one beat backwards
    ReverseLoop = 6,
    /// Half-speed playback from the freeze point
    SlowDown = 7,
    /// Decelerate to a stop over two beats, then mute
    TapeStop = 8,
    /// Fast reverse scratch repeating every half beat
    Backspin = 9,
    /// Live signal muted on every other eighth-beat step
    TranceGate = 10,
    /// Live signal jumping back a quarter beat in the second half of each half beat
    Shuffle = 11,
}

impl GlitchMode {
    /// All modes in index order
    pub const ALL: [GlitchMode; NUM_MODES] = [
        GlitchMode::Clean,
        GlitchMode::StutterHalf,
        GlitchMode::StutterQuarter,
        GlitchMode::StutterEighth,
        GlitchMode::StutterSixteenth,
        GlitchMode::Reverse,
        GlitchMode::ReverseLoop,
        GlitchMode::SlowDown,
        GlitchMode::TapeStop,
        GlitchMode::Backspin,
        GlitchMode::TranceGate,
        GlitchMode::Shuffle,
    ];

    /// Convert from index (0-11)
    pub fn from_index(idx: u8) -> Option<Self> {
        Self::ALL.get(idx as usize).copied()
    }

    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn is_clean(self) -> bool {
        self == GlitchMode::Clean
    }

    /// Label shown on the pad for this mode
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Clean => "CLEAN",
            Self::StutterHalf => "REPEAT 1/2",
            Self::StutterQuarter => "REPEAT 1/4",
            Self::StutterEighth => "REPEAT 1/8",
            Self::StutterSixteenth => "REPEAT 1/16",
            Self::Reverse => "REVERSE",
            Self::ReverseLoop => "REV LOOP",
            Self::SlowDown => "SLOW DOWN",
            Self::TapeStop => "TAPE STOP",
            Self::Backspin => "BACKSPIN",
            Self::TranceGate => "TRANCE GT",
            Self::Shuffle => "SHUFFLE",
        }
    }

    /// Pad indicator colour (hex RGB), grouped by effect family
    pub fn color(&self) -> &'static str {
        match self {
            Self::Clean => "#2ecc71",
            Self::StutterHalf
            | Self::StutterQuarter
            | Self::StutterEighth
            | Self::StutterSixteenth => "#00d2d3",
            Self::Reverse | Self::ReverseLoop => "#e67e22",
            Self::SlowDown | Self::TapeStop => "#ff9f43",
            Self::Backspin | Self::Shuffle => "#ff4757",
            Self::TranceGate => "#54a0ff",
        }
    }

    /// Machine name used in config files and on the command line
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::StutterHalf => "stutter-half",
            Self::StutterQuarter => "stutter-quarter",
            Self::StutterEighth => "stutter-eighth",
            Self::StutterSixteenth => "stutter-sixteenth",
            Self::Reverse => "reverse",
            Self::ReverseLoop => "reverse-loop",
            Self::SlowDown => "slow-down",
            Self::TapeStop => "tape-stop",
            Self::Backspin => "backspin",
            Self::TranceGate => "trance-gate",
            Self::Shuffle => "shuffle",
        }
    }
}

impl fmt::Display for GlitchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error returned when a mode name or index is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown glitch mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for GlitchMode {
    type Err = UnknownMode;

    /// Accepts an index ("3"), a slug ("tape-stop") or a pad label ("TAPE STOP")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(idx) = trimmed.parse::<u8>() {
            return Self::from_index(idx).ok_or_else(|| UnknownMode(s.to_string()));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|m| {
                m.slug().eq_ignore_ascii_case(trimmed)
                    || m.display_name().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}
