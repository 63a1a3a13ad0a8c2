//! Line-based pad control for the live host
//!
//! Each stdin line is one action. A mode id or name behaves like pressing
//! that pad; `0` or `release` lets go.

use glitch_core::glitch::UnknownMode;
use glitch_core::GlitchMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Press(GlitchMode),
    Release,
    Status,
    Help,
    Quit,
}

/// Parse one input line; blank lines yield `None`
pub fn parse_line(line: &str) -> Result<Option<Control>, UnknownMode> {
    let line = line.trim();
    let control = match line.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "q" | "quit" | "exit" => Control::Quit,
        "r" | "release" => Control::Release,
        "s" | "status" => Control::Status,
        "?" | "h" | "help" => Control::Help,
        _ => match line.parse::<GlitchMode>()? {
            GlitchMode::Clean => Control::Release,
            mode => Control::Press(mode),
        },
    };
    Ok(Some(control))
}

/// Mode table shown by `modes` and the live `help` command
pub fn mode_table() -> String {
    let mut table = String::new();
    for mode in GlitchMode::ALL {
        table.push_str(&format!(
            "  {:>2}  {:<16} {:<18} {}\n",
            mode.index(),
            mode.display_name(),
            mode.slug(),
            mode.color()
        ));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_presses() {
        assert_eq!(
            parse_line("3").unwrap(),
            Some(Control::Press(GlitchMode::StutterEighth))
        );
        assert_eq!(
            parse_line("  tape-stop ").unwrap(),
            Some(Control::Press(GlitchMode::TapeStop))
        );
        assert_eq!(
            parse_line("BACKSPIN").unwrap(),
            Some(Control::Press(GlitchMode::Backspin))
        );
    }

    #[test]
    fn test_clean_releases() {
        assert_eq!(parse_line("0").unwrap(), Some(Control::Release));
        assert_eq!(parse_line("release").unwrap(), Some(Control::Release));
        assert_eq!(parse_line("clean").unwrap(), Some(Control::Release));
    }

    #[test]
    fn test_commands_and_errors() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("q").unwrap(), Some(Control::Quit));
        assert_eq!(parse_line("status").unwrap(), Some(Control::Status));
        assert_eq!(parse_line("?").unwrap(), Some(Control::Help));
        assert!(parse_line("12").is_err());
        assert!(parse_line("wobble").is_err());
    }

    #[test]
    fn test_mode_table_lists_every_mode() {
        let table = mode_table();
        assert_eq!(table.lines().count(), 12);
        assert!(table.contains("TAPE STOP"));
    }
}
