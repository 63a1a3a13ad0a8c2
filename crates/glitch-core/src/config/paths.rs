//! Standard locations for glitch configuration files

use std::path::PathBuf;

/// Name of the default config file
pub const CONFIG_FILENAME: &str = "config.yaml";

/// Directory holding glitch configuration
///
/// Returns: `<platform config dir>/glitch` (e.g. `~/.config/glitch` on Linux),
/// falling back to `./glitch` when the platform has no config directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glitch")
}

/// Default config file path: `<config dir>/glitch/config.yaml`
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILENAME)
}
