//! # Output Configuration
//!
//! Progress and diagnostics are reported through the `log` facade and printed
//! to stderr by `env_logger`. This module sets the logger up from the CLI
//! flags and the environment.
//!
//! ## Respecting User Preferences
//!
//! - `--log-level` sets the default level; `RUST_LOG` refines or overrides it.
//! - `--color=never|always|auto` controls colored level labels.
//! - In auto mode `NO_COLOR`, `CLICOLOR=0` and `TERM=dumb` disable colors,
//!   `CLICOLOR_FORCE=1` forces them, and otherwise stderr must be a terminal.

use std::env;

use env_logger::WriteStyle;
use log::LevelFilter;

/// Output configuration for controlling colors.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether log output should be colored.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is the value of `--color`: "always", "never", or "auto".
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // https://no-color.org/: presence alone disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        // Logs go to stderr, so that is the stream to probe
        console::Term::stderr().features().colors_supported()
    }

    fn write_style(&self) -> WriteStyle {
        if self.use_color {
            WriteStyle::Always
        } else {
            WriteStyle::Never
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Build the stderr logger for `level`, letting `rust_log` (the value of
/// `RUST_LOG`) refine it.
pub fn logger(level: LevelFilter, output: &OutputConfig, rust_log: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .write_style(output.write_style())
        .format_target(false)
        .format_timestamp(None);
    if let Some(filters) = rust_log.filter(|f| !f.trim().is_empty()) {
        builder.parse_filters(filters);
    }
    builder
}

/// Install the global logger. Calling this more than once is harmless.
pub fn init_logging(level: LevelFilter, output: &OutputConfig) {
    let rust_log = env::var("RUST_LOG").ok();
    // A second initialisation only happens in tests; keep the first logger.
    let _ = logger(level, output, rust_log.as_deref()).try_init();
}
