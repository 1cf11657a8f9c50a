//! Output formatting
//!
//! Every command writes through a [`Formatter`] so that `--json`, `--quiet` and `--no-color`
//! behave the same everywhere.

mod formatter;

pub use formatter::Formatter;

/// Output settings taken from the global flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Emit strict JSON, without colors or progress
    pub json: bool,
    pub no_color: bool,
    /// Suppress everything except errors
    pub quiet: bool,
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Modification time as shown in listings
pub fn format_time(time: jiff::Timestamp) -> String {
    time.strftime("%Y-%m-%d %H:%M:%S").to_string()
}
