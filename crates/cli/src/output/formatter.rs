//! Command output
//!
//! Each `cosn` command ends in one result record. With `--json` the record is written to stdout
//! as a single compact JSON line, so runs can be appended to a log and read back line by line;
//! otherwise a short status line is shown instead. Diagnostics always go to stderr, as
//! `{"error": ...}` lines in JSON mode. `--quiet` silences the human lines; a JSON record is
//! still written, since asking for it is explicit.
//!
//! A closed stdout (`cosn ls | head`) ends output quietly rather than aborting the process.

use std::fmt::Display;
use std::io::{self, Write};

use console::Style;
use serde::Serialize;

use super::OutputConfig;

/// Styles for the parts of a line that carry meaning
#[derive(Debug, Clone)]
struct Theme {
    dir: Style,
    size: Style,
    date: Style,
    location: Style,
    success: Style,
    error: Style,
    warning: Style,
}

impl Theme {
    fn colored() -> Self {
        Self {
            dir: Style::new().blue().bold(),
            size: Style::new().green(),
            date: Style::new().dim(),
            location: Style::new().cyan(),
            success: Style::new().green(),
            error: Style::new().red(),
            warning: Style::new().yellow(),
        }
    }

    fn plain() -> Self {
        Self {
            dir: Style::new(),
            size: Style::new(),
            date: Style::new(),
            location: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warning: Style::new(),
        }
    }
}

/// Writes command results and diagnostics according to the global output flags
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
    theme: Theme,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        let theme = if config.no_color || config.json {
            Theme::plain()
        } else {
            Theme::colored()
        };
        Self { config, theme }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    pub fn is_quiet(&self) -> bool {
        self.config.quiet
    }

    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    pub fn style_dir(&self, text: &str) -> String {
        self.theme.dir.apply_to(text).to_string()
    }

    pub fn style_size(&self, text: &str) -> String {
        self.theme.size.apply_to(text).to_string()
    }

    pub fn style_date(&self, text: &str) -> String {
        self.theme.date.apply_to(text).to_string()
    }

    /// Style an object key or `cosn://` location
    pub fn style_location(&self, text: &str) -> String {
        self.theme.location.apply_to(text).to_string()
    }

    /// Report a command's result: the record itself in JSON mode, `message` otherwise.
    ///
    /// `message` is only built when it is shown.
    pub fn report<T, F>(&self, record: &T, message: F)
    where
        T: Serialize,
        F: FnOnce() -> String,
    {
        if let Some(line) = self.render_report(record, message) {
            write_stdout(&line);
        }
    }

    /// Show a record through its `Display` form, or as JSON in JSON mode
    pub fn output<T: Serialize + Display>(&self, record: &T) {
        if self.config.json {
            self.json(record);
        } else {
            self.line(&record.to_string());
        }
    }

    /// Show one item's progress line; nothing in JSON mode, where only the final record counts
    pub fn success(&self, message: &str) {
        if self.config.json {
            return;
        }
        self.line(&format!("{} {message}", self.theme.success.apply_to("✓")));
    }

    /// Write a record as one JSON line
    pub fn json<T: Serialize>(&self, record: &T) {
        match serde_json::to_string(record) {
            Ok(json) => write_stdout(&json),
            Err(e) => self.error(&format!("Cannot encode result: {e}")),
        }
    }

    /// Write preformatted text such as a table; silenced by `--quiet`
    pub fn line(&self, text: &str) {
        if !self.config.quiet {
            write_stdout(text);
        }
    }

    /// Errors are shown even in quiet mode
    pub fn error(&self, message: &str) {
        write_stderr(&self.render_error(message));
    }

    pub fn warning(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        write_stderr(&format!("{} {message}", self.theme.warning.apply_to("!")));
    }

    fn render_report<T, F>(&self, record: &T, message: F) -> Option<String>
    where
        T: Serialize,
        F: FnOnce() -> String,
    {
        if self.config.json {
            match serde_json::to_string(record) {
                Ok(json) => Some(json),
                Err(e) => {
                    self.error(&format!("Cannot encode result: {e}"));
                    None
                }
            }
        } else if self.config.quiet {
            None
        } else {
            Some(format!("{} {}", self.theme.success.apply_to("✓"), message()))
        }
    }

    fn render_error(&self, message: &str) -> String {
        if self.config.json {
            serde_json::json!({ "error": message }).to_string()
        } else {
            format!("{} {message}", self.theme.error.apply_to("✗"))
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}

fn write_stdout(text: &str) {
    write_line(&mut io::stdout().lock(), text);
}

fn write_stderr(text: &str) {
    write_line(&mut io::stderr().lock(), text);
}

// A reader that went away (broken pipe) is not worth reporting; nothing else can be shown either
fn write_line(out: &mut impl Write, text: &str) {
    if let Err(e) = writeln!(out, "{text}").and_then(|()| out.flush())
        && e.kind() != io::ErrorKind::BrokenPipe
    {
        tracing::debug!(error = %e, "Writing output failed");
    }
}
