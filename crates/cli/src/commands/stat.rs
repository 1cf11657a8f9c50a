//! stat command - Resolve a key to a file, a directory or nothing

use std::fmt;
use std::path::PathBuf;

use clap::Args;
use cosn_core::FileMetadata;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, format_size, format_time};

/// Show metadata for a key
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Key to resolve; a trailing `/` asks for a directory
    pub key: String,
}

#[derive(Debug, Serialize)]
struct StatOutput {
    key: String,
    #[serde(rename = "type")]
    kind: &'static str,
    size_bytes: u64,
    size_human: String,
    last_modified: String,
}

impl From<FileMetadata> for StatOutput {
    fn from(meta: FileMetadata) -> Self {
        Self {
            kind: if meta.is_file { "file" } else { "directory" },
            size_human: format_size(meta.size),
            size_bytes: meta.size,
            last_modified: meta.mod_time.to_string(),
            key: meta.key,
        }
    }
}

impl fmt::Display for StatOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Key      : {}", self.key)?;
        writeln!(f, "Type     : {}", self.kind)?;
        writeln!(f, "Size     : {} ({} bytes)", self.size_human, self.size_bytes)?;
        write!(f, "Modified : {}", self.last_modified)
    }
}

/// Execute the stat command
pub async fn execute(
    args: StatArgs,
    config: Option<PathBuf>,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let store = match super::open_store(config, &formatter).await {
        Ok(store) => store,
        Err(code) => return code,
    };

    match store.retrieve_metadata(&args.key).await {
        Ok(Some(meta)) => {
            let modified = format_time(meta.mod_time);
            let mut output = StatOutput::from(meta);
            if !formatter.is_json() {
                output.last_modified = formatter.style_date(&modified);
            }
            formatter.output(&output);
            ExitCode::Success
        }
        Ok(None) => {
            formatter.error(&format!("{}: no such file or directory", args.key));
            ExitCode::NotFound
        }
        Err(e) => super::fail(&formatter, "Failed to stat", &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_output_file() {
        let meta = FileMetadata::file("/a/b.txt", 2048, jiff::Timestamp::from_second(60).ok());
        let output = StatOutput::from(meta);
        assert_eq!(output.kind, "file");
        assert_eq!(output.size_bytes, 2048);
        assert_eq!(output.size_human, "2 KiB");

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["last_modified"], "1970-01-01T00:01:00Z");
    }

    #[test]
    fn test_stat_output_directory() {
        let output = StatOutput::from(FileMetadata::directory("/a/", None));
        assert_eq!(output.kind, "directory");
        assert_eq!(output.size_bytes, 0);
        assert!(output.to_string().contains("Type     : directory"));
    }
}
