//! put command - Upload a local file
//!
//! The file's MD5 is computed locally first and sent with the upload, so the store rejects
//! content that changed on the way.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use cosn_core::checksum::file_md5;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, format_size};

/// Upload a local file
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file to upload
    pub local: PathBuf,

    /// Destination key; a trailing `/` uploads into that directory under the file's name
    pub key: String,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    key: String,
    local: String,
    size_bytes: u64,
    md5: String,
}

/// Resolve the destination key for `local`
fn destination_key(key: &str, local: &Path) -> Option<String> {
    if key.ends_with('/') {
        let name = local.file_name()?.to_str()?;
        Some(format!("{key}{name}"))
    } else {
        Some(key.to_string())
    }
}

fn spinner(formatter: &Formatter, message: String) -> Option<ProgressBar> {
    if formatter.is_json() || formatter.is_quiet() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")
    {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Execute the put command
pub async fn execute(args: PutArgs, config: Option<PathBuf>, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let Some(key) = destination_key(&args.key, &args.local) else {
        formatter.error(&format!("Cannot derive a key from {}", args.local.display()));
        return ExitCode::UsageError;
    };

    let size = match tokio::fs::metadata(&args.local).await {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => {
            formatter.error(&format!("{} is not a regular file", args.local.display()));
            return ExitCode::UsageError;
        }
        Err(e) => {
            formatter.error(&format!("Cannot read {}: {e}", args.local.display()));
            return ExitCode::NotFound;
        }
    };

    let store = match super::open_store(config, &formatter).await {
        Ok(store) => store,
        Err(code) => return code,
    };

    let digest = match file_md5(&args.local).await {
        Ok(digest) => digest,
        Err(e) => return super::fail(&formatter, "Failed to checksum", &e),
    };

    let pb = spinner(&formatter, format!("Uploading {} ({})", key, format_size(size)));
    let result = store.store_file(&key, &args.local, &digest).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if let Err(e) = result {
        return super::fail(&formatter, "Failed to upload", &e);
    }

    let output = PutOutput {
        local: args.local.display().to_string(),
        size_bytes: size,
        md5: hex::encode(digest),
        key,
    };
    formatter.report(&output, || {
        format!(
            "{} -> {} ({})",
            output.local,
            formatter.style_location(&output.key),
            formatter.style_size(&format_size(size))
        )
    });
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_key() {
        let local = Path::new("/tmp/report.csv");
        assert_eq!(destination_key("/data/", local).unwrap(), "/data/report.csv");
        assert_eq!(destination_key("/data/r.csv", local).unwrap(), "/data/r.csv");
        assert!(destination_key("/data/", Path::new("/")).is_none());
    }

    #[test]
    fn test_spinner_hidden_in_json_mode() {
        let formatter = Formatter::new(OutputConfig {
            json: true,
            ..Default::default()
        });
        assert!(spinner(&formatter, "x".into()).is_none());
    }
}
