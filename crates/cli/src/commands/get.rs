//! get command - Download an object, or one block of it, to a local file

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, format_size};

/// Download an object to a local file
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Key to download
    pub key: String,

    /// Local destination file
    pub local: PathBuf,

    /// First byte of the block to fetch
    #[arg(long, requires = "length")]
    pub offset: Option<u64>,

    /// Block size in bytes; the block is clamped to the end of the object
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub length: Option<u64>,
}

#[derive(Debug, Serialize)]
struct GetOutput {
    key: String,
    local: String,
    size_bytes: u64,
}

fn prepare_destination(local: &Path) -> anyhow::Result<()> {
    if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    Ok(())
}

/// Execute the get command
pub async fn execute(args: GetArgs, config: Option<PathBuf>, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    if let Err(e) = prepare_destination(&args.local) {
        formatter.error(&format!("{e:#}"));
        return ExitCode::GeneralError;
    }

    let store = match super::open_store(config, &formatter).await {
        Ok(store) => store,
        Err(code) => return code,
    };

    let result = match args.length {
        Some(length) => {
            let offset = args.offset.unwrap_or(0);
            store
                .retrieve_block(&args.key, offset, length, &args.local)
                .await
                .map(drop)
        }
        None => download(&store, &args.key, &args.local).await,
    };
    if let Err(e) = result {
        return super::fail(&formatter, "Failed to download", &e);
    }

    let size = tokio::fs::metadata(&args.local)
        .await
        .map(|m| m.len())
        .unwrap_or(0);
    let output = GetOutput {
        key: args.key,
        local: args.local.display().to_string(),
        size_bytes: size,
    };
    formatter.report(&output, || {
        format!(
            "{} -> {} ({})",
            formatter.style_location(&output.key),
            output.local,
            formatter.style_size(&format_size(size))
        )
    });
    ExitCode::Success
}

async fn download(store: &cosn_core::NativeStore, key: &str, local: &Path) -> cosn_core::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut reader = store.retrieve(key).await?;
    let mut file = tokio::fs::File::create(local).await?;
    tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::commands::{Cli, Commands};

    #[test]
    fn test_offset_requires_length() {
        assert!(Cli::try_parse_from(["cosn", "get", "/a", "out", "--offset", "4"]).is_err());

        let cli =
            Cli::try_parse_from(["cosn", "get", "/a", "out", "--offset", "4", "--length", "8"])
                .unwrap();
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.offset, Some(4));
                assert_eq!(args.length, Some(8));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_zero_length_rejected() {
        assert!(Cli::try_parse_from(["cosn", "get", "/a", "out", "--length", "0"]).is_err());
    }

    #[test]
    fn test_prepare_destination_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a").join("b").join("file");
        prepare_destination(&local).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
        prepare_destination(Path::new("file")).unwrap();
    }
}
