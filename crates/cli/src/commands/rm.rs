//! rm command - Delete keys
//!
//! Deleting a directory removes only its marker. Keys below it stay unless `-r` is given.

use std::path::PathBuf;

use clap::Args;
use cosn_core::{ListMode, NativeStore};
use futures::StreamExt;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Delete keys
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Keys to delete
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Delete every key under each given prefix
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    deleted: Vec<String>,
}

/// Every key under `prefix`, followed by `prefix` itself
async fn collect_keys(store: &NativeStore, prefix: &str) -> cosn_core::Result<Vec<String>> {
    let prefix = cosn_core::key::with_trailing_delimiter(prefix);
    let mut keys = Vec::new();
    {
        let mut pages = std::pin::pin!(store.list_pages(&prefix, ListMode::Flat, 1000));
        while let Some(page) = pages.next().await {
            keys.extend(page?.files.into_iter().map(|meta| meta.key));
        }
    }
    keys.push(prefix);
    Ok(keys)
}

/// Execute the rm command
pub async fn execute(args: RmArgs, config: Option<PathBuf>, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let store = match super::open_store(config, &formatter).await {
        Ok(store) => store,
        Err(code) => return code,
    };

    let mut deleted = Vec::new();
    for key in &args.keys {
        let targets = if args.recursive {
            match collect_keys(&store, key).await {
                Ok(keys) => keys,
                Err(e) => return super::fail(&formatter, "Failed to list", &e),
            }
        } else {
            vec![key.clone()]
        };

        for target in targets {
            if let Err(e) = store.delete(&target).await {
                return super::fail(&formatter, "Failed to delete", &e);
            }
            formatter.success(&format!("Removed {}", formatter.style_location(&target)));
            deleted.push(target);
        }
    }

    if formatter.is_json() {
        formatter.json(&RmOutput { deleted });
    }
    ExitCode::Success
}
