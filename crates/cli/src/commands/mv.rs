//! mv command - Rename an object
//!
//! The store has no rename, so this copies then deletes. When only the copy succeeds both keys
//! remain, and the command exits with [`ExitCode::Conflict`].

use std::path::PathBuf;

use clap::Args;
use cosn_core::Error;

use super::cp::TransferOutput;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Rename an object
#[derive(Args, Debug)]
pub struct MvArgs {
    pub src: String,
    pub dst: String,
}

/// Execute the mv command
pub async fn execute(args: MvArgs, config: Option<PathBuf>, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let store = match super::open_store(config, &formatter).await {
        Ok(store) => store,
        Err(code) => return code,
    };

    match store.rename(&args.src, &args.dst).await {
        Ok(()) => {}
        Err(e @ Error::PartialRename { .. }) => {
            formatter.error(&e.to_string());
            formatter.warning(&format!("Remove {} manually once the cause is fixed", args.src));
            return ExitCode::from_error(&e);
        }
        Err(e) => return super::fail(&formatter, "Failed to rename", &e),
    }

    let output = TransferOutput {
        src: args.src,
        dst: args.dst,
    };
    formatter.report(&output, || {
        format!(
            "{} -> {}",
            formatter.style_location(&output.src),
            formatter.style_location(&output.dst)
        )
    });
    ExitCode::Success
}
