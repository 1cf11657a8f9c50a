//! cp command - Server-side copy within the bucket

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Copy an object
#[derive(Args, Debug)]
pub struct CpArgs {
    pub src: String,
    pub dst: String,
}

#[derive(Debug, Serialize)]
pub(super) struct TransferOutput {
    pub src: String,
    pub dst: String,
}

/// Execute the cp command
pub async fn execute(args: CpArgs, config: Option<PathBuf>, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let store = match super::open_store(config, &formatter).await {
        Ok(store) => store,
        Err(code) => return code,
    };

    if let Err(e) = store.copy(&args.src, &args.dst).await {
        return super::fail(&formatter, "Failed to copy", &e);
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
