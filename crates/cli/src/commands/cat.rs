//! cat command - Write an object to stdout

use std::path::PathBuf;

use clap::Args;
use tokio::io::AsyncWriteExt;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Write an object to stdout
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Key to read
    pub key: String,

    /// Skip this many leading bytes
    #[arg(long, default_value = "0")]
    pub offset: u64,
}

/// Execute the cat command
pub async fn execute(args: CatArgs, config: Option<PathBuf>, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let store = match super::open_store(config, &formatter).await {
        Ok(store) => store,
        Err(code) => return code,
    };

    let reader = if args.offset > 0 {
        store.retrieve_from(&args.key, args.offset).await
    } else {
        store.retrieve(&args.key).await
    };
    let mut reader = match reader {
        Ok(reader) => reader,
        Err(e) => return super::fail(&formatter, "Failed to read", &e),
    };

    let mut stdout = tokio::io::stdout();
    let copied = async {
        tokio::io::copy(&mut reader, &mut stdout).await?;
        stdout.flush().await
    };
    match copied.await {
        Ok(()) => ExitCode::Success,
        // Reader closed the pipe early
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => ExitCode::Success,
        Err(e) => {
            formatter.error(&format!("Failed to read {}: {e}", args.key));
            ExitCode::NetworkError
        }
    }
}
