//! Command definitions
//!
//! Each subcommand lives in its own module with an `Args` struct and an `execute` function
//! returning the process exit code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cosn_core::{ConfigManager, NativeStore};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod cat;
mod completions;
mod cp;
mod get;
mod ls;
mod mkdir;
mod mv;
mod put;
mod rm;
mod stat;

/// cosn - filesystem-style access to COS/S3 buckets
#[derive(Parser, Debug)]
#[command(name = "cosn", version, about, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Config file (default: $COSN_CONFIG_DIR/config.toml or the platform config dir)
    #[arg(long, global = true, env = "COSN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            json: self.json,
            no_color: self.no_color,
            quiet: self.quiet,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show whether a key is a file, a directory or absent
    Stat(stat::StatArgs),

    /// List entries under a prefix
    Ls(ls::LsArgs),

    /// Upload a local file
    Put(put::PutArgs),

    /// Download an object, or one block of it, to a local file
    Get(get::GetArgs),

    /// Write an object to stdout
    Cat(cat::CatArgs),

    /// Create a directory marker
    Mkdir(mkdir::MkdirArgs),

    /// Delete keys
    Rm(rm::RmArgs),

    /// Copy an object within the bucket
    Cp(cp::CpArgs),

    /// Rename an object (copy, then delete the source)
    Mv(mv::MvArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Run the parsed command
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = cli.global.output_config();
    let config = cli.global.config;

    match cli.command {
        Commands::Stat(args) => stat::execute(args, config, output_config).await,
        Commands::Ls(args) => ls::execute(args, config, output_config).await,
        Commands::Put(args) => put::execute(args, config, output_config).await,
        Commands::Get(args) => get::execute(args, config, output_config).await,
        Commands::Cat(args) => cat::execute(args, config, output_config).await,
        Commands::Mkdir(args) => mkdir::execute(args, config, output_config).await,
        Commands::Rm(args) => rm::execute(args, config, output_config).await,
        Commands::Cp(args) => cp::execute(args, config, output_config).await,
        Commands::Mv(args) => mv::execute(args, config, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Load configuration and connect to the store, reporting failures through `formatter`
pub(crate) async fn open_store(
    config_path: Option<PathBuf>,
    formatter: &Formatter,
) -> Result<NativeStore, ExitCode> {
    let manager = match config_path {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new().map_err(|e| {
            formatter.error(&e.to_string());
            ExitCode::from_error(&e)
        })?,
    };

    let config = manager.load().map_err(|e| {
        formatter.error(&e.to_string());
        ExitCode::from_error(&e)
    })?;

    let backend = cosn_s3::connect(&config).await.map_err(|e| {
        formatter.error(&format!("Failed to create store client: {e}"));
        ExitCode::from_error(&e)
    })?;

    Ok(NativeStore::new(backend, config.retry))
}

/// Report a store error and map it to an exit code
pub(crate) fn fail(formatter: &Formatter, context: &str, error: &cosn_core::Error) -> ExitCode {
    formatter.error(&format!("{context}: {error}"));
    ExitCode::from_error(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cosn", "ls", "/logs", "--json", "-vv"]).unwrap();
        assert!(cli.global.json);
        assert_eq!(cli.global.verbose, 2);
        assert!(matches!(cli.command, Commands::Ls(_)));
    }

    #[test]
    fn test_explicit_config_path() {
        let cli =
            Cli::try_parse_from(["cosn", "--config", "/tmp/cosn.toml", "stat", "/a"]).unwrap();
        assert_eq!(cli.global.config, Some(PathBuf::from("/tmp/cosn.toml")));
    }

    #[tokio::test]
    async fn test_open_store_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let formatter = Formatter::new(OutputConfig {
            quiet: true,
            ..Default::default()
        });

        let result = open_store(Some(dir.path().join("absent.toml")), &formatter).await;
        assert_eq!(result.err(), Some(ExitCode::UsageError));
    }
}
