//! releasefeed CLI - Command-line interface
//!
//! Lists the releases an update source offers and downloads one with
//! progress and checksum verification.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use console::style;

use commands::common::CliContext;
use commands::download::DownloadArgs;
use commands::feed::FeedArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "releasefeed")]
#[command(version, about = "Resolve release feeds and download verified artifacts")]
struct Cli {
    /// Configuration file (default: ~/.config/releasefeed/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides [logging] level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write logs to this file; overrides [logging] file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the configuration file
    Init,

    /// List releases available from the source
    Feed(FeedArgs),

    /// Download a release and print its checksum
    Download(DownloadArgs),
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Init = cli.command {
        return commands::init::run(cli.config.as_ref());
    }

    let ctx = CliContext::new(cli.config.as_ref(), cli.log_level, cli.log_file)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(format!("Failed to start runtime: {}", e)))?;

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Feed(args) => commands::feed::run(&ctx, &runtime, args),
        Commands::Download(args) => commands::download::run(&ctx, &runtime, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_download_flags_parse() {
        let cli = Cli::try_parse_from([
            "releasefeed",
            "download",
            "App-1.2.3.zip",
            "--backend",
            "local",
            "--root",
            "/srv",
            "--container",
            "releases",
            "-y",
            "--log-level",
            "debug",
        ])
        .unwrap();

        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.file_name.as_deref(), Some("App-1.2.3.zip"));
                assert_eq!(args.source.container.as_deref(), Some("releases"));
                assert!(args.yes);
                assert_eq!(cli.log_level.as_deref(), Some("debug"));
            }
            _ => panic!("Expected download command"),
        }
    }
}
