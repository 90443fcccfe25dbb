//! Feed command - list the releases a source currently offers.

use clap::Args;
use console::style;
use tokio::runtime::Runtime;

use super::common::{format_size, CliContext, SourceArgs};
use crate::error::CliError;

/// Arguments for the feed command.
#[derive(Debug, Args)]
pub struct FeedArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Release channel (accepted for compatibility; storage backends ignore it)
    #[arg(long, default_value = "")]
    pub channel: String,

    /// Print the feed as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the feed command.
pub fn run(ctx: &CliContext, runtime: &Runtime, args: FeedArgs) -> Result<(), CliError> {
    let source = ctx.update_source(&args.source)?;
    let feed = runtime.block_on(source.resolve_feed(&args.channel, None, None))?;

    if args.json {
        let json = feed
            .to_json()
            .map_err(|e| CliError::Runtime(format!("Failed to serialize feed: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    if feed.is_empty() {
        println!("No releases found in '{}'.", source.config().container_id);
        return Ok(());
    }

    let latest = feed.latest().map(|a| a.file_name.clone());
    println!(
        "{} ({} releases)",
        style(&source.config().package_id).bold(),
        feed.len()
    );
    println!();
    println!("  {:<16} {:>10}  File", "Version", "Size");
    println!("  {:<16} {:>10}  ────", "───────", "────");
    for asset in feed.iter() {
        let marker = if latest.as_deref() == Some(asset.file_name.as_str()) {
            style("latest").green().to_string()
        } else {
            String::new()
        };
        println!(
            "  {:<16} {:>10}  {} {}",
            asset.version.to_string(),
            format_size(asset.size_bytes),
            asset.file_name,
            marker
        );
    }
    Ok(())
}
