//! Download command - fetch one release and print its checksum.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use releasefeed::ReleaseAsset;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::common::{format_size, CliContext, SourceArgs};
use crate::error::CliError;

/// Arguments for the download command.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// File name of the release to download (default: latest version)
    pub file_name: Option<String>,

    /// Output directory (default: [download] directory, then current directory)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Fail unless the downloaded file has this checksum
    #[arg(long)]
    pub expect_checksum: Option<String>,

    /// Overwrite an existing file without asking
    #[arg(long, short)]
    pub yes: bool,
}

/// Run the download command.
pub fn run(ctx: &CliContext, runtime: &Runtime, args: DownloadArgs) -> Result<(), CliError> {
    let source = ctx.update_source(&args.source)?;
    let feed = runtime.block_on(source.resolve_feed("", None, None))?;

    let mut asset = select_asset(feed.iter(), args.file_name.as_deref())?.clone();

    let directory = args
        .output
        .or_else(|| ctx.config().download.directory.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let destination = destination_path(&directory, &asset.file_name)?;

    if destination.exists() && !args.yes {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} exists. Overwrite?", destination.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            return Err(CliError::Aborted);
        }
    }

    println!(
        "Downloading {} ({})",
        style(&asset.file_name).bold(),
        format_size(asset.size_bytes)
    );

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| CliError::Runtime(format!("Failed to set signal handler: {}", e)))?;

    let bar = progress_bar();
    let on_progress = {
        let bar = bar.clone();
        move |percent: u8| bar.set_position(u64::from(percent))
    };

    let result = runtime.block_on(source.download(&mut asset, &destination, &on_progress, &cancel));
    match &result {
        Ok(()) => bar.finish_with_message("done"),
        Err(e) if e.is_cancelled() => bar.abandon_with_message("cancelled"),
        Err(_) => bar.abandon_with_message("failed"),
    }
    result?;

    let checksum = asset.checksum.clone().unwrap_or_default();
    if let Some(expected) = &args.expect_checksum {
        if !expected.eq_ignore_ascii_case(&checksum) {
            return Err(CliError::ChecksumMismatch {
                expected: expected.clone(),
                actual: checksum,
            });
        }
    }

    info!(file = %destination.display(), checksum = %checksum, "Saved release");
    println!("Saved:    {}", destination.display());
    println!(
        "{} {}",
        style(format!("{}:", source.config().digest.to_string().to_uppercase())).dim(),
        checksum
    );
    Ok(())
}

/// Pick the named asset, or the highest version when no name is given.
pub fn select_asset<'a>(
    mut assets: impl Iterator<Item = &'a ReleaseAsset>,
    file_name: Option<&str>,
) -> Result<&'a ReleaseAsset, CliError> {
    match file_name {
        Some(name) => assets
            .find(|a| a.file_name == name)
            .ok_or_else(|| CliError::NotFound(name.to_string())),
        None => assets
            .max_by(|a, b| a.version.cmp(&b.version))
            .ok_or_else(|| CliError::NotFound("(latest)".to_string())),
    }
}

/// Place `file_name` inside `directory`, refusing names that would land
/// anywhere else.
pub fn destination_path(directory: &Path, file_name: &str) -> Result<PathBuf, CliError> {
    match Path::new(file_name).file_name() {
        Some(name) if name == file_name && !file_name.contains('\\') => Ok(directory.join(name)),
        _ => Err(CliError::UnsafeFileName(file_name.to_string())),
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::with_template("{spinner} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    fn assets() -> Vec<ReleaseAsset> {
        vec![
            ReleaseAsset::new("App", "App-1.2.0.zip", Version::new(1, 2, 0), 10),
            ReleaseAsset::new("App", "App-1.10.0.zip", Version::new(1, 10, 0), 10),
            ReleaseAsset::new("App", "App-1.9.0.zip", Version::new(1, 9, 0), 10),
        ]
    }

    #[test]
    fn test_select_latest_by_version() {
        let assets = assets();
        let selected = select_asset(assets.iter(), None).unwrap();
        assert_eq!(selected.file_name, "App-1.10.0.zip");
    }

    #[test]
    fn test_select_by_name() {
        let assets = assets();
        let selected = select_asset(assets.iter(), Some("App-1.2.0.zip")).unwrap();
        assert_eq!(selected.version, Version::new(1, 2, 0));
    }

    #[test]
    fn test_select_missing() {
        let assets = assets();
        assert!(matches!(
            select_asset(assets.iter(), Some("App-3.0.0.zip")),
            Err(CliError::NotFound(_))
        ));
        assert!(select_asset(std::iter::empty(), None).is_err());
    }

    #[test]
    fn test_destination_stays_in_directory() {
        let dir = Path::new("out");
        assert_eq!(
            destination_path(dir, "App-1.0.0.zip").unwrap(),
            PathBuf::from("out/App-1.0.0.zip")
        );

        for name in [
            "../../escape-1.0.0.zip",
            "/tmp/abs-1.0.0.zip",
            "sub/App-1.0.0.zip",
            "..\\App-1.0.0.zip",
            "..",
            "",
        ] {
            assert!(
                matches!(destination_path(dir, name), Err(CliError::UnsafeFileName(_))),
                "{name}"
            );
        }
    }
}
