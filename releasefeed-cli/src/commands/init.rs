//! Init command - create or update the configuration file interactively.

use std::path::PathBuf;

use dialoguer::{Input, Select};
use releasefeed::config::{config_file_path, BackendKind, ConfigFile};

use crate::error::CliError;

/// Run the init command.
pub fn run(config_path: Option<&PathBuf>) -> Result<(), CliError> {
    let path = config_path.cloned().unwrap_or_else(config_file_path);
    let mut config = ConfigFile::load_from(&path)?;

    let backends = ["Google Drive folder", "Local directory"];
    let current = match config.source.backend {
        BackendKind::Drive => 0,
        BackendKind::Local => 1,
    };
    let choice = Select::new()
        .with_prompt("Where are releases stored?")
        .items(&backends)
        .default(current)
        .interact()?;
    config.source.backend = if choice == 0 {
        BackendKind::Drive
    } else {
        BackendKind::Local
    };

    match config.source.backend {
        BackendKind::Drive => {
            config.source.container = Some(prompt(
                "Drive folder id",
                config.source.container.clone(),
            )?);
            let api_key = prompt_optional("API key (empty for public folders)", config.source.api_key.clone())?;
            config.source.api_key = api_key;
        }
        BackendKind::Local => {
            let root = prompt(
                "Root directory",
                config.source.root.as_ref().map(|p| p.display().to_string()),
            )?;
            config.source.root = Some(PathBuf::from(root));
            config.source.container = Some(prompt(
                "Release subdirectory",
                config.source.container.clone(),
            )?);
        }
    }

    config.source.package_id = Some(prompt("Package id", config.source.package_id.clone())?);

    config.save_to(&path)?;

    println!();
    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to customize releasefeed settings.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

fn prompt(label: &str, current: Option<String>) -> Result<String, CliError> {
    let mut input = Input::<String>::new().with_prompt(label);
    if let Some(current) = current {
        input = input.default(current);
    }
    Ok(input.interact_text()?.trim().to_string())
}

fn prompt_optional(label: &str, current: Option<String>) -> Result<Option<String>, CliError> {
    let value: String = Input::new()
        .with_prompt(label)
        .default(current.unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}
