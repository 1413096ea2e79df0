#![forbid(unsafe_code)]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use spicy_a11y::config::{WidgetConfig, init_logging, level_from};
use spicy_a11y::constants::channels;
use spicy_a11y::settings::is_reserved;
use spicy_a11y::{A11yContext, SettingId, SettingValue};

#[derive(Parser)]
#[command(name = "spicy-a11y", version, about = "Inspect and edit Spicy accessibility settings")]
struct Cli {
    /// Storage file (defaults to SPICY_STORAGE or the user config dir)
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Storage key prefix
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Apply changes in memory only
    #[arg(long, global = true)]
    no_persist: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every current setting as JSON
    Show,
    /// Print one setting
    Get { key: String },
    /// Change one setting (true/false/on/off or an integer)
    Set { key: String, value: String },
    /// Restore the built-in defaults
    Reset,
    /// List profile names
    Profiles,
    /// Apply a saved profile
    LoadProfile { name: String },
    /// Save the current settings as a profile
    SaveProfile { name: String },
    /// Delete a custom profile
    DeleteProfile { name: String },
    /// Write custom profiles as JSON (stdout if no file)
    Export { output: Option<PathBuf> },
    /// Merge custom profiles from a JSON backup
    Import { input: PathBuf },
    /// Remove every stored key under the prefix
    ClearStorage,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // logging first so configuration warnings are reported
    init_logging(level_from(|name| env::var(name).ok()))?;

    let mut config = WidgetConfig::from_env();
    if let Some(path) = cli.storage {
        config.storage_path = Some(path);
    }
    if let Some(prefix) = cli.prefix {
        config.storage_prefix = prefix;
    }
    if cli.no_persist {
        config.persist = false;
    }

    debug!(?config, "Starting");

    let mut ctx = A11yContext::new(&config);
    ctx.subscribe(channels::WILDCARD, |event| {
        debug!(channel = event.channel, "Settings event");
        Ok(())
    });

    let manager = ctx.manager();
    match cli.command {
        Command::Show => {
            println!("{}", serde_json::to_string_pretty(&manager.get_all())?);
        }
        Command::Get { key } => match manager.get_setting(&key) {
            Some(value) => println!("{value}"),
            None => bail!("No setting named '{key}'"),
        },
        Command::Set { key, value } => {
            let value: SettingValue = value.parse()?;
            let persisted = match key.parse::<SettingId>() {
                Ok(id) => manager.set(id, value)?,
                Err(_) => {
                    warn!(key = %key, "Not a known setting, storing it anyway");
                    manager.update_setting(key.as_str(), value)
                }
            };
            if !persisted {
                warn!("Change was not persisted");
            }
            println!("{key} = {}", manager.get_setting(&key).unwrap_or(value));
        }
        Command::Reset => {
            manager.reset_all();
            println!("Settings reset to defaults");
        }
        Command::Profiles => {
            for name in manager.profile_names() {
                let marker = if is_reserved(&name) { " (built-in)" } else { "" };
                println!("{name}{marker}");
            }
        }
        Command::LoadProfile { name } => {
            if !manager.load_profile(&name) {
                bail!("Profile '{name}' does not exist");
            }
            println!("Loaded profile '{name}'");
        }
        Command::SaveProfile { name } => {
            if !manager.save_profile(&name) {
                bail!("Profile '{name}' cannot be overwritten");
            }
            println!("Saved profile '{name}'");
        }
        Command::DeleteProfile { name } => {
            if !manager.delete_profile(&name) {
                bail!("Profile '{name}' is built-in or does not exist");
            }
            println!("Deleted profile '{name}'");
        }
        Command::Export { output } => {
            let json = manager.export_profiles()?;
            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "Exported profiles");
                }
                None => println!("{json}"),
            }
        }
        Command::Import { input } => {
            let json = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let count = manager.import_profiles(&json)?;
            println!("Imported {count} profile(s)");
        }
        Command::ClearStorage => {
            if !ctx.store().clear() {
                bail!("Storage could not be cleared");
            }
            println!("Cleared stored settings and profiles");
        }
    }

    ctx.dispose();
    Ok(())
}
