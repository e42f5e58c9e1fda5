use anyhow::{Context, Result};
use clap::Subcommand;
use rem_config::{ConfigError, ConfigManager, ConfigSource, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a config file with the default settings (./rem.toml unless a path is given)
    Init {
        /// Where to write the file
        path: Option<PathBuf>,

        /// Write the user config (~/.config/rem/config.toml) instead
        #[arg(long, conflicts_with = "path")]
        user: bool,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Show which config file is in use
    Path,
}

pub fn handle_config_command(cmd: ConfigCommand, explicit: Option<&Path>) -> Result<()> {
    match cmd {
        ConfigCommand::Init { path, user, force } => {
            let path = match (path, user) {
                (Some(path), _) => path,
                (None, true) => ConfigManager::user_config_path().context("No user configuration directory")?,
                (None, false) => explicit.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
            };
            init_config(&path, force)
        }
        ConfigCommand::Show => show_config(explicit),
        ConfigCommand::Path => show_config_path(explicit),
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    match ConfigManager::init_at(path, force) {
        Ok(_) => {
            println!("✓ Initialized config at: {}", path.display());
            Ok(())
        }
        Err(ConfigError::ConfigExists(existing)) => {
            println!("Config already exists at: {}", existing.display());
            println!("To reinitialize, run again with --force.");
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to write config to {}", path.display())),
    }
}

fn show_config(explicit: Option<&Path>) -> Result<()> {
    let manager = ConfigManager::discover(explicit).context("Failed to load configuration")?;
    match manager.source() {
        ConfigSource::File(path) => println!("# {}", path.display()),
        ConfigSource::Defaults => println!("# built-in defaults"),
    }
    print!("{}", manager.to_toml()?);
    Ok(())
}

fn show_config_path(explicit: Option<&Path>) -> Result<()> {
    let manager = ConfigManager::discover(explicit).context("Failed to load configuration")?;
    match manager.source() {
        ConfigSource::File(path) => println!("{}", path.display()),
        ConfigSource::Defaults => {
            println!("No config file found, using defaults.");
            println!("Searched:");
            println!("  ./{}", CONFIG_FILE_NAME);
            if let Some(user) = ConfigManager::user_config_path() {
                println!("  {}", user.display());
            }
        }
    }
    Ok(())
}
