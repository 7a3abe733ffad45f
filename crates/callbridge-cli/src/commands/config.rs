use crate::GlobalOpts;
use anyhow::Context;
use callbridge_config::{Config, ConfigError, CONFIG_ENV_VAR, CONFIG_KEYS, CONFIG_POINTER_FILE};
use callbridge_logger as logger;
use clap::Subcommand;
use colored::Colorize;
use std::fs;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show every configured value
    Show,
    /// Print one value
    Get { key: String },
    /// Set a value
    Set { key: String, value: String },
    /// Get or set the path to the config file.
    /// If `new_path` is provided, the CLI will set the config path to that value.
    /// If omitted, the CLI will print the current configuration file path.
    Path {
        /// Optional new config path to set
        new_path: Option<String>,
    },
}

pub fn handle_config(action: Option<ConfigAction>, opts: &GlobalOpts) -> anyhow::Result<()> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = Config::load().context("Failed to load config")?;
            println!("{}", "Configuration:".bold().green());
            if config.is_empty() {
                if opts.verbosity_level() > 0 {
                    println!("  {}", "(empty)".yellow());
                }
            } else {
                for (key, value) in config.values_iter() {
                    println!("  {}: {}", key.cyan(), value);
                }
            }
        }
        ConfigAction::Get { key } => {
            let config = Config::load().context("Failed to load config")?;
            match config.get(&key) {
                Some(value) => println!("{}", value),
                None if CONFIG_KEYS.contains(&key.as_str()) => {
                    anyhow::bail!("Config key '{}' is not set", key);
                }
                None => return Err(ConfigError::UnknownKey(key).into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load().context("Failed to load config")?;
            config.set(&key, value.clone())?;
            config.save().context("Failed to save config")?;
            logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path { new_path } => {
            let config_path = Config::path()?;
            logger::debug(&format!("Reading config from: {}", config_path.display()));
            let pointer_path = Config::default_dir()?.join(CONFIG_POINTER_FILE);

            match new_path {
                Some(p) => {
                    if let Some(parent) = pointer_path.parent() {
                        fs::create_dir_all(parent).context("Failed to set config path")?;
                    }
                    fs::write(&pointer_path, p.as_bytes()).context("Failed to set config path")?;
                    logger::success(&format!("Config path set to {}", p));
                    if let Some(active) = Config::env_override() {
                        logger::warn(&format!(
                            "{} is set; {} stays in use until it is unset",
                            CONFIG_ENV_VAR,
                            active.display()
                        ));
                    }
                }
                None => {
                    println!("{}", config_path.display());

                    if let Ok(contents) = fs::read_to_string(&pointer_path) {
                        let trimmed = contents.trim();
                        if !trimmed.is_empty() {
                            println!("{} {}", "overridden-by".cyan(), trimmed);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
