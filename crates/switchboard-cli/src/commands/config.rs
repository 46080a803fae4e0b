//! Config command for managing CLI configuration

use clap::{Args, Subcommand};

use crate::config::Config;
use crate::output::{to_json, OutputFormat};
use crate::Cli;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Get a config value
    Get {
        /// Config key name
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key name
        key: String,
        /// New value
        value: String,
    },
    /// Show all config values
    #[command(visible_alias = "list")]
    Show,
    /// Show config file path
    Path,
    /// Initialize default config file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: &ConfigArgs, cli: &Cli) -> anyhow::Result<()> {
    let path = cli.config_path();

    match &args.command {
        ConfigCommands::Get { key } => {
            let config = Config::load(&path)?;
            match config.get(key)? {
                Some(value) => println!("{}", value),
                None => println!("(not set)"),
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load(&path)?;
            config.set(key, value)?;
            config.save(&path)?;
            tracing::info!("Set {} in {:?}", key, path);
            println!("Set {} = {}", key, value);
        }
        ConfigCommands::Show => {
            let config = Config::load(&path)?;
            if cli.output_format() == OutputFormat::Json {
                println!("{}", to_json(&config)?);
                return Ok(());
            }
            println!("Config file: {}", path.display());
            println!();
            for key in Config::keys() {
                let value = config.get(key)?.unwrap_or_else(|| "(not set)".to_string());
                println!("{} = {}", key, value);
            }
        }
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            Config::default().save(&path)?;
            println!("Created config file at {}", path.display());
        }
    }

    Ok(())
}
