use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use weather_core::{Config, ProviderId, StaticCredential};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-web", version, about = "Weather web front end")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve {
        /// Listen address, e.g. 127.0.0.1:5000. Overrides config and environment.
        #[arg(long)]
        address: Option<SocketAddr>,
    },

    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "unsplash".
        provider: String,
    },

    /// Hash a login password for the `login.password_hash` config key.
    HashPassword,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Serve { address } => {
                let mut config = Config::load_from(&path)?;
                config.apply_env(|key| std::env::var(key).ok())?;
                if let Some(address) = address {
                    config.server.address = address;
                }

                tracing::info!(config = %path.display(), "Loaded configuration");
                server::run(&config).await
            }
            Command::Configure { provider } => {
                let id = ProviderId::try_from(provider.as_str())?;
                let mut config = Config::load_from(&path)?;

                let message = format!("API key for {id}:");
                let api_key = Password::new(&message)
                    .without_confirmation()
                    .with_display_mode(PasswordDisplayMode::Masked)
                    .prompt()
                    .context("Failed to read API key")?;

                config.upsert_provider_api_key(id, api_key.trim().to_string());
                config.save_to(&path)?;

                println!("Saved {id} API key to {}", path.display());
                Ok(())
            }
            Command::HashPassword => {
                let password = Password::new("Password:")
                    .with_display_mode(PasswordDisplayMode::Masked)
                    .prompt()
                    .context("Failed to read password")?;

                let encoded = StaticCredential::from_password("", &password).encoded();
                println!("[login]\npassword_hash = \"{encoded}\"");
                Ok(())
            }
        }
    }
}
