use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use geosearch_core::{Config, LocationLookup, OsDataHubClient, config::API_KEY_ENV};
use inquire::{Password, PasswordDisplayMode};
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "geosearch", version, about = "OS Data Hub location search proxy")]
pub struct Cli {
    /// Path to the config file. Defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the lookup endpoint over HTTP.
    Serve {
        /// Address to listen on, e.g. "0.0.0.0:8080".
        #[arg(long)]
        bind: Option<String>,

        /// OS Data Hub API key; overrides the config file.
        #[arg(long, env = "OS_DATA_HUB_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Store the OS Data Hub API key in the config file.
    Configure,

    /// Look up a single location and print the JSON response.
    Lookup {
        /// Place name or postcode to search for.
        location: String,

        /// OS Data Hub API key; overrides the config file.
        #[arg(long, env = "OS_DATA_HUB_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = self.config_path()?;
        let mut config = Config::load_from(&config_path)?;

        match self.command {
            Command::Serve { bind, api_key } => {
                if let Some(bind) = bind {
                    config.bind_address = bind;
                }
                if let Some(key) = api_key {
                    config.set_api_key(key);
                }
                serve(config).await
            }
            Command::Configure => {
                let key = Password::new("OS Data Hub API key:")
                    .with_display_mode(PasswordDisplayMode::Masked)
                    .without_confirmation()
                    .prompt()?;

                if key.trim().is_empty() {
                    bail!("API key must not be empty");
                }
                config.set_api_key(key.trim().to_string());

                config.save_to(&config_path)?;
                println!("Saved API key to {}", config_path.display());
                Ok(())
            }
            Command::Lookup { location, api_key } => {
                if let Some(key) = api_key {
                    config.set_api_key(key);
                }
                lookup_once(config, &location).await
            }
        }
    }

    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Config::config_file_path(),
        }
    }
}

fn build_lookup(config: Config) -> anyhow::Result<LocationLookup> {
    let client = OsDataHubClient::new(&config.base_url, config.upstream_timeout())?;
    Ok(LocationLookup::new(config, Arc::new(client)))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    if config.api_key().is_none() {
        tracing::warn!(
            "No usable OS Data Hub API key; lookups will fail until {API_KEY_ENV} is set"
        );
    }

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    tracing::info!(
        address = %listener.local_addr()?,
        route = server::LOOKUP_ROUTE,
        request_timeout_secs = config.request_timeout_secs,
        "Listening for lookups"
    );

    let timeout = config.request_timeout();
    let app = server::router(build_lookup(config)?, timeout);
    server::serve(listener, app).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn lookup_once(config: Config, location: &str) -> anyhow::Result<()> {
    let lookup = build_lookup(config)?;

    match lookup.handle(Some(location), b"").await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", serde_json::to_string_pretty(&err.body())?);
            bail!("lookup failed with status {}", err.status())
        }
    }
}
