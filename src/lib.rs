pub mod cli;
pub mod core;
pub mod providers;

pub use cli::top::OutputFormat;

use anyhow::Result;
use tracing::{debug, info};

use crate::core::config::AppConfig;
use crate::providers::ArkFundsProvider;

/// Loads the config from `config_path`, or from the default location.
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    }
}

pub async fn run(config: &AppConfig, format: OutputFormat) -> Result<()> {
    info!("noah starting...");
    config.validate()?;
    debug!("Using config: {config:#?}");

    let provider = ArkFundsProvider::new(&config.base_url, config.timeout());
    cli::top::run(&provider, &config.funds, format).await
}
