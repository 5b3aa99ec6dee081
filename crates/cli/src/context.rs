//! Configuration resolution and gateway construction shared by all commands

use std::path::PathBuf;
use std::sync::Arc;

use bgw_core::{BucketGateway, Config, ConfigManager, GatewaySettings, Result};
use bgw_s3::S3Client;
use clap::Args;

use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Bucket selection flags; each overrides the config file and `BGW_*` variables
#[derive(Args, Debug, Clone, Default)]
pub struct BucketArgs {
    /// Configuration file (default: <config dir>/bucket-gateway/config.toml)
    #[arg(long, global = true, env = "BGW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bucket name
    #[arg(long, global = true)]
    pub bucket: Option<String>,

    /// Bucket region
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint URL
    #[arg(long, global = true)]
    pub endpoint: Option<String>,
}

impl BucketArgs {
    /// Config file, then environment, then flags; validated
    pub fn load_config(&self) -> Result<Config> {
        let manager = match &self.config {
            Some(path) => ConfigManager::with_path(path),
            None => ConfigManager::new()?,
        };

        tracing::debug!(path = %manager.config_path().display(), "Loading configuration");
        let mut config = manager.load()?;
        config.apply_env(|name| std::env::var(name).ok());

        if let Some(bucket) = &self.bucket {
            config.bucket.name = bucket.clone();
        }
        if let Some(region) = &self.region {
            config.bucket.region = region.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.bucket.endpoint = Some(endpoint.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

/// Build the S3 backend and bind the gateway to the configured bucket
pub async fn connect(config: &Config) -> Result<BucketGateway> {
    let client = S3Client::new(&config.bucket).await?;
    let gateway =
        BucketGateway::connect(Arc::new(client), &config.bucket.name, &config.bucket.region)
            .await?;
    Ok(gateway.with_settings(GatewaySettings::from(&config.transfer)))
}

/// Resolve configuration and connect, reporting failures through `formatter`
pub async fn open_gateway(
    args: &BucketArgs,
    formatter: &Formatter,
) -> std::result::Result<BucketGateway, ExitCode> {
    let config = args.load_config().map_err(|e| {
        formatter.error(&e.to_string());
        ExitCode::from(&e)
    })?;

    connect(&config).await.map_err(|e| {
        formatter.error(&e.to_string());
        ExitCode::from(&e)
    })
}
