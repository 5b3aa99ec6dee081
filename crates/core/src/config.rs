//! Configuration management
//!
//! Configuration lives in a TOML file (default
//! `<config dir>/bucket-gateway/config.toml`, or `$BGW_CONFIG_DIR/config.toml`)
//! and can be overridden from the environment. A missing file yields defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable that relocates the configuration directory
pub const CONFIG_DIR_ENV: &str = "BGW_CONFIG_DIR";

/// Default validity of presigned download URLs (20 minutes)
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 20 * 60;

/// Upper bound accepted by S3 for presigned URLs (7 days)
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 604_800;

/// Bucket binding and credentials
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BucketConfig {
    pub name: String,
    pub region: String,
    /// Custom endpoint for S3-compatible services; AWS when unset
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key: String::new(),
            secret_key: String::new(),
            path_style: false,
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Transfer behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransferConfig {
    pub presign_expiry_secs: u64,
    /// Parent directory for per-download scratch directories; OS temp dir when unset
    pub scratch_dir: Option<PathBuf>,
    /// Use put-if-absent on upload instead of check-then-put
    pub conditional_writes: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            presign_expiry_secs: DEFAULT_PRESIGN_EXPIRY_SECS,
            scratch_dir: None,
            conditional_writes: false,
        }
    }
}

impl TransferConfig {
    pub fn presign_expiry(&self) -> Duration {
        Duration::from_secs(self.presign_expiry_secs)
    }
}

/// Full gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub bucket: BucketConfig,
    pub server: ServerConfig,
    pub transfer: TransferConfig,
}

impl Config {
    /// Apply `BGW_*` environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BGW_BUCKET") {
            self.bucket.name = v;
        }
        if let Some(v) = lookup("BGW_REGION") {
            self.bucket.region = v;
        }
        if let Some(v) = lookup("BGW_ENDPOINT") {
            self.bucket.endpoint = Some(v);
        }
        if let Some(v) = lookup("BGW_ACCESS_KEY") {
            self.bucket.access_key = v;
        }
        if let Some(v) = lookup("BGW_SECRET_KEY") {
            self.bucket.secret_key = v;
        }
    }

    /// Check that the configuration can build a gateway
    pub fn validate(&self) -> Result<()> {
        if self.bucket.name.trim().is_empty() {
            return Err(Error::Config("bucket name is not set".to_string()));
        }
        if self.bucket.region.trim().is_empty() {
            return Err(Error::Config("region is not set".to_string()));
        }
        if self.bucket.access_key.is_empty() || self.bucket.secret_key.is_empty() {
            return Err(Error::Config(
                "access key and secret key must both be set".to_string(),
            ));
        }
        if let Some(endpoint) = &self.bucket.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| Error::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
        }
        let expiry = self.transfer.presign_expiry_secs;
        if expiry == 0 || expiry > MAX_PRESIGN_EXPIRY_SECS {
            return Err(Error::Config(format!(
                "presign_expiry_secs must be between 1 and {MAX_PRESIGN_EXPIRY_SECS}, got {expiry}"
            )));
        }
        Ok(())
    }
}

/// Locates and loads the configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for the default config location
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("cannot determine config directory".to_string()))?
                .join("bucket-gateway"),
        };
        Ok(Self::with_path(dir.join("config.toml")))
    }

    /// Manager for an explicit config file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the file, falling back to defaults when it does not exist
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

}
