//! Configuration management for GRIB Fetcher
//!
//! Settings come from four layers, later ones winning:
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, `./grib-fetcher.toml`, or the user config dir)
//! 3. Environment variables (`GRIB_FETCHER_DATA_DIR`, `GRIB_FETCHER_TIMEOUT_SECS`)
//! 4. CLI arguments, applied by the command handler
//!
//! Running without any file is the normal case; the defaults target the
//! public NOAA endpoints.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ArchiveWindow, ClientConfig, Endpoints, FetchConfig, OutputLayout};
use crate::constants::{env as env_constants, files, http, limits, noaa};
use crate::errors::{ConfigError, Result};

/// File name looked up in the working directory
const LOCAL_CONFIG_FILE: &str = "grib-fetcher.toml";

/// Directory below the user config dir
const CONFIG_DIR_NAME: &str = "grib-fetcher";

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Remote endpoints
    pub endpoints: Endpoints,
    /// Output directories
    pub output: OutputConfigToml,
    /// Optional archive window check
    pub archive: ArchiveWindow,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfigToml {
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Retries for transient failures
    pub max_retries: u32,
    /// Base backoff delay in milliseconds
    pub retry_base_delay_ms: u64,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            pool_idle_timeout_secs: Some(http::POOL_IDLE_TIMEOUT.as_secs()),
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            max_retries: limits::MAX_RETRIES,
            retry_base_delay_ms: limits::RETRY_BASE_DELAY_MS,
        }
    }
}

/// TOML-friendly output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfigToml {
    /// Root of `Zipped/` and `Unzipped/`
    pub data_dir: PathBuf,
}

impl Default for OutputConfigToml {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(files::DEFAULT_DATA_DIR),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when no verbosity flag is given
    pub level: String,
    /// Enable colored output on stderr
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            colored_output: true,
        }
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> std::result::Result<FetchConfig, ConfigError> {
        Ok(FetchConfig {
            client: self.client.to_runtime_config()?,
            endpoints: self.endpoints.clone(),
            output: OutputLayout::new(&self.output.data_dir),
            archive: self.archive.clone(),
        })
    }

    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        let config_path = match config_file_override {
            Some(ref path) => Some(path.clone()),
            None => Self::find_config_file(),
        };

        if let Some(path) = config_path {
            if path.exists() {
                debug!("Loading config from: {}", path.display());
                config = Self::load_from_file(&path).await?;
            } else if config_file_override.is_some() {
                return Err(ConfigError::NotFound { path }.into());
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides, reading variables through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> std::result::Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(data_dir) = lookup(env_constants::DATA_DIR).filter(|v| !v.is_empty()) {
            debug!("{} overrides data_dir", env_constants::DATA_DIR);
            self.output.data_dir = PathBuf::from(data_dir);
        }

        if let Some(raw) = lookup(env_constants::TIMEOUT_SECS) {
            let seconds = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: env_constants::TIMEOUT_SECS.to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
            debug!("{} overrides request_timeout_secs", env_constants::TIMEOUT_SECS);
            self.client.request_timeout_secs = seconds;
        }

        Ok(())
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(".").join(LOCAL_CONFIG_FILE)];
        search_paths.extend(Self::get_default_config_path());

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Some(path);
            }
        }

        debug!("No config file found in standard locations");
        None
    }

    /// Get the default config file path for the current user
    pub fn get_default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::InvalidFormat)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Write the commented default configuration to `path`
    ///
    /// Refuses to overwrite an existing file.
    pub async fn write_default(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(ConfigError::InvalidValue {
                field: "config".to_string(),
                value: path.display().to_string(),
                reason: "File already exists".to_string(),
            }
            .into());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, Self::generate_default_config_content()).await?;
        info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# GRIB Fetcher Configuration
# Every setting is optional; removed keys fall back to these defaults.

[client]
tcp_nodelay = true
pool_idle_timeout_secs = {pool_idle}
# Deadline for a whole request, body included; size it for the slowest link
request_timeout_secs = {request_timeout}
connect_timeout_secs = {connect_timeout}
# NOMADS blocks clients that exceed its hit rate
rate_limit_rps = {rps}
max_retries = {retries}
retry_base_delay_ms = {retry_delay}

[endpoints]
# {{date}} is replaced by YYYYMMDD, {{hour}} by HH
nomads_rap_dir_template = "{nomads}"
rap_s3_template = "{rap_s3}"
mrms_bucket_url = "{bucket}"
mrms_region = "{region}"
mrms_latest_base_url = "{latest}"
# Calendar of the live directory date: "local" or "utc"
live_date_basis = "local"

[output]
data_dir = "{data_dir}"

[archive]
# Reject archive timestamps outside the window (quote the date)
# earliest = "2020-10-14"
# delay_hours = 2

[logging]
level = "warn"  # error, warn, info, debug, trace
colored_output = true
"#,
            pool_idle = http::POOL_IDLE_TIMEOUT.as_secs(),
            request_timeout = http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout = http::CONNECT_TIMEOUT.as_secs(),
            rps = limits::DEFAULT_RATE_LIMIT_RPS,
            retries = limits::MAX_RETRIES,
            retry_delay = limits::RETRY_BASE_DELAY_MS,
            nomads = noaa::NOMADS_RAP_DIR_TEMPLATE,
            rap_s3 = noaa::RAP_S3_TEMPLATE,
            bucket = noaa::MRMS_BUCKET_URL,
            region = noaa::MRMS_REGION,
            latest = noaa::MRMS_LATEST_BASE_URL,
            data_dir = files::DEFAULT_DATA_DIR,
        )
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> std::result::Result<ClientConfig, ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.request_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "Every request needs a timeout".to_string(),
            });
        }
        if self.rate_limit_rps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.rate_limit_rps".to_string(),
                value: "0".to_string(),
                reason: "Rate limit must be non-zero".to_string(),
            });
        }

        Ok(ClientConfig {
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
        })
    }
}
