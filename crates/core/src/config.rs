//! Configuration management
//!
//! Store settings live in a TOML file (`config.toml`) under `$COSN_CONFIG_DIR`, or under
//! the platform config directory (`~/.config/cosn` on Linux). Every setting is validated when
//! the store is initialized; a bad value never surfaces later as a call-time failure.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::retry::RetryConfig;

const CONFIG_FILE: &str = "config.toml";
const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Settings consumed when building a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Bucket holding the filesystem
    pub bucket: String,

    /// Endpoint region, e.g. `ap-guangzhou`
    pub region: String,

    #[serde(default)]
    pub secret_id: String,

    #[serde(default)]
    pub secret_key: String,

    /// Account identifier scoping the credentials; appended to the bucket name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    #[serde(default)]
    pub use_https: bool,

    /// Endpoint override; derived from the region when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
    #[serde(default)]
    pub path_style: bool,

    /// Worker pool size for multipart uploads. Signed so that a configured zero or negative
    /// value is reported rather than rejected by the parser with a less useful message.
    #[serde(default = "default_upload_thread_pool")]
    pub upload_thread_pool: i64,

    /// Files at least this large are uploaded in parts
    #[serde(default = "default_multipart_threshold")]
    pub multipart_threshold: u64,

    #[serde(default = "default_part_size")]
    pub part_size: u64,

    /// Retry policy. Fixed at the defaults for file-based configuration; only code can
    /// change it.
    #[serde(skip)]
    pub retry: RetryConfig,
}

fn default_upload_thread_pool() -> i64 {
    32
}

fn default_multipart_threshold() -> u64 {
    16 * 1024 * 1024
}

fn default_part_size() -> u64 {
    8 * 1024 * 1024
}

impl StoreConfig {
    /// Create a configuration with defaults for everything but the required settings
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            app_id: None,
            use_https: false,
            endpoint: None,
            path_style: false,
            upload_thread_pool: default_upload_thread_pool(),
            multipart_threshold: default_multipart_threshold(),
            part_size: default_part_size(),
            retry: RetryConfig::default(),
        }
    }

    /// Parse from TOML text without validating
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("invalid config: {e}")))
    }

    /// Override credentials from `COSN_SECRET_ID` / `COSN_SECRET_KEY` when set
    pub fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("COSN_SECRET_ID") {
            self.secret_id = id;
        }
        if let Ok(key) = std::env::var("COSN_SECRET_KEY") {
            self.secret_key = key;
        }
    }

    /// Check every setting, reporting the first violation
    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(Error::Config("bucket is missing".into()));
        }
        if self.region.trim().is_empty() {
            return Err(Error::Config("region is missing".into()));
        }
        if self.secret_id.is_empty() {
            return Err(Error::Config("secret_id is missing".into()));
        }
        if self.secret_key.is_empty() {
            return Err(Error::Config("secret_key is missing".into()));
        }
        if self.upload_thread_pool <= 0 {
            return Err(Error::Config(format!(
                "upload_thread_pool must be greater than 0, got {}",
                self.upload_thread_pool
            )));
        }
        if self.part_size < MIN_PART_SIZE {
            return Err(Error::Config(format!(
                "part_size must be at least {MIN_PART_SIZE} bytes, got {}",
                self.part_size
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if let Some(endpoint) = &self.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| Error::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
        }
        Ok(())
    }

    /// Bucket name as addressed on the wire, scoped by `app_id` when present
    pub fn bucket_name(&self) -> String {
        match &self.app_id {
            Some(app_id) if !app_id.is_empty() && !self.bucket.ends_with(&format!("-{app_id}")) => {
                format!("{}-{app_id}", self.bucket)
            }
            _ => self.bucket.clone(),
        }
    }

    /// Endpoint URL: the override, or the regional COS endpoint
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => {
                let scheme = if self.use_https { "https" } else { "http" };
                format!("{scheme}://cos.{}.myqcloud.com", self.region)
            }
        }
    }

    /// Upload worker count; only meaningful after [`StoreConfig::validate`]
    pub fn upload_workers(&self) -> usize {
        usize::try_from(self.upload_thread_pool.max(1)).unwrap_or(1)
    }
}

/// Configuration file manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a manager for the default location
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os("COSN_CONFIG_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("cannot determine config directory".into()))?
                .join("cosn"),
        };
        Ok(Self::with_path(dir.join(CONFIG_FILE)))
    }

    /// Create a manager for an explicit file
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Read, apply environment overrides and validate
    pub fn load(&self) -> Result<StoreConfig> {
        let text = std::fs::read_to_string(&self.config_path).map_err(|e| {
            Error::Config(format!(
                "cannot read {}: {e}",
                self.config_path.display()
            ))
        })?;
        let mut config = StoreConfig::from_toml_str(&text)?;
        config.apply_env_overrides();
        config.validate()?;

        tracing::debug!(path = %self.config_path.display(), bucket = %config.bucket, "Loaded config");
        Ok(config)
    }

    pub fn save(&self, config: &StoreConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("cannot serialize config: {e}")))?;
        std::fs::write(&self.config_path, text)?;
        Ok(())
    }
}
