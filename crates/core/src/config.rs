//! Configuration management
//!
//! This module handles loading and saving the ut configuration file.
//! The configuration file is stored in TOML format at ~/.config/ut/config.toml,
//! or under `$UT_CONFIG_DIR` when that variable is set.
//!
//! Files written with a newer `schema_version` than this build knows are
//! rejected rather than rewritten.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "UT_CONFIG_DIR";

/// Environment variable overriding the API base URL
pub const API_URL_ENV: &str = "UT_API_URL";

/// Environment variable overriding the public file base URL
pub const FILE_URL_ENV: &str = "UT_FILE_URL";

/// Default REST API base
pub const DEFAULT_API_URL: &str = "https://api.uploadthing.com/v6";

/// Default prefix for public file downloads
pub const DEFAULT_FILE_URL: &str = "https://utfs.io/f/";

/// Default output format
const DEFAULT_OUTPUT: &str = "human";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Stored credentials
    #[serde(default)]
    pub credentials: Credentials,

    /// Endpoint overrides
    #[serde(default)]
    pub endpoints: EndpointOverrides,
}

/// Default settings for CLI behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Output format: "human" or "json"
    #[serde(default = "default_output")]
    pub output: String,

    /// Show progress while fetching
    #[serde(default)]
    pub progress: bool,
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            progress: false,
        }
    }
}

/// Credential section of the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Application name shown by `ut config show`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    /// Secret API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

/// Optional endpoint overrides from the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

/// Resolved remote endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// REST API base, without trailing slash
    pub api_url: String,

    /// Prefix that a file key is appended to for public downloads
    pub file_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            file_url: DEFAULT_FILE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Resolve endpoints: environment first, then config file, then defaults
    pub fn resolve(overrides: &EndpointOverrides) -> Self {
        let api_url = std::env::var(API_URL_ENV)
            .ok()
            .or_else(|| overrides.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let file_url = std::env::var(FILE_URL_ENV)
            .ok()
            .or_else(|| overrides.file_url.clone())
            .unwrap_or_else(|| DEFAULT_FILE_URL.to_string());

        Self::new(api_url, file_url)
    }

    /// Build endpoints from explicit bases
    pub fn new(api_url: impl Into<String>, file_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            api_url,
            file_url: file_url.into(),
        }
    }

    /// Full URL of an API operation, e.g. `uploadFiles`
    pub fn api(&self, operation: &str) -> String {
        format!("{}/{}", self.api_url, operation)
    }

    /// Direct URL of a public file
    pub fn public_file(&self, file_key: &str) -> String {
        format!("{}{}", self.file_url, file_key)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            credentials: Credentials::default(),
            endpoints: EndpointOverrides::default(),
        }
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("ut"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Whether the configuration file exists on disk
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade ut.",
                config.schema_version, SCHEMA_VERSION
            )));
        }
        config.schema_version = SCHEMA_VERSION;

        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if they don't exist.
    /// Sets file permissions to 600 (owner read/write only).
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        tracing::debug!(path = %self.config_path.display(), "configuration saved");
        Ok(())
    }

    /// Store a new secret key, keeping the rest of the file intact
    pub fn set_secret_key(&self, secret_key: &str) -> Result<()> {
        let secret_key = secret_key.trim();
        if secret_key.is_empty() {
            return Err(Error::InvalidInput("secret key cannot be empty".into()));
        }

        let mut config = self.load()?;
        config.credentials.secret_key = Some(secret_key.to_string());
        self.save(&config)
    }

    /// Store the application name
    pub fn set_app_name(&self, app_name: &str) -> Result<()> {
        let mut config = self.load()?;
        config.credentials.app_name = Some(app_name.trim().to_string()).filter(|s| !s.is_empty());
        self.save(&config)
    }
}
