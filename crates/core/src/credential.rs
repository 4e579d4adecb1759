//! Credential loading
//!
//! The secret API key lives in the config file. [`CachedCredential`] reads it
//! through a [`CredentialProvider`] on first use and hands out the same value
//! for the rest of the process.

use std::sync::OnceLock;

use crate::config::ConfigManager;
use crate::error::{Error, Result};

/// Source of the secret API key
#[cfg_attr(test, mockall::automock)]
pub trait CredentialProvider: Send + Sync {
    /// Load the secret, or fail with `Error::ConfigurationMissing`
    fn load_secret(&self) -> Result<String>;
}

/// Reads the secret from the ut config file
#[derive(Debug, Clone)]
pub struct ConfigCredentialProvider {
    manager: ConfigManager,
}

impl ConfigCredentialProvider {
    pub fn new(manager: ConfigManager) -> Self {
        Self { manager }
    }
}

impl CredentialProvider for ConfigCredentialProvider {
    fn load_secret(&self) -> Result<String> {
        if !self.manager.exists() {
            return Err(Error::ConfigurationMissing(format!(
                "configuration file not found at {}",
                self.manager.config_path().display()
            )));
        }

        let config = self.manager.load()?;
        match config.credentials.secret_key {
            Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(Error::ConfigurationMissing("api key not set".into())),
        }
    }
}

/// Load-once wrapper around a provider
///
/// Failures are not cached; a later call retries the provider.
pub struct CachedCredential {
    provider: Box<dyn CredentialProvider>,
    secret: OnceLock<String>,
}

impl CachedCredential {
    pub fn new(provider: impl CredentialProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            secret: OnceLock::new(),
        }
    }

    /// Credential that is already known
    pub fn fixed(secret: impl Into<String>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(secret.into());
        Self {
            provider: Box::new(Unconfigured),
            secret: cell,
        }
    }

    /// Get the secret, loading it on first call
    pub fn get(&self) -> Result<&str> {
        if let Some(secret) = self.secret.get() {
            return Ok(secret);
        }

        let loaded = self.provider.load_secret()?;
        tracing::debug!("credential loaded");
        Ok(self.secret.get_or_init(|| loaded))
    }
}

impl std::fmt::Debug for CachedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCredential")
            .field("loaded", &self.secret.get().is_some())
            .finish()
    }
}

/// Provider used when no credential source exists
#[derive(Debug, Clone, Copy)]
pub struct Unconfigured;

impl CredentialProvider for Unconfigured {
    fn load_secret(&self) -> Result<String> {
        Err(Error::ConfigurationMissing("api key not set".into()))
    }
}

/// Mask a secret for display
///
/// Keys of eight characters or fewer are hidden entirely.
pub fn mask_secret(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}
