//! Account configuration.
//!
//! A [`Config`] names the account and its public key, plus where to reach the
//! API. The private key may live in the file, in `EMMA_PRIVATE_KEY`, or in the
//! system keyring (see [`crate::credentials`]).
//!
//! The default location is `{config_dir}/emma/config.json`.

use std::path::{Path, PathBuf};

use emma_transport::{Credentials, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::credentials;
use crate::error::{Error, Result};

const ENV_ACCOUNT_ID: &str = "EMMA_ACCOUNT_ID";
const ENV_PUBLIC_KEY: &str = "EMMA_PUBLIC_KEY";
const ENV_PRIVATE_KEY: &str = "EMMA_PRIVATE_KEY";
const ENV_BASE_URL: &str = "EMMA_BASE_URL";
const ENV_TIMEOUT: &str = "EMMA_TIMEOUT_SECS";

const fn default_timeout_secs() -> u64 {
    30
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Connection settings for one account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Account identifier.
    pub account_id: String,
    /// Public API key.
    pub public_key: String,
    /// Private API key. Falls back to the keyring when absent.
    ///
    /// Read from a config file when present but never written back; store it
    /// with [`credentials::store_private_key`] instead.
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
    /// API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Creates a configuration with the default API root and timeout.
    #[must_use]
    pub fn new(account_id: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            public_key: public_key.into(),
            private_key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Sets the private key.
    #[must_use]
    pub fn with_private_key(mut self, private_key: impl Into<String>) -> Self {
        self.private_key = Some(private_key.into());
        self
    }

    /// Default configuration file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("emma")
            .join("config.json")
    }

    /// Reads the configuration from the `EMMA_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the account id or public key is unset, or
    /// the timeout is not a number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{name} is not set")))
        };
        let mut config = Self::new(required(ENV_ACCOUNT_ID)?, required(ENV_PUBLIC_KEY)?);
        config.private_key = lookup(ENV_PRIVATE_KEY);
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            config.timeout_secs = timeout
                .parse()
                .map_err(|_| Error::Config(format!("{ENV_TIMEOUT} is not a number: {timeout}")))?;
        }
        Ok(config)
    }

    /// Reads the configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        debug!("Loaded configuration for account {} from {path:?}", config.account_id);
        Ok(config)
    }

    /// Writes the configuration as JSON, creating parent directories.
    ///
    /// The private key is left out of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Configuration saved to {path:?}");
        Ok(())
    }

    /// The private key from the configuration, or else the keyring.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if neither has one, or a credential error if
    /// the keyring cannot be read.
    pub fn resolve_private_key(&self) -> Result<String> {
        if let Some(key) = self.private_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        credentials::get_private_key(&self.account_id)?.ok_or_else(|| {
            Error::Config(format!(
                "no private key configured for account {}",
                self.account_id
            ))
        })
    }

    /// Transport credentials, resolving the private key.
    ///
    /// # Errors
    ///
    /// See [`Config::resolve_private_key`].
    pub fn credentials(&self) -> Result<Credentials> {
        Ok(Credentials::new(
            self.account_id.clone(),
            self.public_key.clone(),
            self.resolve_private_key()?,
        ))
    }
}
