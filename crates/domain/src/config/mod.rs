//! Configuration structures
//!
//! Deserialized by the infra loader from environment variables or a
//! JSON/TOML file. Every section has defaults so a file only needs to name
//! what differs.

pub mod browser;
pub mod oauth;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use browser::{BrowserAnimations, InAppBrowserConfig};
pub use oauth::{OAuthConfig, ServiceConfiguration};

use crate::constants::DEFAULT_MINIMUM_TOKEN_EXPIRATION_MINUTES;
use crate::impl_label_conversions;

/// Top-level session configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Provider client settings
    pub oauth: OAuthConfig,
    /// URL opened in the in-app browser to end the provider session.
    pub logout_url: String,
    /// Chrome options for the logout page
    pub browser: InAppBrowserConfig,
    /// Token persistence
    pub storage: StorageConfig,
    /// Expiration guard thresholds
    pub guard: GuardConfig,
}

/// Key-value store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// JSON file on disk.
    #[default]
    File,
    /// Platform keychain.
    Keyring,
    /// Process memory; lost on exit.
    Memory,
}

impl_label_conversions!(StorageBackend {
    File => "file",
    Keyring => "keyring",
    Memory => "memory",
});

/// Where tokens are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store used for the token cache
    pub backend: StorageBackend,
    /// File path for the `file` backend. Defaults to the platform data dir.
    pub path: Option<PathBuf>,
    /// Keychain service name for the `keyring` backend.
    pub service_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { backend: StorageBackend::File, path: None, service_name: "authsession".to_string() }
    }
}

/// Default thresholds for expiration guards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Minutes before expiry at which the token counts as expired.
    pub minutes_to_consider_token_as_expired: f64,
    /// Start of the near-expiration window, in minutes before expiry.
    pub minutes_to_consider_token_as_near_expiration: Option<f64>,
    /// Threshold for the mount-only guard.
    pub minimum_token_expiration_time: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            minutes_to_consider_token_as_expired: 0.0,
            minutes_to_consider_token_as_near_expiration: None,
            minimum_token_expiration_time: DEFAULT_MINIMUM_TOKEN_EXPIRATION_MINUTES,
        }
    }
}
