//! Configuration loader
//!
//! Loads [`SessionConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the environment when one is present
//! 2. Attempts to load from environment variables
//! 3. If incomplete, falls back to loading from file (`AUTHSESSION_CONFIG`
//!    or the first probed location)
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `AUTHSESSION_ISSUER`: Issuer base URL (required)
//! - `AUTHSESSION_CLIENT_ID`: OAuth client id (required)
//! - `AUTHSESSION_REDIRECT_URL`: Redirect URL (required)
//! - `AUTHSESSION_SCOPES`: Scopes, separated by spaces or commas
//! - `AUTHSESSION_AUTHORIZATION_ENDPOINT` / `AUTHSESSION_TOKEN_ENDPOINT`:
//!   Explicit endpoints, both or neither
//! - `AUTHSESSION_LOGOUT_URL`: Provider logout page
//! - `AUTHSESSION_STORAGE_BACKEND`: `file`, `keyring` or `memory`
//! - `AUTHSESSION_STORAGE_PATH`: File path for the `file` backend
//! - `AUTHSESSION_KEYRING_SERVICE`: Service name for the `keyring` backend
//! - `AUTHSESSION_EXPIRED_MINUTES`: Guard expired threshold
//! - `AUTHSESSION_NEAR_EXPIRATION_MINUTES`: Guard near-expiration threshold
//! - `AUTHSESSION_MINIMUM_EXPIRATION_MINUTES`: Mount guard minimum lifetime
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./authsession.json` or `./authsession.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names in the parent and grandparent directories
//! 4. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use authsession_domain::{
    OAuthConfig, Result, ServiceConfiguration, SessionConfig, SessionError, StorageBackend,
};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["authsession.json", "authsession.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `SessionError::Config` if configuration cannot be loaded from
/// either source or fails validation.
pub fn load() -> Result<SessionConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            let explicit = std::env::var_os("AUTHSESSION_CONFIG").map(PathBuf::from);
            load_from_file(explicit)
        }
    }
}

/// Load configuration from environment variables
///
/// Issuer, client id and redirect URL are required; everything else falls
/// back to defaults.
///
/// # Errors
/// Returns `SessionError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_env() -> Result<SessionConfig> {
    let issuer = env_var("AUTHSESSION_ISSUER")?;
    let client_id = env_var("AUTHSESSION_CLIENT_ID")?;
    let redirect_url = env_var("AUTHSESSION_REDIRECT_URL")?;
    let scopes = std::env::var("AUTHSESSION_SCOPES")
        .map(|raw| parse_scopes(&raw))
        .unwrap_or_default();

    let service_configuration = match (
        std::env::var("AUTHSESSION_AUTHORIZATION_ENDPOINT").ok(),
        std::env::var("AUTHSESSION_TOKEN_ENDPOINT").ok(),
    ) {
        (Some(authorization_endpoint), Some(token_endpoint)) => {
            Some(ServiceConfiguration { authorization_endpoint, token_endpoint })
        }
        (None, None) => None,
        _ => {
            return Err(SessionError::Config(
                "AUTHSESSION_AUTHORIZATION_ENDPOINT and AUTHSESSION_TOKEN_ENDPOINT must be set together"
                    .to_string(),
            ))
        }
    };

    let mut config = SessionConfig {
        oauth: OAuthConfig {
            issuer,
            client_id,
            redirect_url,
            scopes,
            service_configuration,
            ..OAuthConfig::default()
        },
        logout_url: std::env::var("AUTHSESSION_LOGOUT_URL").unwrap_or_default(),
        ..SessionConfig::default()
    };

    if let Ok(backend) = std::env::var("AUTHSESSION_STORAGE_BACKEND") {
        config.storage.backend = StorageBackend::from_str(&backend).map_err(SessionError::Config)?;
    }
    if let Ok(path) = std::env::var("AUTHSESSION_STORAGE_PATH") {
        config.storage.path = Some(PathBuf::from(path));
    }
    if let Ok(service) = std::env::var("AUTHSESSION_KEYRING_SERVICE") {
        config.storage.service_name = service;
    }
    if let Some(minutes) = env_f64("AUTHSESSION_EXPIRED_MINUTES")? {
        config.guard.minutes_to_consider_token_as_expired = minutes;
    }
    if let Some(minutes) = env_f64("AUTHSESSION_NEAR_EXPIRATION_MINUTES")? {
        config.guard.minutes_to_consider_token_as_near_expiration = Some(minutes);
    }
    if let Some(minutes) = env_f64("AUTHSESSION_MINIMUM_EXPIRATION_MINUTES")? {
        config.guard.minimum_token_expiration_time = minutes;
    }

    config.oauth.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `SessionError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The OAuth section fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<SessionConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SessionError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SessionError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SessionError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.oauth.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<SessionConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SessionError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SessionError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SessionError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the working directory, its two parents, then the same
/// relative to the executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Split a scope list on whitespace and commas.
fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|scope| !scope.is_empty())
        .map(str::to_string)
        .collect()
}

/// Get required environment variable
///
/// # Errors
/// Returns `SessionError::Config` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| SessionError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional number of minutes
fn env_f64(key: &str) -> Result<Option<f64>> {
    std::env::var(key)
        .ok()
        .map(|raw| {
            raw.trim()
                .parse::<f64>()
                .map_err(|e| SessionError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}
