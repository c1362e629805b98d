//! Platform keychain store
//!
//! One keychain entry per key under a shared service name. The `keyring`
//! API is blocking, so every call runs on the blocking pool.

use async_trait::async_trait;
use authsession_core::KeyValueStore;
use authsession_domain::{Result, SessionError};
use tracing::debug;

use crate::errors::InfraError;

/// Store backed by the platform credential manager.
#[derive(Debug, Clone)]
pub struct KeyringKeyValueStore {
    service_name: String,
}

impl KeyringKeyValueStore {
    /// Store entries under `service_name` in the OS credential store.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    /// Keyring service the entries live under
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    async fn with_entry<T, F>(&self, key: &str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(::keyring::Entry) -> std::result::Result<T, ::keyring::Error> + Send + 'static,
    {
        let service = self.service_name.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let entry = ::keyring::Entry::new(&service, &key).map_err(InfraError::from)?;
            op(entry).map_err(|err| SessionError::from(InfraError::from(err)))
        })
        .await
        .map_err(|err| SessionError::Cache(format!("keychain task failed: {err}")))?
    }
}

#[async_trait]
impl KeyValueStore for KeyringKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        debug!(service = %self.service_name, key, "reading keychain entry");
        self.with_entry(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(::keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err),
        })
        .await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        debug!(service = %self.service_name, key, "writing keychain entry");
        let value = value.to_string();
        self.with_entry(key, move |entry| entry.set_password(&value)).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        debug!(service = %self.service_name, key, "deleting keychain entry");
        self.with_entry(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(::keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err),
        })
        .await
    }
}
