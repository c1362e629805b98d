//! Key-value store adapters
//!
//! Backends for the core `KeyValueStore` port, selected by
//! [`StorageBackend`](authsession_domain::StorageBackend).

pub mod file;
pub mod keyring;
pub mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use authsession_core::KeyValueStore;
use authsession_domain::{StorageBackend, StorageConfig};
use tracing::info;

pub use self::file::FileKeyValueStore;
pub use self::keyring::KeyringKeyValueStore;
pub use self::memory::InMemoryKeyValueStore;

const STORE_DIR: &str = "authsession";
const STORE_FILE: &str = "session.json";

/// Build the store named by `config`.
pub fn build_store(config: &StorageConfig) -> Arc<dyn KeyValueStore> {
    info!(backend = %config.backend, "initialising token storage");
    match config.backend {
        StorageBackend::File => {
            let path = config.path.clone().unwrap_or_else(default_store_path);
            Arc::new(FileKeyValueStore::new(path))
        }
        StorageBackend::Keyring => Arc::new(KeyringKeyValueStore::new(&config.service_name)),
        StorageBackend::Memory => Arc::new(InMemoryKeyValueStore::new()),
    }
}

/// `$XDG_DATA_HOME/authsession/session.json`, then `~/.local/share/...`,
/// then the working directory.
pub fn default_store_path() -> PathBuf {
    let base = std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share"))
        })
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(STORE_DIR).join(STORE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_round_trips() {
        let config = StorageConfig { backend: StorageBackend::Memory, ..StorageConfig::default() };
        let store = build_store(&config);

        store.set_item("k", "v").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn default_path_ends_with_store_file() {
        let path = default_store_path();
        assert!(path.ends_with("authsession/session.json"));
    }
}
