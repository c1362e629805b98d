//! Port interfaces for the session lifecycle
//!
//! These traits define the boundaries between the token-lifecycle logic and
//! the platform: persistence, the identity provider, the in-app browser and
//! the identity-token decoding primitive.

use async_trait::async_trait;
use authsession_domain::{InAppBrowserConfig, OAuthConfig, Result, TokenBundle};
use serde_json::Value;
use tracing::warn;

/// Asynchronous string key-value store
///
/// No atomicity is guaranteed across keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent.
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn remove_item(&self, key: &str) -> Result<()>;
}

/// Identity-provider client driving the authorization-code flow
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Run the interactive authorization flow and exchange the code.
    async fn authorize(&self, config: &OAuthConfig) -> Result<TokenBundle>;

    /// Exchange a refresh token for a new bundle.
    async fn refresh(&self, config: &OAuthConfig, refresh_token: &str) -> Result<TokenBundle>;
}

/// In-app browser used for the provider logout page
#[async_trait]
pub trait InAppBrowser: Send + Sync {
    /// Whether a browser can be opened on this platform.
    async fn is_available(&self) -> Result<bool>;

    /// Open `url` with the given chrome options.
    async fn open(&self, url: &str, config: &InAppBrowserConfig) -> Result<()>;
}

/// Claims-decoding primitive: token in, JSON payload out
pub trait TokenDecoder: Send + Sync {
    /// Decode the payload of `token` without verifying its signature.
    fn decode(&self, token: &str) -> Result<Value>;
}

/// Snapshot of the two persisted cache entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedTokens {
    /// Bundle under the tokens key
    pub tokens: Option<TokenBundle>,
    /// Epoch milliseconds stored alongside the bundle.
    pub expiration: Option<i64>,
}

/// Persistence of the token bundle and its derived expiration
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Persist the bundle and its expiration as two entries.
    ///
    /// # Errors
    /// `SessionError::Validation` when the bundle has no parseable expiration
    /// date (nothing is written); `SessionError::Cache` on I/O failure.
    async fn store(&self, tokens: &TokenBundle) -> Result<()>;

    /// Read both entries, surfacing I/O failures.
    async fn load(&self) -> Result<CachedTokens>;

    /// Read both entries; failures resolve to an empty result.
    async fn read(&self) -> CachedTokens {
        match self.load().await {
            Ok(cached) => cached,
            Err(err) => {
                warn!(error = %err, "token cache read failed, treating as unauthenticated");
                CachedTokens::default()
            }
        }
    }

    /// Remove both entries. Returns `false` if any removal failed.
    async fn clear(&self) -> bool;
}
