//! Session-independent queries against the token cache
//!
//! These run without a controller, for background tasks and request
//! interceptors that only need the current credentials.

use authsession_common::Clock;
use authsession_domain::constants::{
    EXPIRED_ACCESS_TOKEN_MESSAGE, EXPIRED_TOKENS_MESSAGE, MISSING_ID_TOKEN_MESSAGE,
    MISSING_TOKENS_MESSAGE,
};
use authsession_domain::{Result, SessionError, TokenBundle, UserClaims};
use tracing::warn;

use crate::policy::is_expired;
use crate::ports::TokenCache;
use crate::store::TokenStore;

impl TokenStore {
    /// Access token of the current session, refreshing it first if expired.
    ///
    /// # Errors
    /// The refresh error when refreshing fails, or `SessionError::Validation`
    /// with `"Expired authentication tokens"` when nothing is cached and
    /// `"Expired authentication access token"` when the cached bundle has no
    /// access token.
    pub async fn get_access_token(&self) -> Result<String> {
        let tokens = self
            .resolve()
            .await?
            .ok_or_else(|| SessionError::Validation(EXPIRED_TOKENS_MESSAGE.to_string()))?;

        tokens
            .access_token()
            .map(str::to_string)
            .ok_or_else(|| SessionError::Validation(EXPIRED_ACCESS_TOKEN_MESSAGE.to_string()))
    }

    /// Claims of the cached identity token.
    ///
    /// # Errors
    /// `SessionError::Cache` on storage failure, `SessionError::Validation`
    /// when no bundle or no identity token is cached, `SessionError::Decode`
    /// for a malformed identity token.
    pub async fn get_user_info(&self) -> Result<UserClaims> {
        let cached = self.cache().load().await?;
        let tokens = cached
            .tokens
            .ok_or_else(|| SessionError::Validation(MISSING_TOKENS_MESSAGE.to_string()))?;
        let id_token = tokens
            .id_token()
            .ok_or_else(|| SessionError::Validation(MISSING_ID_TOKEN_MESSAGE.to_string()))?;

        self.decoder()
            .decode(id_token)?
            .ok_or_else(|| SessionError::Validation(MISSING_ID_TOKEN_MESSAGE.to_string()))
    }

    /// Whether the cached access token is past its raw expiration.
    ///
    /// No cached expiration counts as expired. A storage failure is logged
    /// and reported as not expired.
    pub async fn is_token_expired(&self) -> bool {
        match self.cache().load().await {
            Ok(cached) => match cached.expiration {
                Some(_) => is_expired(cached.expiration, 0.0, self.clock().millis_since_epoch()),
                None => true,
            },
            Err(err) => {
                warn!(error = %err, "could not read token expiration");
                false
            }
        }
    }

    /// Cached bundle without any refresh attempt.
    pub async fn cached_tokens(&self) -> Option<TokenBundle> {
        self.cache().read().await.tokens
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for access.
    use std::sync::Arc;

    use authsession_common::MockClock;
    use authsession_domain::constants::OAUTH_TOKENS_EXPIRATION_KEY;
    use authsession_domain::{OAuthConfig, SessionConfig};
    use serde_json::json;

    use super::*;
    use crate::cache::KeyValueTokenCache;
    use crate::testing::{
        bundle_expiring_at, unsigned_jwt, MemoryKeyValueStore, MockBrowser, MockIdentityProvider,
    };

    const NOW: i64 = 1_700_000_000_000;

    fn store_with(kv: Arc<MemoryKeyValueStore>, provider: MockIdentityProvider) -> TokenStore {
        let config = SessionConfig {
            oauth: OAuthConfig {
                issuer: "https://app.example.com".into(),
                client_id: "client".into(),
                redirect_url: "example/callback".into(),
                ..OAuthConfig::default()
            },
            ..SessionConfig::default()
        };
        TokenStore::new(
            Arc::new(KeyValueTokenCache::new(kv)),
            Arc::new(provider),
            Arc::new(MockBrowser::new()),
            &config,
        )
        .with_clock(Arc::new(MockClock::at_millis(NOW)))
    }

    #[tokio::test]
    async fn access_token_of_cached_session() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(kv, MockIdentityProvider::new());
        store.cache().store(&bundle_expiring_at(NOW + 60_000)).await.unwrap();

        assert_eq!(store.get_access_token().await.unwrap(), "access-token-1");
    }

    #[tokio::test]
    async fn access_token_errors_name_the_missing_piece() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(kv, MockIdentityProvider::new());

        let err = store.get_access_token().await.unwrap_err();
        assert_eq!(err.user_message(), "Expired authentication tokens");

        let mut bundle = bundle_expiring_at(NOW + 60_000);
        bundle.access_token = None;
        store.cache().store(&bundle).await.unwrap();
        let err = store.get_access_token().await.unwrap_err();
        assert_eq!(err.user_message(), "Expired authentication access token");
    }

    #[tokio::test]
    async fn access_token_surfaces_refresh_failure() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(kv, MockIdentityProvider::new());
        store
            .cache()
            .store(&bundle_expiring_at(NOW - 1).with_refresh_token("refresh-token-1"))
            .await
            .unwrap();

        let err = store.get_access_token().await.unwrap_err();
        assert_eq!(err, SessionError::Provider("refresh rejected".into()));
    }

    #[tokio::test]
    async fn user_info_decodes_cached_id_token() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(kv, MockIdentityProvider::new());

        let err = store.get_user_info().await.unwrap_err();
        assert_eq!(err.user_message(), MISSING_TOKENS_MESSAGE);

        store.cache().store(&bundle_expiring_at(NOW + 60_000)).await.unwrap();
        let err = store.get_user_info().await.unwrap_err();
        assert_eq!(err.user_message(), MISSING_ID_TOKEN_MESSAGE);

        let id_token = unsigned_jwt(&json!({"sub": "user-1", "name": "Example"}));
        store
            .cache()
            .store(&bundle_expiring_at(NOW + 60_000).with_id_token(id_token))
            .await
            .unwrap();
        let claims = store.get_user_info().await.unwrap();
        assert_eq!(claims.name(), Some("Example"));
    }

    /// Validates the cache-level expiry query.
    ///
    /// Assertions:
    /// - Ensures a past expiration is expired and a future one is not.
    /// - Ensures a missing expiration is expired.
    /// - Ensures a storage failure reports not expired.
    #[tokio::test]
    async fn is_token_expired_cases() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(kv.clone(), MockIdentityProvider::new());

        assert!(store.is_token_expired().await);

        kv.insert(OAUTH_TOKENS_EXPIRATION_KEY, &(NOW - 1_000).to_string());
        assert!(store.is_token_expired().await);

        kv.insert(OAUTH_TOKENS_EXPIRATION_KEY, &(NOW + 60_000).to_string());
        assert!(!store.is_token_expired().await);

        kv.fail_reads(true);
        assert!(!store.is_token_expired().await);
    }
}
