//! Token cache over a key-value store
//!
//! The bundle is written as JSON under [`OAUTH_TOKENS_KEY`] and its derived
//! expiration as a decimal epoch-millisecond string under
//! [`OAUTH_TOKENS_EXPIRATION_KEY`]. The two writes are independent; readers
//! may observe one without the other.

use std::sync::Arc;

use async_trait::async_trait;
use authsession_domain::constants::{
    EXPIRATION_DATE_REQUIRED, OAUTH_TOKENS_EXPIRATION_KEY, OAUTH_TOKENS_KEY,
};
use authsession_domain::{Result, SessionError, TokenBundle};
use tracing::{debug, warn};

use crate::ports::{CachedTokens, KeyValueStore, TokenCache};

/// [`TokenCache`] backed by any [`KeyValueStore`]
#[derive(Clone)]
pub struct KeyValueTokenCache {
    store: Arc<dyn KeyValueStore>,
}

impl KeyValueTokenCache {
    /// Cache over `store` using the well-known key
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TokenCache for KeyValueTokenCache {
    async fn store(&self, tokens: &TokenBundle) -> Result<()> {
        let expiration = tokens
            .expiration_millis()
            .ok_or_else(|| SessionError::Validation(EXPIRATION_DATE_REQUIRED.to_string()))?;

        let serialized = serde_json::to_string(tokens)?;
        self.store.set_item(OAUTH_TOKENS_KEY, &serialized).await?;
        self.store.set_item(OAUTH_TOKENS_EXPIRATION_KEY, &expiration.to_string()).await?;

        debug!(expiration, "token bundle stored");
        Ok(())
    }

    async fn load(&self) -> Result<CachedTokens> {
        let raw_tokens = self.store.get_item(OAUTH_TOKENS_KEY).await?;
        let raw_expiration = self.store.get_item(OAUTH_TOKENS_EXPIRATION_KEY).await?;

        let tokens = raw_tokens.as_deref().and_then(parse_tokens);
        let expiration = raw_expiration.as_deref().and_then(parse_expiration);

        debug!(has_tokens = tokens.is_some(), expiration = ?expiration, "token cache loaded");
        Ok(CachedTokens { tokens, expiration })
    }

    async fn clear(&self) -> bool {
        let mut cleared = true;
        for key in [OAUTH_TOKENS_KEY, OAUTH_TOKENS_EXPIRATION_KEY] {
            if let Err(err) = self.store.remove_item(key).await {
                warn!(key, error = %err, "failed to remove token cache entry");
                cleared = false;
            }
        }
        cleared
    }
}

fn parse_tokens(raw: &str) -> Option<TokenBundle> {
    match serde_json::from_str::<TokenBundle>(raw) {
        Ok(bundle) if bundle.is_empty() => None,
        Ok(bundle) => Some(bundle),
        Err(err) => {
            warn!(error = %err, "discarding unreadable token bundle");
            None
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_expiration(raw: &str) -> Option<i64> {
    let trimmed = raw.trim().trim_matches('"');
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
}
