//! Identity-token claims decoding
//!
//! Claims are read from the JWT payload segment only. Signatures are not
//! verified.

use std::sync::Arc;

use authsession_domain::{Result, SessionError, UserClaims};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

use crate::ports::TokenDecoder;

/// Decodes the base64url payload segment of a compact JWT.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtPayloadDecoder;

impl TokenDecoder for JwtPayloadDecoder {
    fn decode(&self, token: &str) -> Result<Value> {
        let mut segments = token.trim().split('.');
        let payload = match (segments.next(), segments.next()) {
            (Some(_header), Some(payload)) if !payload.is_empty() => payload,
            _ => return Err(SessionError::Decode("missing payload segment".into())),
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|err| SessionError::Decode(format!("invalid base64 payload: {err}")))?;

        serde_json::from_slice(&bytes)
            .map_err(|err| SessionError::Decode(format!("invalid JSON payload: {err}")))
    }
}

/// Turns identity tokens into [`UserClaims`] through a [`TokenDecoder`].
#[derive(Clone)]
pub struct ClaimsDecoder {
    primitive: Arc<dyn TokenDecoder>,
}

impl Default for ClaimsDecoder {
    fn default() -> Self {
        Self::new(Arc::new(JwtPayloadDecoder))
    }
}

impl ClaimsDecoder {
    /// Wrap a decoding primitive
    pub fn new(primitive: Arc<dyn TokenDecoder>) -> Self {
        Self { primitive }
    }

    /// Decode `id_token`; `Ok(None)` for an empty token.
    ///
    /// # Errors
    /// `SessionError::Decode` when the token is malformed or its payload is
    /// not a JSON object.
    pub fn decode(&self, id_token: &str) -> Result<Option<UserClaims>> {
        if id_token.trim().is_empty() {
            return Ok(None);
        }

        let payload = self.primitive.decode(id_token).map_err(|err| match err {
            SessionError::Decode(_) => err,
            other => SessionError::Decode(other.user_message().to_string()),
        })?;

        UserClaims::from_value(payload)
            .map(Some)
            .ok_or_else(|| SessionError::Decode("payload is not a JSON object".into()))
    }
}
