//! OAuth client configuration
//!
//! Keys are snake_case in config files; the camelCase spelling used by
//! mobile OAuth clients (`clientId`, `redirectUrl`, ...) is accepted as an
//! alias so existing configuration can be reused.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::CONFIG_REQUIRED;
use crate::errors::{Result, SessionError};

/// Explicit endpoints, bypassing issuer-based discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfiguration {
    #[serde(alias = "authorizationEndpoint")]
    pub authorization_endpoint: String,
    #[serde(alias = "tokenEndpoint")]
    pub token_endpoint: String,
}

/// Single-issuer client configuration passed to the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Issuer base URL; endpoints derive from it unless given explicitly.
    pub issuer: String,
    #[serde(alias = "clientId")]
    pub client_id: String,
    #[serde(alias = "redirectUrl")]
    pub redirect_url: String,
    /// Requested scopes, in order.
    pub scopes: Vec<String>,
    #[serde(alias = "serviceConfiguration", skip_serializing_if = "Option::is_none")]
    pub service_configuration: Option<ServiceConfiguration>,
    /// Extra query parameters appended to the authorization request.
    #[serde(alias = "additionalParameters", skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_parameters: BTreeMap<String, String>,
}

impl OAuthConfig {
    /// True when nothing identifying a client has been configured.
    pub fn is_empty(&self) -> bool {
        self.issuer.trim().is_empty()
            && self.client_id.trim().is_empty()
            && self.service_configuration.is_none()
    }

    /// Check the fields every authorize or refresh call needs.
    ///
    /// # Errors
    /// Returns `SessionError::Config` when the configuration is empty, lacks
    /// a client id or redirect URL, or names neither an issuer nor explicit
    /// endpoints.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(SessionError::Config(CONFIG_REQUIRED.to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(SessionError::Config("client_id is required".to_string()));
        }
        if self.redirect_url.trim().is_empty() {
            return Err(SessionError::Config("redirect_url is required".to_string()));
        }
        if self.issuer.trim().is_empty() && self.service_configuration.is_none() {
            return Err(SessionError::Config(
                "either issuer or service_configuration is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Authorization endpoint, explicit or derived from the issuer.
    pub fn authorization_endpoint(&self) -> String {
        self.service_configuration.as_ref().map_or_else(
            || format!("{}/authorize", self.issuer.trim_end_matches('/')),
            |service| service.authorization_endpoint.clone(),
        )
    }

    /// Token endpoint, explicit or derived from the issuer.
    pub fn token_endpoint(&self) -> String {
        self.service_configuration.as_ref().map_or_else(
            || format!("{}/oauth/token", self.issuer.trim_end_matches('/')),
            |service| service.token_endpoint.clone(),
        )
    }

    /// Space-separated scope string for the wire.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}
