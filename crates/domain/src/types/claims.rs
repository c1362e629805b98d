//! Decoded identity-token claims

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload of an identity token. Not signature-verified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserClaims(Map<String, Value>);

impl UserClaims {
    /// Accepts only JSON objects; any other payload shape yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Raw value of `claim`
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    fn get_str(&self, claim: &str) -> Option<&str> {
        self.0.get(claim).and_then(Value::as_str)
    }

    /// `sub` claim
    pub fn subject(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// `email` claim
    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    /// `name` claim
    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    /// `iss` claim
    pub fn issuer(&self) -> Option<&str> {
        self.get_str("iss")
    }

    /// `exp` claim in epoch seconds.
    pub fn expires_at(&self) -> Option<i64> {
        self.0.get("exp").and_then(Value::as_i64)
    }

    /// All claims as decoded
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying claim map
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for claims.
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_standard_claims() {
        let claims = UserClaims::from_value(json!({
            "sub": "user-1",
            "email": "user@example.com",
            "name": "Example User",
            "iss": "https://app.example.com",
            "exp": 1_616_453_419
        }))
        .unwrap();

        assert_eq!(claims.subject(), Some("user-1"));
        assert_eq!(claims.email(), Some("user@example.com"));
        assert_eq!(claims.name(), Some("Example User"));
        assert_eq!(claims.issuer(), Some("https://app.example.com"));
        assert_eq!(claims.expires_at(), Some(1_616_453_419));
        assert_eq!(claims.as_map().len(), 5);
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(UserClaims::from_value(json!("string")).is_none());
        assert!(UserClaims::from_value(json!([1, 2])).is_none());
        assert!(UserClaims::from_value(Value::Null).is_none());
    }
}
