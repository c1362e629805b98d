//! Provider-issued token bundle
//!
//! The bundle is persisted as one JSON document. Fields the provider returns
//! beyond the well-known ones are kept verbatim in `additional` so a
//! store/read round-trip never drops data.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Full set of credentials returned by authorize or refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expiration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    /// Provider fields without a dedicated slot (`expiresIn`, `scope`, ...).
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl TokenBundle {
    /// Bundle holding only an access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self { access_token: Some(access_token.into()), ..Self::default() }
    }

    pub fn with_expiration_date(mut self, date: impl Into<String>) -> Self {
        self.access_token_expiration_date = Some(date.into());
        self
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn with_id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }

    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.additional.insert(key.into(), value);
        self
    }

    /// True when the bundle carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
            && self.access_token_expiration_date.is_none()
            && self.refresh_token.is_none()
            && self.id_token.is_none()
            && self.token_type.is_none()
            && self.scopes.is_empty()
            && self.additional.is_empty()
    }

    /// Non-empty refresh token, if any.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Non-empty identity token, if any.
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Non-empty access token, if any.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Expiration derived from `access_token_expiration_date`.
    pub fn expiration_millis(&self) -> Option<i64> {
        self.access_token_expiration_date.as_deref().and_then(parse_expiration_date)
    }
}

/// Parse a provider expiration date into epoch milliseconds.
///
/// Accepted forms:
/// - RFC 3339 (`2021-03-22T22:50:19Z`, `2021-03-22T19:50:19.000-03:00`)
/// - ISO 8601 without offset, taken as UTC
/// - RFC 2822 (`Mon, 22 Mar 2021 22:50:19 +0000`)
/// - `Mon Mar 22 2021 19:50:19 GMT-0300 (Brasilia Standard Time)`
/// - `Mon Mar 22 2021`, taken as UTC midnight
///
/// Returns `None` for empty or unrecognised input and for the epoch itself,
/// which providers never issue as a real expiry.
pub fn parse_expiration_date(input: &str) -> Option<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let millis = DateTime::parse_from_rfc3339(trimmed)
        .or_else(|_| DateTime::parse_from_rfc2822(trimmed))
        .map(|dt| dt.timestamp_millis())
        .ok()
        .or_else(|| parse_js_date_string(trimmed))
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc().timestamp_millis())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%a %b %d %Y")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc().timestamp_millis())
        })?;

    (millis != 0).then_some(millis)
}

fn parse_js_date_string(input: &str) -> Option<i64> {
    // Drop the trailing "(Zone Name)" annotation.
    let without_zone_name = input.split(" (").next().unwrap_or(input).trim();
    DateTime::parse_from_str(without_zone_name, "%a %b %d %Y %H:%M:%S GMT%z")
        .ok()
        .map(|dt| dt.timestamp_millis())
}
