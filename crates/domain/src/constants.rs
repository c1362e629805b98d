//! Session constants
//!
//! Storage keys and the fixed, user-facing messages surfaced through
//! `SessionState::error` and the controller snapshot.

// Persisted layout
/// Key holding the serialized token bundle
pub const OAUTH_TOKENS_KEY: &str = "@authsession/oauth_tokens";
/// Key holding the access token expiration in epoch milliseconds
pub const OAUTH_TOKENS_EXPIRATION_KEY: &str = "@authsession/oauth_tokens_expiration";

// Time
/// Milliseconds per minute
pub const MINUTE_MS: i64 = 60_000;
/// Default remaining lifetime below which the mount guard ends the session
pub const DEFAULT_MINIMUM_TOKEN_EXPIRATION_MINUTES: f64 = 120.0;

// Messages surfaced to the UI layer
/// Fallback when a provider failure carries no message
pub const DEFAULT_AUTHORIZATION_ERROR: &str = "Authorization error";
/// Set on the session when logout fails
pub const LOGOUT_ERROR_MESSAGE: &str = "Error in logout";
/// Set when the identity token cannot be decoded
pub const INVALID_ID_TOKEN_MESSAGE: &str = "Invalid identity token";
/// Browser port reported no usable browser
pub const BROWSER_UNAVAILABLE_MESSAGE: &str = "InAppBrowser is not available";
/// Cached tokens are expired and cannot be refreshed
pub const EXPIRED_TOKENS_MESSAGE: &str = "Expired authentication tokens";
/// Cached access token is expired
pub const EXPIRED_ACCESS_TOKEN_MESSAGE: &str = "Expired authentication access token";
/// No tokens are cached
pub const MISSING_TOKENS_MESSAGE: &str = "cant get oauth tokens";
/// Cached tokens carry no identity token
pub const MISSING_ID_TOKEN_MESSAGE: &str = "cant get id token";

// Validation messages
/// Bundle stored without an access token expiration
pub const EXPIRATION_DATE_REQUIRED: &str = "oauthTokens.accessTokenExpirationDate is required";
/// Refresh requested without a refresh token
pub const REFRESH_TOKEN_REQUIRED: &str = "refresh token param is required";
/// Operation requested without provider configuration
pub const CONFIG_REQUIRED: &str = "config param is required";
