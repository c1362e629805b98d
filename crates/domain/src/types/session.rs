//! Session state exposed to observers

use serde::Serialize;

use super::claims::UserClaims;
use super::tokens::TokenBundle;
use crate::impl_label_conversions;

/// Normalized outcome of authorize, refresh or cache validation.
///
/// `is_logged` is true exactly when `oauth_tokens` is present and non-empty.
/// Fields are private so the invariant can only be established through the
/// constructors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    is_logged: bool,
    oauth_tokens: Option<TokenBundle>,
    error: Option<String>,
}

impl SessionState {
    /// Unauthenticated default.
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// Wrap a bundle; empty bundles collapse into the logged-out state.
    pub fn from_tokens(tokens: Option<TokenBundle>) -> Self {
        let tokens = tokens.filter(|bundle| !bundle.is_empty());
        Self { is_logged: tokens.is_some(), oauth_tokens: tokens, error: None }
    }

    /// Logged-out state carrying a user-facing error message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self { is_logged: false, oauth_tokens: None, error: Some(message.into()) }
    }

    /// Whether an access token was resolved
    pub const fn is_logged(&self) -> bool {
        self.is_logged
    }

    /// Tokens backing the session, if any
    pub const fn oauth_tokens(&self) -> Option<&TokenBundle> {
        self.oauth_tokens.as_ref()
    }

    /// Message from the last failed operation
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Identity token of the current bundle, if any.
    pub fn id_token(&self) -> Option<&str> {
        self.oauth_tokens.as_ref().and_then(TokenBundle::id_token)
    }
}

/// Lifecycle phase of a session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Before the first validation settles
    #[default]
    InitialLoading,
    /// Cache check (and refresh) in flight
    Validating,
    /// Session holds an access token
    LoggedIn,
    /// No usable session
    LoggedOut,
    /// Logout in flight
    LoggingOut,
    /// Last operation failed
    Error,
}

impl_label_conversions!(SessionPhase {
    InitialLoading => "initial_loading",
    Validating => "validating",
    LoggedIn => "logged_in",
    LoggedOut => "logged_out",
    LoggingOut => "logging_out",
    Error => "error",
});

/// Everything an observer of a controller sees at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Current session
    pub session: SessionState,
    /// Claims decoded from the identity token
    pub user_claims: Option<UserClaims>,
    /// A validation or login is in flight
    pub loading: bool,
    /// Message from the last failed operation
    pub error: Option<String>,
    /// Controller phase
    pub phase: SessionPhase,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            session: SessionState::logged_out(),
            user_claims: None,
            loading: true,
            error: None,
            phase: SessionPhase::InitialLoading,
        }
    }
}

impl SessionSnapshot {
    /// Whether the current session is logged in
    pub const fn is_logged(&self) -> bool {
        self.session.is_logged()
    }

    /// Tokens backing the current session
    pub const fn oauth_tokens(&self) -> Option<&TokenBundle> {
        self.session.oauth_tokens()
    }
}
