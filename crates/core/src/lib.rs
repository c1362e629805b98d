//! # Authsession Core
//!
//! Token-lifecycle logic for a client-side OAuth/OIDC session.
//!
//! This crate contains:
//! - Port interfaces (key-value store, identity provider, browser, decoder)
//! - The token cache, token store and expiration policy
//! - The session controller with its broadcast context
//! - Expiration guards wrapping UI components
//!
//! ## Architecture Principles
//! - Depends only on `authsession-common` and `authsession-domain`
//! - No filesystem, HTTP, or platform code
//! - All external collaborators via traits

#![warn(missing_docs)]

pub mod access;
pub mod cache;
pub mod claims;
pub mod guard;
pub mod policy;
pub mod ports;
mod report;
pub mod session;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
#[allow(missing_docs)]
pub mod testing;

pub use cache::KeyValueTokenCache;
pub use claims::{ClaimsDecoder, JwtPayloadDecoder};
pub use guard::{
    callback, with_minimum_expiration_time, with_tokens_expiration_access, Component,
    ExpirationGuard, GuardCallback, GuardContext, GuardOptions, GuardOutcome, LogoutAction,
    MountExpirationGuard, MountGuardOptions,
};
pub use policy::{ExpirationPolicy, ExpirationStatus};
pub use ports::{CachedTokens, IdentityProvider, InAppBrowser, KeyValueStore, TokenCache, TokenDecoder};
pub use session::{SessionController, SessionHandle, SessionProvider};
pub use store::TokenStore;
