//! HTTP identity provider
//!
//! [`HttpIdentityProvider`] runs the authorization-code flow with PKCE
//! against the configured endpoints. The interactive step is delegated to an
//! [`AuthorizationAgent`]; [`LoopbackAgent`] serves the redirect on a local
//! port.

pub mod client;
pub mod loopback;
pub mod provider;

pub use client::{HttpClient, HttpClientBuilder, Replay};
pub use loopback::LoopbackAgent;
pub use provider::{AuthorizationAgent, HttpIdentityProvider};
