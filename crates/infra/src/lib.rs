//! # Authsession Infrastructure
//!
//! Infrastructure implementations of core session ports.
//!
//! This crate contains:
//! - Key-value stores (JSON file, platform keychain, memory)
//! - HTTP identity provider (authorization code + PKCE, refresh)
//! - Loopback redirect capture and the system browser launcher
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `authsession-core`
//! - Depends on `authsession-domain` and `authsession-common`
//! - Contains all "impure" code (I/O, network, processes)

#![warn(missing_docs)]

pub mod bootstrap;
pub mod browser;
pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod storage;

// Re-export commonly used items
pub use bootstrap::{from_environment, SessionBootstrap};
pub use browser::CommandBrowser;
pub use errors::InfraError;
pub use http::*;
pub use logging::LogFormat;
pub use storage::*;
