//! Modular common utilities shared across authsession crates.
//!
//! # Feature Tiers
//!
//! - `foundation` (default): [`time`] clock abstraction and [`error`]
//!   classification
//! - `pkce`: RFC 7636 helpers for browser-based authorization flows

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
pub mod error;
pub mod time;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "pkce")]
pub mod pkce;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use error::{ErrorClassification, ErrorSeverity};
pub use time::{Clock, MockClock, SystemClock};
