//! # authsession Domain
//!
//! Session domain types for authsession.
//!
//! This crate contains:
//! - Token bundle, session state and identity claims
//! - Domain error types and Result definitions
//! - Configuration structures (OAuth client, in-app browser, storage, guard)
//! - Domain constants (storage keys, fixed user-facing messages)
//!
//! ## Architecture
//! - Depends only on `authsession-common` for error classification
//! - No I/O, no async runtime
//! - Pure domain models and data structures

#![warn(missing_docs)]

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
