//! Tracing subscriber setup
//!
//! Filter directives come from `AUTHSESSION_LOG`, then `RUST_LOG`, then
//! default to `info`. Token values are never logged by this workspace, only
//! their presence and expiration.

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "AUTHSESSION_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Output format for [`init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Resolve the filter from the environment. Invalid directives fall back
/// to `info`.
pub fn env_filter() -> EnvFilter {
    let directives = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .unwrap_or_else(|_| DEFAULT_DIRECTIVE.to_string());

    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed, which happens
/// when a host application or a previous test set one up.
pub fn init(format: LogFormat) -> bool {
    let registry = tracing_subscriber::registry().with(env_filter());
    let result = match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_current_span(false)).try_init(),
    };
    result.is_ok()
}
