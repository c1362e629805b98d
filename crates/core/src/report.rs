//! Failure logging at the level an error's severity calls for

use authsession_common::{ErrorClassification, ErrorSeverity};
use authsession_domain::SessionError;
use tracing::{debug, error, warn, Level};

/// Level used for `err`.
pub(crate) fn level_for(err: &SessionError) -> Level {
    match err.severity() {
        ErrorSeverity::Info => Level::DEBUG,
        ErrorSeverity::Warning => Level::WARN,
        ErrorSeverity::Error | ErrorSeverity::Critical => Level::ERROR,
    }
}

/// Log a failed `action`, swallowed or surfaced to the session.
pub(crate) fn report(err: &SessionError, action: &'static str) {
    let kind = err.kind();
    let retryable = err.is_retryable();
    match level_for(err) {
        Level::ERROR => error!(error = %err, kind, retryable, action, "session operation failed"),
        Level::WARN => warn!(error = %err, kind, retryable, action, "session operation failed"),
        _ => debug!(error = %err, kind, retryable, action, "session operation failed"),
    }
}
