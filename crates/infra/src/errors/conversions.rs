//! Conversions from external infrastructure errors into session errors.

use authsession_domain::SessionError;
use keyring::Error as KeyringError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the session error.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct InfraError(pub SessionError);

impl From<InfraError> for SessionError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SessionError> for InfraError {
    fn from(value: SessionError) -> Self {
        Self(value)
    }
}

trait IntoSessionError {
    fn into_session(self) -> SessionError;
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → SessionError */
/* -------------------------------------------------------------------------- */

impl IntoSessionError for KeyringError {
    fn into_session(self) -> SessionError {
        let description = self.to_string();

        match self {
            KeyringError::NoEntry => SessionError::Cache("keychain entry not found".into()),
            KeyringError::BadEncoding(_) => {
                SessionError::Cache("credential in keychain is not valid UTF-8".into())
            }
            KeyringError::TooLong(name, limit) => SessionError::Cache(format!(
                "keychain attribute '{name}' exceeds platform limit ({limit})"
            )),
            KeyringError::PlatformFailure(err) => {
                SessionError::Cache(format!("keychain platform error: {err}"))
            }
            KeyringError::NoStorageAccess(err) => {
                SessionError::Cache(format!("unable to access secure storage: {err}"))
            }
            _ => SessionError::Cache(description),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        Self(value.into_session())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → SessionError */
/* -------------------------------------------------------------------------- */

impl IntoSessionError for std::io::Error {
    fn into_session(self) -> SessionError {
        SessionError::Cache(format!("storage I/O failure ({:?}): {self}", self.kind()))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        Self(value.into_session())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SessionError */
/* -------------------------------------------------------------------------- */

impl IntoSessionError for HttpError {
    fn into_session(self) -> SessionError {
        if self.is_timeout() {
            return SessionError::Provider("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SessionError::Provider("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return SessionError::Provider(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            ));
        }

        if self.is_decode() {
            return SessionError::Provider(format!("malformed token endpoint response: {self}"));
        }

        SessionError::Provider(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_session())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
