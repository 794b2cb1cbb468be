//! Conversions from external infrastructure errors into domain errors.

use loopauth_domain::LoopauthError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub LoopauthError);

impl From<InfraError> for LoopauthError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<LoopauthError> for InfraError {
    fn from(value: LoopauthError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoLoopauthError {
    fn into_loopauth(self) -> LoopauthError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → LoopauthError */
/* -------------------------------------------------------------------------- */

impl IntoLoopauthError for HttpError {
    fn into_loopauth(self) -> LoopauthError {
        if self.is_timeout() {
            return LoopauthError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return LoopauthError::Network("HTTP connection failure".into());
        }

        if self.is_builder() {
            return LoopauthError::Config(format!("invalid HTTP client configuration: {self}"));
        }

        LoopauthError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_loopauth())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → LoopauthError */
/* -------------------------------------------------------------------------- */

impl IntoLoopauthError for std::io::Error {
    fn into_loopauth(self) -> LoopauthError {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::AddrInUse => LoopauthError::Loopback(format!("address already in use: {self}")),
            ErrorKind::AddrNotAvailable => {
                LoopauthError::Loopback(format!("address not available: {self}"))
            }
            ErrorKind::PermissionDenied => {
                LoopauthError::Platform(format!("permission denied: {self}"))
            }
            ErrorKind::NotFound => LoopauthError::Config(format!("file not found: {self}")),
            _ => LoopauthError::Internal(self.to_string()),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_loopauth())
    }
}

/* -------------------------------------------------------------------------- */
/* config parse errors → LoopauthError */
/* -------------------------------------------------------------------------- */

impl IntoLoopauthError for toml::de::Error {
    fn into_loopauth(self) -> LoopauthError {
        LoopauthError::Config(format!("Invalid TOML format: {self}"))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(value.into_loopauth())
    }
}

impl IntoLoopauthError for serde_json::Error {
    fn into_loopauth(self) -> LoopauthError {
        LoopauthError::Config(format!("Invalid JSON format: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_loopauth())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
