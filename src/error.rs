//! Error types for oidc-loopback
//!
//! Application-level errors (configuration, reading and parsing the config
//! file) live here. Errors
//! raised by the authorization flow itself are [`AuthError`] values; both
//! travel through the crate as [`anyhow::Error`] so that context can be
//! attached on the way up.

use thiserror::Error;

pub use crate::auth::error::{AuthError, ErrorKind};

/// Main error type for application concerns outside the login flow
#[derive(Error, Debug)]
pub enum OidcLoopbackError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for oidc-loopback operations
///
/// Uses `anyhow::Error` so callers can add context freely. Use
/// [`auth_error_kind`] to recover the kind of a login failure.
pub type Result<T> = anyhow::Result<T>;

/// Returns the [`ErrorKind`] of an error produced by the login flow.
///
/// Returns `None` when the error did not originate from [`AuthError`].
pub fn auth_error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.downcast_ref::<AuthError>().map(AuthError::kind)
}
