//! Failure kinds of the login flow
//!
//! Every variant is terminal for the session that produced it; the flow
//! never retries. A caller that wants another attempt starts a fresh
//! session with new PKCE and state values.

use thiserror::Error;

/// Errors raised while running the authorization code flow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The discovery document or its signing keys could not be obtained.
    #[error("Discovery unavailable: {0}")]
    DiscoveryUnavailable(String),

    /// The loopback callback listener could not be bound or failed while
    /// serving.
    #[error("Callback listener failed: {0}")]
    ListenerBindFailed(String),

    /// The system browser could not be opened.
    #[error("Cannot open default browser: {0}")]
    BrowserLaunchUnsupported(String),

    /// No callback arrived before the listener's ceiling elapsed.
    #[error("Timed out waiting for the authorization callback")]
    Timeout,

    /// The caller canceled the flow while it waited for the callback.
    #[error("Authorization was canceled")]
    Canceled,

    /// The callback did not arrive on the redirect URI sent to the provider.
    #[error("Callback URL {received} does not match the redirect URI {expected}")]
    RedirectMismatch {
        /// Redirect URI recorded in the session
        expected: String,
        /// Callback URL actually received, without its query
        received: String,
    },

    /// The provider reported an error on the callback.
    #[error("Authorization request failed: \"{error}\": {description}")]
    AuthorizationDenied {
        /// OAuth `error` code
        error: String,
        /// OAuth `error_description`, or `Unknown Error`
        description: String,
    },

    /// The returned state did not match, or no code was returned.
    #[error("Authorization state was not valid")]
    InvalidState,

    /// The token endpoint rejected the exchange or could not be reached.
    #[error("Token request failed: {reason}")]
    TokenExchangeFailed {
        /// HTTP status code, when a response was received
        status: Option<u16>,
        /// Canonical reason phrase for the status (not the phrase the
        /// provider sent), or the transport failure description
        reason: String,
    },

    /// The token response or ID token could not be parsed.
    #[error("Token malformed: {0}")]
    TokenMalformed(String),

    /// The ID token failed signature or claim validation.
    #[error("Token validation failed: {0}")]
    TokenValidationFailed(String),
}

/// Data-free mirror of [`AuthError`], used to record why a flow failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DiscoveryUnavailable,
    ListenerBindFailed,
    BrowserLaunchUnsupported,
    Timeout,
    Canceled,
    RedirectMismatch,
    AuthorizationDenied,
    InvalidState,
    TokenExchangeFailed,
    TokenMalformed,
    TokenValidationFailed,
}

impl AuthError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::DiscoveryUnavailable(_) => ErrorKind::DiscoveryUnavailable,
            AuthError::ListenerBindFailed(_) => ErrorKind::ListenerBindFailed,
            AuthError::BrowserLaunchUnsupported(_) => ErrorKind::BrowserLaunchUnsupported,
            AuthError::Timeout => ErrorKind::Timeout,
            AuthError::Canceled => ErrorKind::Canceled,
            AuthError::RedirectMismatch { .. } => ErrorKind::RedirectMismatch,
            AuthError::AuthorizationDenied { .. } => ErrorKind::AuthorizationDenied,
            AuthError::InvalidState => ErrorKind::InvalidState,
            AuthError::TokenExchangeFailed { .. } => ErrorKind::TokenExchangeFailed,
            AuthError::TokenMalformed(_) => ErrorKind::TokenMalformed,
            AuthError::TokenValidationFailed(_) => ErrorKind::TokenValidationFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_denied_display() {
        let error = AuthError::AuthorizationDenied {
            error: "access_denied".to_string(),
            description: "User cancelled".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Authorization request failed: \"access_denied\": User cancelled"
        );
    }

    #[test]
    fn test_token_exchange_failed_display_carries_reason() {
        let error = AuthError::TokenExchangeFailed {
            status: Some(400),
            reason: "Bad Request".to_string(),
        };
        assert_eq!(error.to_string(), "Token request failed: Bad Request");
    }

    #[test]
    fn test_redirect_mismatch_display() {
        let error = AuthError::RedirectMismatch {
            expected: "http://127.0.0.1:5001/callback".to_string(),
            received: "http://127.0.0.1:5000/callback".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("5000"));
        assert!(msg.contains("5001"));
    }

    #[test]
    fn test_kind_maps_every_variant() {
        let cases = [
            (AuthError::DiscoveryUnavailable(String::new()), ErrorKind::DiscoveryUnavailable),
            (AuthError::ListenerBindFailed(String::new()), ErrorKind::ListenerBindFailed),
            (
                AuthError::BrowserLaunchUnsupported(String::new()),
                ErrorKind::BrowserLaunchUnsupported,
            ),
            (AuthError::Timeout, ErrorKind::Timeout),
            (AuthError::Canceled, ErrorKind::Canceled),
            (AuthError::InvalidState, ErrorKind::InvalidState),
            (AuthError::TokenMalformed(String::new()), ErrorKind::TokenMalformed),
            (
                AuthError::TokenValidationFailed(String::new()),
                ErrorKind::TokenValidationFailed,
            ),
        ];
        for (error, kind) in cases {
            assert_eq!(error.kind(), kind, "{error}");
        }
    }
}
