//! Callback validation
//!
//! Turns a [`CallbackOutcome`] into an [`AuthorizationResult`], or into the
//! [`AuthError`] that ends the flow. Checks run in a fixed order:
//!
//! 1. Listener outcome (timeout, cancellation, listener failure)
//! 2. Callback URL against the session's redirect URI
//! 3. Provider `error` parameter
//! 4. `state` and `code`

use url::Url;

use crate::auth::error::AuthError;
use crate::auth::listener::CallbackOutcome;
use crate::auth::session::AuthSession;
use crate::error::Result;

/// Description used when the provider sends `error` without
/// `error_description`.
pub const UNKNOWN_ERROR_DESCRIPTION: &str = "Unknown Error";

/// A callback that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResult {
    /// Authorization code to redeem at the token endpoint. Never empty.
    pub authorization_code: String,
    /// `state` as returned by the provider; equals the session's state.
    pub returned_state: String,
    /// Full callback URL as received.
    pub redirect_url: Url,
}

/// Validates the listener outcome against `session`.
///
/// # Errors
///
/// - [`AuthError::Timeout`] / [`AuthError::Canceled`] for the matching
///   outcomes, [`AuthError::ListenerBindFailed`] for a listener failure
/// - [`AuthError::RedirectMismatch`] when scheme, host, port or path differ
///   from the session's redirect URI; this wins over a provider error
/// - [`AuthError::AuthorizationDenied`] when the callback carries `error`
/// - [`AuthError::InvalidState`] when `state` differs or `code` is empty
pub fn validate_callback(
    outcome: CallbackOutcome,
    session: &AuthSession,
) -> Result<AuthorizationResult> {
    let url = match outcome {
        CallbackOutcome::Received(url) => url,
        CallbackOutcome::TimedOut => return Err(AuthError::Timeout.into()),
        CallbackOutcome::Canceled => return Err(AuthError::Canceled.into()),
        CallbackOutcome::ListenerError(message) => {
            return Err(AuthError::ListenerBindFailed(message).into())
        }
    };

    if !same_endpoint(&url, &session.redirect_uri) {
        let mut received = url.clone();
        received.set_query(None);
        return Err(AuthError::RedirectMismatch {
            expected: session.redirect_uri.clone(),
            received: received.to_string(),
        }
        .into());
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut error_description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" if code.is_none() => code = Some(value.into_owned()),
            "state" if state.is_none() => state = Some(value.into_owned()),
            "error" if error.is_none() => error = Some(value.into_owned()),
            "error_description" if error_description.is_none() => {
                error_description = Some(value.into_owned())
            }
            _ => {}
        }
    }

    if let Some(error) = error {
        let description = error_description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| UNKNOWN_ERROR_DESCRIPTION.to_string());
        tracing::warn!("Provider returned error {}: {}", error, description);
        return Err(AuthError::AuthorizationDenied { error, description }.into());
    }

    let state = state.unwrap_or_default();
    let code = code.unwrap_or_default();
    let state_matches = state == session.state;
    let has_code = !code.is_empty();
    if !state_matches || !has_code {
        tracing::warn!(
            "Rejecting callback (state matches: {}, code present: {})",
            state_matches,
            has_code
        );
        return Err(AuthError::InvalidState.into());
    }

    Ok(AuthorizationResult {
        authorization_code: code,
        returned_state: state,
        redirect_url: url,
    })
}

/// Scheme, host, port and path equality; the query is ignored.
fn same_endpoint(received: &Url, expected: &str) -> bool {
    let Ok(expected) = Url::parse(expected) else {
        return false;
    };

    received.scheme() == expected.scheme()
        && received.host_str() == expected.host_str()
        && received.port_or_known_default() == expected.port_or_known_default()
        && received.path() == expected.path()
}
