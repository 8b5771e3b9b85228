//! One authorization attempt
//!
//! An [`AuthSession`] holds the values that must agree between the
//! authorization request, the callback and the token request. It lives
//! only in memory and is dropped once the flow ends.

use crate::auth::pkce;
use crate::config::AuthenticationSettings;

/// State of a single authorization attempt.
///
/// `state` and `code_verifier` are generated by [`AuthSession::new`] and
/// never reused; `code_challenge` is derived from `code_verifier`.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// OAuth client identifier
    pub client_id: String,
    /// Optional `audience` request parameter
    pub audience: Option<String>,
    /// Space separated scopes
    pub scopes: String,
    /// Anti-CSRF value echoed back on the callback
    pub state: String,
    /// PKCE code verifier, sent only to the token endpoint
    pub code_verifier: String,
    /// PKCE S256 challenge, sent to the authorization endpoint
    pub code_challenge: String,
    /// Redirect URI returned by the callback listener
    pub redirect_uri: String,
}

impl AuthSession {
    /// Starts a session with fresh PKCE and state values.
    ///
    /// # Examples
    ///
    /// ```
    /// use oidc_loopback::auth::session::AuthSession;
    /// use oidc_loopback::config::AuthenticationSettings;
    ///
    /// let settings = AuthenticationSettings {
    ///     client_id: "desktop-app".to_string(),
    ///     ..AuthenticationSettings::default()
    /// };
    /// let session = AuthSession::new(&settings, "http://127.0.0.1:5000/callback");
    /// assert_eq!(session.scopes, "openid email profile");
    /// assert!(session.audience.is_none());
    /// ```
    pub fn new(settings: &AuthenticationSettings, redirect_uri: impl Into<String>) -> Self {
        let challenge = pkce::generate();

        Self {
            client_id: settings.client_id.clone(),
            audience: settings.audience().map(str::to_string),
            scopes: settings.scopes.clone(),
            state: pkce::new_state(),
            code_verifier: challenge.verifier,
            code_challenge: challenge.challenge,
            redirect_uri: redirect_uri.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AuthenticationSettings {
        AuthenticationSettings {
            client_id: "desktop-app".to_string(),
            audience: "https://api.example.com".to_string(),
            ..AuthenticationSettings::default()
        }
    }

    #[test]
    fn test_new_session_challenge_matches_verifier() {
        let session = AuthSession::new(&settings(), "http://127.0.0.1:1/callback");
        assert!(pkce::verify(&session.code_verifier, &session.code_challenge));
    }

    #[test]
    fn test_new_session_copies_settings() {
        let session = AuthSession::new(&settings(), "http://127.0.0.1:1/callback");
        assert_eq!(session.client_id, "desktop-app");
        assert_eq!(session.audience.as_deref(), Some("https://api.example.com"));
        assert_eq!(session.redirect_uri, "http://127.0.0.1:1/callback");
    }

    #[test]
    fn test_sessions_never_share_secrets() {
        let a = AuthSession::new(&settings(), "http://127.0.0.1:1/callback");
        let b = AuthSession::new(&settings(), "http://127.0.0.1:1/callback");
        assert_ne!(a.state, b.state);
        assert_ne!(a.code_verifier, b.code_verifier);
        assert_ne!(a.state, a.code_verifier);
    }
}
