//! Authorization request URL
//!
//! Builds the URL the browser is sent to. Parameters are appended in a
//! fixed order and each value is percent-encoded on its own.

use url::Url;

use crate::auth::discovery::DiscoveryDocument;
use crate::auth::error::AuthError;
use crate::auth::pkce::CHALLENGE_METHOD;
use crate::auth::session::AuthSession;
use crate::error::Result;

/// Builds the authorization request URL for `session`.
///
/// Query parameters, in order: `response_type=code`, `client_id`,
/// `redirect_uri`, `scope`, `state`, `code_challenge`,
/// `code_challenge_method=S256` and, when the session has one, `audience`.
/// Any query already present on the endpoint is preserved in front.
///
/// # Errors
///
/// Returns [`AuthError::DiscoveryUnavailable`] when the discovery document's
/// authorization endpoint is not a valid URL.
///
/// # Examples
///
/// ```
/// use jsonwebtoken::jwk::JwkSet;
/// use oidc_loopback::auth::discovery::DiscoveryDocument;
/// use oidc_loopback::auth::request::build_authorization_url;
/// use oidc_loopback::auth::session::AuthSession;
/// use oidc_loopback::config::AuthenticationSettings;
///
/// let discovery = DiscoveryDocument {
///     issuer: "https://auth.example.com/".to_string(),
///     authorization_endpoint: "https://auth.example.com/authorize".to_string(),
///     token_endpoint: "https://auth.example.com/oauth/token".to_string(),
///     jwks_uri: "https://auth.example.com/jwks".to_string(),
///     signing_keys: JwkSet { keys: vec![] },
/// };
/// let settings = AuthenticationSettings {
///     client_id: "desktop-app".to_string(),
///     ..AuthenticationSettings::default()
/// };
/// let session = AuthSession::new(&settings, "http://127.0.0.1:5000/callback");
///
/// let url = build_authorization_url(&discovery, &session).unwrap();
/// assert!(url.as_str().starts_with("https://auth.example.com/authorize?response_type=code"));
/// ```
pub fn build_authorization_url(
    discovery: &DiscoveryDocument,
    session: &AuthSession,
) -> Result<Url> {
    let mut url = Url::parse(&discovery.authorization_endpoint).map_err(|e| {
        AuthError::DiscoveryUnavailable(format!(
            "invalid authorization endpoint {:?}: {e}",
            discovery.authorization_endpoint
        ))
    })?;

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("response_type", "code")
            .append_pair("client_id", &session.client_id)
            .append_pair("redirect_uri", &session.redirect_uri)
            .append_pair("scope", &session.scopes)
            .append_pair("state", &session.state)
            .append_pair("code_challenge", &session.code_challenge)
            .append_pair("code_challenge_method", CHALLENGE_METHOD);

        if let Some(audience) = session.audience.as_deref() {
            query.append_pair("audience", audience);
        }
    }

    tracing::debug!("Authorization URL: {}", url);
    Ok(url)
}
