//! Authorization code redemption
//!
//! [`TokenExchangeClient`] POSTs the authorization code and PKCE verifier to
//! the provider's token endpoint and returns the parsed [`TokenResponse`].

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::callback::AuthorizationResult;
use crate::auth::discovery::DiscoveryDocument;
use crate::auth::error::AuthError;
use crate::auth::session::AuthSession;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Token endpoint responses (raw deserialization)
// ---------------------------------------------------------------------------

/// Raw JSON body of a successful token response.
#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// OAuth error body (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Tokens issued for one authorization code.
#[derive(Debug, Clone)]
pub struct TokenResponse {
    /// Signed ID token (compact JWS). Never empty.
    pub id_token: String,
    /// Access token, if the provider issued one.
    pub access_token: Option<String>,
    /// Access token type, usually `Bearer`.
    pub token_type: Option<String>,
    /// Access token lifetime in seconds, as reported.
    pub expires_in: Option<u64>,
    /// Absolute expiry computed from `expires_in` at receipt.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenResponse {
    fn from_raw(raw: RawTokenResponse) -> Result<Self> {
        let id_token = raw
            .id_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AuthError::TokenMalformed("token response has no id_token".to_string())
            })?;

        let expires_at = raw.expires_in.map(|secs| {
            Utc::now() + chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
        });

        Ok(Self {
            id_token,
            access_token: raw.access_token,
            token_type: raw.token_type,
            expires_in: raw.expires_in,
            expires_at,
        })
    }
}

// ---------------------------------------------------------------------------
// TokenExchangeClient
// ---------------------------------------------------------------------------

/// Client for the token endpoint.
///
/// # Examples
///
/// ```no_run
/// use oidc_loopback::auth::token::TokenExchangeClient;
///
/// let client = TokenExchangeClient::new(reqwest::Client::new(), None);
/// ```
#[derive(Debug, Clone)]
pub struct TokenExchangeClient {
    http: reqwest::Client,
    client_secret: Option<String>,
}

impl TokenExchangeClient {
    /// Creates a client. `client_secret` is sent only when non-empty.
    pub fn new(http: reqwest::Client, client_secret: Option<String>) -> Self {
        Self {
            http,
            client_secret: client_secret.filter(|s| !s.is_empty()),
        }
    }

    /// Redeems `auth_result`'s code for tokens.
    ///
    /// The form carries `grant_type=authorization_code`, `client_id`,
    /// `code`, `redirect_uri` (exactly the session's), `code_verifier` and
    /// `client_secret` when configured.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenExchangeFailed`] when the endpoint cannot be
    ///   reached or answers with a non-2xx status; `reason` is the canonical
    ///   reason phrase for the status code
    /// - [`AuthError::TokenMalformed`] when a 2xx body is not JSON or has no
    ///   `id_token`
    pub async fn exchange(
        &self,
        discovery: &DiscoveryDocument,
        auth_result: &AuthorizationResult,
        session: &AuthSession,
    ) -> Result<TokenResponse> {
        let mut params: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("client_id", session.client_id.as_str()),
            ("code", auth_result.authorization_code.as_str()),
            ("redirect_uri", session.redirect_uri.as_str()),
            ("code_verifier", session.code_verifier.as_str()),
        ];
        if let Some(secret) = self.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        tracing::info!("Exchanging authorization code at {}", discovery.token_endpoint);
        let resp = self
            .http
            .post(&discovery.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed {
                status: None,
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            match serde_json::from_str::<OAuthErrorBody>(&body) {
                Ok(oauth) => tracing::debug!(
                    "Token endpoint returned {}: {} ({})",
                    status,
                    oauth.error,
                    oauth.error_description.as_deref().unwrap_or("no description")
                ),
                Err(_) => tracing::debug!("Token endpoint returned {}: {}", status, body),
            }

            let reason = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string());
            return Err(AuthError::TokenExchangeFailed {
                status: Some(status.as_u16()),
                reason,
            }
            .into());
        }

        let body = resp.text().await.map_err(|e| AuthError::TokenExchangeFailed {
            status: Some(status.as_u16()),
            reason: format!("failed to read token response: {e}"),
        })?;
        let raw: RawTokenResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::TokenMalformed(format!("failed to parse token response: {e}"))
        })?;

        TokenResponse::from_raw(raw)
    }
}
