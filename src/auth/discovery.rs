//! OpenID Connect discovery
//!
//! The flow consumes a [`DiscoveryDocument`]: the provider's endpoints plus
//! the signing keys ID tokens are verified against. Retrieval sits behind
//! the [`DiscoveryClient`] trait so callers can supply a cached or fixed
//! document; [`HttpDiscoveryClient`] fetches it over HTTP:
//!
//! 1. `GET {authority}/.well-known/openid-configuration` (trailing slash of
//!    the authority trimmed first).
//! 2. `GET {jwks_uri}` for the key set.
//!
//! # References
//!
//! - OpenID Connect Discovery 1.0 <https://openid.net/specs/openid-connect-discovery-1_0.html>

use std::collections::HashMap;

use jsonwebtoken::jwk::JwkSet;
use serde::{Deserialize, Serialize};

use crate::auth::error::AuthError;
use crate::auth::pkce::CHALLENGE_METHOD;
use crate::error::Result;

/// Well-known path of the OpenID provider configuration document.
pub const WELL_KNOWN_PATH: &str = "/.well-known/openid-configuration";

// ---------------------------------------------------------------------------
// Provider metadata
// ---------------------------------------------------------------------------

/// Raw `/.well-known/openid-configuration` document.
///
/// # Examples
///
/// ```
/// use oidc_loopback::auth::discovery::ProviderMetadata;
///
/// let json = r#"{
///     "issuer": "https://auth.example.com/",
///     "authorization_endpoint": "https://auth.example.com/authorize",
///     "token_endpoint": "https://auth.example.com/oauth/token",
///     "jwks_uri": "https://auth.example.com/.well-known/jwks.json"
/// }"#;
///
/// let meta: ProviderMetadata = serde_json::from_str(json).unwrap();
/// assert_eq!(meta.issuer, "https://auth.example.com/");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier of the provider.
    pub issuer: String,

    /// URL of the authorization endpoint.
    pub authorization_endpoint: String,

    /// URL of the token endpoint.
    pub token_endpoint: String,

    /// URL of the provider's JSON Web Key Set.
    pub jwks_uri: String,

    /// URL of the userinfo endpoint, if advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    /// Scopes the provider supports, if advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// PKCE challenge methods the provider supports, if advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_methods_supported: Option<Vec<String>>,

    /// Additional fields not modelled above.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ProviderMetadata {
    /// `Some(false)` when the provider advertises PKCE methods without
    /// `S256`, `None` when it advertises none at all.
    pub fn supports_s256(&self) -> Option<bool> {
        self.code_challenge_methods_supported
            .as_ref()
            .map(|methods| methods.iter().any(|m| m == CHALLENGE_METHOD))
    }
}

// ---------------------------------------------------------------------------
// DiscoveryDocument
// ---------------------------------------------------------------------------

/// Provider endpoints and signing keys, read-only to the flow.
#[derive(Debug, Clone)]
pub struct DiscoveryDocument {
    /// Issuer identifier advertised by the provider.
    pub issuer: String,
    /// Authorization endpoint URL.
    pub authorization_endpoint: String,
    /// Token endpoint URL.
    pub token_endpoint: String,
    /// Key set URL the signing keys were loaded from.
    pub jwks_uri: String,
    /// Keys ID tokens must be signed with. Never empty.
    pub signing_keys: JwkSet,
}

impl DiscoveryDocument {
    /// Combines provider metadata with its key set.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DiscoveryUnavailable`] when the key set is empty.
    pub fn new(metadata: ProviderMetadata, signing_keys: JwkSet) -> Result<Self> {
        if signing_keys.keys.is_empty() {
            return Err(AuthError::DiscoveryUnavailable(format!(
                "no signing keys published at {}",
                metadata.jwks_uri
            ))
            .into());
        }

        Ok(Self {
            issuer: metadata.issuer,
            authorization_endpoint: metadata.authorization_endpoint,
            token_endpoint: metadata.token_endpoint,
            jwks_uri: metadata.jwks_uri,
            signing_keys,
        })
    }
}

// ---------------------------------------------------------------------------
// DiscoveryClient
// ---------------------------------------------------------------------------

/// Source of discovery documents.
#[async_trait::async_trait]
pub trait DiscoveryClient: Send + Sync + std::fmt::Debug {
    /// Returns the discovery document for `authority`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DiscoveryUnavailable`] on any failure.
    async fn fetch(&self, authority: &str) -> Result<DiscoveryDocument>;
}

/// Builds the discovery URL for an authority.
///
/// ```
/// use oidc_loopback::auth::discovery::discovery_url;
///
/// assert_eq!(
///     discovery_url("https://tenant.auth0.com/"),
///     "https://tenant.auth0.com/.well-known/openid-configuration"
/// );
/// ```
pub fn discovery_url(authority: &str) -> String {
    format!("{}{}", authority.trim_end_matches('/'), WELL_KNOWN_PATH)
}

/// [`DiscoveryClient`] that fetches the document and key set over HTTP.
///
/// No caching: every call re-fetches.
#[derive(Debug, Clone)]
pub struct HttpDiscoveryClient {
    http: reqwest::Client,
}

impl HttpDiscoveryClient {
    /// Creates a client that issues requests through `http`.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::DiscoveryUnavailable(format!("{what} request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AuthError::DiscoveryUnavailable(format!(
                "{what} endpoint {url} returned {}",
                resp.status()
            ))
            .into());
        }

        let value = resp
            .json::<T>()
            .await
            .map_err(|e| AuthError::DiscoveryUnavailable(format!("failed to parse {what}: {e}")))?;

        Ok(value)
    }
}

#[async_trait::async_trait]
impl DiscoveryClient for HttpDiscoveryClient {
    async fn fetch(&self, authority: &str) -> Result<DiscoveryDocument> {
        let url = discovery_url(authority);
        tracing::info!("Retrieving configuration from {}...", url);

        let metadata: ProviderMetadata = self.get_json(&url, "discovery document").await?;
        if metadata.supports_s256() == Some(false) {
            tracing::warn!(
                "Provider does not advertise PKCE S256 support; continuing with S256 anyway"
            );
        }

        tracing::debug!("Retrieving signing keys from {}", metadata.jwks_uri);
        let keys: JwkSet = self.get_json(&metadata.jwks_uri, "key set").await?;

        DiscoveryDocument::new(metadata, keys)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(methods: Option<Vec<&str>>) -> ProviderMetadata {
        ProviderMetadata {
            issuer: "https://auth.example.com/".to_string(),
            authorization_endpoint: "https://auth.example.com/authorize".to_string(),
            token_endpoint: "https://auth.example.com/oauth/token".to_string(),
            jwks_uri: "https://auth.example.com/jwks".to_string(),
            userinfo_endpoint: None,
            scopes_supported: None,
            code_challenge_methods_supported: methods
                .map(|m| m.into_iter().map(str::to_string).collect()),
            extra: HashMap::new(),
        }
    }

    #[test]
    fn test_discovery_url_trims_trailing_slash() {
        assert_eq!(
            discovery_url("https://auth.example.com/tenant/"),
            "https://auth.example.com/tenant/.well-known/openid-configuration"
        );
        assert_eq!(
            discovery_url("https://auth.example.com"),
            "https://auth.example.com/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_supports_s256() {
        assert_eq!(metadata(None).supports_s256(), None);
        assert_eq!(metadata(Some(vec!["plain"])).supports_s256(), Some(false));
        assert_eq!(
            metadata(Some(vec!["plain", "S256"])).supports_s256(),
            Some(true)
        );
        // method names are case-sensitive
        assert_eq!(metadata(Some(vec!["s256"])).supports_s256(), Some(false));
    }

    #[test]
    fn test_provider_metadata_captures_extra_fields() {
        let json = r#"{
            "issuer": "https://auth.example.com/",
            "authorization_endpoint": "https://auth.example.com/authorize",
            "token_endpoint": "https://auth.example.com/oauth/token",
            "jwks_uri": "https://auth.example.com/jwks",
            "end_session_endpoint": "https://auth.example.com/logout"
        }"#;

        let meta: ProviderMetadata = serde_json::from_str(json).unwrap();
        assert!(meta.extra.contains_key("end_session_endpoint"));
        assert!(meta.userinfo_endpoint.is_none());
    }

    #[test]
    fn test_document_rejects_empty_key_set() {
        let err = DiscoveryDocument::new(metadata(None), JwkSet { keys: vec![] }).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthError>(),
            Some(AuthError::DiscoveryUnavailable(_))
        ));
    }

    #[test]
    fn test_document_keeps_endpoints() {
        let keys: JwkSet = serde_json::from_value(serde_json::json!({
            "keys": [{ "kty": "RSA", "kid": "k1", "n": "AQAB", "e": "AQAB" }]
        }))
        .unwrap();

        let doc = DiscoveryDocument::new(metadata(None), keys).unwrap();
        assert_eq!(doc.token_endpoint, "https://auth.example.com/oauth/token");
        assert_eq!(doc.signing_keys.keys.len(), 1);
    }

    // HTTP behaviour is covered in tests/discovery_test.rs
}
