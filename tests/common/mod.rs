//! Shared fixtures for the integration tests: a fake OpenID provider built
//! on wiremock and RS256 ID tokens signed with the keys under
//! `tests/fixtures/keys`.

use std::fs;
use std::path::PathBuf;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use oidc_loopback::auth::discovery::DiscoveryDocument;
use oidc_loopback::auth::session::AuthSession;
use oidc_loopback::config::AuthenticationSettings;

pub const CLIENT_ID: &str = "desktop-app";
pub const KEY_ID: &str = "test-key-1";

pub const SIGNING_KEY_PEM: &str = include_str!("../fixtures/keys/rsa-private.pem");
pub const OTHER_KEY_PEM: &str = include_str!("../fixtures/keys/other-rsa-private.pem");
pub const JWKS_JSON: &str = include_str!("../fixtures/keys/jwks.json");

#[allow(dead_code)]
pub fn jwks() -> JwkSet {
    serde_json::from_str(JWKS_JSON).expect("fixture JWKS must parse")
}

#[allow(dead_code)]
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Signs `claims` as an RS256 JWT with `pem`, tagging it with `kid`.
#[allow(dead_code)]
pub fn sign_with(pem: &str, kid: Option<&str>, claims: &serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture key must parse");
    jsonwebtoken::encode(&header, claims, &key).expect("token must encode")
}

/// Signs `claims` with the fixture key published in the JWKS.
#[allow(dead_code)]
pub fn sign(claims: &serde_json::Value) -> String {
    sign_with(SIGNING_KEY_PEM, Some(KEY_ID), claims)
}

/// Claims of a valid ID token issued by `issuer` for [`CLIENT_ID`].
#[allow(dead_code)]
pub fn id_token_claims(issuer: &str) -> serde_json::Value {
    serde_json::json!({
        "iss": issuer,
        "sub": "auth0|user-42",
        "aud": CLIENT_ID,
        "iat": now(),
        "exp": now() + 600,
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "roles": ["admin", "reader"]
    })
}

/// Settings pointing at a fake provider whose authority is `authority`.
#[allow(dead_code)]
pub fn settings(authority: &str) -> AuthenticationSettings {
    AuthenticationSettings {
        authority: authority.to_string(),
        client_id: CLIENT_ID.to_string(),
        ..AuthenticationSettings::default()
    }
}

/// Discovery document for a provider at `base_url`, carrying the fixture
/// JWKS.
#[allow(dead_code)]
pub fn discovery_document(base_url: &str) -> DiscoveryDocument {
    DiscoveryDocument {
        issuer: format!("{}/", base_url),
        authorization_endpoint: format!("{}/authorize", base_url),
        token_endpoint: format!("{}/oauth/token", base_url),
        jwks_uri: format!("{}/.well-known/jwks.json", base_url),
        signing_keys: jwks(),
    }
}

/// Discovery metadata JSON served by the fake provider.
#[allow(dead_code)]
pub fn discovery_json(base_url: &str) -> serde_json::Value {
    serde_json::json!({
        "issuer": format!("{}/", base_url),
        "authorization_endpoint": format!("{}/authorize", base_url),
        "token_endpoint": format!("{}/oauth/token", base_url),
        "jwks_uri": format!("{}/.well-known/jwks.json", base_url),
        "userinfo_endpoint": format!("{}/userinfo", base_url),
        "response_types_supported": ["code"],
        "code_challenge_methods_supported": ["S256"]
    })
}

/// Mounts the discovery document and JWKS on `server`.
#[allow(dead_code)]
pub async fn mount_discovery(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(discovery_json(&server.uri())))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(JWKS_JSON))
        .mount(server)
        .await;
}

/// A session with a fixed redirect URI, as the listener would have produced.
#[allow(dead_code)]
pub fn session(redirect_uri: &str) -> AuthSession {
    AuthSession::new(&settings("https://auth.example.com/"), redirect_uri)
}

/// Returns a port that was free a moment ago.
#[allow(dead_code)]
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("failed to probe for a free port")
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
