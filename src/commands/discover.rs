//! `discover` subcommand handler

use std::fmt::Write as _;

use crate::auth::discovery::{
    discovery_url, DiscoveryClient, DiscoveryDocument, HttpDiscoveryClient,
};
use crate::config::Config;
use crate::error::Result;

/// Fetches the configured provider's discovery document and prints it.
///
/// # Errors
///
/// Returns [`crate::auth::error::AuthError::DiscoveryUnavailable`] when the
/// document or key set cannot be retrieved.
pub async fn run_discover(config: &Config) -> Result<()> {
    let client = HttpDiscoveryClient::new(reqwest::Client::new());
    let document = client.fetch(&config.authentication.authority).await?;

    print!(
        "{}",
        render_discovery(&discovery_url(&config.authentication.authority), &document)
    );
    Ok(())
}

/// Formats a discovery document for the terminal.
pub fn render_discovery(source: &str, document: &DiscoveryDocument) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nDiscovery document ({})\n", source);
    let _ = writeln!(out, "Issuer:                  {}", document.issuer);
    let _ = writeln!(out, "Authorization endpoint:  {}", document.authorization_endpoint);
    let _ = writeln!(out, "Token endpoint:          {}", document.token_endpoint);
    let _ = writeln!(out, "JWKS URI:                {}", document.jwks_uri);
    let _ = writeln!(out, "\nSigning keys ({}):", document.signing_keys.keys.len());
    for key in &document.signing_keys.keys {
        let _ = writeln!(
            out,
            "  kid={} alg={}",
            key.common.key_id.as_deref().unwrap_or("-"),
            key.common
                .key_algorithm
                .as_ref()
                .map(|a| format!("{a:?}"))
                .unwrap_or_else(|| "-".to_string())
        );
    }
    out
}
