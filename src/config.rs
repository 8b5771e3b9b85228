//! Configuration management for oidc-loopback
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{OidcLoopbackError, Result};
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Placeholder in `role_claim_type` replaced by the configured client id.
pub const CLIENT_ID_PLACEHOLDER: &str = "{client_id}";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Identity provider and client registration settings
    #[serde(default)]
    pub authentication: AuthenticationSettings,
}

/// How the provider's redirect reaches this process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackTransport {
    /// HTTP listener on `127.0.0.1`
    #[default]
    Loopback,
}

/// Settings needed to start an authorization session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationSettings {
    /// Issuer URL of the identity provider. ID tokens must carry exactly
    /// this value in `iss`.
    #[serde(default)]
    pub authority: String,

    /// OAuth client identifier registered with the provider
    #[serde(default)]
    pub client_id: String,

    /// Client secret for confidential clients; empty for public clients
    #[serde(default)]
    pub client_secret: String,

    /// Optional `audience` request parameter (Auth0 style APIs)
    #[serde(default)]
    pub audience: String,

    /// Fixed loopback port for the redirect URI, or `0` for an ephemeral one
    #[serde(default)]
    pub redirect_uri_port: u16,

    /// Path segment of the redirect URI
    #[serde(default = "default_redirect_uri_path")]
    pub redirect_uri_path: String,

    /// Claim holding role names; `{client_id}` expands to the client id
    #[serde(default = "default_role_claim_type")]
    pub role_claim_type: String,

    /// Space separated scopes requested from the provider
    #[serde(default = "default_scopes")]
    pub scopes: String,

    /// Ceiling on how long to wait for the browser redirect
    #[serde(default = "default_callback_timeout_seconds")]
    pub callback_timeout_seconds: u64,

    /// Callback transport
    #[serde(default)]
    pub transport: CallbackTransport,
}

fn default_redirect_uri_path() -> String {
    "callback".to_string()
}

fn default_role_claim_type() -> String {
    "roles".to_string()
}

fn default_scopes() -> String {
    "openid email profile".to_string()
}

fn default_callback_timeout_seconds() -> u64 {
    300
}

impl Default for AuthenticationSettings {
    fn default() -> Self {
        Self {
            authority: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            audience: String::new(),
            redirect_uri_port: 0,
            redirect_uri_path: default_redirect_uri_path(),
            role_claim_type: default_role_claim_type(),
            scopes: default_scopes(),
            callback_timeout_seconds: default_callback_timeout_seconds(),
            transport: CallbackTransport::default(),
        }
    }
}

impl AuthenticationSettings {
    /// Client secret, when one is configured.
    pub fn client_secret(&self) -> Option<&str> {
        non_empty(&self.client_secret)
    }

    /// Audience request parameter, when one is configured.
    pub fn audience(&self) -> Option<&str> {
        non_empty(&self.audience)
    }

    /// Role claim name with `{client_id}` expanded.
    pub fn role_claim(&self) -> String {
        self.role_claim_type
            .replace(CLIENT_ID_PLACEHOLDER, &self.client_id)
    }

    /// Redirect path without surrounding slashes.
    pub fn redirect_path(&self) -> &str {
        self.redirect_uri_path.trim_matches('/')
    }

    /// Callback wait ceiling.
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_seconds)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used and a warning is
    /// logged, so that a fully env-driven setup works.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(OidcLoopbackError::from)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config = serde_yaml::from_str(&contents)
            .map_err(OidcLoopbackError::from)
            .with_context(|| format!("Failed to parse config file {}", path))?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        let auth = &mut self.authentication;

        if let Ok(authority) = std::env::var("OIDC_LOOPBACK_AUTHORITY") {
            auth.authority = authority;
        }

        if let Ok(client_id) = std::env::var("OIDC_LOOPBACK_CLIENT_ID") {
            auth.client_id = client_id;
        }

        if let Ok(secret) = std::env::var("OIDC_LOOPBACK_CLIENT_SECRET") {
            auth.client_secret = secret;
        }

        if let Ok(audience) = std::env::var("OIDC_LOOPBACK_AUDIENCE") {
            auth.audience = audience;
        }

        if let Ok(port) = std::env::var("OIDC_LOOPBACK_REDIRECT_PORT") {
            match port.parse::<u16>() {
                Ok(p) => auth.redirect_uri_port = p,
                Err(_) => {
                    tracing::warn!("Ignoring invalid OIDC_LOOPBACK_REDIRECT_PORT: {}", port)
                }
            }
        }

        if let Ok(role_claim) = std::env::var("OIDC_LOOPBACK_ROLE_CLAIM") {
            auth.role_claim_type = role_claim;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let crate::cli::Commands::Login {
            port: Some(port), ..
        } = &cli.command
        {
            tracing::debug!("Using redirect port override: {}", port);
            self.authentication.redirect_uri_port = *port;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let auth = &self.authentication;

        if auth.authority.trim().is_empty() {
            return Err(
                OidcLoopbackError::Config("authentication.authority is required".to_string())
                    .into(),
            );
        }

        let authority = url::Url::parse(&auth.authority).map_err(|e| {
            OidcLoopbackError::Config(format!("authentication.authority is not a URL: {}", e))
        })?;
        if !matches!(authority.scheme(), "http" | "https") {
            return Err(OidcLoopbackError::Config(format!(
                "authentication.authority must use http or https, got {}",
                authority.scheme()
            ))
            .into());
        }

        if auth.client_id.trim().is_empty() {
            return Err(
                OidcLoopbackError::Config("authentication.client_id is required".to_string())
                    .into(),
            );
        }

        if auth.redirect_path().is_empty() {
            return Err(OidcLoopbackError::Config(
                "authentication.redirect_uri_path cannot be empty".to_string(),
            )
            .into());
        }

        if !auth.scopes.split_whitespace().any(|s| s == "openid") {
            return Err(OidcLoopbackError::Config(
                "authentication.scopes must include openid".to_string(),
            )
            .into());
        }

        if auth.role_claim().trim().is_empty() {
            return Err(OidcLoopbackError::Config(
                "authentication.role_claim_type cannot be empty".to_string(),
            )
            .into());
        }

        if auth.callback_timeout_seconds == 0 {
            return Err(OidcLoopbackError::Config(
                "authentication.callback_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
