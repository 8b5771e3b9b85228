//! oidc-loopback - OpenID Connect login for native applications
//!
//! This library signs a user in through the system browser using the OAuth
//! 2.0 authorization code grant with PKCE, receiving the redirect on a
//! short-lived loopback listener, and returns the claims of the validated
//! ID token.
//!
//! # Architecture
//!
//! - `auth`: discovery, callback listener, token exchange, ID token
//!   validation and the flow that ties them together
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: Handlers for the CLI subcommands
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use oidc_loopback::auth::browser::SystemBrowser;
//! use oidc_loopback::auth::discovery::HttpDiscoveryClient;
//! use oidc_loopback::auth::identity::IdentityValidator;
//! use oidc_loopback::{Config, OidcFlow};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let http = reqwest::Client::new();
//!     let mut flow = OidcFlow::new(
//!         config.authentication,
//!         http.clone(),
//!         Arc::new(HttpDiscoveryClient::new(http)),
//!         Arc::new(SystemBrowser),
//!         IdentityValidator::default(),
//!     );
//!     let principal = flow.authenticate(CancellationToken::new()).await?;
//!     println!("signed in as {:?}", principal.subject());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use auth::error::{AuthError, ErrorKind};
pub use auth::flow::{FlowState, OidcFlow};
pub use auth::identity::ClaimsPrincipal;
pub use config::Config;
pub use error::{OidcLoopbackError, Result};
