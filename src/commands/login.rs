//! `login` subcommand handler

use std::fmt::Write as _;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::browser::{BrowserLauncher, ManualBrowser, SystemBrowser};
use crate::auth::discovery::HttpDiscoveryClient;
use crate::auth::flow::OidcFlow;
use crate::auth::identity::{ClaimsPrincipal, IdentityValidator};
use crate::auth::token::TokenResponse;
use crate::config::Config;
use crate::error::Result;

/// Runs one login and prints the authenticated principal.
///
/// # Arguments
///
/// * `config` - Validated application configuration
/// * `no_browser` - Print the authorization URL instead of launching a browser
/// * `roles` - Roles to report membership for
/// * `cancel` - Aborts the wait for the callback (Ctrl-C)
///
/// # Errors
///
/// Returns the [`crate::auth::error::AuthError`] that ended the flow.
pub async fn run_login(
    config: Config,
    no_browser: bool,
    roles: Vec<String>,
    cancel: CancellationToken,
) -> Result<()> {
    let http = reqwest::Client::new();
    let browser: Arc<dyn BrowserLauncher> = if no_browser {
        Arc::new(ManualBrowser)
    } else {
        Arc::new(SystemBrowser)
    };

    let mut flow = OidcFlow::new(
        config.authentication,
        http.clone(),
        Arc::new(HttpDiscoveryClient::new(http)),
        browser,
        IdentityValidator::default(),
    );

    let principal = flow.authenticate(cancel).await?;
    print!("{}", render_principal(&principal, flow.tokens(), &roles));
    Ok(())
}

/// Formats a principal for the terminal.
pub fn render_principal(
    principal: &ClaimsPrincipal,
    tokens: Option<&TokenResponse>,
    roles: &[String],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nAuthenticated\n");
    let _ = writeln!(out, "Subject:  {}", principal.subject().unwrap_or("-"));
    let _ = writeln!(out, "Name:     {}", principal.name().unwrap_or("-"));
    let _ = writeln!(out, "Email:    {}", principal.email().unwrap_or("-"));
    if let Some(expires_at) = tokens.and_then(|t| t.expires_at) {
        let _ = writeln!(out, "Expires:  {}", expires_at.to_rfc3339());
    }

    if !roles.is_empty() {
        let _ = writeln!(out, "\nRoles ({}):", principal.role_claim_type());
        for role in roles {
            let _ = writeln!(out, "  {:<24} {}", role, principal.is_in_role(role));
        }
    }

    let _ = writeln!(out, "\nClaims:");
    for claim in principal.claims() {
        let _ = writeln!(out, "  {} = {}", claim.claim_type, claim.value);
    }
    out
}
