//! Login flow orchestration
//!
//! [`OidcFlow`] runs one authorization code + PKCE session end to end:
//!
//! 1. Fetch the discovery document
//! 2. Bind the callback listener and start a session
//! 3. Open the authorization URL in the browser
//! 4. Wait for the redirect, the listener's ceiling or cancellation
//! 5. Validate the callback
//! 6. Redeem the code at the token endpoint
//! 7. Validate the ID token
//!
//! Any failure ends the flow in [`FlowState::Failed`]; nothing is retried.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::browser::BrowserLauncher;
use crate::auth::callback::validate_callback;
use crate::auth::discovery::DiscoveryClient;
use crate::auth::error::ErrorKind;
use crate::auth::identity::{ClaimsPrincipal, IdentityValidator, ValidationExpectations};
use crate::auth::listener::create_listener;
use crate::auth::request::build_authorization_url;
use crate::auth::session::AuthSession;
use crate::auth::token::{TokenExchangeClient, TokenResponse};
use crate::config::AuthenticationSettings;
use crate::error::{auth_error_kind, Result};

/// Where a flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Init,
    Discovering,
    Listening,
    AwaitingCallback,
    ExchangingToken,
    Validating,
    Authenticated,
    /// Terminal failure, tagged with its cause.
    Failed(ErrorKind),
}

impl FlowState {
    /// Whether the flow has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Authenticated | FlowState::Failed(_))
    }

    /// Failure kind assumed for an error raised in this state that does not
    /// carry one.
    fn default_failure(&self) -> ErrorKind {
        match self {
            FlowState::Init | FlowState::Discovering => ErrorKind::DiscoveryUnavailable,
            FlowState::Listening | FlowState::AwaitingCallback => ErrorKind::ListenerBindFailed,
            FlowState::ExchangingToken => ErrorKind::TokenExchangeFailed,
            FlowState::Validating | FlowState::Authenticated => ErrorKind::TokenValidationFailed,
            FlowState::Failed(kind) => *kind,
        }
    }
}

/// Orchestrates one login.
///
/// Collaborators are passed in explicitly so tests can replace the
/// provider and the browser.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use oidc_loopback::auth::browser::SystemBrowser;
/// use oidc_loopback::auth::discovery::HttpDiscoveryClient;
/// use oidc_loopback::auth::flow::OidcFlow;
/// use oidc_loopback::auth::identity::IdentityValidator;
/// use oidc_loopback::config::AuthenticationSettings;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(settings: AuthenticationSettings) -> oidc_loopback::error::Result<()> {
/// let http = reqwest::Client::new();
/// let mut flow = OidcFlow::new(
///     settings,
///     http.clone(),
///     Arc::new(HttpDiscoveryClient::new(http)),
///     Arc::new(SystemBrowser),
///     IdentityValidator::default(),
/// );
///
/// let principal = flow.authenticate(CancellationToken::new()).await?;
/// println!("Hello, {}", principal.name().unwrap_or("stranger"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OidcFlow {
    settings: AuthenticationSettings,
    http: reqwest::Client,
    discovery: Arc<dyn DiscoveryClient>,
    browser: Arc<dyn BrowserLauncher>,
    validator: IdentityValidator,
    state: FlowState,
    tokens: Option<TokenResponse>,
}

impl OidcFlow {
    pub fn new(
        settings: AuthenticationSettings,
        http: reqwest::Client,
        discovery: Arc<dyn DiscoveryClient>,
        browser: Arc<dyn BrowserLauncher>,
        validator: IdentityValidator,
    ) -> Self {
        Self {
            settings,
            http,
            discovery,
            browser,
            validator,
            state: FlowState::Init,
            tokens: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Tokens from the last successful login.
    pub fn tokens(&self) -> Option<&TokenResponse> {
        self.tokens.as_ref()
    }

    /// Runs a complete login and returns the authenticated principal.
    ///
    /// `cancel` only interrupts the wait for the callback.
    ///
    /// # Errors
    ///
    /// Returns the [`crate::auth::error::AuthError`] that ended the flow;
    /// [`Self::state`] is then `Failed` with the matching kind.
    pub async fn authenticate(&mut self, cancel: CancellationToken) -> Result<ClaimsPrincipal> {
        self.state = FlowState::Init;
        self.tokens = None;

        match self.run(cancel).await {
            Ok(principal) => {
                self.transition(FlowState::Authenticated);
                Ok(principal)
            }
            Err(err) => {
                let kind = auth_error_kind(&err).unwrap_or_else(|| self.state.default_failure());
                tracing::error!("Login failed in state {:?}: {}", self.state, err);
                self.transition(FlowState::Failed(kind));
                Err(err)
            }
        }
    }

    async fn run(&mut self, cancel: CancellationToken) -> Result<ClaimsPrincipal> {
        self.transition(FlowState::Discovering);
        let discovery = self.discovery.fetch(&self.settings.authority).await?;

        self.transition(FlowState::Listening);
        let mut listener = create_listener(&self.settings);
        let redirect_uri = listener.listen(&self.settings).await?;
        let session = AuthSession::new(&self.settings, redirect_uri);
        tracing::info!("Listening for the callback on {}", session.redirect_uri);

        let authorization_url = build_authorization_url(&discovery, &session)?;
        self.browser.open(&authorization_url)?;

        self.transition(FlowState::AwaitingCallback);
        let outcome = listener.wait_for_response(cancel).await;
        drop(listener);

        let auth_result = validate_callback(outcome, &session)?;
        tracing::info!("Authorization code received");

        self.transition(FlowState::ExchangingToken);
        let client = TokenExchangeClient::new(
            self.http.clone(),
            self.settings.client_secret().map(str::to_string),
        );
        let tokens = client.exchange(&discovery, &auth_result, &session).await?;

        self.transition(FlowState::Validating);
        let expectations = ValidationExpectations::from_settings(&self.settings);
        let principal = self
            .validator
            .validate(&tokens.id_token, &discovery, &expectations)?;

        self.tokens = Some(tokens);
        Ok(principal)
    }

    fn transition(&mut self, next: FlowState) {
        tracing::debug!("Flow state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
