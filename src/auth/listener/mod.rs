//! Redirect callback listeners
//!
//! This module defines the [`CallbackListener`] trait the login flow uses
//! to receive the provider's redirect. Concrete implementations live in
//! submodules:
//!
//! - [`loopback::LoopbackListener`] -- a one-shot HTTP listener bound to
//!   `127.0.0.1`.
//!
//! The flow only talks to the trait, so another transport (a custom URI
//! scheme handed over by the OS, for instance) can be added as a new
//! [`CallbackTransport`] variant without touching the flow.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{AuthenticationSettings, CallbackTransport};
use crate::error::Result;

pub mod loopback;

pub use loopback::LoopbackListener;

/// Default ceiling on how long a listener waits for the redirect.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Result of waiting for the redirect. Exactly one variant holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The full callback URL, including its query string.
    Received(Url),
    /// The ceiling elapsed before any callback arrived.
    TimedOut,
    /// The cancellation token fired first.
    Canceled,
    /// The listener failed while waiting or serving.
    ListenerError(String),
}

/// A transport that receives exactly one authorization redirect.
///
/// Implementations must release every OS resource (sockets, registrations)
/// before `wait_for_response` returns, whatever the outcome.
#[async_trait::async_trait]
pub trait CallbackListener: Send + std::fmt::Debug {
    /// Starts listening and returns the redirect URI to send to the
    /// provider.
    ///
    /// # Errors
    ///
    /// Returns [`crate::auth::error::AuthError::ListenerBindFailed`] when
    /// the transport cannot be set up.
    async fn listen(&mut self, settings: &AuthenticationSettings) -> Result<String>;

    /// Waits for the redirect, the listener's ceiling, or `cancel`.
    async fn wait_for_response(&mut self, cancel: CancellationToken) -> CallbackOutcome;
}

/// Creates the listener configured by `settings.transport`.
pub fn create_listener(settings: &AuthenticationSettings) -> Box<dyn CallbackListener> {
    match settings.transport {
        CallbackTransport::Loopback => {
            Box::new(LoopbackListener::new().with_timeout(settings.callback_timeout()))
        }
    }
}
