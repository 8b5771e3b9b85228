//! OpenID Connect login for native applications
//!
//! This module implements the authorization code flow with PKCE, receiving
//! the provider's redirect on a loopback HTTP listener (RFC 8252).
//!
//! # Module Layout
//!
//! - [`browser`]   -- opening the authorization URL for the user
//! - [`callback`]  -- validation of the redirect callback
//! - [`discovery`] -- OpenID provider metadata and signing keys
//! - [`error`]     -- failure kinds of the flow
//! - [`flow`]      -- orchestration of one login, start to finish
//! - [`identity`]  -- ID token validation and the resulting principal
//! - [`listener`]  -- one-shot callback listeners
//! - [`pkce`]      -- PKCE `S256` verifier/challenge and `state` generation
//! - [`request`]   -- the authorization request URL
//! - [`session`]   -- per-attempt values shared across the flow
//! - [`token`]     -- redemption of the authorization code

pub mod browser;
pub mod callback;
pub mod discovery;
pub mod error;
pub mod flow;
pub mod identity;
pub mod listener;
pub mod pkce;
pub mod request;
pub mod session;
pub mod token;
