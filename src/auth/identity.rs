//! ID token validation
//!
//! [`IdentityValidator`] checks an ID token's signature and standard claims
//! against the discovery document and the configured client, and turns the
//! payload into a [`ClaimsPrincipal`].
//!
//! The rules are fixed:
//!
//! - zero clock skew
//! - signature, `exp`, `iss` and `aud` all required
//! - a token is rejected before its `nbf`
//! - issuer must equal the configured authority
//! - audience must be the client id, or the configured audience if any
//! - only the provider's published asymmetric keys are trusted
//!
//! Signature checking sits behind [`SignatureVerifier`];
//! [`JwtSignatureVerifier`] implements it with `jsonwebtoken`.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use crate::auth::discovery::DiscoveryDocument;
use crate::auth::error::AuthError;
use crate::config::AuthenticationSettings;
use crate::error::Result;

/// Claim type holding the display name.
pub const NAME_CLAIM_TYPE: &str = "name";

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// What the caller expects a valid ID token to say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationExpectations {
    /// Configured authority; the token's `iss` must equal it.
    pub authority: String,
    /// OAuth client identifier; always a valid audience.
    pub client_id: String,
    /// Additional valid audience, if configured.
    pub audience: Option<String>,
    /// Claim type carrying roles, placeholders already expanded.
    pub role_claim_type: String,
}

impl ValidationExpectations {
    /// Derives expectations from configuration.
    pub fn from_settings(settings: &AuthenticationSettings) -> Self {
        Self {
            authority: settings.authority.clone(),
            client_id: settings.client_id.clone(),
            audience: settings.audience().map(str::to_string),
            role_claim_type: settings.role_claim(),
        }
    }
}

/// Fully resolved validation rules handed to a [`SignatureVerifier`].
#[derive(Debug, Clone)]
pub struct ValidationParameters {
    /// Allowed clock difference when checking `exp` and `nbf`. Always zero.
    pub clock_skew: Duration,
    /// Unsigned tokens are rejected.
    pub require_signature: bool,
    /// Tokens without `exp` are rejected.
    pub require_expiration: bool,
    /// Tokens whose `nbf` lies in the future are rejected.
    pub validate_not_before: bool,
    /// The only accepted `iss`.
    pub valid_issuer: String,
    /// Accepted `aud` values.
    pub valid_audiences: Vec<String>,
    /// Keys a signature may be made with.
    pub signing_keys: JwkSet,
    /// Claim type for [`ClaimsPrincipal::name`].
    pub name_claim_type: String,
    /// Claim type for [`ClaimsPrincipal::roles`].
    pub role_claim_type: String,
}

impl ValidationParameters {
    /// Builds the parameters for `discovery` and `expectations`.
    pub fn new(discovery: &DiscoveryDocument, expectations: &ValidationExpectations) -> Self {
        let mut valid_audiences = vec![expectations.client_id.clone()];
        if let Some(audience) = &expectations.audience {
            valid_audiences.push(audience.clone());
        }

        Self {
            clock_skew: Duration::ZERO,
            require_signature: true,
            require_expiration: true,
            validate_not_before: true,
            valid_issuer: expectations.authority.clone(),
            valid_audiences,
            signing_keys: discovery.signing_keys.clone(),
            name_claim_type: NAME_CLAIM_TYPE.to_string(),
            role_claim_type: expectations.role_claim_type.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Signature verification
// ---------------------------------------------------------------------------

/// Verifies a compact JWS and returns its payload.
pub trait SignatureVerifier: Send + Sync + std::fmt::Debug {
    /// Verifies `token` under `params` and returns the claims.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenMalformed`] when `token` is not a compact JWS,
    /// [`AuthError::TokenValidationFailed`] for any other failure.
    fn verify(&self, token: &str, params: &ValidationParameters) -> Result<Map<String, Value>>;
}

/// [`SignatureVerifier`] backed by `jsonwebtoken`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtSignatureVerifier;

impl JwtSignatureVerifier {
    fn select_key<'a>(keys: &'a JwkSet, kid: Option<&str>) -> Result<&'a Jwk> {
        match kid {
            Some(kid) => keys.find(kid).ok_or_else(|| {
                AuthError::TokenValidationFailed(format!("no signing key with kid {kid:?}")).into()
            }),
            None => match keys.keys.as_slice() {
                [only] => Ok(only),
                _ => Err(AuthError::TokenValidationFailed(
                    "token has no kid and the key set holds more than one key".to_string(),
                )
                .into()),
            },
        }
    }
}

impl SignatureVerifier for JwtSignatureVerifier {
    fn verify(&self, token: &str, params: &ValidationParameters) -> Result<Map<String, Value>> {
        if token.split('.').count() != 3 {
            return Err(
                AuthError::TokenMalformed("ID token is not a compact JWS".to_string()).into(),
            );
        }

        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| AuthError::TokenMalformed(format!("invalid ID token header: {e}")))?;

        if !is_asymmetric(header.alg) {
            return Err(AuthError::TokenValidationFailed(format!(
                "unsupported signing algorithm {:?}",
                header.alg
            ))
            .into());
        }

        let jwk = Self::select_key(&params.signing_keys, header.kid.as_deref())?;
        let key = DecodingKey::from_jwk(jwk)
            .map_err(|e| AuthError::TokenValidationFailed(format!("unusable signing key: {e}")))?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = params.clock_skew.as_secs();
        validation.validate_exp = params.require_expiration;
        validation.validate_nbf = params.validate_not_before;
        validation.set_issuer(&[params.valid_issuer.as_str()]);
        validation.set_audience(params.valid_audiences.as_slice());
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        let data = jsonwebtoken::decode::<Map<String, Value>>(token, &key, &validation)
            .map_err(|e| AuthError::TokenValidationFailed(e.to_string()))?;

        Ok(data.claims)
    }
}

fn is_asymmetric(alg: Algorithm) -> bool {
    matches!(
        alg,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
            | Algorithm::ES256
            | Algorithm::ES384
            | Algorithm::EdDSA
    )
}

// ---------------------------------------------------------------------------
// IdentityValidator
// ---------------------------------------------------------------------------

/// Validates ID tokens and builds principals.
///
/// # Examples
///
/// ```no_run
/// use oidc_loopback::auth::identity::{IdentityValidator, ValidationExpectations};
/// # use oidc_loopback::auth::discovery::DiscoveryDocument;
/// # fn example(id_token: &str, discovery: &DiscoveryDocument) -> oidc_loopback::error::Result<()> {
/// let expectations = ValidationExpectations {
///     authority: "https://auth.example.com/".to_string(),
///     client_id: "desktop-app".to_string(),
///     audience: None,
///     role_claim_type: "roles".to_string(),
/// };
/// let principal = IdentityValidator::default().validate(id_token, discovery, &expectations)?;
/// println!("signed in as {:?}", principal.subject());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IdentityValidator {
    verifier: Arc<dyn SignatureVerifier>,
}

impl Default for IdentityValidator {
    fn default() -> Self {
        Self::new(Arc::new(JwtSignatureVerifier))
    }
}

impl IdentityValidator {
    /// Creates a validator that checks signatures with `verifier`.
    pub fn new(verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { verifier }
    }

    /// Validates `id_token` and returns the authenticated principal.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenMalformed`] or [`AuthError::TokenValidationFailed`].
    pub fn validate(
        &self,
        id_token: &str,
        discovery: &DiscoveryDocument,
        expectations: &ValidationExpectations,
    ) -> Result<ClaimsPrincipal> {
        let params = ValidationParameters::new(discovery, expectations);
        let claims = self.verifier.verify(id_token, &params)?;

        let principal = ClaimsPrincipal::from_payload(
            &claims,
            &params.name_claim_type,
            &params.role_claim_type,
        );
        tracing::info!(
            "ID token validated for subject {}",
            principal.subject().unwrap_or("<none>")
        );
        Ok(principal)
    }
}

// ---------------------------------------------------------------------------
// ClaimsPrincipal
// ---------------------------------------------------------------------------

/// One `(type, value)` pair from a validated token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

/// Authenticated identity built from a validated ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimsPrincipal {
    claims: Vec<Claim>,
    name_claim_type: String,
    role_claim_type: String,
}

impl ClaimsPrincipal {
    /// Flattens a JWT payload into claims.
    ///
    /// Arrays become one claim per element, strings are kept as is, other
    /// scalars are stringified, objects are kept as JSON text and nulls are
    /// skipped.
    pub fn from_payload(
        payload: &Map<String, Value>,
        name_claim_type: &str,
        role_claim_type: &str,
    ) -> Self {
        let mut claims = Vec::new();
        for (claim_type, value) in payload {
            match value {
                Value::Array(items) => {
                    for item in items {
                        push_claim(&mut claims, claim_type, item);
                    }
                }
                other => push_claim(&mut claims, claim_type, other),
            }
        }

        Self {
            claims,
            name_claim_type: name_claim_type.to_string(),
            role_claim_type: role_claim_type.to_string(),
        }
    }

    /// All claims, sorted by claim type. Values of an array claim keep
    /// their array order.
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// First value of `claim_type`.
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// Every value of `claim_type`.
    pub fn find_all(&self, claim_type: &str) -> Vec<&str> {
        self.claims
            .iter()
            .filter(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
            .collect()
    }

    pub fn subject(&self) -> Option<&str> {
        self.find_first("sub")
    }

    pub fn name(&self) -> Option<&str> {
        self.find_first(&self.name_claim_type)
    }

    pub fn email(&self) -> Option<&str> {
        self.find_first("email")
    }

    /// Values of the configured role claim.
    pub fn roles(&self) -> Vec<&str> {
        self.find_all(&self.role_claim_type)
    }

    /// Whether `role` is among [`Self::roles`]. Case-sensitive.
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles().contains(&role)
    }

    pub fn role_claim_type(&self) -> &str {
        &self.role_claim_type
    }
}

fn push_claim(claims: &mut Vec<Claim>, claim_type: &str, value: &Value) {
    let value = match value {
        Value::Null => return,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    claims.push(Claim {
        claim_type: claim_type.to_string(),
        value,
    });
}
