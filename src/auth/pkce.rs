//! PKCE S256 challenge generation and verification
//!
//! This module implements the Proof Key for Code Exchange (PKCE) extension
//! to OAuth 2.0 as defined in RFC 7636, using the `S256` challenge method,
//! and the random `state` value sent alongside it.
//!
//! # How PKCE works
//!
//! 1. The client generates a high-entropy random string called the `code_verifier`.
//! 2. The client computes a SHA-256 hash of the verifier and base64url-encodes
//!    it to produce the `code_challenge`.
//! 3. The authorization request includes `code_challenge` and
//!    `code_challenge_method=S256`.
//! 4. The token exchange request sends the same `code_verifier`.
//! 5. The authorization server recomputes the challenge and compares it to
//!    the value sent in step 3, proving possession of the verifier.
//!
//! # References
//!
//! - RFC 7636 <https://www.rfc-editor.org/rfc/rfc7636>

use base64::Engine as _;
use rand::RngCore as _;
use sha2::{Digest, Sha256};

/// Number of random bytes behind a code verifier.
pub const VERIFIER_BYTES: usize = 32;

/// Number of random bytes behind a state value.
pub const STATE_BYTES: usize = 16;

/// The only challenge method this crate emits.
pub const CHALLENGE_METHOD: &str = "S256";

// ---------------------------------------------------------------------------
// PkceChallenge
// ---------------------------------------------------------------------------

/// A PKCE S256 challenge pair consisting of a verifier and its derived
/// challenge value.
///
/// # Examples
///
/// ```
/// use oidc_loopback::auth::pkce::{self, PkceChallenge};
///
/// let pkce: PkceChallenge = pkce::generate();
/// assert_eq!(pkce.method, "S256");
/// assert_eq!(pkce.verifier.len(), 43);
/// assert!(pkce::verify(&pkce.verifier, &pkce.challenge));
/// ```
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// The code verifier: base64url (no padding) of 32 random bytes,
    /// 43 characters long.
    ///
    /// Sent to the token endpoint in the `code_verifier` parameter.
    pub verifier: String,

    /// The code challenge: base64url (no padding) of the SHA-256 digest of
    /// the verifier's ASCII bytes.
    ///
    /// Sent to the authorization endpoint in the `code_challenge` parameter.
    pub challenge: String,

    /// The challenge method. Always `"S256"`.
    pub method: String,
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// Generates a fresh PKCE S256 challenge pair.
pub fn generate() -> PkceChallenge {
    let verifier = new_verifier();
    let challenge = challenge(&verifier);

    PkceChallenge {
        verifier,
        challenge,
        method: CHALLENGE_METHOD.to_string(),
    }
}

/// Returns a new code verifier.
///
/// The bytes come from the thread-local CSPRNG, which is seeded from the
/// operating system. Failure of the OS entropy source panics inside `rand`;
/// there is no recoverable error here.
pub fn new_verifier() -> String {
    random_base64url(VERIFIER_BYTES)
}

/// Computes the S256 challenge for a verifier.
///
/// `BASE64URL(SHA256(ASCII(code_verifier)))` per RFC 7636 section 4.2.
pub fn challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice())
}

/// Returns a new anti-CSRF `state` value, independent of any verifier.
pub fn new_state() -> String {
    random_base64url(STATE_BYTES)
}

/// Returns `true` when `challenge` is the S256 challenge of `verifier`.
pub fn verify(verifier: &str, challenge: &str) -> bool {
    self::challenge(verifier) == challenge
}

fn random_base64url(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn is_base64url(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn test_generate_produces_correct_verifier_length() {
        let pkce = generate();
        assert_eq!(
            pkce.verifier.len(),
            43,
            "32 random bytes in base64url without padding produces 43 chars"
        );
    }

    #[test]
    fn test_challenge_is_correct_s256_of_verifier() {
        let pkce = generate();

        let digest = Sha256::digest(pkce.verifier.as_bytes());
        let expected = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice());

        assert_eq!(
            pkce.challenge, expected,
            "challenge must equal base64url(SHA256(verifier))"
        );
    }

    #[test]
    fn test_challenge_is_deterministic() {
        let verifier = new_verifier();
        assert_eq!(challenge(&verifier), challenge(&verifier));
    }

    #[test]
    fn test_method_is_always_s256() {
        assert_eq!(generate().method, "S256");
    }

    #[test]
    fn test_verifier_and_challenge_use_url_safe_base64_no_padding() {
        let pkce = generate();
        assert!(is_base64url(&pkce.verifier), "verifier: {}", pkce.verifier);
        assert!(is_base64url(&pkce.challenge), "challenge: {}", pkce.challenge);
    }

    #[test]
    fn test_new_verifier_never_repeats_across_samples() {
        let samples: HashSet<String> = (0..10_000).map(|_| new_verifier()).collect();
        assert_eq!(samples.len(), 10_000, "verifiers must not collide");
    }

    #[test]
    fn test_new_state_length_and_alphabet() {
        let state = new_state();
        // 16 bytes -> 22 base64url chars without padding
        assert_eq!(state.len(), 22);
        assert!(is_base64url(&state));
    }

    #[test]
    fn test_new_state_is_unique() {
        assert_ne!(new_state(), new_state());
    }

    #[test]
    fn test_verify_accepts_matching_pair() {
        let pkce = generate();
        assert!(verify(&pkce.verifier, &pkce.challenge));
    }

    #[test]
    fn test_verify_rejects_other_verifier() {
        let pkce = generate();
        assert!(!verify(&new_verifier(), &pkce.challenge));
    }

    /// RFC 7636 Appendix B:
    ///   code_verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"
    ///   code_challenge = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
    #[test]
    fn test_s256_known_answer_rfc7636_appendix_b() {
        assert_eq!(
            challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }
}
