//! PKCE and `state` generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

/// Random code verifier: 64 bytes, base64url without padding (86 chars).
pub fn generate_code_verifier() -> String {
    let random_bytes: [u8; 64] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// S256 challenge: `BASE64URL(SHA256(verifier))`.
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Random `state` parameter: 32 bytes, base64url without padding (43 chars).
pub fn generate_state() -> String {
    let random_bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_url_safe(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn verifier_is_within_rfc7636_bounds() {
        let verifier = generate_code_verifier();
        assert_eq!(verifier.len(), 86);
        assert!((43..=128).contains(&verifier.len()));
        assert!(is_url_safe(&verifier), "verifier should be URL-safe: {verifier}");
    }

    #[test]
    fn verifiers_and_states_are_unique() {
        assert_ne!(generate_code_verifier(), generate_code_verifier());
        assert_ne!(generate_state(), generate_state());
    }

    #[test]
    fn challenge_matches_rfc7636_appendix_b() {
        assert_eq!(
            generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn state_length() {
        let state = generate_state();
        assert_eq!(state.len(), 43);
        assert!(is_url_safe(&state));
    }
}
