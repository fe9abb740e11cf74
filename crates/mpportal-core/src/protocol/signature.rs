//! Request signatures (plain + safe mode).
//!
//! The platform signs every callback with a SHA-1 digest over the
//! lexicographically sorted concatenation of its inputs:
//! - plain: `{token, timestamp, nonce}`
//! - safe:  `{token, timestamp, nonce, encrypt}`
//!
//! Digests are rendered as lowercase hex and compared in constant time.

use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

/// Which inputs the signature covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMode {
    /// `signature` query parameter over token/timestamp/nonce.
    Plain,
    /// `msg_signature` query parameter that additionally covers the ciphertext.
    Safe,
}

/// Compute the lowercase-hex SHA-1 over the sorted, concatenated parts.
pub fn sign(parts: &[&str]) -> String {
    let mut sorted = parts.to_vec();
    sorted.sort_unstable();

    let mut hasher = Sha1::new();
    for p in sorted {
        hasher.update(p.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Verify a request signature.
///
/// `encrypted` is the opaque ciphertext and is required in safe mode; a safe
/// mode check without it never passes.
pub fn verify(
    mode: SignatureMode,
    token: &str,
    timestamp: &str,
    nonce: &str,
    signature: &str,
    encrypted: Option<&str>,
) -> bool {
    let expected = match (mode, encrypted) {
        (SignatureMode::Plain, _) => sign(&[token, timestamp, nonce]),
        (SignatureMode::Safe, Some(blob)) => sign(&[token, timestamp, nonce, blob]),
        (SignatureMode::Safe, None) => return false,
    };
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn sorting_is_order_independent() {
        assert_eq!(sign(&["b", "a", "c"]), sign(&["c", "b", "a"]));
    }

    #[test]
    fn safe_mode_requires_ciphertext() {
        let sig = sign(&["tok", "1", "n", "blob"]);
        assert!(verify(SignatureMode::Safe, "tok", "1", "n", &sig, Some("blob")));
        assert!(!verify(SignatureMode::Safe, "tok", "1", "n", &sig, None));
        assert!(!verify(SignatureMode::Safe, "tok", "1", "n", &sig, Some("blob2")));
    }

    #[test]
    fn plain_signature_does_not_pass_safe_check() {
        let sig = sign(&["tok", "1", "n"]);
        assert!(!verify(SignatureMode::Safe, "tok", "1", "n", &sig, Some("blob")));
    }
}
