//! Signature vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use mpportal_core::protocol::signature::{sign, verify, SignatureMode};

mod vector_loader;
use vector_loader::SignatureVector;

fn mode(s: &str) -> SignatureMode {
    match s {
        "plain" => SignatureMode::Plain,
        "safe" => SignatureMode::Safe,
        other => panic!("unsupported mode: {other}"),
    }
}

#[test]
fn signature_vectors() {
    let vectors: Vec<SignatureVector> = vector_loader::load("signatures.json");
    assert!(!vectors.is_empty());

    for v in vectors {
        let ok = verify(
            mode(&v.mode),
            &v.token,
            &v.timestamp,
            &v.nonce,
            &v.signature,
            v.encrypt.as_deref(),
        );
        assert_eq!(ok, v.expect_valid, "vector={}", v.description);
    }
}

#[test]
fn sign_then_verify_plain() {
    let cases = [
        ("token", "1409304348", "xxxxxx"),
        ("", "0", ""),
        ("t0ken-with-dash", "1700000000", "nonce with space"),
        ("中文令牌", "1", "2"),
    ];
    for (token, ts, nonce) in cases {
        let sig = sign(&[token, ts, nonce]);
        assert_eq!(sig.len(), 40);
        assert!(verify(SignatureMode::Plain, token, ts, nonce, &sig, None));
    }
}

#[test]
fn any_single_character_flip_fails() {
    let (token, ts, nonce) = ("mpportal", "1700000000", "1234567890");
    let sig = sign(&[token, ts, nonce]);

    for i in 0..sig.len() {
        let mut flipped: Vec<u8> = sig.clone().into_bytes();
        flipped[i] = if flipped[i] == b'0' { b'1' } else { b'0' };
        let flipped = String::from_utf8(flipped).unwrap();
        assert!(
            !verify(SignatureMode::Plain, token, ts, nonce, &flipped, None),
            "flip at {i} still verified"
        );
    }
}

#[test]
fn truncated_or_empty_signature_fails() {
    let sig = sign(&["a", "b", "c"]);
    assert!(!verify(SignatureMode::Plain, "a", "b", "c", &sig[..39], None));
    assert!(!verify(SignatureMode::Plain, "a", "b", "c", "", None));
}
