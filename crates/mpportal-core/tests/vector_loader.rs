//! JSON test vector loader shared by signature/cipher tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::fs;

use serde::de::DeserializeOwned;
use serde::Deserialize;

pub fn load<T: DeserializeOwned>(name: &str) -> T {
    let s = fs::read_to_string(format!("tests/vectors/{name}")).unwrap();
    serde_json::from_str(&s).expect("invalid test vector json")
}

#[derive(Debug, Deserialize)]
pub struct SignatureVector {
    pub description: String,
    pub mode: String,
    pub token: String,
    pub timestamp: String,
    pub nonce: String,
    #[serde(default)]
    pub encrypt: Option<String>,
    pub signature: String,
    pub expect_valid: bool,
}

#[derive(Debug, Deserialize)]
pub struct CipherVectors {
    pub encoding_aes_key: String,
    pub key_hex: String,
    pub app_id: String,
    pub cases: Vec<CipherCase>,
}

#[derive(Debug, Deserialize)]
pub struct CipherCase {
    pub description: String,
    pub ciphertext: String,
    #[serde(default)]
    pub random_hex: Option<String>,
    #[serde(default)]
    pub expect_content: Option<String>,
    #[serde(default)]
    pub expect_error: Option<String>,
}
