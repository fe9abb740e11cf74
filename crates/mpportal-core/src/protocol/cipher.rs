//! Safe-mode payload cipher (panic-free).
//!
//! Wire layout after base64 decoding: AES-256-CBC ciphertext whose IV is the
//! first 16 bytes of the key. The plaintext is PKCS#7 padded to a multiple of
//! 32 bytes and wraps the message as:
//!
//! ```text
//! [16 random bytes][u32 BE content length][content][app id]
//! ```
//!
//! Parsing rules follow the rest of the protocol module: length checks before
//! every read, `Buf` instead of raw indexing, and no `unwrap()`.

use std::fmt;

use aes::Aes256;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use crate::error::CipherError;

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

/// AES block size.
pub const BLOCK_SIZE: usize = 16;
/// The protocol pads to 32-byte multiples, not to the AES block size.
pub const PAD_BLOCK: usize = 32;
/// Random prefix length inside the plaintext wrapper.
pub const RANDOM_PREFIX_LEN: usize = 16;
/// Length of the configured EncodingAESKey (base64 without the trailing `=`).
pub const ENCODING_KEY_LEN: usize = 43;

// EncodingAESKey values are 43 chars, which leaves 2 dangling bits.
const KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// 32-byte symmetric key. The IV is derived from its first 16 bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct AesKey([u8; 32]);

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AesKey(..)")
    }
}

impl AesKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse the 43-character EncodingAESKey shown in the platform console.
    pub fn from_encoding_key(encoded: &str) -> Result<Self, CipherError> {
        let trimmed = encoded.trim();
        if trimmed.len() != ENCODING_KEY_LEN {
            return Err(CipherError::Key(format!(
                "encoding key must be {ENCODING_KEY_LEN} characters, got {}",
                trimmed.len()
            )));
        }
        let raw = KEY_ENGINE
            .decode(trimmed)
            .map_err(|e| CipherError::Key(format!("invalid base64: {e}")))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|v: Vec<u8>| CipherError::Key(format!("decoded to {} bytes", v.len())))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn iv(&self) -> &[u8] {
        &self.0[..BLOCK_SIZE]
    }
}

/// Plaintext recovered from a safe-mode payload.
#[derive(Debug, Clone)]
pub struct OpenedMessage {
    /// Inner message bytes (the plain XML/JSON envelope).
    pub content: Bytes,
    /// App id trailer written by the sender.
    pub app_id: String,
}

/// AES-256-CBC decrypt + PKCS#7 unpad, without interpreting the wrapper.
pub fn decrypt_raw(ciphertext_b64: &str, key: &AesKey) -> Result<Vec<u8>, CipherError> {
    let mut buf = STANDARD
        .decode(ciphertext_b64.trim())
        .map_err(|_| CipherError::Base64)?;

    let total = buf.len();
    if total == 0 || total % BLOCK_SIZE != 0 {
        return Err(CipherError::BlockLength(total));
    }

    let plain_len = Aes256CbcDec::new_from_slices(key.as_bytes(), key.iv())
        .map_err(|e| CipherError::Key(e.to_string()))?
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| CipherError::BlockLength(total))?
        .len();
    buf.truncate(plain_len);

    let unpadded = pkcs7_unpad(&buf)?;
    buf.truncate(unpadded);
    Ok(buf)
}

/// Decrypt a payload and strip the protocol wrapper.
pub fn open(ciphertext_b64: &str, key: &AesKey) -> Result<OpenedMessage, CipherError> {
    let plain = decrypt_raw(ciphertext_b64, key)?;
    unwrap_message(&plain)
}

/// Decrypt a payload addressed to `app_id` and return the inner message bytes.
pub fn decrypt(ciphertext_b64: &str, key: &AesKey, app_id: &str) -> Result<Bytes, CipherError> {
    let opened = open(ciphertext_b64, key)?;
    if opened.app_id != app_id {
        return Err(CipherError::AppIdMismatch);
    }
    Ok(opened.content)
}

/// Encrypt `content` for `app_id` with a fresh random prefix.
pub fn encrypt(content: &[u8], key: &AesKey, app_id: &str) -> Result<String, CipherError> {
    let mut random = [0u8; RANDOM_PREFIX_LEN];
    rand::thread_rng().fill_bytes(&mut random);
    encrypt_with_prefix(content, key, app_id, random)
}

/// Encrypt with a caller-chosen random prefix (deterministic output).
pub fn encrypt_with_prefix(
    content: &[u8],
    key: &AesKey,
    app_id: &str,
    random: [u8; RANDOM_PREFIX_LEN],
) -> Result<String, CipherError> {
    let content_len = u32::try_from(content.len())
        .map_err(|_| CipherError::LengthPrefix { declared: content.len(), remaining: u32::MAX as usize })?;

    let body_len = RANDOM_PREFIX_LEN + 4 + content.len() + app_id.len();
    let pad = PAD_BLOCK - body_len % PAD_BLOCK;

    let mut buf = BytesMut::with_capacity(body_len + pad);
    buf.put_slice(&random);
    buf.put_u32(content_len);
    buf.put_slice(content);
    buf.put_slice(app_id.as_bytes());
    // pad is in 1..=32, always fits a u8
    buf.put_bytes(pad as u8, pad);

    let msg_len = buf.len();
    let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), key.iv())
        .map_err(|e| CipherError::Key(e.to_string()))?
        .encrypt_padded_mut::<NoPadding>(&mut buf, msg_len)
        .map_err(|_| CipherError::BlockLength(msg_len))?;

    Ok(STANDARD.encode(cipher))
}

fn pkcs7_unpad(buf: &[u8]) -> Result<usize, CipherError> {
    let Some(&last) = buf.last() else {
        return Err(CipherError::Padding);
    };
    let pad = last as usize;
    if pad == 0 || pad > PAD_BLOCK || pad > buf.len() {
        return Err(CipherError::Padding);
    }
    let keep = buf.len() - pad;
    if buf[keep..].iter().any(|&b| b != last) {
        return Err(CipherError::Padding);
    }
    Ok(keep)
}

fn unwrap_message(plain: &[u8]) -> Result<OpenedMessage, CipherError> {
    let mut buf = plain;
    if buf.remaining() < RANDOM_PREFIX_LEN + 4 {
        return Err(CipherError::Truncated(plain.len()));
    }
    buf.advance(RANDOM_PREFIX_LEN);

    let declared = buf.get_u32() as usize;
    if declared > buf.remaining() {
        return Err(CipherError::LengthPrefix {
            declared,
            remaining: buf.remaining(),
        });
    }
    let content = buf.copy_to_bytes(declared);
    let app_id = String::from_utf8_lossy(buf.chunk()).into_owned();

    Ok(OpenedMessage { content, app_id })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn key() -> AesKey {
        AesKey::from_bytes(*b"0123456789abcdef0123456789abcdef")
    }

    #[test]
    fn pkcs7_rejects_zero_and_oversized_pad() {
        let mut block = vec![7u8; 31];
        block.push(0);
        assert_eq!(pkcs7_unpad(&block), Err(CipherError::Padding));

        let block = vec![33u8; 64];
        assert_eq!(pkcs7_unpad(&block), Err(CipherError::Padding));
    }

    #[test]
    fn pkcs7_rejects_inconsistent_pad_bytes() {
        let mut block = vec![0u8; 28];
        block.extend_from_slice(&[4, 4, 3, 4]);
        assert_eq!(pkcs7_unpad(&block), Err(CipherError::Padding));
    }

    #[test]
    fn wrapper_length_prefix_is_bounded() {
        let mut plain = vec![0u8; RANDOM_PREFIX_LEN];
        plain.extend_from_slice(&100u32.to_be_bytes());
        plain.extend_from_slice(b"short");
        assert_eq!(
            unwrap_message(&plain).unwrap_err(),
            CipherError::LengthPrefix { declared: 100, remaining: 5 }
        );
    }

    #[test]
    fn wrapper_too_short() {
        assert_eq!(unwrap_message(&[0u8; 10]).unwrap_err(), CipherError::Truncated(10));
    }

    #[test]
    fn open_returns_trailing_app_id() {
        let ct = encrypt(b"<xml/>", &key(), "wx1234").unwrap();
        let opened = open(&ct, &key()).unwrap();
        assert_eq!(&opened.content[..], b"<xml/>");
        assert_eq!(opened.app_id, "wx1234");
    }

    #[test]
    fn decrypt_checks_app_id() {
        let ct = encrypt(b"hi", &key(), "wx1234").unwrap();
        assert_eq!(decrypt(&ct, &key(), "wx9999").unwrap_err(), CipherError::AppIdMismatch);
    }

    #[test]
    fn ciphertext_is_padded_to_32_bytes() {
        let ct = encrypt_with_prefix(b"abc", &key(), "wx", [0u8; 16]).unwrap();
        let raw = STANDARD.decode(ct).unwrap();
        assert_eq!(raw.len() % PAD_BLOCK, 0);
    }

    #[test]
    fn encoding_key_parses_43_chars() {
        // 32 zero bytes encode to 43 'A' characters plus '='.
        let k = AesKey::from_encoding_key(&"A".repeat(43)).unwrap();
        assert_eq!(k.as_bytes(), &[0u8; 32]);
        assert!(AesKey::from_encoding_key("short").is_err());
    }
}
