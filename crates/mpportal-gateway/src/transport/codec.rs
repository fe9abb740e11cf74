//! Decode-once codec for portal requests.
//!
//! - Handshake query => signature check
//! - Push query + body => verified, decrypted, decoded `InboundMessage`
//! - Encoded reply => safe-mode sealed envelope when the push was encrypted
//!
//! Verification always happens before the payload is decrypted or decoded.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use mpportal_core::{
    error::{PortalError, Result},
    protocol::{
        cipher, inbound,
        inbound::InboundMessage,
        signature::{self, SignatureMode},
        wire::{self, SealedReply},
        WireFormat,
    },
};
use serde::Deserialize;

use crate::credentials::AppCredentials;

/// `GET` verification handshake parameters.
#[derive(Debug, Deserialize)]
pub struct HandshakeQuery {
    pub signature: String,
    pub timestamp: String,
    pub nonce: String,
    pub echostr: String,
}

/// `POST` push parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PushQuery {
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub msg_signature: Option<String>,
    pub timestamp: String,
    pub nonce: String,
    #[serde(default)]
    pub encrypt_type: Option<String>,
    #[serde(default)]
    pub openid: Option<String>,
}

/// How a push body is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEncoding {
    Plain,
    Aes,
}

impl PushEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            PushEncoding::Plain => "plain",
            PushEncoding::Aes => "aes",
        }
    }
}

impl PushQuery {
    pub fn encoding(&self) -> Result<PushEncoding> {
        match self.encrypt_type.as_deref() {
            None | Some("") | Some("raw") | Some("plain") => Ok(PushEncoding::Plain),
            Some("aes") => Ok(PushEncoding::Aes),
            Some(other) => Err(PortalError::BadRequest(format!(
                "unsupported encrypt_type: {other}"
            ))),
        }
    }
}

/// A push that passed verification and decoded cleanly.
#[derive(Debug)]
pub struct OpenedPush {
    pub message: InboundMessage,
    pub format: WireFormat,
    pub encoding: PushEncoding,
}

pub fn verify_handshake(creds: &AppCredentials, q: &HandshakeQuery) -> Result<()> {
    if signature::verify(
        SignatureMode::Plain,
        &creds.token,
        &q.timestamp,
        &q.nonce,
        &q.signature,
        None,
    ) {
        Ok(())
    } else {
        Err(PortalError::AuthFailed)
    }
}

/// Verify, decrypt (when `encrypt_type=aes`) and decode a push body.
pub fn open_push(
    creds: &AppCredentials,
    q: &PushQuery,
    format: WireFormat,
    body: &[u8],
) -> Result<OpenedPush> {
    let encoding = q.encoding()?;
    let message = match encoding {
        PushEncoding::Plain => {
            if !creds.encoding_mode.accepts_plain() {
                return Err(PortalError::BadRequest(format!(
                    "app {} only accepts encrypted pushes",
                    creds.app_id
                )));
            }
            let sig = q.signature.as_deref().ok_or(PortalError::AuthFailed)?;
            if !signature::verify(SignatureMode::Plain, &creds.token, &q.timestamp, &q.nonce, sig, None) {
                return Err(PortalError::AuthFailed);
            }
            inbound::decode(body, format)?
        }
        PushEncoding::Aes => {
            if !creds.encoding_mode.accepts_aes() {
                return Err(PortalError::BadRequest(format!(
                    "app {} does not accept encrypted pushes",
                    creds.app_id
                )));
            }
            let key = creds.aes_key.as_ref().ok_or_else(|| {
                PortalError::Internal(format!("app {} has no encoding key", creds.app_id))
            })?;
            // The safe signature covers the ciphertext, so the outer wrapper
            // has to be read before verification; nothing is decrypted yet.
            let envelope = wire::decode_encrypted(body, format)?;
            let sig = q.msg_signature.as_deref().ok_or(PortalError::AuthFailed)?;
            if !signature::verify(
                SignatureMode::Safe,
                &creds.token,
                &q.timestamp,
                &q.nonce,
                sig,
                Some(&envelope.encrypt),
            ) {
                return Err(PortalError::AuthFailed);
            }
            let plain = cipher::decrypt(&envelope.encrypt, key, &creds.app_id)?;
            inbound::decode(&plain, format)?
        }
    };

    Ok(OpenedPush {
        message,
        format,
        encoding,
    })
}

/// Wrap an encoded reply for the wire. Encrypted pushes get encrypted replies.
pub fn seal_reply(
    creds: &AppCredentials,
    q: &PushQuery,
    encoding: PushEncoding,
    format: WireFormat,
    reply: Bytes,
) -> Result<Bytes> {
    match encoding {
        PushEncoding::Plain => Ok(reply),
        PushEncoding::Aes => {
            let key = creds.aes_key.as_ref().ok_or_else(|| {
                PortalError::Internal(format!("app {} has no encoding key", creds.app_id))
            })?;
            SealedReply::seal(&reply, &creds.token, key, &creds.app_id, unix_now(), &q.nonce)?
                .encode(format)
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::credentials::EncodingMode;
    use mpportal_core::protocol::cipher::AesKey;

    fn creds(mode: EncodingMode) -> AppCredentials {
        AppCredentials {
            app_id: "wx1".into(),
            token: "tok".into(),
            aes_key: Some(AesKey::from_bytes([3u8; 32])),
            encoding_mode: mode,
        }
    }

    fn query(encrypt_type: Option<&str>) -> PushQuery {
        PushQuery {
            timestamp: "1".into(),
            nonce: "n".into(),
            encrypt_type: encrypt_type.map(str::to_string),
            ..PushQuery::default()
        }
    }

    #[test]
    fn encoding_from_query() {
        assert_eq!(query(None).encoding().unwrap(), PushEncoding::Plain);
        assert_eq!(query(Some("raw")).encoding().unwrap(), PushEncoding::Plain);
        assert_eq!(query(Some("aes")).encoding().unwrap(), PushEncoding::Aes);
        assert!(query(Some("rot13")).encoding().is_err());
    }

    #[test]
    fn missing_signature_is_auth_failure() {
        let err = open_push(&creds(EncodingMode::Plain), &query(None), WireFormat::Xml, b"<xml/>")
            .unwrap_err();
        assert_eq!(err.client_code().as_str(), "AUTH_FAILED");
    }

    #[test]
    fn mode_gates_encoding() {
        let err = open_push(&creds(EncodingMode::Safe), &query(None), WireFormat::Xml, b"<xml/>")
            .unwrap_err();
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST");

        let err = open_push(&creds(EncodingMode::Plain), &query(Some("aes")), WireFormat::Xml, b"")
            .unwrap_err();
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    }

    #[test]
    fn bad_signature_rejected_before_decoding() {
        let mut q = query(None);
        q.signature = Some("0".repeat(40));
        // Garbage body: an auth failure proves decoding never ran.
        let err = open_push(&creds(EncodingMode::Plain), &q, WireFormat::Xml, b"\xff\xfe")
            .unwrap_err();
        assert_eq!(err.client_code().as_str(), "AUTH_FAILED");
    }
}
