//! Safe-mode transport envelopes.
//!
//! Inbound: `{ToUserName, Encrypt}`. Outbound: `{Encrypt, MsgSignature,
//! TimeStamp, Nonce}` where `MsgSignature` covers the ciphertext.

use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;

use crate::error::{PortalError, Result};
use crate::protocol::cipher::{self, AesKey};
use crate::protocol::reply::{CData, XmlOut};
use crate::protocol::signature;
use crate::protocol::WireFormat;

/// Inbound safe-mode wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub to_user: String,
    /// Base64 ciphertext.
    pub encrypt: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEncrypted {
    #[serde(rename = "ToUserName")]
    to_user_name: String,
    #[serde(rename = "Encrypt")]
    encrypt: String,
}

/// Parse the safe-mode wrapper. A missing or empty `Encrypt` is a decode error.
pub fn decode_encrypted(bytes: &[u8], format: WireFormat) -> Result<EncryptedEnvelope> {
    let raw: RawEncrypted = match format {
        WireFormat::Xml => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| PortalError::Decode(format!("envelope is not utf-8: {e}")))?;
            quick_xml::de::from_str(s)
                .map_err(|e| PortalError::Decode(format!("invalid xml wrapper: {e}")))?
        }
        WireFormat::Json => serde_json::from_slice(bytes)
            .map_err(|e| PortalError::Decode(format!("invalid json wrapper: {e}")))?,
    };

    if raw.encrypt.trim().is_empty() {
        return Err(PortalError::Decode("wrapper has no Encrypt payload".into()));
    }
    Ok(EncryptedEnvelope {
        to_user: raw.to_user_name,
        encrypt: raw.encrypt,
    })
}

/// Outbound safe-mode wrapper around an encrypted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedReply {
    pub encrypt: String,
    pub msg_signature: String,
    pub timestamp: i64,
    pub nonce: String,
}

impl SealedReply {
    /// Encrypt `reply` for `app_id` and sign it with the app token.
    pub fn seal(
        reply: &[u8],
        token: &str,
        key: &AesKey,
        app_id: &str,
        timestamp: i64,
        nonce: &str,
    ) -> Result<Self> {
        let encrypt = cipher::encrypt(reply, key, app_id)?;
        let ts = timestamp.to_string();
        let msg_signature = signature::sign(&[token, &ts, nonce, &encrypt]);
        Ok(Self {
            encrypt,
            msg_signature,
            timestamp,
            nonce: nonce.to_string(),
        })
    }

    pub fn encode(&self, format: WireFormat) -> Result<Bytes> {
        match format {
            WireFormat::Xml => {
                let mut out = XmlOut::new();
                out.open("xml")?;
                out.cdata("Encrypt", &CData::new(self.encrypt.as_str()))?;
                out.cdata("MsgSignature", &CData::new(self.msg_signature.as_str()))?;
                out.text("TimeStamp", &self.timestamp.to_string())?;
                out.cdata("Nonce", &CData::new(self.nonce.as_str()))?;
                out.close("xml")?;
                Ok(out.finish())
            }
            WireFormat::Json => {
                let v = json!({
                    "Encrypt": self.encrypt,
                    "MsgSignature": self.msg_signature,
                    "TimeStamp": self.timestamp,
                    "Nonce": self.nonce,
                });
                serde_json::to_vec(&v)
                    .map(Bytes::from)
                    .map_err(|e| PortalError::Internal(format!("wrapper json encode failed: {e}")))
            }
        }
    }
}
