//! Shared error type across mpPortal crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Signature check failed.
    AuthFailed,
    /// No credentials registered for the app id.
    UnknownApp,
    /// Body could not be decrypted or parsed.
    DecodeFailed,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::UnknownApp => "UNKNOWN_APP",
            ClientCode::DecodeFailed => "DECODE_FAILED",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Distinct safe-mode decryption failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("ciphertext is not valid base64")]
    Base64,
    #[error("ciphertext length {0} is not a positive multiple of the block size")]
    BlockLength(usize),
    #[error("invalid pkcs7 padding")]
    Padding,
    #[error("plaintext too short for message wrapper ({0} bytes)")]
    Truncated(usize),
    #[error("length prefix {declared} exceeds remaining {remaining} bytes")]
    LengthPrefix { declared: usize, remaining: usize },
    #[error("app id mismatch")]
    AppIdMismatch,
    #[error("invalid key material: {0}")]
    Key(String),
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PortalError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("signature verification failed")]
    AuthFailed,
    #[error("unknown app: {0}")]
    UnknownApp(String),
    #[error("decrypt failed: {0}")]
    Decrypt(#[from] CipherError),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl PortalError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            PortalError::BadRequest(_) => ClientCode::BadRequest,
            PortalError::AuthFailed => ClientCode::AuthFailed,
            PortalError::UnknownApp(_) => ClientCode::UnknownApp,
            PortalError::Decrypt(_) | PortalError::Decode(_) => ClientCode::DecodeFailed,
            PortalError::Internal(_) => ClientCode::Internal,
        }
    }
}
