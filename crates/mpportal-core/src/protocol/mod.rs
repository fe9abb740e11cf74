//! Protocol modules for platform callbacks.
//!
//! - `signature`: SHA-1 request signatures (plain + safe mode).
//! - `cipher`: AES-256-CBC payload cipher and the message wrapper.
//! - `inbound`: tagged inbound message model + XML/JSON decoder.
//! - `reply`: passive reply model + encoder (CDATA for all free text).
//! - `wire`: safe-mode transport envelopes.
//!
//! All parsers are panic-free: malformed input is reported as `PortalError`
//! instead of panicking, so one hostile request cannot take the process down.

pub mod cipher;
pub mod inbound;
pub mod reply;
pub mod signature;
pub mod wire;

/// Body grammar of a conversation. XML unless the request says JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    #[default]
    Xml,
    Json,
}

impl WireFormat {
    /// Pick the grammar from a `Content-Type` header value.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.to_ascii_lowercase().contains("json") => WireFormat::Json,
            _ => WireFormat::Xml,
        }
    }

    /// `Content-Type` for replies in this grammar.
    pub fn content_type(self) -> &'static str {
        match self {
            WireFormat::Xml => "text/xml; charset=utf-8",
            WireFormat::Json => "application/json; charset=utf-8",
        }
    }
}
