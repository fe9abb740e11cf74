//! mpPortal core: transport-agnostic protocol primitives and error types.
//!
//! This crate defines the callback wire contracts (signatures, safe-mode
//! cipher, inbound messages, passive replies) and the error surface shared by
//! the gateway and tooling. It carries no transport or runtime dependencies so
//! it can be reused outside the HTTP server.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `PortalError`/`Result` so malformed
//! callbacks never crash the process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{CipherError, ClientCode, PortalError, Result};
