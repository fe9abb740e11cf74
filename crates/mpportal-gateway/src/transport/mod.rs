//! Transport layer (HTTP callbacks).
//!
//! Exposes the portal handlers and the codec that verifies and decodes a
//! request once before it reaches the dispatcher.

pub mod codec;
pub mod portal;
