//! mpPortal gateway library entry.
//!
//! This crate wires the config, credential store, transport, dispatcher and
//! deadline executor into the callback server. It is consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod obs;
pub mod ops;
pub mod router;
pub mod transport;
