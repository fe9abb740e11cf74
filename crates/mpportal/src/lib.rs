//! Top-level facade crate for mpPortal.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use mpportal_core::*;
}

pub mod gateway {
    pub use mpportal_gateway::*;
}
