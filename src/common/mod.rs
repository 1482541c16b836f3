//! Common types and host-facility traits
//!
//! Shared across the escrow layer, the protocol config and the game modules.

pub mod types;
pub mod traits;
