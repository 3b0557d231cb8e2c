//! Common types and traits for netpulse
//!
//! This crate provides the value types shared by the netpulse agent and its
//! consumers, along with the platform abstraction the agent samples through.

pub mod platform;
pub mod records;
pub mod state;

pub use platform::*;
pub use records::*;
pub use state::*;
