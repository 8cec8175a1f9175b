//! Host-facing contracts and transports for rendering layers.

pub mod contract;
pub mod router;
pub mod stdio;
