//! Ports module (Hexagonal Architecture)
//!
//! Inbound: the use cases this crate offers. Outbound: persistence, identity,
//! blob storage, event and clock collaborators it consumes.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
