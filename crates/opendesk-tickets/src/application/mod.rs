//! Application layer
//!
//! Orchestrates use cases: authorization, the lifecycle engine, conditional
//! writes and event publication.

pub mod commands;
pub mod queries;
pub mod dto;

pub use commands::TicketService;
pub use dto::*;
