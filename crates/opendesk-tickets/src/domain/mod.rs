//! Domain module
//!
//! Ticket aggregate, value objects, events and the pure lifecycle/SLA
//! services.

pub mod aggregates;
pub mod value_objects;
pub mod events;
pub mod services;

pub use aggregates::*;
pub use value_objects::*;
pub use events::*;
pub use services::*;
