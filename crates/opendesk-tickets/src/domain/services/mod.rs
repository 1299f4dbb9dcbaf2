//! Domain services
//!
//! Pure computations over ticket snapshots.

pub mod lifecycle;
pub mod sla;

pub use lifecycle::TicketLifecycle;
pub use sla::{evaluate_sla, SlaPolicy, SlaReport, SlaStatus};
