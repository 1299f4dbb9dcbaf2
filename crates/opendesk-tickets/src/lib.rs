//! OpenDesk Ticket Core
//!
//! Ticket lifecycle and SLA evaluation for the OpenDesk customer support
//! platform, following the same hexagonal layout as the other OpenDesk
//! crates.
//!
//! ## Architecture
//!
//! - **Domain Layer**: `Ticket` aggregate, value objects, domain events and
//!   the pure `TicketLifecycle` / SLA services
//! - **Application Layer**: `TicketService` use cases (authorization,
//!   conditional writes with bounded conflict retry, attachment I/O)
//! - **Ports Layer**: repository, directory, blob store, event and clock
//!   interfaces
//! - **Infrastructure Layer**: in-memory adapters
//!
//! ## Lifecycle rules
//!
//! - Assigning an unassigned open ticket moves it to `in_progress`;
//!   unassigning an `in_progress` ticket moves it back to `open`. An
//!   explicit status in the same update takes precedence.
//! - `resolved_at` is set exactly while the status is `resolved` or
//!   `closed`; reopening clears it together with the resolution steps.
//! - SLA: green up to 19h, yellow up to 24h, red beyond, measured from
//!   creation (resolved tickets: green/red on time-to-resolution).

pub mod config;
pub mod error;
pub mod domain;
pub mod application;
pub mod ports;
pub mod infrastructure;

// Re-exports for convenience
pub use config::SupportConfig;
pub use error::{Result, SupportError};
pub use domain::aggregates::{
    AssignmentChange, DeletionPlan, NewTicket, Ticket, TicketPatch, TicketStatus, UserProfile,
};
pub use domain::value_objects::{
    Actor, AttachmentRef, Category, Priority, Role, TicketId, TicketNumber, UserId,
};
pub use domain::events::{DomainEvent, TicketEvent};
pub use domain::services::{evaluate_sla, SlaPolicy, SlaReport, SlaStatus, TicketLifecycle};
pub use application::{
    AttachmentUpload, DeletionOutcome, FailedRelease, SubmitTicketCommand, TicketFilter,
    TicketService, UpdateTicketCommand,
};
pub use ports::inbound::{TicketQueries, TicketUseCases};
pub use ports::outbound::{
    AttachmentStore, Clock, EventPublisher, RepositoryError, SignedUrl, StorageError,
    TicketRepository, UserDirectory,
};
