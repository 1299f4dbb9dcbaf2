//! Aggregates
pub mod ticket;
pub mod user;
pub use ticket::{AssignmentChange, DeletionPlan, NewTicket, Ticket, TicketPatch, TicketStatus};
pub use user::UserProfile;
