//! Error types for the ticketing core

use thiserror::Error;

use crate::domain::value_objects::TicketId;

/// Ticketing error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupportError {
    /// Malformed input (empty title, unknown enum value, ...)
    #[error("validation error: {0}")]
    Validation(String),

    /// Conditional write lost against a concurrent edit
    #[error("conflict on ticket {ticket_id}: expected version {expected_version}")]
    Conflict {
        ticket_id: TicketId,
        expected_version: u64,
    },

    /// Ticket, user or attachment does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Actor's role does not permit the action
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Persistence collaborator failure
    #[error("repository error: {0}")]
    Repository(String),

    /// Blob storage collaborator failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),
}

impl SupportError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Only optimistic-concurrency failures are worth a re-fetch and retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result type for the ticketing core
pub type Result<T> = std::result::Result<T, SupportError>;
