//! Outbound ports
//!
//! Hexagonal architecture: the collaborators infrastructure must provide.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::domain::aggregates::{Ticket, TicketStatus, UserProfile};
use crate::domain::value_objects::{AttachmentRef, TicketId, TicketNumber, UserId};
use crate::domain::DomainEvent;
use crate::error::SupportError;

/// Ticket repository port
///
/// Writes are conditional on the version the caller last read, so two
/// edits from the same stale snapshot cannot both land.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Allocate the next sequential ticket number
    async fn next_number(&self) -> Result<TicketNumber, RepositoryError>;

    /// Insert a newly created ticket
    async fn insert(&self, ticket: &Ticket) -> Result<(), RepositoryError>;

    /// Find ticket by ID
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, RepositoryError>;

    /// Replace the stored ticket if its version still equals `expected_version`
    async fn update(&self, ticket: &Ticket, expected_version: u64) -> Result<(), RepositoryError>;

    /// Delete the ticket if its version still equals `expected_version`
    async fn delete(&self, id: &TicketId, expected_version: u64) -> Result<(), RepositoryError>;

    async fn find_by_status(&self, status: TicketStatus) -> Result<Vec<Ticket>, RepositoryError>;

    async fn find_by_assignee(&self, agent_id: &UserId) -> Result<Vec<Ticket>, RepositoryError>;

    async fn find_by_submitter(&self, user_id: &UserId) -> Result<Vec<Ticket>, RepositoryError>;

    /// All tickets, newest number first
    async fn list(&self) -> Result<Vec<Ticket>, RepositoryError>;
}

/// User/role directory port (identity provider)
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError>;
}

/// Blob storage port for attachments
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Store `bytes` at `path`
    async fn upload(&self, path: &AttachmentRef, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Time-limited retrieval URL
    async fn signed_url(&self, path: &AttachmentRef, ttl: Duration) -> Result<SignedUrl, StorageError>;

    /// Delete by path. Deleting a missing path succeeds.
    async fn delete(&self, path: &AttachmentRef) -> Result<(), StorageError>;
}

/// Event publisher port
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish domain events
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError>;
}

/// Wall clock port
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Repository error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("entity not found")]
    NotFound,

    #[error("version conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("query error: {0}")]
    QueryError(String),
}

/// Blob storage error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    /// Map into the use-case error for the given ticket.
    pub fn for_ticket(self, ticket_id: &TicketId) -> SupportError {
        match self {
            Self::NotFound => SupportError::NotFound(format!("ticket {ticket_id}")),
            Self::Conflict { expected, .. } => SupportError::Conflict {
                ticket_id: *ticket_id,
                expected_version: expected,
            },
            other => SupportError::Repository(other.to_string()),
        }
    }
}

impl From<RepositoryError> for SupportError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => SupportError::NotFound("entity".into()),
            other => SupportError::Repository(other.to_string()),
        }
    }
}

impl From<StorageError> for SupportError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => SupportError::NotFound(format!("attachment {path}")),
            StorageError::TooLarge { .. } => SupportError::Validation(err.to_string()),
            StorageError::Backend(_) => SupportError::Storage(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_conflict() {
        let id = TicketId::new();
        let err = RepositoryError::Conflict { expected: 2, actual: 3 }.for_ticket(&id);
        assert_eq!(err, SupportError::Conflict { ticket_id: id, expected_version: 2 });
        assert!(err.is_retryable());
    }

    #[test]
    fn test_not_found_maps_to_not_found() {
        let id = TicketId::new();
        assert!(matches!(RepositoryError::NotFound.for_ticket(&id), SupportError::NotFound(_)));
        assert!(matches!(
            SupportError::from(StorageError::NotFound("tickets/a".into())),
            SupportError::NotFound(_)
        ));
    }
}
