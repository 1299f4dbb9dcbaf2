//! Inbound ports (Use case traits)
//!
//! Hexagonal architecture: application service interfaces.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::dto::*;
use crate::domain::aggregates::{Ticket, TicketPatch, TicketStatus};
use crate::domain::services::SlaReport;
use crate::domain::value_objects::{Actor, AttachmentRef, TicketId, UserId};
use crate::error::Result;
use crate::ports::outbound::SignedUrl;

/// Ticket lifecycle use cases
#[async_trait]
pub trait TicketUseCases: Send + Sync {
    /// Submit a new ticket
    async fn submit(&self, actor: &Actor, command: SubmitTicketCommand) -> Result<Ticket>;

    /// Fetch, patch and conditionally write, retrying on conflict
    async fn update(&self, actor: &Actor, ticket_id: &TicketId, command: UpdateTicketCommand) -> Result<Ticket>;

    /// Single attempt against a caller-held snapshot
    async fn update_snapshot(&self, actor: &Actor, snapshot: &Ticket, patch: TicketPatch) -> Result<Ticket>;

    /// Upload a file and record it on the ticket
    async fn attach_file(&self, actor: &Actor, ticket_id: &TicketId, upload: AttachmentUpload) -> Result<Ticket>;

    /// Drop the reference from the ticket and release the blob
    async fn detach_file(&self, actor: &Actor, ticket_id: &TicketId, reference: &AttachmentRef) -> Result<Ticket>;

    /// Signed retrieval URL for an attachment the ticket owns
    async fn attachment_url(&self, actor: &Actor, ticket_id: &TicketId, reference: &AttachmentRef) -> Result<SignedUrl>;

    /// Delete the row, then release its attachments
    async fn delete(&self, actor: &Actor, ticket_id: &TicketId) -> Result<DeletionOutcome>;

    /// Retry the attachment releases a previous deletion could not finish
    async fn release_pending(&self, actor: &Actor, outcome: &DeletionOutcome) -> Result<DeletionOutcome>;
}

/// Ticket read-side use cases
#[async_trait]
pub trait TicketQueries: Send + Sync {
    async fn get(&self, actor: &Actor, ticket_id: &TicketId) -> Result<Ticket>;

    async fn list_by_status(&self, actor: &Actor, status: TicketStatus) -> Result<Vec<Ticket>>;

    async fn list_assigned_to(&self, actor: &Actor, agent_id: &UserId) -> Result<Vec<Ticket>>;

    async fn list_submitted_by(&self, actor: &Actor, user_id: &UserId) -> Result<Vec<Ticket>>;

    /// SLA compliance over the tickets the actor may see
    async fn sla_report(&self, actor: &Actor, filter: TicketFilter, now: Option<DateTime<Utc>>) -> Result<SlaReport>;
}
