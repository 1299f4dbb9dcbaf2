//! Data Transfer Objects (DTOs)
//!
//! Boundary shapes: raw string fields as they arrive from a form or API,
//! converted into typed domain input with validation.

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{AssignmentChange, NewTicket, Ticket, TicketPatch, TicketStatus};
use crate::domain::value_objects::{AttachmentRef, Category, Priority, TicketId, TicketNumber, UserId};
use crate::error::{Result, SupportError};

// =============================================================================
// Commands
// =============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SubmitTicketCommand {
    pub title: String,
    pub category: String,
    pub customer_name: Option<String>,
    pub customer_whatsapp: Option<String>,
    pub description: Option<String>,
}

impl SubmitTicketCommand {
    pub fn into_new_ticket(self, submitted_by: Option<UserId>) -> Result<NewTicket> {
        Ok(NewTicket {
            title: self.title,
            category: self.category.parse::<Category>()?,
            customer_name: self.customer_name,
            customer_whatsapp: self.customer_whatsapp,
            description: self.description,
            submitted_by,
        })
    }
}

/// Raw partial update. `assign_to` and `unassign` are mutually exclusive.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateTicketCommand {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub assign_to: Option<String>,
    pub unassign: bool,
    pub resolution_steps: Option<String>,
    pub attachments_add: Vec<String>,
    pub attachments_remove: Vec<String>,
}

impl TryFrom<UpdateTicketCommand> for TicketPatch {
    type Error = SupportError;

    fn try_from(cmd: UpdateTicketCommand) -> Result<Self> {
        let assignment = match (cmd.assign_to, cmd.unassign) {
            (Some(_), true) => {
                return Err(SupportError::validation("cannot assign and unassign in the same update"));
            }
            (Some(agent_id), false) => Some(AssignmentChange::Assign(UserId::new(agent_id)?)),
            (None, true) => Some(AssignmentChange::Unassign),
            (None, false) => None,
        };

        Ok(TicketPatch {
            title: cmd.title,
            description: cmd.description,
            category: cmd.category.as_deref().map(str::parse::<Category>).transpose()?,
            priority: cmd.priority.as_deref().map(str::parse::<Priority>).transpose()?,
            status: cmd.status.as_deref().map(str::parse::<TicketStatus>).transpose()?,
            assignment,
            resolution_steps: cmd.resolution_steps,
            attachments_add: cmd.attachments_add.into_iter().map(AttachmentRef::new).collect::<Result<_>>()?,
            attachments_remove: cmd.attachments_remove.into_iter().map(AttachmentRef::new).collect::<Result<_>>()?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

// =============================================================================
// Results & filters
// =============================================================================

/// Result of a deletion. The row and the blobs are separate steps, so the
/// outcome says which attachment releases still need a retry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    pub ticket_id: TicketId,
    pub number: TicketNumber,
    pub row_deleted: bool,
    pub released: Vec<AttachmentRef>,
    pub failed: Vec<FailedRelease>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRelease {
    pub reference: AttachmentRef,
    pub error: String,
}

impl DeletionOutcome {
    pub fn is_complete(&self) -> bool {
        self.row_deleted && self.failed.is_empty()
    }

    pub fn pending(&self) -> Vec<AttachmentRef> {
        self.failed.iter().map(|f| f.reference.clone()).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub assigned_to: Option<UserId>,
    pub submitted_by: Option<UserId>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.status.map_or(true, |s| ticket.status() == s)
            && self.assigned_to.as_ref().map_or(true, |a| ticket.assigned_to() == Some(a))
            && self.submitted_by.as_ref().map_or(true, |u| ticket.submitted_by() == Some(u))
    }
}
