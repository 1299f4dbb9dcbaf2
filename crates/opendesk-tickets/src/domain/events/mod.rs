//! Ticketing domain events
//!
//! Raised by the ticket aggregate, drained and published by the application
//! layer after the write that produced them has succeeded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::TicketStatus;
use crate::domain::value_objects::{AttachmentRef, Priority, TicketId, TicketNumber, UserId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DomainEvent {
    Ticket(TicketEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TicketEvent {
    Created {
        ticket_id: TicketId,
        number: TicketNumber,
        created_at: DateTime<Utc>,
    },
    StatusChanged {
        ticket_id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
    },
    Assigned {
        ticket_id: TicketId,
        agent_id: UserId,
    },
    Unassigned {
        ticket_id: TicketId,
        previous_agent_id: UserId,
    },
    PriorityChanged {
        ticket_id: TicketId,
        from: Priority,
        to: Priority,
    },
    Resolved {
        ticket_id: TicketId,
        resolved_at: DateTime<Utc>,
    },
    Reopened {
        ticket_id: TicketId,
    },
    AttachmentAdded {
        ticket_id: TicketId,
        reference: AttachmentRef,
    },
    AttachmentRemoved {
        ticket_id: TicketId,
        reference: AttachmentRef,
    },
    Deleted {
        ticket_id: TicketId,
        number: TicketNumber,
    },
}

impl DomainEvent {
    pub fn aggregate_id(&self) -> &TicketId {
        match self {
            DomainEvent::Ticket(e) => match e {
                TicketEvent::Created { ticket_id, .. }
                | TicketEvent::StatusChanged { ticket_id, .. }
                | TicketEvent::Assigned { ticket_id, .. }
                | TicketEvent::Unassigned { ticket_id, .. }
                | TicketEvent::PriorityChanged { ticket_id, .. }
                | TicketEvent::Resolved { ticket_id, .. }
                | TicketEvent::Reopened { ticket_id }
                | TicketEvent::AttachmentAdded { ticket_id, .. }
                | TicketEvent::AttachmentRemoved { ticket_id, .. }
                | TicketEvent::Deleted { ticket_id, .. } => ticket_id,
            },
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::Ticket(e) => match e {
                TicketEvent::Created { .. } => "ticket.created",
                TicketEvent::StatusChanged { .. } => "ticket.status_changed",
                TicketEvent::Assigned { .. } => "ticket.assigned",
                TicketEvent::Unassigned { .. } => "ticket.unassigned",
                TicketEvent::PriorityChanged { .. } => "ticket.priority_changed",
                TicketEvent::Resolved { .. } => "ticket.resolved",
                TicketEvent::Reopened { .. } => "ticket.reopened",
                TicketEvent::AttachmentAdded { .. } => "ticket.attachment_added",
                TicketEvent::AttachmentRemoved { .. } => "ticket.attachment_removed",
                TicketEvent::Deleted { .. } => "ticket.deleted",
            },
        }
    }
}
