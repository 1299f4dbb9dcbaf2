//! Ticket lifecycle engine
//!
//! Snapshot-in, snapshot-out wrapper around the ticket aggregate. Holds no
//! state and performs no I/O, so it can be shared freely across callers;
//! persisting the result is the caller's job.

use chrono::{DateTime, Utc};

use crate::domain::aggregates::{DeletionPlan, NewTicket, Ticket, TicketPatch};
use crate::domain::value_objects::{AttachmentRef, TicketNumber};
use crate::error::Result;

#[derive(Clone, Copy, Debug, Default)]
pub struct TicketLifecycle;

impl TicketLifecycle {
    pub fn new() -> Self {
        Self
    }

    /// Open a ticket under a freshly allocated number.
    pub fn create(&self, number: TicketNumber, new: NewTicket, now: DateTime<Utc>) -> Result<Ticket> {
        Ticket::open(number, new, now)
    }

    /// Validate `patch` against `current` and return the next snapshot.
    /// `current` is left untouched either way.
    pub fn apply_update(&self, current: &Ticket, patch: &TicketPatch, now: DateTime<Utc>) -> Result<Ticket> {
        let mut next = current.clone();
        next.apply(patch, now)?;
        Ok(next)
    }

    pub fn add_attachment(&self, current: &Ticket, reference: AttachmentRef, now: DateTime<Utc>) -> Ticket {
        let mut next = current.clone();
        next.attach(reference, now);
        next
    }

    /// Idempotent: removing a reference the ticket does not hold returns an
    /// identical snapshot.
    pub fn remove_attachment(&self, current: &Ticket, reference: &AttachmentRef, now: DateTime<Utc>) -> Ticket {
        let mut next = current.clone();
        next.detach(reference, now);
        next
    }

    pub fn delete(&self, current: &Ticket) -> DeletionPlan {
        current.deletion_plan()
    }
}
