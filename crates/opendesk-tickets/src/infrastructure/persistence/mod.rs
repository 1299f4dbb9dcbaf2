//! In-memory persistence adapters
//!
//! `DashMap` shard locks make the version check and the write of a
//! conditional update a single atomic step per ticket.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::aggregates::{Ticket, TicketStatus};
use crate::domain::value_objects::{TicketId, TicketNumber, UserId};
use crate::domain::DomainEvent;
use crate::ports::outbound::{EventPublisher, RepositoryError, TicketRepository};

/// In-memory ticket repository with optimistic concurrency
pub struct InMemoryTicketRepository {
    tickets: DashMap<TicketId, Ticket>,
    sequence: AtomicU64,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// First allocated number will be `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            tickets: DashMap::new(),
            sequence: AtomicU64::new(first.saturating_sub(1)),
        }
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    fn collect(&self, pred: impl Fn(&Ticket) -> bool) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self
            .tickets
            .iter()
            .filter(|entry| pred(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        tickets.sort_by(|a, b| b.number().cmp(&a.number()));
        tickets
    }
}

impl Default for InMemoryTicketRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn next_number(&self) -> Result<TicketNumber, RepositoryError> {
        Ok(TicketNumber::new(self.sequence.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn insert(&self, ticket: &Ticket) -> Result<(), RepositoryError> {
        match self.tickets.entry(*ticket.id()) {
            Entry::Occupied(_) => Err(RepositoryError::DuplicateKey(ticket.id().to_string())),
            Entry::Vacant(slot) => {
                slot.insert(ticket.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, RepositoryError> {
        Ok(self.tickets.get(id).map(|t| t.value().clone()))
    }

    async fn update(&self, ticket: &Ticket, expected_version: u64) -> Result<(), RepositoryError> {
        match self.tickets.entry(*ticket.id()) {
            Entry::Vacant(_) => Err(RepositoryError::NotFound),
            Entry::Occupied(mut slot) => {
                let actual = slot.get().version();
                if actual != expected_version {
                    return Err(RepositoryError::Conflict { expected: expected_version, actual });
                }
                slot.insert(ticket.clone());
                Ok(())
            }
        }
    }

    async fn delete(&self, id: &TicketId, expected_version: u64) -> Result<(), RepositoryError> {
        match self.tickets.entry(*id) {
            Entry::Vacant(_) => Err(RepositoryError::NotFound),
            Entry::Occupied(slot) => {
                let actual = slot.get().version();
                if actual != expected_version {
                    return Err(RepositoryError::Conflict { expected: expected_version, actual });
                }
                slot.remove();
                Ok(())
            }
        }
    }

    async fn find_by_status(&self, status: TicketStatus) -> Result<Vec<Ticket>, RepositoryError> {
        Ok(self.collect(|t| t.status() == status))
    }

    async fn find_by_assignee(&self, agent_id: &UserId) -> Result<Vec<Ticket>, RepositoryError> {
        Ok(self.collect(|t| t.assigned_to() == Some(agent_id)))
    }

    async fn find_by_submitter(&self, user_id: &UserId) -> Result<Vec<Ticket>, RepositoryError> {
        Ok(self.collect(|t| t.submitted_by() == Some(user_id)))
    }

    async fn list(&self) -> Result<Vec<Ticket>, RepositoryError> {
        Ok(self.collect(|_| true))
    }
}

/// No-op event publisher
#[derive(Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish(&self, _events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Keeps every published event, in order
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.event_type()).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        self.events.lock().extend(events);
        Ok(())
    }
}
