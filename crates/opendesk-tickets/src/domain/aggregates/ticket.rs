//! Ticket Aggregate
//!
//! Rich aggregate root holding the status/assignment state machine and the
//! resolution bookkeeping. Every mutation takes an explicit `now` so the
//! rules stay deterministic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::events::{DomainEvent, TicketEvent};
use crate::domain::value_objects::{AttachmentRef, Category, Priority, TicketId, TicketNumber, UserId};
use crate::error::{Result, SupportError};

/// Ticket aggregate root
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    id: TicketId,
    number: TicketNumber,
    title: String,
    description: Option<String>,
    category: Category,
    priority: Priority,
    status: TicketStatus,
    assigned_to: Option<UserId>,
    resolution_steps: Option<String>,
    customer_name: Option<String>,
    customer_whatsapp: Option<String>,
    attachments: Vec<AttachmentRef>,
    submitted_by: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    version: u64,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Resolved and closed tickets carry a resolution timestamp.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = SupportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            other => Err(SupportError::validation(format!("unrecognized status: {other:?}"))),
        }
    }
}

/// Submission data for a new ticket
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTicket {
    pub title: String,
    pub category: Category,
    pub customer_name: Option<String>,
    pub customer_whatsapp: Option<String>,
    pub description: Option<String>,
    pub submitted_by: Option<UserId>,
}

impl NewTicket {
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title).map(|_| ())
    }
}

/// Requested change of assignee
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentChange {
    Assign(UserId),
    Unassign,
}

/// Partial update carrying only the fields being changed
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub status: Option<TicketStatus>,
    pub assignment: Option<AssignmentChange>,
    pub resolution_steps: Option<String>,
    #[serde(default)]
    pub attachments_add: Vec<AttachmentRef>,
    #[serde(default)]
    pub attachments_remove: Vec<AttachmentRef>,
}

impl TicketPatch {
    pub fn status(status: TicketStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn assign(agent_id: UserId) -> Self {
        Self { assignment: Some(AssignmentChange::Assign(agent_id)), ..Default::default() }
    }

    pub fn unassign() -> Self {
        Self { assignment: Some(AssignmentChange::Unassign), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// What the caller must release to delete a ticket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionPlan {
    pub ticket_id: TicketId,
    pub number: TicketNumber,
    pub expected_version: u64,
    pub attachment_refs: Vec<AttachmentRef>,
}

impl Ticket {
    /// Open a new ticket: status open, priority medium, unassigned.
    pub fn open(number: TicketNumber, new: NewTicket, now: DateTime<Utc>) -> Result<Self> {
        let title = validate_title(&new.title)?;
        let id = TicketId::new();

        let mut ticket = Self {
            id,
            number,
            title,
            description: normalize(new.description),
            category: new.category,
            priority: Priority::Medium,
            status: TicketStatus::Open,
            assigned_to: None,
            resolution_steps: None,
            customer_name: normalize(new.customer_name),
            customer_whatsapp: normalize(new.customer_whatsapp),
            attachments: vec![],
            submitted_by: new.submitted_by,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            version: 1,
            events: vec![],
        };

        ticket.raise_event(TicketEvent::Created { ticket_id: id, number, created_at: now });
        Ok(ticket)
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> &TicketId { &self.id }
    pub fn number(&self) -> TicketNumber { self.number }
    pub fn title(&self) -> &str { &self.title }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }
    pub fn category(&self) -> Category { self.category }
    pub fn priority(&self) -> Priority { self.priority }
    pub fn status(&self) -> TicketStatus { self.status }
    pub fn assigned_to(&self) -> Option<&UserId> { self.assigned_to.as_ref() }
    pub fn is_assigned(&self) -> bool { self.assigned_to.is_some() }
    pub fn resolution_steps(&self) -> Option<&str> { self.resolution_steps.as_deref() }
    pub fn customer_name(&self) -> Option<&str> { self.customer_name.as_deref() }
    pub fn customer_whatsapp(&self) -> Option<&str> { self.customer_whatsapp.as_deref() }
    pub fn attachments(&self) -> &[AttachmentRef] { &self.attachments }
    pub fn submitted_by(&self) -> Option<&UserId> { self.submitted_by.as_ref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn resolved_at(&self) -> Option<DateTime<Utc>> { self.resolved_at }
    pub fn version(&self) -> u64 { self.version }

    pub fn has_attachment(&self, reference: &AttachmentRef) -> bool {
        self.attachments.contains(reference)
    }

    // =========================================================================
    // Business Operations
    // =========================================================================

    /// Apply a partial update.
    ///
    /// Status is finalized first: an explicit status in the patch is taken
    /// as-is, otherwise an assignment change may auto-transition
    /// (open -> in_progress on first assignment, in_progress -> open on
    /// unassignment). Resolution bookkeeping runs on the final status.
    /// Validation happens before anything is mutated.
    pub fn apply(&mut self, patch: &TicketPatch, now: DateTime<Utc>) -> Result<()> {
        let title = patch.title.as_deref().map(validate_title).transpose()?;

        let previous_assignee = self.assigned_to.clone();
        let next_assignee = match &patch.assignment {
            None => previous_assignee.clone(),
            Some(AssignmentChange::Assign(agent_id)) => Some(agent_id.clone()),
            Some(AssignmentChange::Unassign) => None,
        };
        let next_status = patch
            .status
            .unwrap_or_else(|| auto_transition(self.status, previous_assignee.is_some(), next_assignee.is_some()));

        if patch.resolution_steps.is_some() && !next_status.is_terminal() {
            return Err(SupportError::validation(
                "resolution_steps requires a resolved or closed status",
            ));
        }

        let mut changed = false;

        if let Some(title) = title {
            changed |= replace(&mut self.title, title);
        }
        if let Some(description) = &patch.description {
            changed |= replace(&mut self.description, normalize(Some(description.clone())));
        }
        if let Some(category) = patch.category {
            changed |= replace(&mut self.category, category);
        }
        if let Some(priority) = patch.priority {
            let from = self.priority;
            if replace(&mut self.priority, priority) {
                changed = true;
                self.raise_event(TicketEvent::PriorityChanged { ticket_id: self.id, from, to: priority });
            }
        }

        if previous_assignee != next_assignee {
            changed = true;
            self.assigned_to = next_assignee.clone();
            match (previous_assignee, next_assignee) {
                (Some(previous_agent_id), None) => {
                    self.raise_event(TicketEvent::Unassigned { ticket_id: self.id, previous_agent_id });
                }
                (_, Some(agent_id)) => {
                    self.raise_event(TicketEvent::Assigned { ticket_id: self.id, agent_id });
                }
                (None, None) => {}
            }
        }

        let from = self.status;
        if replace(&mut self.status, next_status) {
            changed = true;
            self.raise_event(TicketEvent::StatusChanged { ticket_id: self.id, from, to: next_status });
        }

        changed |= self.settle_resolution(patch.resolution_steps.as_ref(), now);

        for reference in &patch.attachments_add {
            changed |= self.push_attachment(reference.clone());
        }
        for reference in &patch.attachments_remove {
            changed |= self.drop_attachment(reference);
        }

        if changed {
            self.touch(now);
        }
        Ok(())
    }

    /// Append an attachment reference. Returns false if it was already there.
    pub fn attach(&mut self, reference: AttachmentRef, now: DateTime<Utc>) -> bool {
        let added = self.push_attachment(reference);
        if added {
            self.touch(now);
        }
        added
    }

    /// Remove an attachment reference. Removing an absent one is a no-op.
    pub fn detach(&mut self, reference: &AttachmentRef, now: DateTime<Utc>) -> bool {
        let removed = self.drop_attachment(reference);
        if removed {
            self.touch(now);
        }
        removed
    }

    /// Describe the deletion without touching storage.
    pub fn deletion_plan(&self) -> DeletionPlan {
        DeletionPlan {
            ticket_id: self.id,
            number: self.number,
            expected_version: self.version,
            attachment_refs: self.attachments.clone(),
        }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.events
    }

    // =========================================================================
    // Private
    // =========================================================================

    /// resolved_at is set iff the status is terminal; steps live only
    /// alongside it.
    fn settle_resolution(&mut self, steps: Option<&String>, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            let mut changed = false;
            if self.resolved_at.is_none() {
                self.resolved_at = Some(now);
                self.raise_event(TicketEvent::Resolved { ticket_id: self.id, resolved_at: now });
                changed = true;
            }
            if let Some(steps) = steps {
                changed |= replace(&mut self.resolution_steps, normalize(Some(steps.clone())));
            }
            changed
        } else if self.resolved_at.is_some() || self.resolution_steps.is_some() {
            self.resolved_at = None;
            self.resolution_steps = None;
            self.raise_event(TicketEvent::Reopened { ticket_id: self.id });
            true
        } else {
            false
        }
    }

    fn push_attachment(&mut self, reference: AttachmentRef) -> bool {
        if self.attachments.contains(&reference) {
            return false;
        }
        self.attachments.push(reference.clone());
        self.raise_event(TicketEvent::AttachmentAdded { ticket_id: self.id, reference });
        true
    }

    fn drop_attachment(&mut self, reference: &AttachmentRef) -> bool {
        let before = self.attachments.len();
        self.attachments.retain(|r| r != reference);
        if self.attachments.len() == before {
            return false;
        }
        self.raise_event(TicketEvent::AttachmentRemoved { ticket_id: self.id, reference: reference.clone() });
        true
    }

    fn raise_event(&mut self, event: TicketEvent) {
        self.events.push(DomainEvent::Ticket(event));
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.updated_at);
        self.version += 1;
    }
}

fn auto_transition(current: TicketStatus, was_assigned: bool, is_assigned: bool) -> TicketStatus {
    match (current, was_assigned, is_assigned) {
        (TicketStatus::Open, false, true) => TicketStatus::InProgress,
        (TicketStatus::InProgress, true, false) => TicketStatus::Open,
        (status, _, _) => status,
    }
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(SupportError::validation("title cannot be empty"));
    }
    Ok(title.to_string())
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn agent(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn new_ticket() -> Ticket {
        Ticket::open(
            TicketNumber::new(1001),
            NewTicket {
                title: "Router keeps rebooting".into(),
                category: Category::TechnicalIssue,
                customer_name: Some("Ada".into()),
                customer_whatsapp: Some(" +234 800 000 0000 ".into()),
                description: None,
                submitted_by: Some(agent("sales-1")),
            },
            t0(),
        )
        .unwrap()
    }

    #[test]
    fn test_open_defaults() {
        let t = new_ticket();
        assert_eq!(t.status(), TicketStatus::Open);
        assert_eq!(t.priority(), Priority::Medium);
        assert!(t.assigned_to().is_none());
        assert!(t.resolved_at().is_none());
        assert_eq!(t.version(), 1);
        assert_eq!(t.customer_whatsapp(), Some("+234 800 000 0000"));
        assert_eq!(t.pending_events().len(), 1);
    }

    #[test]
    fn test_open_rejects_blank_title() {
        let result = Ticket::open(
            TicketNumber::new(1),
            NewTicket {
                title: "   ".into(),
                category: Category::Other,
                customer_name: None,
                customer_whatsapp: None,
                description: None,
                submitted_by: None,
            },
            t0(),
        );
        assert!(matches!(result, Err(SupportError::Validation(_))));
    }

    #[test]
    fn test_assign_moves_open_to_in_progress() {
        let mut t = new_ticket();
        t.apply(&TicketPatch::assign(agent("cs-1")), t0()).unwrap();
        assert_eq!(t.status(), TicketStatus::InProgress);
        assert_eq!(t.assigned_to(), Some(&agent("cs-1")));
        assert_eq!(t.version(), 2);
    }

    #[test]
    fn test_failed_validation_leaves_ticket_untouched() {
        let mut t = new_ticket();
        let before = t.clone();
        let patch = TicketPatch {
            title: Some("".into()),
            priority: Some(Priority::Urgent),
            ..Default::default()
        };
        assert!(t.apply(&patch, t0()).is_err());
        assert_eq!(t, before);
    }

    #[test]
    fn test_resolution_steps_without_terminal_status_rejected() {
        let mut t = new_ticket();
        let patch = TicketPatch { resolution_steps: Some("rebooted".into()), ..Default::default() };
        assert!(matches!(t.apply(&patch, t0()), Err(SupportError::Validation(_))));
    }

    #[test]
    fn test_empty_patch_is_not_a_change() {
        let mut t = new_ticket();
        t.apply(&TicketPatch::default(), t0() + Duration::hours(1)).unwrap();
        assert_eq!(t.version(), 1);
        assert_eq!(t.updated_at(), t0());
    }

    #[test]
    fn test_deletion_plan_lists_attachments() {
        let mut t = new_ticket();
        let a = AttachmentRef::new("tickets/x/a.png").unwrap();
        assert!(t.attach(a.clone(), t0()));
        let plan = t.deletion_plan();
        assert_eq!(plan.ticket_id, *t.id());
        assert_eq!(plan.attachment_refs, vec![a]);
        assert_eq!(plan.expected_version, 2);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("in_progress".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert!(matches!("bogus".parse::<TicketStatus>(), Err(SupportError::Validation(_))));
    }

    #[test]
    fn test_events_are_drained_once() {
        let mut t = new_ticket();
        t.apply(&TicketPatch::status(TicketStatus::Resolved), t0()).unwrap();
        let events = t.take_events();
        let kinds: Vec<_> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(kinds, vec!["ticket.created", "ticket.status_changed", "ticket.resolved"]);
        assert!(t.take_events().is_empty());
    }
}
