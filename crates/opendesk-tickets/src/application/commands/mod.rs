//! Command handlers
//!
//! `TicketService` pairs the pure lifecycle engine with the outbound ports.
//! Every write is conditional on the version that was read; a lost race
//! comes back as `SupportError::Conflict`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::dto::*;
use crate::config::SupportConfig;
use crate::domain::aggregates::{AssignmentChange, Ticket, TicketPatch};
use crate::domain::events::{DomainEvent, TicketEvent};
use crate::domain::services::TicketLifecycle;
use crate::domain::value_objects::{Actor, AttachmentRef, TicketId};
use crate::error::{Result, SupportError};
use crate::ports::inbound::TicketUseCases;
use crate::ports::outbound::{
    AttachmentStore, Clock, EventPublisher, SignedUrl, TicketRepository, UserDirectory,
};

/// Ticket application service
pub struct TicketService {
    pub(crate) tickets: Arc<dyn TicketRepository>,
    pub(crate) users: Arc<dyn UserDirectory>,
    pub(crate) attachments: Arc<dyn AttachmentStore>,
    pub(crate) events: Arc<dyn EventPublisher>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: SupportConfig,
    pub(crate) lifecycle: TicketLifecycle,
}

impl TicketService {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        users: Arc<dyn UserDirectory>,
        attachments: Arc<dyn AttachmentStore>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        config: SupportConfig,
    ) -> Self {
        Self {
            tickets,
            users,
            attachments,
            events,
            clock,
            config,
            lifecycle: TicketLifecycle::new(),
        }
    }

    pub fn config(&self) -> &SupportConfig {
        &self.config
    }

    pub(crate) async fn load(&self, id: &TicketId) -> Result<Ticket> {
        self.tickets
            .find_by_id(id)
            .await
            .map_err(|e| e.for_ticket(id))?
            .ok_or_else(|| SupportError::NotFound(format!("ticket {id}")))
    }

    pub(crate) fn ensure_visible(&self, actor: &Actor, ticket: &Ticket) -> Result<()> {
        if actor.role.can_view_all() || ticket.submitted_by() == Some(&actor.user_id) {
            Ok(())
        } else {
            Err(SupportError::Forbidden(format!(
                "role {} may not view ticket {}",
                actor.role,
                ticket.number()
            )))
        }
    }

    /// New assignees must exist in the directory and hold an agent role.
    async fn validate_assignee(&self, patch: &TicketPatch) -> Result<()> {
        let Some(AssignmentChange::Assign(agent_id)) = &patch.assignment else {
            return Ok(());
        };
        let user = self
            .users
            .find_user(agent_id)
            .await?
            .ok_or_else(|| SupportError::NotFound(format!("user {agent_id}")))?;
        if !user.can_take_ticket() {
            return Err(SupportError::validation(format!(
                "user {agent_id} has role {} and cannot be assigned tickets",
                user.role
            )));
        }
        Ok(())
    }

    /// Persist `next` if it differs from `current`, conditional on the
    /// version `current` was read at.
    async fn write(&self, current: &Ticket, mut next: Ticket) -> Result<Ticket> {
        let id = *current.id();
        if next.version() == current.version() {
            // nothing to write, but a deleted or newer row still fails the call
            let stored = self
                .tickets
                .find_by_id(&id)
                .await
                .map_err(|e| e.for_ticket(&id))?
                .ok_or_else(|| SupportError::NotFound(format!("ticket {id}")))?;
            if stored.version() != current.version() {
                return Err(SupportError::Conflict { ticket_id: id, expected_version: current.version() });
            }
            return Ok(next);
        }

        // stored rows never carry pending events
        let events = next.take_events();
        self.tickets
            .update(&next, current.version())
            .await
            .map_err(|e| e.for_ticket(&id))?;

        self.publish(events).await;
        debug!(ticket_id = %id, version = next.version(), "ticket updated");
        Ok(next)
    }

    /// Re-fetch and re-apply on conflict, up to `max_conflict_retries` times.
    async fn mutate_with_retry<F>(&self, id: &TicketId, mutate: F) -> Result<Ticket>
    where
        F: Fn(&Ticket, chrono::DateTime<chrono::Utc>) -> Result<Ticket> + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            let current = self.load(id).await?;
            let next = mutate(&current, self.clock.now())?;
            match self.write(&current, next).await {
                Err(err) if err.is_retryable() && attempt < self.config.max_conflict_retries => {
                    attempt += 1;
                    debug!(ticket_id = %id, attempt, "conflicting write, retrying");
                }
                Err(err) => {
                    if err.is_retryable() {
                        warn!(ticket_id = %id, attempts = attempt + 1, "giving up after conflicting writes");
                    }
                    return Err(err);
                }
                Ok(ticket) => return Ok(ticket),
            }
        }
    }

    /// Tickets may only reference blobs stored under their own prefix.
    fn ensure_owned(ticket_id: &TicketId, patch: &TicketPatch) -> Result<()> {
        match patch.attachments_add.iter().find(|r| !r.belongs_to(ticket_id)) {
            Some(foreign) => Err(SupportError::validation(format!(
                "attachment {foreign} is not stored under ticket {ticket_id}"
            ))),
            None => Ok(()),
        }
    }

    /// Delete the blobs a successful patch dropped from the ticket.
    async fn release_removed(&self, ticket_id: &TicketId, patch: &TicketPatch) -> Result<()> {
        for reference in patch.attachments_remove.iter().filter(|r| r.belongs_to(ticket_id)) {
            self.attachments.delete(reference).await?;
        }
        Ok(())
    }

    async fn publish(&self, events: Vec<DomainEvent>) {
        if events.is_empty() {
            return;
        }
        // The write already landed; a failed publish must not undo it.
        if let Err(err) = self.events.publish(events).await {
            warn!(error = %err, "failed to publish ticket events");
        }
    }

    async fn release(&self, ticket_id: &TicketId, references: &[AttachmentRef]) -> (Vec<AttachmentRef>, Vec<FailedRelease>) {
        let mut released = Vec::new();
        let mut failed = Vec::new();
        for reference in references {
            if !reference.belongs_to(ticket_id) {
                warn!(ticket_id = %ticket_id, attachment = %reference, "skipping attachment owned by another ticket");
                continue;
            }
            match self.attachments.delete(reference).await {
                Ok(()) => released.push(reference.clone()),
                Err(err) => {
                    warn!(attachment = %reference, error = %err, "failed to release attachment");
                    failed.push(FailedRelease { reference: reference.clone(), error: err.to_string() });
                }
            }
        }
        (released, failed)
    }
}

#[async_trait]
impl TicketUseCases for TicketService {
    async fn submit(&self, actor: &Actor, command: SubmitTicketCommand) -> Result<Ticket> {
        actor.require(actor.role.can_submit(), "submit tickets")?;

        let new = command.into_new_ticket(Some(actor.user_id.clone()))?;
        // validate before a number is spent
        new.validate()?;

        let number = self.tickets.next_number().await?;
        let mut ticket = self.lifecycle.create(number, new, self.clock.now())?;

        let events = ticket.take_events();
        self.tickets.insert(&ticket).await?;
        self.publish(events).await;

        info!(ticket_id = %ticket.id(), number = %ticket.number(), category = %ticket.category(), "ticket submitted");
        Ok(ticket)
    }

    async fn update(&self, actor: &Actor, ticket_id: &TicketId, command: UpdateTicketCommand) -> Result<Ticket> {
        actor.require(actor.role.can_update(), "update tickets")?;

        let patch = TicketPatch::try_from(command)?;
        Self::ensure_owned(ticket_id, &patch)?;
        self.validate_assignee(&patch).await?;

        let ticket = self
            .mutate_with_retry(ticket_id, |current, now| self.lifecycle.apply_update(current, &patch, now))
            .await?;
        self.release_removed(ticket_id, &patch).await?;

        info!(ticket_id = %ticket_id, status = %ticket.status(), version = ticket.version(), "ticket update applied");
        Ok(ticket)
    }

    async fn update_snapshot(&self, actor: &Actor, snapshot: &Ticket, patch: TicketPatch) -> Result<Ticket> {
        actor.require(actor.role.can_update(), "update tickets")?;
        Self::ensure_owned(snapshot.id(), &patch)?;
        self.validate_assignee(&patch).await?;

        let next = self.lifecycle.apply_update(snapshot, &patch, self.clock.now())?;
        let ticket = self.write(snapshot, next).await?;
        self.release_removed(snapshot.id(), &patch).await?;
        Ok(ticket)
    }

    async fn attach_file(&self, actor: &Actor, ticket_id: &TicketId, upload: AttachmentUpload) -> Result<Ticket> {
        actor.require(actor.role.can_update(), "attach files")?;

        if upload.bytes.len() > self.config.max_attachment_bytes {
            return Err(SupportError::validation(format!(
                "attachment is {} bytes, limit is {}",
                upload.bytes.len(),
                self.config.max_attachment_bytes
            )));
        }

        // fail fast on a missing ticket before anything is uploaded
        self.load(ticket_id).await?;

        let reference = AttachmentRef::generate(ticket_id, &upload.file_name)?;
        self.attachments
            .upload(&reference, upload.bytes, &upload.content_type)
            .await?;

        let result = self
            .mutate_with_retry(ticket_id, |current, now| {
                Ok(self.lifecycle.add_attachment(current, reference.clone(), now))
            })
            .await;

        if let Err(err) = &result {
            warn!(ticket_id = %ticket_id, attachment = %reference, error = %err, "recording attachment failed, releasing upload");
            if let Err(cleanup) = self.attachments.delete(&reference).await {
                warn!(attachment = %reference, error = %cleanup, "orphaned attachment upload");
            }
        }
        result
    }

    async fn detach_file(&self, actor: &Actor, ticket_id: &TicketId, reference: &AttachmentRef) -> Result<Ticket> {
        actor.require(actor.role.can_update(), "detach files")?;

        let held = self.load(ticket_id).await?.has_attachment(reference);
        let ticket = self
            .mutate_with_retry(ticket_id, |current, now| {
                Ok(self.lifecycle.remove_attachment(current, reference, now))
            })
            .await?;

        // Paths under the ticket's prefix are released even when the
        // reference is already gone, so a retry finishes a half-done detach.
        if held || reference.belongs_to(ticket_id) {
            self.attachments.delete(reference).await?;
        }
        Ok(ticket)
    }

    async fn attachment_url(&self, actor: &Actor, ticket_id: &TicketId, reference: &AttachmentRef) -> Result<SignedUrl> {
        let ticket = self.load(ticket_id).await?;
        self.ensure_visible(actor, &ticket)?;
        if !ticket.has_attachment(reference) {
            return Err(SupportError::NotFound(format!("attachment {reference} on ticket {}", ticket.number())));
        }
        Ok(self.attachments.signed_url(reference, self.config.signed_url_ttl()).await?)
    }

    async fn delete(&self, actor: &Actor, ticket_id: &TicketId) -> Result<DeletionOutcome> {
        actor.require(actor.role.can_delete(), "delete tickets")?;

        let ticket = self.load(ticket_id).await?;
        let plan = self.lifecycle.delete(&ticket);

        self.tickets
            .delete(&plan.ticket_id, plan.expected_version)
            .await
            .map_err(|e| e.for_ticket(&plan.ticket_id))?;

        self.publish(vec![DomainEvent::Ticket(TicketEvent::Deleted {
            ticket_id: plan.ticket_id,
            number: plan.number,
        })])
        .await;

        let (released, failed) = self.release(&plan.ticket_id, &plan.attachment_refs).await;
        let outcome = DeletionOutcome {
            ticket_id: plan.ticket_id,
            number: plan.number,
            row_deleted: true,
            released,
            failed,
        };

        if outcome.is_complete() {
            info!(ticket_id = %ticket_id, number = %plan.number, "ticket deleted");
        } else {
            warn!(ticket_id = %ticket_id, pending = outcome.failed.len(), "ticket deleted with attachments pending release");
        }
        Ok(outcome)
    }

    async fn release_pending(&self, actor: &Actor, outcome: &DeletionOutcome) -> Result<DeletionOutcome> {
        actor.require(actor.role.can_delete(), "delete tickets")?;

        let (released, failed) = self.release(&outcome.ticket_id, &outcome.pending()).await;
        let mut next = outcome.clone();
        next.released.extend(released);
        next.failed = failed;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{TicketStatus, UserProfile};
    use crate::domain::value_objects::{Priority, Role, TicketNumber, UserId};
    use crate::infrastructure::{
        InMemoryAttachmentStore, InMemoryTicketRepository, InMemoryUserDirectory, ManualClock,
        RecordingEventPublisher,
    };
    use crate::ports::outbound::RepositoryError;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Fixture {
        service: TicketService,
        repo: Arc<InMemoryTicketRepository>,
        store: Arc<InMemoryAttachmentStore>,
        events: Arc<RecordingEventPublisher>,
        clock: Arc<ManualClock>,
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn admin() -> Actor {
        Actor::new(user("admin-1"), Role::Admin)
    }

    fn cs() -> Actor {
        Actor::new(user("cs-1"), Role::CustomerService)
    }

    fn sales() -> Actor {
        Actor::new(user("sales-1"), Role::Sales)
    }

    fn directory() -> Arc<InMemoryUserDirectory> {
        Arc::new(InMemoryUserDirectory::with_users([
            UserProfile::new(user("admin-1"), "Amara", Role::Admin),
            UserProfile::new(user("cs-1"), "Chidi", Role::CustomerService),
            UserProfile::new(user("cs-2"), "Bola", Role::CustomerService),
            UserProfile::new(user("sales-1"), "Sade", Role::Sales),
        ]))
    }

    fn fixture_with(repo: Arc<dyn TicketRepository>, mem: Arc<InMemoryTicketRepository>, config: SupportConfig) -> Fixture {
        let store = Arc::new(InMemoryAttachmentStore::new(config.max_attachment_bytes));
        let events = Arc::new(RecordingEventPublisher::new());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()));
        let service = TicketService::new(repo, directory(), store.clone(), events.clone(), clock.clone(), config);
        Fixture { service, repo: mem, store, events, clock }
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryTicketRepository::starting_at(1000));
        fixture_with(repo.clone(), repo, SupportConfig::default())
    }

    fn submit_command(title: &str) -> SubmitTicketCommand {
        SubmitTicketCommand {
            title: title.into(),
            category: "Service Interruption".into(),
            customer_name: Some("Tunde".into()),
            customer_whatsapp: Some("+2348000000000".into()),
            description: Some("No signal since morning".into()),
        }
    }

    fn upload(name: &str) -> AttachmentUpload {
        AttachmentUpload { file_name: name.into(), content_type: "image/png".into(), bytes: vec![7; 16] }
    }

    /// Lets a competing writer bump the stored version right before the
    /// next `races` updates.
    struct RacingRepository {
        inner: Arc<InMemoryTicketRepository>,
        races: AtomicU32,
    }

    #[async_trait]
    impl TicketRepository for RacingRepository {
        async fn next_number(&self) -> std::result::Result<TicketNumber, RepositoryError> {
            self.inner.next_number().await
        }
        async fn insert(&self, ticket: &Ticket) -> std::result::Result<(), RepositoryError> {
            self.inner.insert(ticket).await
        }
        async fn find_by_id(&self, id: &TicketId) -> std::result::Result<Option<Ticket>, RepositoryError> {
            self.inner.find_by_id(id).await
        }
        async fn update(&self, ticket: &Ticket, expected_version: u64) -> std::result::Result<(), RepositoryError> {
            if self.races.load(Ordering::SeqCst) > 0 {
                self.races.fetch_sub(1, Ordering::SeqCst);
                let mut stored = self.inner.find_by_id(ticket.id()).await?.ok_or(RepositoryError::NotFound)?;
                let version = stored.version();
                let bump = if stored.priority() == Priority::High { Priority::Low } else { Priority::High };
                let patch = TicketPatch { priority: Some(bump), ..Default::default() };
                stored.apply(&patch, Utc::now()).map_err(|e| RepositoryError::QueryError(e.to_string()))?;
                stored.take_events();
                self.inner.update(&stored, version).await?;
            }
            self.inner.update(ticket, expected_version).await
        }
        async fn delete(&self, id: &TicketId, expected_version: u64) -> std::result::Result<(), RepositoryError> {
            self.inner.delete(id, expected_version).await
        }
        async fn find_by_status(&self, status: TicketStatus) -> std::result::Result<Vec<Ticket>, RepositoryError> {
            self.inner.find_by_status(status).await
        }
        async fn find_by_assignee(&self, agent_id: &UserId) -> std::result::Result<Vec<Ticket>, RepositoryError> {
            self.inner.find_by_assignee(agent_id).await
        }
        async fn find_by_submitter(&self, user_id: &UserId) -> std::result::Result<Vec<Ticket>, RepositoryError> {
            self.inner.find_by_submitter(user_id).await
        }
        async fn list(&self) -> std::result::Result<Vec<Ticket>, RepositoryError> {
            self.inner.list().await
        }
    }

    fn racing_fixture(races: u32, max_conflict_retries: u32) -> Fixture {
        let mem = Arc::new(InMemoryTicketRepository::new());
        let racing = Arc::new(RacingRepository { inner: mem.clone(), races: AtomicU32::new(races) });
        fixture_with(racing, mem, SupportConfig { max_conflict_retries, ..Default::default() })
    }

    // --- submit ---------------------------------------------------------

    #[tokio::test]
    async fn test_submit_assigns_sequential_numbers() {
        let f = fixture();
        let a = f.service.submit(&sales(), submit_command("Outage in Ikeja")).await.unwrap();
        let b = f.service.submit(&cs(), submit_command("Outage in Yaba")).await.unwrap();
        assert_eq!(a.number(), TicketNumber::new(1000));
        assert_eq!(b.number(), TicketNumber::new(1001));
        assert_eq!(a.status(), TicketStatus::Open);
        assert_eq!(a.submitted_by(), Some(&user("sales-1")));
        assert_eq!(f.repo.len(), 2);
        assert_eq!(f.events.event_types(), vec!["ticket.created", "ticket.created"]);
    }

    #[tokio::test]
    async fn test_invalid_submission_spends_no_number() {
        let f = fixture();
        let err = f.service.submit(&sales(), submit_command("  ")).await.unwrap_err();
        assert!(matches!(err, SupportError::Validation(_)));
        let bad_category = SubmitTicketCommand { category: "Spam".into(), ..submit_command("x") };
        assert!(f.service.submit(&sales(), bad_category).await.is_err());
        let t = f.service.submit(&sales(), submit_command("Real one")).await.unwrap();
        assert_eq!(t.number(), TicketNumber::new(1000));
    }

    // --- update ---------------------------------------------------------

    #[tokio::test]
    async fn test_assignment_auto_transitions() {
        let f = fixture();
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();

        let assign = UpdateTicketCommand { assign_to: Some("cs-1".into()), ..Default::default() };
        let t = f.service.update(&cs(), t.id(), assign).await.unwrap();
        assert_eq!(t.status(), TicketStatus::InProgress);

        let unassign = UpdateTicketCommand { unassign: true, ..Default::default() };
        let t = f.service.update(&cs(), t.id(), unassign).await.unwrap();
        assert_eq!(t.status(), TicketStatus::Open);
        assert!(t.assigned_to().is_none());
    }

    #[tokio::test]
    async fn test_bogus_status_rejected() {
        let f = fixture();
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        let cmd = UpdateTicketCommand { status: Some("bogus".into()), ..Default::default() };
        let err = f.service.update(&cs(), t.id(), cmd).await.unwrap_err();
        assert!(matches!(err, SupportError::Validation(_)));
        assert_eq!(f.service.load(t.id()).await.unwrap().version(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_ticket_is_not_found() {
        let f = fixture();
        let cmd = UpdateTicketCommand { status: Some("closed".into()), ..Default::default() };
        let err = f.service.update(&cs(), &TicketId::new(), cmd).await.unwrap_err();
        assert!(matches!(err, SupportError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_assignee_must_exist_and_be_agent() {
        let f = fixture();
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();

        let ghost = UpdateTicketCommand { assign_to: Some("nobody".into()), ..Default::default() };
        assert!(matches!(f.service.update(&cs(), t.id(), ghost).await, Err(SupportError::NotFound(_))));

        let to_sales = UpdateTicketCommand { assign_to: Some("sales-1".into()), ..Default::default() };
        assert!(matches!(f.service.update(&cs(), t.id(), to_sales).await, Err(SupportError::Validation(_))));
    }

    #[tokio::test]
    async fn test_sales_cannot_update() {
        let f = fixture();
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        let cmd = UpdateTicketCommand { priority: Some("urgent".into()), ..Default::default() };
        assert!(matches!(f.service.update(&sales(), t.id(), cmd).await, Err(SupportError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_resolution_uses_clock() {
        let f = fixture();
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        f.clock.advance(Duration::hours(3));
        let cmd = UpdateTicketCommand {
            status: Some("resolved".into()),
            resolution_steps: Some("Replaced power adapter".into()),
            ..Default::default()
        };
        let t = f.service.update(&cs(), t.id(), cmd).await.unwrap();
        assert_eq!(t.resolved_at(), Some(t.created_at() + Duration::hours(3)));
        assert!(f.events.event_types().contains(&"ticket.resolved"));
    }

    // --- optimistic concurrency -------------------------------------------

    #[tokio::test]
    async fn test_concurrent_updates_from_stale_snapshot_conflict() {
        let f = fixture();
        let stale = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();

        let (cs_actor, admin_actor) = (cs(), admin());
        let (a, b) = tokio::join!(
            f.service.update_snapshot(&cs_actor, &stale, TicketPatch::status(TicketStatus::Resolved)),
            f.service.update_snapshot(&admin_actor, &stale, TicketPatch::status(TicketStatus::Closed)),
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let err = results.into_iter().find_map(|r| r.err()).unwrap();
        assert_eq!(err, SupportError::Conflict { ticket_id: *stale.id(), expected_version: 1 });
    }

    #[tokio::test]
    async fn test_sequential_stale_write_conflicts() {
        let f = fixture();
        let stale = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        f.service.update_snapshot(&cs(), &stale, TicketPatch::status(TicketStatus::InProgress)).await.unwrap();
        let err = f
            .service
            .update_snapshot(&cs(), &stale, TicketPatch::status(TicketStatus::Closed))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_update_retries_after_conflict() {
        let f = racing_fixture(2, 3);
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        let cmd = UpdateTicketCommand { status: Some("closed".into()), ..Default::default() };
        let updated = f.service.update(&cs(), t.id(), cmd).await.unwrap();
        assert_eq!(updated.status(), TicketStatus::Closed);
        // two competing writes landed before ours
        assert_eq!(updated.version(), 4);
    }

    #[tokio::test]
    async fn test_update_gives_up_after_retry_budget() {
        let f = racing_fixture(5, 1);
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        let cmd = UpdateTicketCommand { status: Some("closed".into()), ..Default::default() };
        let err = f.service.update(&cs(), t.id(), cmd).await.unwrap_err();
        assert!(matches!(err, SupportError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_noop_snapshot_update_on_deleted_ticket_is_not_found() {
        let f = fixture();
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        f.service.delete(&admin(), t.id()).await.unwrap();
        let err = f.service.update_snapshot(&cs(), &t, TicketPatch::default()).await.unwrap_err();
        assert!(matches!(err, SupportError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_noop_update_on_stale_snapshot_conflicts() {
        let f = fixture();
        let stale = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        f.service.update_snapshot(&cs(), &stale, TicketPatch::status(TicketStatus::InProgress)).await.unwrap();
        let err = f.service.update_snapshot(&cs(), &stale, TicketPatch::default()).await.unwrap_err();
        assert_eq!(err, SupportError::Conflict { ticket_id: *stale.id(), expected_version: 1 });
    }

    // --- attachments ------------------------------------------------------

    #[tokio::test]
    async fn test_attach_and_detach_file() {
        let f = fixture();
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();

        let t = f.service.attach_file(&cs(), t.id(), upload("photo.png")).await.unwrap();
        let reference = t.attachments()[0].clone();
        assert!(f.store.contains(&reference));
        assert_eq!(f.store.content_type(&reference).as_deref(), Some("image/png"));

        let url = f.service.attachment_url(&sales(), t.id(), &reference).await.unwrap();
        assert!(url.url.contains(reference.as_str()));

        let t = f.service.detach_file(&cs(), t.id(), &reference).await.unwrap();
        assert!(t.attachments().is_empty());
        assert!(!f.store.contains(&reference));

        // second detach is a no-op
        let again = f.service.detach_file(&cs(), t.id(), &reference).await.unwrap();
        assert_eq!(again.version(), t.version());
    }

    #[tokio::test]
    async fn test_attach_to_missing_ticket_uploads_nothing() {
        let f = fixture();
        let err = f.service.attach_file(&cs(), &TicketId::new(), upload("a.png")).await.unwrap_err();
        assert!(matches!(err, SupportError::NotFound(_)));
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_attach_rejects_oversized_upload() {
        let f = fixture();
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        let big = AttachmentUpload { bytes: vec![0; f.service.config().max_attachment_bytes + 1], ..upload("big.bin") };
        assert!(matches!(f.service.attach_file(&cs(), t.id(), big).await, Err(SupportError::Validation(_))));
    }

    #[tokio::test]
    async fn test_attachment_url_requires_ownership() {
        let f = fixture();
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        let foreign = AttachmentRef::new("tickets/other/x.png").unwrap();
        assert!(matches!(
            f.service.attachment_url(&cs(), t.id(), &foreign).await,
            Err(SupportError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_rejects_foreign_attachment() {
        let f = fixture();
        let a = f.service.submit(&sales(), submit_command("Outage in Ikeja")).await.unwrap();
        let b = f.service.submit(&sales(), submit_command("Outage in Yaba")).await.unwrap();
        let b = f.service.attach_file(&cs(), b.id(), upload("evidence.png")).await.unwrap();
        let evidence = b.attachments()[0].clone();

        let cmd = UpdateTicketCommand { attachments_add: vec![evidence.to_string()], ..Default::default() };
        let err = f.service.update(&cs(), a.id(), cmd).await.unwrap_err();
        assert!(matches!(err, SupportError::Validation(_)));
        let patch = TicketPatch { attachments_add: vec![evidence.clone()], ..Default::default() };
        assert!(matches!(f.service.update_snapshot(&cs(), &a, patch).await, Err(SupportError::Validation(_))));

        f.service.delete(&admin(), a.id()).await.unwrap();
        assert!(f.store.contains(&evidence));
        assert!(f.service.load(b.id()).await.unwrap().has_attachment(&evidence));
    }

    #[tokio::test]
    async fn test_update_removing_attachment_releases_blob() {
        let f = fixture();
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        let t = f.service.attach_file(&cs(), t.id(), upload("x.png")).await.unwrap();
        let reference = t.attachments()[0].clone();

        let cmd = UpdateTicketCommand { attachments_remove: vec![reference.to_string()], ..Default::default() };
        let t = f.service.update(&cs(), t.id(), cmd).await.unwrap();
        assert!(t.attachments().is_empty());
        assert!(!f.store.contains(&reference));

        f.service.delete(&admin(), t.id()).await.unwrap();
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_skips_references_outside_ticket_prefix() {
        let f = fixture();
        let a = f.service.submit(&sales(), submit_command("Outage in Ikeja")).await.unwrap();
        let b = f.service.submit(&sales(), submit_command("Outage in Yaba")).await.unwrap();
        let b = f.service.attach_file(&cs(), b.id(), upload("evidence.png")).await.unwrap();
        let evidence = b.attachments()[0].clone();

        // a row that picked up a foreign reference before ownership was enforced
        let mut legacy = f.service.load(a.id()).await.unwrap();
        let version = legacy.version();
        legacy.apply(&TicketPatch { attachments_add: vec![evidence.clone()], ..Default::default() }, Utc::now()).unwrap();
        legacy.take_events();
        f.repo.update(&legacy, version).await.unwrap();

        let outcome = f.service.delete(&admin(), a.id()).await.unwrap();
        assert!(outcome.released.is_empty());
        assert!(outcome.is_complete());
        assert!(f.store.contains(&evidence));
    }

    // --- deletion ---------------------------------------------------------

    #[tokio::test]
    async fn test_delete_releases_attachments() {
        let f = fixture();
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        f.service.attach_file(&cs(), t.id(), upload("a.png")).await.unwrap();
        f.service.attach_file(&cs(), t.id(), upload("b.png")).await.unwrap();

        let outcome = f.service.delete(&admin(), t.id()).await.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.released.len(), 2);
        assert!(f.store.is_empty());
        assert!(f.repo.is_empty());
        assert!(f.events.event_types().contains(&"ticket.deleted"));
    }

    #[tokio::test]
    async fn test_partial_deletion_is_reported_and_retryable() {
        let f = fixture();
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        let t = f.service.attach_file(&cs(), t.id(), upload("a.png")).await.unwrap();
        let t = f.service.attach_file(&cs(), t.id(), upload("b.png")).await.unwrap();
        let stuck = t.attachments()[1].clone();
        f.store.fail_deletes_for(&stuck);

        let outcome = f.service.delete(&admin(), t.id()).await.unwrap();
        assert!(outcome.row_deleted);
        assert!(!outcome.is_complete());
        assert_eq!(outcome.pending(), vec![stuck.clone()]);
        assert!(f.repo.is_empty());

        f.store.heal(&stuck);
        let retried = f.service.release_pending(&admin(), &outcome).await.unwrap();
        assert!(retried.is_complete());
        assert_eq!(retried.released.len(), 2);
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_only_admin_deletes() {
        let f = fixture();
        let t = f.service.submit(&sales(), submit_command("Router down")).await.unwrap();
        assert!(matches!(f.service.delete(&cs(), t.id()).await, Err(SupportError::Forbidden(_))));
        assert_eq!(f.repo.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_ticket() {
        let f = fixture();
        assert!(matches!(f.service.delete(&admin(), &TicketId::new()).await, Err(SupportError::NotFound(_))));
    }
}
