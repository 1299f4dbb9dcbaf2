//! Query handlers
//!
//! Read side of `TicketService`. Sales users only ever see the tickets
//! they submitted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::commands::TicketService;
use crate::application::dto::TicketFilter;
use crate::domain::aggregates::{Ticket, TicketStatus};
use crate::domain::services::SlaReport;
use crate::domain::value_objects::{Actor, TicketId, UserId};
use crate::error::{Result, SupportError};
use crate::ports::inbound::TicketQueries;

impl TicketService {
    fn visible_to(actor: &Actor, tickets: Vec<Ticket>) -> Vec<Ticket> {
        if actor.role.can_view_all() {
            return tickets;
        }
        tickets
            .into_iter()
            .filter(|t| t.submitted_by() == Some(&actor.user_id))
            .collect()
    }
}

#[async_trait]
impl TicketQueries for TicketService {
    async fn get(&self, actor: &Actor, ticket_id: &TicketId) -> Result<Ticket> {
        let ticket = self.load(ticket_id).await?;
        self.ensure_visible(actor, &ticket)?;
        Ok(ticket)
    }

    async fn list_by_status(&self, actor: &Actor, status: TicketStatus) -> Result<Vec<Ticket>> {
        let tickets = self.tickets.find_by_status(status).await?;
        Ok(Self::visible_to(actor, tickets))
    }

    async fn list_assigned_to(&self, actor: &Actor, agent_id: &UserId) -> Result<Vec<Ticket>> {
        let tickets = self.tickets.find_by_assignee(agent_id).await?;
        Ok(Self::visible_to(actor, tickets))
    }

    async fn list_submitted_by(&self, actor: &Actor, user_id: &UserId) -> Result<Vec<Ticket>> {
        if !actor.role.can_view_all() && actor.user_id != *user_id {
            return Err(SupportError::Forbidden(format!(
                "role {} may only list its own submissions",
                actor.role
            )));
        }
        Ok(self.tickets.find_by_submitter(user_id).await?)
    }

    async fn sla_report(&self, actor: &Actor, filter: TicketFilter, now: Option<DateTime<Utc>>) -> Result<SlaReport> {
        let now = now.unwrap_or_else(|| self.clock.now());
        let tickets = Self::visible_to(actor, self.tickets.list().await?);
        let report = SlaReport::build(
            &self.config.sla,
            tickets.iter().filter(|t| filter.matches(t)),
            now,
        );
        tracing::debug!(total = report.total, red = report.red, "sla report built");
        Ok(report)
    }
}
