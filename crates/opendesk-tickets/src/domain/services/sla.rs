//! SLA evaluation
//!
//! Traffic-light classification of how quickly a ticket is (or was)
//! handled. Always computed on demand; never stored on the ticket.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::aggregates::{Ticket, TicketStatus};
use crate::domain::value_objects::TicketId;
use crate::error::{Result, SupportError};

/// SLA traffic light
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        })
    }
}

/// Threshold policy, both limits measured from ticket creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaPolicy {
    pub green_limit_hours: u32,
    pub red_limit_hours: u32,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self { green_limit_hours: 19, red_limit_hours: 24 }
    }
}

impl SlaPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.green_limit_hours == 0 {
            return Err(SupportError::Config("sla green limit must be positive".into()));
        }
        if self.green_limit_hours > self.red_limit_hours {
            return Err(SupportError::Config(format!(
                "sla green limit ({}h) exceeds red limit ({}h)",
                self.green_limit_hours, self.red_limit_hours
            )));
        }
        Ok(())
    }

    pub fn green_limit(&self) -> Duration {
        Duration::hours(i64::from(self.green_limit_hours))
    }

    pub fn red_limit(&self) -> Duration {
        Duration::hours(i64::from(self.red_limit_hours))
    }

    /// Classify a ticket at instant `now`.
    ///
    /// Terminal tickets with a resolution timestamp are judged on
    /// `resolved_at - created_at` only (green or red, never yellow).
    /// Everything else is judged on `now - created_at`. Each bracket is
    /// inclusive of its upper bound.
    pub fn evaluate(
        &self,
        created_at: DateTime<Utc>,
        resolved_at: Option<DateTime<Utc>>,
        status: TicketStatus,
        now: DateTime<Utc>,
    ) -> SlaStatus {
        match resolved_at {
            Some(resolved_at) if status.is_terminal() => {
                if resolved_at - created_at <= self.red_limit() {
                    SlaStatus::Green
                } else {
                    SlaStatus::Red
                }
            }
            _ => {
                let elapsed = now - created_at;
                if elapsed <= self.green_limit() {
                    SlaStatus::Green
                } else if elapsed <= self.red_limit() {
                    SlaStatus::Yellow
                } else {
                    SlaStatus::Red
                }
            }
        }
    }

    pub fn evaluate_ticket(&self, ticket: &Ticket, now: DateTime<Utc>) -> SlaStatus {
        self.evaluate(ticket.created_at(), ticket.resolved_at(), ticket.status(), now)
    }
}

/// Evaluate under the default 19h / 24h policy.
pub fn evaluate_sla(
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    status: TicketStatus,
    now: DateTime<Utc>,
) -> SlaStatus {
    SlaPolicy::default().evaluate(created_at, resolved_at, status, now)
}

/// Dashboard compliance figures over a set of tickets
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlaReport {
    pub evaluated_at: Option<DateTime<Utc>>,
    pub total: usize,
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
    /// Share of green tickets; 1.0 for an empty set.
    pub compliance_rate: f64,
    pub breached: Vec<TicketId>,
}

impl SlaReport {
    pub fn build<'a>(
        policy: &SlaPolicy,
        tickets: impl IntoIterator<Item = &'a Ticket>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut report = Self { evaluated_at: Some(now), ..Default::default() };
        for ticket in tickets {
            report.total += 1;
            match policy.evaluate_ticket(ticket, now) {
                SlaStatus::Green => report.green += 1,
                SlaStatus::Yellow => report.yellow += 1,
                SlaStatus::Red => {
                    report.red += 1;
                    report.breached.push(*ticket.id());
                }
            }
        }
        report.compliance_rate = if report.total == 0 {
            1.0
        } else {
            report.green as f64 / report.total as f64
        };
        report
    }
}
