//! Ticketing value objects
//!
//! Immutable, validated domain primitives.

pub mod classification;
pub mod role;

pub use classification::{Category, Priority};
pub use role::{Actor, Role};

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Result, SupportError};

/// Ticket identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(Uuid);

impl TicketId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(id: &str) -> Result<Self> {
        Uuid::parse_str(id.trim())
            .map(Self)
            .map_err(|_| SupportError::validation(format!("invalid ticket id: {id}")))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable sequential ticket number
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketNumber(u64);

impl TicketNumber {
    pub fn new(n: u64) -> Self {
        Self(n)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a user in the directory (agent, submitter)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(SupportError::validation("user id cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = SupportError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque blob-store path of a ticket attachment
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttachmentRef(String);

impl AttachmentRef {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(SupportError::validation("attachment reference cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Fresh storage path for an upload. A new name per upload keeps
    /// re-uploads from overwriting each other.
    pub fn generate(ticket_id: &TicketId, file_name: &str) -> Result<Self> {
        let file_name: String = file_name
            .trim()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
            .collect();
        if file_name.is_empty() {
            return Err(SupportError::validation("file name cannot be empty"));
        }
        Self::new(format!("tickets/{}/{}-{}", ticket_id, Uuid::new_v4(), file_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for paths generated under the ticket's own prefix.
    pub fn belongs_to(&self, ticket_id: &TicketId) -> bool {
        self.0.starts_with(&format!("tickets/{ticket_id}/"))
    }
}

impl TryFrom<String> for AttachmentRef {
    type Error = SupportError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AttachmentRef> for String {
    fn from(r: AttachmentRef) -> Self {
        r.0
    }
}

impl fmt::Display for AttachmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
