//! Directory user entity
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Role, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
}

impl UserProfile {
    pub fn new(id: UserId, name: impl Into<String>, role: Role) -> Self {
        Self { id, name: name.into(), email: None, role }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Only agents may hold tickets.
    pub fn can_take_ticket(&self) -> bool { self.role.is_agent() }
}
