//! Roles and the calling actor
//!
//! Authorization is decided here, at the application boundary. The lifecycle
//! engine itself never looks at roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UserId;
use crate::error::SupportError;

/// Directory role of a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    CustomerService,
    Sales,
}

impl Role {
    /// Agents are the users tickets may be assigned to.
    pub fn is_agent(&self) -> bool {
        match self {
            Self::Admin | Self::CustomerService => true,
            Self::Sales => false,
        }
    }

    pub fn can_submit(&self) -> bool {
        match self {
            Self::Admin | Self::CustomerService | Self::Sales => true,
        }
    }

    pub fn can_view_all(&self) -> bool {
        match self {
            Self::Admin | Self::CustomerService => true,
            Self::Sales => false,
        }
    }

    /// Status, priority, assignment and attachment changes.
    pub fn can_update(&self) -> bool {
        match self {
            Self::Admin | Self::CustomerService => true,
            Self::Sales => false,
        }
    }

    pub fn can_delete(&self) -> bool {
        match self {
            Self::Admin => true,
            Self::CustomerService | Self::Sales => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::CustomerService => "customer_service",
            Self::Sales => "sales",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SupportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Self::Admin),
            "customer_service" => Ok(Self::CustomerService),
            "sales" => Ok(Self::Sales),
            other => Err(SupportError::validation(format!("unrecognized role: {other:?}"))),
        }
    }
}

/// The authenticated caller of a use case, supplied per call by the
/// identity/session provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub(crate) fn require(&self, allowed: bool, action: &str) -> Result<(), SupportError> {
        if allowed {
            Ok(())
        } else {
            Err(SupportError::Forbidden(format!("role {} may not {}", self.role, action)))
        }
    }
}
