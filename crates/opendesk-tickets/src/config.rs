//! Service configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::services::SlaPolicy;
use crate::error::{Result, SupportError};

/// Ticket service configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportConfig {
    /// SLA thresholds
    pub sla: SlaPolicy,

    /// Re-fetch-and-retry attempts after a conflicting write
    pub max_conflict_retries: u32,

    /// Lifetime of attachment URLs (seconds)
    pub signed_url_ttl_secs: u64,

    /// Upload size limit (bytes)
    pub max_attachment_bytes: usize,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            sla: SlaPolicy::default(),
            max_conflict_retries: 3,
            signed_url_ttl_secs: 900,
            max_attachment_bytes: 10 * 1024 * 1024,
        }
    }
}

impl SupportConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SupportError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.sla.validate()?;
        if self.signed_url_ttl_secs == 0 {
            return Err(SupportError::Config("signed_url_ttl_secs must be positive".into()));
        }
        if self.max_attachment_bytes == 0 {
            return Err(SupportError::Config("max_attachment_bytes must be positive".into()));
        }
        Ok(())
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }
}
