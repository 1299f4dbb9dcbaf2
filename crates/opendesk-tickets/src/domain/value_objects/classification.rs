//! Ticket classification: category and priority

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SupportError;

/// Complaint category chosen at submission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Technical Issue", alias = "technical_issue")]
    TechnicalIssue,
    #[serde(rename = "Billing Inquiry", alias = "billing_inquiry")]
    BillingInquiry,
    #[serde(rename = "Service Interruption", alias = "service_interruption")]
    ServiceInterruption,
    #[serde(rename = "Product Feedback", alias = "product_feedback")]
    ProductFeedback,
    #[serde(rename = "General Inquiry", alias = "general_inquiry")]
    GeneralInquiry,
    #[serde(rename = "Other", alias = "other")]
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::TechnicalIssue,
        Category::BillingInquiry,
        Category::ServiceInterruption,
        Category::ProductFeedback,
        Category::GeneralInquiry,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::TechnicalIssue => "Technical Issue",
            Self::BillingInquiry => "Billing Inquiry",
            Self::ServiceInterruption => "Service Interruption",
            Self::ProductFeedback => "Product Feedback",
            Self::GeneralInquiry => "General Inquiry",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = SupportError;

    /// Accepts the display label or its snake_case form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label() == s || c.label().to_lowercase().replace(' ', "_") == s)
            .ok_or_else(|| SupportError::validation(format!("unrecognized category: {s:?}")))
    }
}

/// Ticket priority
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = SupportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(SupportError::validation(format!("unrecognized priority: {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_label_and_snake_case() {
        assert_eq!("Billing Inquiry".parse::<Category>().unwrap(), Category::BillingInquiry);
        assert_eq!("service_interruption".parse::<Category>().unwrap(), Category::ServiceInterruption);
        assert!(matches!("Refunds".parse::<Category>(), Err(SupportError::Validation(_))));
    }

    #[test]
    fn test_category_serde_uses_label() {
        let json = serde_json::to_string(&Category::TechnicalIssue).unwrap();
        assert_eq!(json, "\"Technical Issue\"");
        let parsed: Category = serde_json::from_str("\"general_inquiry\"").unwrap();
        assert_eq!(parsed, Category::GeneralInquiry);
    }

    #[test]
    fn test_priority_ordering_and_default() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert!(Priority::Urgent > Priority::High);
        assert!("critical".parse::<Priority>().is_err());
    }
}
