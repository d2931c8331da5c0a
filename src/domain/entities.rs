//! Domain entities. Pure data structures for the core business.
//!
//! No storage/IO types here; adapters map fixtures and stored payloads into these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A sales lead as seeded from the fixture. Only `email` and `status` are editable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub company: String,
    pub email: String,
    pub source: String,
    pub score: i64,
    pub status: LeadStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Converted,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::Qualified => "Qualified",
            Self::Converted => "Converted",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown lead status: {s}"))
    }
}

/// Partial update for a lead. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadPatch {
    pub email: Option<String>,
    pub status: Option<LeadStatus>,
}

impl LeadPatch {
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            status: None,
        }
    }

    pub fn status(status: LeadStatus) -> Self {
        Self {
            email: None,
            status: Some(status),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.status.is_none()
    }

    pub fn apply_to(&self, lead: &mut Lead) {
        if let Some(email) = &self.email {
            lead.email = email.clone();
        }
        if let Some(status) = self.status {
            lead.status = status;
        }
    }
}

/// An opportunity created by converting a lead. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub name: String,
    pub account_name: String,
    pub stage: OpportunityStage,
    pub amount: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OpportunityStage {
    #[default]
    Discovery,
    Qualification,
    Proposal,
    Negotiation,
    #[serde(rename = "Closed Won")]
    ClosedWon,
    #[serde(rename = "Closed Lost")]
    ClosedLost,
}

impl OpportunityStage {
    pub const ALL: [OpportunityStage; 6] = [
        OpportunityStage::Discovery,
        OpportunityStage::Qualification,
        OpportunityStage::Proposal,
        OpportunityStage::Negotiation,
        OpportunityStage::ClosedWon,
        OpportunityStage::ClosedLost,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Discovery => "Discovery",
            Self::Qualification => "Qualification",
            Self::Proposal => "Proposal",
            Self::Negotiation => "Negotiation",
            Self::ClosedWon => "Closed Won",
            Self::ClosedLost => "Closed Lost",
        }
    }
}

impl fmt::Display for OpportunityStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OpportunityStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown opportunity stage: {s}"))
    }
}

/// Input for converting a lead. Id and timestamp are assigned by the mutator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub name: String,
    pub account_name: String,
    pub amount: Option<f64>,
    pub stage: OpportunityStage,
}

impl ConversionRequest {
    /// Prefills name and account from the lead, as the detail panel does.
    pub fn for_lead(lead: &Lead, amount: Option<f64>, stage: OpportunityStage) -> Self {
        Self {
            name: lead.name.clone(),
            account_name: lead.company.clone(),
            amount,
            stage,
        }
    }
}

/// Status filter for the lead list. `All` disables filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(LeadStatus),
}

impl StatusFilter {
    pub fn matches(self, status: LeadStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }

    pub fn options() -> Vec<StatusFilter> {
        std::iter::once(Self::All)
            .chain(LeadStatus::ALL.into_iter().map(Self::Only))
            .collect()
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Only(status) => status.fmt(f),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction: {other}")),
        }
    }
}

/// Search, status and sort criteria for the lead list. Persisted across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub search_term: String,
    pub status_filter: StatusFilter,
    pub sort_direction: SortDirection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serializes_display_name() {
        let json = serde_json::to_string(&OpportunityStage::ClosedWon).unwrap();
        assert_eq!(json, "\"Closed Won\"");
        let back: OpportunityStage = serde_json::from_str("\"Closed Lost\"").unwrap();
        assert_eq!(back, OpportunityStage::ClosedLost);
    }

    #[test]
    fn test_lead_deserializes_fixture_shape() {
        let json = r#"{"id":"L1","name":"Ada","company":"Acme","email":"a@b.com","source":"Web","score":80,"status":"New"}"#;
        let lead: Lead = serde_json::from_str(json).unwrap();
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.score, 80);
    }

    #[test]
    fn test_patch_touches_only_set_fields() {
        let mut lead = Lead {
            id: "L1".into(),
            name: "Ada".into(),
            company: "Acme".into(),
            email: "a@b.com".into(),
            source: "Web".into(),
            score: 80,
            status: LeadStatus::New,
        };
        LeadPatch::status(LeadStatus::Contacted).apply_to(&mut lead);
        assert_eq!(lead.status, LeadStatus::Contacted);
        assert_eq!(lead.email, "a@b.com");
    }

    #[test]
    fn test_status_filter_parsing() {
        assert_eq!("All".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "qualified".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(LeadStatus::Qualified)
        );
        assert!("Lost".parse::<StatusFilter>().is_err());
        assert_eq!(StatusFilter::options().len(), 5);
    }

    #[test]
    fn test_sort_direction_toggle() {
        assert_eq!(SortDirection::default(), SortDirection::Desc);
        assert_eq!(SortDirection::Desc.toggled(), SortDirection::Asc);
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
    }
}
