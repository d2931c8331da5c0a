//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{DomainError, Lead, LeadPatch, Opportunity};
use chrono::{DateTime, Utc};

/// Remote backend that confirms (or rejects) mutations already applied locally.
#[async_trait::async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Persist an edit to a lead. Only the fields set in `patch` changed.
    async fn update_lead(&self, lead_id: &str, patch: &LeadPatch) -> Result<(), DomainError>;

    /// Persist a freshly converted opportunity for `lead_id`.
    async fn create_opportunity(
        &self,
        lead_id: &str,
        opportunity: &Opportunity,
    ) -> Result<(), DomainError>;
}

/// Source of the initial lead collection.
#[async_trait::async_trait]
pub trait LeadSource: Send + Sync {
    async fn fetch_leads(&self) -> Result<Vec<Lead>, DomainError>;
}

/// Durable key-value storage for small string payloads (preferences).
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError>;
}

/// Wall clock. Injected so opportunity ids and timestamps are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
