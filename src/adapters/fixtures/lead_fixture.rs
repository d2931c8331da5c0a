//! Implements LeadSource from a static JSON fixture.
//!
//! The default fixture is embedded at compile time; a file path can replace it.
//! Loading is delayed to mimic a network fetch and can be configured to fail.

use crate::domain::{DomainError, Lead};
use crate::ports::LeadSource;
use crate::shared::config::{AppConfig, clamp_rate};
use rand::Rng;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

const EMBEDDED_LEADS: &str = include_str!("../../../data/leads.json");

enum FixtureData {
    Embedded,
    File(PathBuf),
}

pub struct FixtureLeadSource {
    data: FixtureData,
    delay: Duration,
    failure_rate: f64,
}

impl FixtureLeadSource {
    pub fn embedded(delay: Duration) -> Self {
        Self {
            data: FixtureData::Embedded,
            delay,
            failure_rate: 0.0,
        }
    }

    pub fn from_file(path: impl Into<PathBuf>, delay: Duration) -> Self {
        Self {
            data: FixtureData::File(path.into()),
            delay,
            failure_rate: 0.0,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        let source = match &cfg.leads_fixture {
            Some(path) => Self::from_file(path, cfg.load_delay()),
            None => Self::embedded(cfg.load_delay()),
        };
        source.with_failure_rate(cfg.load_failure_rate_or_default())
    }

    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = clamp_rate(rate);
        self
    }

    async fn raw(&self) -> Result<String, DomainError> {
        match &self.data {
            FixtureData::Embedded => Ok(EMBEDDED_LEADS.to_string()),
            FixtureData::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| DomainError::Load(format!("read {}: {}", path.display(), e))),
        }
    }
}

/// Parses a fixture payload. Duplicate ids are rejected since the store keys on them.
pub fn parse_leads(json: &str) -> Result<Vec<Lead>, DomainError> {
    let leads: Vec<Lead> =
        serde_json::from_str(json).map_err(|e| DomainError::Load(format!("parse leads: {}", e)))?;
    let mut seen = HashSet::with_capacity(leads.len());
    for lead in &leads {
        if !seen.insert(lead.id.as_str()) {
            return Err(DomainError::Load(format!("duplicate lead id {}", lead.id)));
        }
    }
    Ok(leads)
}

#[async_trait::async_trait]
impl LeadSource for FixtureLeadSource {
    async fn fetch_leads(&self) -> Result<Vec<Lead>, DomainError> {
        debug!(delay_ms = self.delay.as_millis() as u64, "simulated lead fetch");
        tokio::time::sleep(self.delay).await;
        let failed = rand::rng().random_bool(self.failure_rate);
        if failed {
            return Err(DomainError::Load("Simulated load failure".into()));
        }
        let leads = parse_leads(&self.raw().await?)?;
        info!(count = leads.len(), "leads fetched from fixture");
        Ok(leads)
    }
}
