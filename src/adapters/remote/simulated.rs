//! Implements RemoteGateway with artificial latency and random failure injection.
//!
//! Stands in for a real backend: nothing leaves the process.

use crate::domain::{DomainError, LeadPatch, Opportunity};
use crate::ports::RemoteGateway;
use crate::shared::config::{
    AppConfig, DEFAULT_CONVERT_DELAY_MS, DEFAULT_CONVERT_FAILURE_RATE, DEFAULT_UPDATE_DELAY_MS,
    DEFAULT_UPDATE_FAILURE_RATE, clamp_rate,
};
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Latency and failure probability of one simulated endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedCall {
    pub delay: Duration,
    pub failure_rate: f64,
}

impl SimulatedCall {
    pub fn new(delay: Duration, failure_rate: f64) -> Self {
        Self {
            delay,
            failure_rate: clamp_rate(failure_rate),
        }
    }

    /// Sleeps for the configured delay, then rolls for failure. Never cancelled.
    async fn resolve(&self, failure: &str) -> Result<(), DomainError> {
        tokio::time::sleep(self.delay).await;
        let failed = rand::rng().random_bool(self.failure_rate);
        if failed {
            Err(DomainError::Remote(failure.to_string()))
        } else {
            Ok(())
        }
    }
}

/// Simulated backend: update 500 ms / 20% failures, convert 800 ms / 15% failures by default.
pub struct SimulatedRemote {
    update: SimulatedCall,
    convert: SimulatedCall,
}

impl SimulatedRemote {
    pub fn new(update: SimulatedCall, convert: SimulatedCall) -> Self {
        Self { update, convert }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            SimulatedCall::new(cfg.update_delay(), cfg.update_failure_rate_or_default()),
            SimulatedCall::new(cfg.convert_delay(), cfg.convert_failure_rate_or_default()),
        )
    }
}

impl Default for SimulatedRemote {
    fn default() -> Self {
        Self::new(
            SimulatedCall::new(
                Duration::from_millis(DEFAULT_UPDATE_DELAY_MS),
                DEFAULT_UPDATE_FAILURE_RATE,
            ),
            SimulatedCall::new(
                Duration::from_millis(DEFAULT_CONVERT_DELAY_MS),
                DEFAULT_CONVERT_FAILURE_RATE,
            ),
        )
    }
}

#[async_trait::async_trait]
impl RemoteGateway for SimulatedRemote {
    async fn update_lead(&self, lead_id: &str, patch: &LeadPatch) -> Result<(), DomainError> {
        debug!(
            lead_id,
            delay_ms = self.update.delay.as_millis() as u64,
            email = patch.email.is_some(),
            status = ?patch.status,
            "simulated lead update"
        );
        self.update.resolve("Simulated server error").await
    }

    async fn create_opportunity(
        &self,
        lead_id: &str,
        opportunity: &Opportunity,
    ) -> Result<(), DomainError> {
        debug!(
            lead_id,
            opportunity_id = %opportunity.id,
            delay_ms = self.convert.delay.as_millis() as u64,
            "simulated conversion"
        );
        self.convert.resolve("Simulated conversion failure").await
    }
}
