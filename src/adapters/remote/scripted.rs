//! Deterministic RemoteGateway for tests and demos.
//!
//! Outcomes are queued per endpoint; an empty queue means success. A gated
//! outcome parks the call until the test releases it, which makes the
//! optimistic "pending" window observable.

use crate::domain::{DomainError, LeadPatch, Opportunity};
use crate::ports::RemoteGateway;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::info;

enum Outcome {
    Succeed,
    Fail(String),
    Gated(oneshot::Receiver<Result<(), DomainError>>),
}

/// A call received by the scripted remote.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    UpdateLead { lead_id: String, patch: LeadPatch },
    CreateOpportunity { lead_id: String, opportunity_id: String },
}

/// Releases a gated call with the given result.
pub struct Gate(oneshot::Sender<Result<(), DomainError>>);

impl Gate {
    pub fn succeed(self) {
        let _ = self.0.send(Ok(()));
    }

    pub fn fail(self, reason: &str) {
        let _ = self.0.send(Err(DomainError::Remote(reason.to_string())));
    }
}

#[derive(Default)]
pub struct ScriptedRemote {
    updates: Mutex<VecDeque<Outcome>>,
    conversions: Mutex<VecDeque<Outcome>>,
    calls: Mutex<Vec<RemoteCall>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed_update(&self) {
        push(&self.updates, Outcome::Succeed);
    }

    pub fn fail_update(&self, reason: &str) {
        push(&self.updates, Outcome::Fail(reason.to_string()));
    }

    pub fn gate_update(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        push(&self.updates, Outcome::Gated(rx));
        Gate(tx)
    }

    pub fn succeed_conversion(&self) {
        push(&self.conversions, Outcome::Succeed);
    }

    pub fn fail_conversion(&self, reason: &str) {
        push(&self.conversions, Outcome::Fail(reason.to_string()));
    }

    pub fn gate_conversion(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        push(&self.conversions, Outcome::Gated(rx));
        Gate(tx)
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Yields to the runtime until at least `n` calls have arrived.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.call_count() < n {
            tokio::task::yield_now().await;
        }
    }

    fn record(&self, call: RemoteCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

fn push(queue: &Mutex<VecDeque<Outcome>>, outcome: Outcome) {
    queue
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push_back(outcome);
}

fn next(queue: &Mutex<VecDeque<Outcome>>) -> Outcome {
    queue
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .pop_front()
        .unwrap_or(Outcome::Succeed)
}

async fn resolve(outcome: Outcome) -> Result<(), DomainError> {
    match outcome {
        Outcome::Succeed => Ok(()),
        Outcome::Fail(reason) => Err(DomainError::Remote(reason)),
        Outcome::Gated(rx) => rx
            .await
            .unwrap_or_else(|_| Err(DomainError::Remote("gate dropped".into()))),
    }
}

#[async_trait::async_trait]
impl RemoteGateway for ScriptedRemote {
    async fn update_lead(&self, lead_id: &str, patch: &LeadPatch) -> Result<(), DomainError> {
        let outcome = next(&self.updates);
        self.record(RemoteCall::UpdateLead {
            lead_id: lead_id.to_string(),
            patch: patch.clone(),
        });
        info!(lead_id, "[SCRIPTED] update_lead");
        resolve(outcome).await
    }

    async fn create_opportunity(
        &self,
        lead_id: &str,
        opportunity: &Opportunity,
    ) -> Result<(), DomainError> {
        let outcome = next(&self.conversions);
        self.record(RemoteCall::CreateOpportunity {
            lead_id: lead_id.to_string(),
            opportunity_id: opportunity.id.clone(),
        });
        info!(lead_id, opportunity_id = %opportunity.id, "[SCRIPTED] create_opportunity");
        resolve(outcome).await
    }
}
