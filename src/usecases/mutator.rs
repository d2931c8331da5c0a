//! Optimistic mutations of the domain store.
//!
//! Every mutation follows the same protocol:
//! 1. check preconditions and apply the change locally, after snapshotting the
//!    affected collections (one write lock)
//! 2. ask the remote gateway to confirm
//! 3. on success keep the change; on failure restore the snapshot before
//!    reporting the error
//!
//! Overlapping mutations on the same lead are allowed by default. Each restore
//! writes back the whole lead collection it captured, so a late rollback
//! overwrites whatever committed in between (last writer wins). Enable the
//! in-flight guard to reject overlapping calls instead.

use crate::domain::validation::{validate_amount, validate_email, validate_patch};
use crate::domain::{
    ConversionRequest, DomainError, DomainStore, Lead, LeadPatch, LeadStatus, Opportunity,
    SnapshotScope, StoreState,
};
use crate::ports::{Clock, RemoteGateway};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const OPPORTUNITY_ID_SPACE: i64 = 1_000_000;

/// How a rollback-protected attempt ended, when it did not commit.
#[derive(Debug)]
enum AttemptError {
    /// Preconditions failed; nothing was applied and the remote was not called.
    Rejected(DomainError),
    /// The remote call failed and the snapshot has been restored.
    RolledBack(DomainError),
}

pub struct OptimisticMutator {
    store: Arc<DomainStore>,
    remote: Arc<dyn RemoteGateway>,
    clock: Arc<dyn Clock>,
    in_flight: Option<Mutex<HashSet<String>>>,
}

impl OptimisticMutator {
    pub fn new(
        store: Arc<DomainStore>,
        remote: Arc<dyn RemoteGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            remote,
            clock,
            in_flight: None,
        }
    }

    /// Reject a mutation on a lead that already has one pending.
    pub fn with_in_flight_guard(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(|| Mutex::new(HashSet::new()));
        self
    }

    /// Applies `patch` to a lead optimistically and confirms it remotely.
    ///
    /// Returns the lead as committed. Invalid input fails with `Validation`
    /// before anything changes; a remote failure restores the lead collection
    /// (and the selection, if the lead was selected) and fails with `MutationFailed`.
    pub async fn update_lead(&self, lead_id: &str, patch: LeadPatch) -> Result<Lead, DomainError> {
        if let Some(email) = &patch.email {
            validate_email(email)?;
        }
        let _claim = self.claim(lead_id)?;

        let attempt = self
            .attempt_with_rollback(
                SnapshotScope::Leads,
                lead_id,
                |state| {
                    let lead = state
                        .lead_mut(lead_id)
                        .ok_or_else(|| DomainError::LeadNotFound(lead_id.to_string()))?;
                    validate_patch(lead, &patch)?;
                    patch.apply_to(lead);
                    Ok(lead.clone())
                },
                |_| self.remote.update_lead(lead_id, &patch),
            )
            .await;

        match attempt {
            Ok(lead) => {
                info!(lead_id, status = %lead.status, "lead update committed");
                Ok(lead)
            }
            Err(AttemptError::Rejected(e)) => Err(e),
            Err(AttemptError::RolledBack(e)) => {
                warn!(lead_id, error = %e, "lead update failed, changes reverted");
                Err(DomainError::MutationFailed {
                    lead_id: lead_id.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Converts a lead into a new opportunity.
    ///
    /// The opportunity id and `created_at` are fixed when the call starts. A lead
    /// that is already `Converted` fails with `AlreadyConverted` without touching
    /// state or the remote. A remote failure restores opportunities, leads and
    /// selection together and fails with `ConversionFailed`.
    pub async fn convert_to_opportunity(
        &self,
        lead_id: &str,
        request: ConversionRequest,
    ) -> Result<Opportunity, DomainError> {
        validate_amount(request.amount)?;
        let created_at = self.clock.now();
        let _claim = self.claim(lead_id)?;

        let attempt = self
            .attempt_with_rollback(
                SnapshotScope::LeadsAndOpportunities,
                lead_id,
                |state| convert_in_place(state, lead_id, request, created_at),
                |opportunity| async move {
                    self.remote
                        .create_opportunity(lead_id, &opportunity)
                        .await
                },
            )
            .await;

        match attempt {
            Ok(opportunity) => {
                info!(
                    lead_id,
                    opportunity_id = %opportunity.id,
                    stage = %opportunity.stage,
                    "lead converted"
                );
                Ok(opportunity)
            }
            Err(AttemptError::Rejected(e)) => Err(e),
            Err(AttemptError::RolledBack(e)) => {
                warn!(lead_id, error = %e, "conversion failed, changes reverted");
                Err(DomainError::ConversionFailed {
                    lead_id: lead_id.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Snapshot + apply, remote call, then commit or restore.
    ///
    /// The restore completes before the error is returned.
    async fn attempt_with_rollback<R, A, C, Fut>(
        &self,
        scope: SnapshotScope,
        lead_id: &str,
        apply: A,
        remote_call: C,
    ) -> Result<R, AttemptError>
    where
        R: Clone,
        A: FnOnce(&mut StoreState) -> Result<R, DomainError>,
        C: FnOnce(R) -> Fut,
        Fut: Future<Output = Result<(), DomainError>>,
    {
        let (snapshot, applied) = self
            .store
            .apply_with_snapshot(scope, lead_id, apply)
            .await
            .map_err(AttemptError::Rejected)?;

        match remote_call(applied.clone()).await {
            Ok(()) => Ok(applied),
            Err(e) => {
                self.store.restore(snapshot).await;
                Err(AttemptError::RolledBack(e))
            }
        }
    }

    fn claim(&self, lead_id: &str) -> Result<InFlightClaim<'_>, DomainError> {
        let Some(in_flight) = &self.in_flight else {
            return Ok(InFlightClaim { owner: None });
        };
        let mut pending = in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !pending.insert(lead_id.to_string()) {
            return Err(DomainError::MutationInFlight(lead_id.to_string()));
        }
        Ok(InFlightClaim {
            owner: Some((in_flight, lead_id.to_string())),
        })
    }
}

/// Releases the per-lead in-flight slot when dropped.
struct InFlightClaim<'a> {
    owner: Option<(&'a Mutex<HashSet<String>>, String)>,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        if let Some((in_flight, lead_id)) = self.owner.take() {
            in_flight
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&lead_id);
        }
    }
}

fn convert_in_place(
    state: &mut StoreState,
    lead_id: &str,
    request: ConversionRequest,
    created_at: DateTime<Utc>,
) -> Result<Opportunity, DomainError> {
    let lead = state
        .lead_mut(lead_id)
        .ok_or_else(|| DomainError::LeadNotFound(lead_id.to_string()))?;
    if lead.status == LeadStatus::Converted {
        return Err(DomainError::AlreadyConverted {
            lead_id: lead_id.to_string(),
        });
    }
    lead.status = LeadStatus::Converted;

    let opportunity = Opportunity {
        id: opportunity_id(&state.opportunities, created_at),
        name: request.name,
        account_name: request.account_name,
        stage: request.stage,
        amount: request.amount,
        created_at,
    };
    state.opportunities.push(opportunity.clone());
    Ok(opportunity)
}

/// `OPP-` plus the last six digits of the epoch millisecond, advanced past any
/// id already taken.
pub fn opportunity_id(existing: &[Opportunity], at: DateTime<Utc>) -> String {
    let taken: HashSet<&str> = existing.iter().map(|o| o.id.as_str()).collect();
    let base = at.timestamp_millis().rem_euclid(OPPORTUNITY_ID_SPACE);
    (0..OPPORTUNITY_ID_SPACE)
        .map(|offset| format!("OPP-{:06}", (base + offset) % OPPORTUNITY_ID_SPACE))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| format!("OPP-{:06}", base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::SteppingClock;
    use crate::adapters::remote::{RemoteCall, ScriptedRemote};
    use crate::domain::{OpportunityStage, StoreState};
    use chrono::TimeZone;

    fn lead(id: &str, email: &str, status: LeadStatus, score: i64) -> Lead {
        Lead {
            id: id.into(),
            name: format!("Lead {id}"),
            company: format!("Company {id}"),
            email: email.into(),
            source: "Website".into(),
            score,
            status,
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    struct Harness {
        store: Arc<DomainStore>,
        remote: Arc<ScriptedRemote>,
        mutator: Arc<OptimisticMutator>,
    }

    fn harness_with(guard: bool) -> Harness {
        let store = Arc::new(DomainStore::with_state(StoreState {
            leads: vec![
                lead("L1", "a@b.com", LeadStatus::New, 80),
                lead("L2", "l2@corp.com", LeadStatus::New, 60),
                lead("L3", "l3@corp.com", LeadStatus::Converted, 40),
            ],
            opportunities: Vec::new(),
            selected_lead_id: None,
        }));
        let remote = Arc::new(ScriptedRemote::new());
        let mutator = Arc::new(
            OptimisticMutator::new(
                Arc::clone(&store),
                remote.clone(),
                Arc::new(SteppingClock::fixed(fixed_time())),
            )
            .with_in_flight_guard(guard),
        );
        Harness {
            store,
            remote,
            mutator,
        }
    }

    fn harness() -> Harness {
        harness_with(false)
    }

    fn discovery(amount: Option<f64>) -> ConversionRequest {
        ConversionRequest {
            name: "Lead L2".into(),
            account_name: "Company L2".into(),
            amount,
            stage: OpportunityStage::Discovery,
        }
    }

    #[tokio::test]
    async fn test_update_commits_status() {
        let h = harness();
        let before = h.store.current_state().await;

        let lead = h
            .mutator
            .update_lead("L1", LeadPatch::status(LeadStatus::Contacted))
            .await
            .unwrap();
        assert_eq!(lead.status, LeadStatus::Contacted);

        let after = h.store.current_state().await;
        let l1 = after.lead("L1").unwrap();
        assert_eq!(l1.status, LeadStatus::Contacted);
        assert_eq!(l1.email, "a@b.com");
        assert_eq!(l1.score, 80);
        assert_eq!(after.leads[1..], before.leads[1..]);
    }

    #[tokio::test]
    async fn test_update_failure_restores_exact_state() {
        let h = harness();
        h.store.select_lead(Some("L1")).await;
        let before = h.store.current_state().await;
        h.remote.fail_update("Simulated server error");

        let err = h
            .mutator
            .update_lead(
                "L1",
                LeadPatch {
                    email: Some("new@b.com".into()),
                    status: Some(LeadStatus::Contacted),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::MutationFailed { ref lead_id, .. } if lead_id == "L1"));
        assert_eq!(
            err.to_string(),
            "Failed to update lead. Changes have been reverted."
        );
        assert_eq!(h.store.current_state().await, before);
    }

    #[tokio::test]
    async fn test_invalid_email_never_reaches_remote() {
        let h = harness();
        let before = h.store.current_state().await;

        let err = h
            .mutator
            .update_lead("L1", LeadPatch::email("not-an-email"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation { field: "email", .. }));
        assert_eq!(h.store.current_state().await, before);
        assert_eq!(h.remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_unknown_lead() {
        let h = harness();
        let err = h
            .mutator
            .update_lead("L404", LeadPatch::status(LeadStatus::Qualified))
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::LeadNotFound("L404".into()));
        assert_eq!(h.remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_cannot_set_converted() {
        let h = harness();
        let err = h
            .mutator
            .update_lead("L1", LeadPatch::status(LeadStatus::Converted))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "status", .. }));
        assert_eq!(h.remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_optimistic_state_visible_while_pending() {
        let h = harness();
        h.store.select_lead(Some("L1")).await;
        let gate = h.remote.gate_update();

        let task = {
            let mutator = Arc::clone(&h.mutator);
            tokio::spawn(async move {
                mutator
                    .update_lead("L1", LeadPatch::status(LeadStatus::Qualified))
                    .await
            })
        };
        h.remote.wait_for_calls(1).await;

        let pending = h.store.current_state().await;
        assert_eq!(pending.lead("L1").unwrap().status, LeadStatus::Qualified);
        assert_eq!(
            pending.selected_lead().unwrap().status,
            LeadStatus::Qualified
        );

        gate.fail("timeout upstream");
        assert!(task.await.unwrap().is_err());
        let after = h.store.current_state().await;
        assert_eq!(after.lead("L1").unwrap().status, LeadStatus::New);
        assert_eq!(after.selected_lead_id.as_deref(), Some("L1"));
    }

    #[tokio::test]
    async fn test_rollback_reselects_target_lead() {
        let h = harness();
        h.store.select_lead(Some("L1")).await;
        let gate = h.remote.gate_update();

        let task = {
            let mutator = Arc::clone(&h.mutator);
            tokio::spawn(async move {
                mutator
                    .update_lead("L1", LeadPatch::email("changed@b.com"))
                    .await
            })
        };
        h.remote.wait_for_calls(1).await;
        h.store.select_lead(Some("L2")).await;

        gate.fail("nope");
        assert!(task.await.unwrap().is_err());
        assert_eq!(
            h.store.current_state().await.selected_lead_id.as_deref(),
            Some("L1")
        );
    }

    #[tokio::test]
    async fn test_convert_then_convert_again() {
        let h = harness();

        let opportunity = h
            .mutator
            .convert_to_opportunity("L2", discovery(Some(1000.0)))
            .await
            .unwrap();
        assert_eq!(opportunity.account_name, "Company L2");
        assert_eq!(opportunity.amount, Some(1000.0));
        assert_eq!(opportunity.stage, OpportunityStage::Discovery);
        assert_eq!(opportunity.created_at, fixed_time());

        let state = h.store.current_state().await;
        assert_eq!(state.opportunities, vec![opportunity.clone()]);
        assert_eq!(state.lead("L2").unwrap().status, LeadStatus::Converted);

        let err = h
            .mutator
            .convert_to_opportunity("L2", discovery(Some(1000.0)))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::AlreadyConverted {
                lead_id: "L2".into()
            }
        );
        assert_eq!(h.store.current_state().await.opportunities.len(), 1);
        assert_eq!(h.remote.call_count(), 1);
    }

    #[tokio::test]
    async fn test_convert_already_converted_lead_is_untouched() {
        let h = harness();
        let before = h.store.current_state().await;
        let err = h
            .mutator
            .convert_to_opportunity("L3", discovery(None))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyConverted { .. }));
        assert_eq!(h.store.current_state().await, before);
        assert_eq!(h.remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_convert_failure_restores_everything() {
        let h = harness();
        h.store.select_lead(Some("L2")).await;
        let before = h.store.current_state().await;
        h.remote.fail_conversion("Simulated conversion failure");

        let err = h
            .mutator
            .convert_to_opportunity("L2", discovery(Some(250.0)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConversionFailed { .. }));
        assert!(err.is_rolled_back());
        assert_eq!(h.store.current_state().await, before);
    }

    #[tokio::test]
    async fn test_conversion_visible_while_pending() {
        let h = harness();
        h.store.select_lead(Some("L2")).await;
        let before = h.store.current_state().await;
        let gate = h.remote.gate_conversion();

        let task = {
            let mutator = Arc::clone(&h.mutator);
            tokio::spawn(async move {
                mutator
                    .convert_to_opportunity("L2", discovery(Some(500.0)))
                    .await
            })
        };
        h.remote.wait_for_calls(1).await;

        let pending = h.store.current_state().await;
        assert_eq!(pending.opportunities.len(), 1);
        assert_eq!(pending.opportunities[0].account_name, "Company L2");
        assert_eq!(pending.lead("L2").unwrap().status, LeadStatus::Converted);
        assert_eq!(
            pending.selected_lead().unwrap().status,
            LeadStatus::Converted
        );

        gate.fail("Simulated conversion failure");
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, DomainError::ConversionFailed { .. }));

        let after = h.store.current_state().await;
        assert_eq!(after, before);
        assert!(after.opportunities.is_empty());
        assert_eq!(after.lead("L2").unwrap().status, LeadStatus::New);
        assert_eq!(after.selected_lead_id.as_deref(), Some("L2"));
    }

    #[tokio::test]
    async fn test_convert_rejects_negative_amount() {
        let h = harness();
        let before = h.store.current_state().await;
        let err = h
            .mutator
            .convert_to_opportunity("L2", discovery(Some(-1.0)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "amount", .. }));
        assert_eq!(h.store.current_state().await, before);
    }

    #[tokio::test]
    async fn test_opportunity_ids_are_unique_under_a_frozen_clock() {
        let h = harness();
        let first = h
            .mutator
            .convert_to_opportunity("L1", discovery(None))
            .await
            .unwrap();
        let second = h
            .mutator
            .convert_to_opportunity("L2", discovery(None))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        for id in [&first.id, &second.id] {
            let suffix = id.strip_prefix("OPP-").unwrap();
            assert_eq!(suffix.len(), 6);
            assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_opportunity_id_uses_last_six_millisecond_digits() {
        let at = Utc.timestamp_millis_opt(1_714_565_123_456).unwrap();
        assert_eq!(opportunity_id(&[], at), "OPP-123456");
        let at = Utc.timestamp_millis_opt(1_714_565_000_042).unwrap();
        assert_eq!(opportunity_id(&[], at), "OPP-000042");
    }

    #[tokio::test]
    async fn test_late_update_rollback_overwrites_concurrent_conversion() {
        // Overlapping mutations are not serialized: the update snapshot predates
        // the conversion, so its rollback puts the lead back to New while the
        // opportunity (outside the update's snapshot) stays.
        let h = harness();
        let gate = h.remote.gate_update();

        let update = {
            let mutator = Arc::clone(&h.mutator);
            tokio::spawn(async move {
                mutator
                    .update_lead("L1", LeadPatch::email("new@b.com"))
                    .await
            })
        };
        h.remote.wait_for_calls(1).await;

        let opportunity = h
            .mutator
            .convert_to_opportunity("L1", discovery(None))
            .await
            .unwrap();

        gate.fail("late failure");
        assert!(update.await.unwrap().is_err());

        let state = h.store.current_state().await;
        assert_eq!(state.opportunities, vec![opportunity]);
        assert_eq!(state.lead("L1").unwrap().status, LeadStatus::New);
        assert_eq!(state.lead("L1").unwrap().email, "a@b.com");
        assert!(matches!(
            h.remote.calls()[1],
            RemoteCall::CreateOpportunity { .. }
        ));
    }

    #[tokio::test]
    async fn test_in_flight_guard_rejects_overlap() {
        let h = harness_with(true);
        let gate = h.remote.gate_update();

        let first = {
            let mutator = Arc::clone(&h.mutator);
            tokio::spawn(async move {
                mutator
                    .update_lead("L1", LeadPatch::status(LeadStatus::Contacted))
                    .await
            })
        };
        h.remote.wait_for_calls(1).await;

        let err = h
            .mutator
            .convert_to_opportunity("L1", discovery(None))
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::MutationInFlight("L1".into()));

        gate.succeed();
        first.await.unwrap().unwrap();

        h.mutator
            .update_lead("L1", LeadPatch::status(LeadStatus::Qualified))
            .await
            .unwrap();
    }
}
