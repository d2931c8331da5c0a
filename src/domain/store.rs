//! In-memory domain store: the single source of truth for leads, opportunities
//! and the current selection.
//!
//! The store performs no validation. Every write takes the lock once and never
//! across an await point, so a snapshot/apply or a restore is atomic with
//! respect to other tasks.

use crate::domain::{DomainError, Lead, Opportunity};
use tokio::sync::RwLock;

/// Owned copy of everything the store holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub leads: Vec<Lead>,
    pub opportunities: Vec<Opportunity>,
    /// Weak reference: the selected lead is resolved from `leads` by id.
    pub selected_lead_id: Option<String>,
}

impl StoreState {
    pub fn lead(&self, id: &str) -> Option<&Lead> {
        self.leads.iter().find(|lead| lead.id == id)
    }

    pub fn lead_mut(&mut self, id: &str) -> Option<&mut Lead> {
        self.leads.iter_mut().find(|lead| lead.id == id)
    }

    pub fn selected_lead(&self) -> Option<&Lead> {
        self.selected_lead_id.as_deref().and_then(|id| self.lead(id))
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_lead_id.as_deref() == Some(id)
    }
}

/// Which collections a snapshot captures besides the leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotScope {
    Leads,
    LeadsAndOpportunities,
}

/// Pre-mutation copy of the parts of the store a mutation touches.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    leads: Vec<Lead>,
    opportunities: Option<Vec<Opportunity>>,
    /// Captured only when the mutation target was the selected lead.
    selection: Option<String>,
}

pub struct DomainStore {
    state: RwLock<StoreState>,
}

impl DomainStore {
    pub fn new() -> Self {
        Self::with_state(StoreState::default())
    }

    pub fn with_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub async fn replace_leads(&self, leads: Vec<Lead>) {
        self.state.write().await.leads = leads;
    }

    pub async fn replace_opportunities(&self, opportunities: Vec<Opportunity>) {
        self.state.write().await.opportunities = opportunities;
    }

    /// Sets or clears the selection. The id is not checked against the leads.
    pub async fn select_lead(&self, id: Option<&str>) {
        self.state.write().await.selected_lead_id = id.map(str::to_string);
    }

    pub async fn current_state(&self) -> StoreState {
        self.state.read().await.clone()
    }

    /// Runs `read` against the live state without cloning it.
    pub async fn read<R>(&self, read: impl FnOnce(&StoreState) -> R) -> R {
        read(&*self.state.read().await)
    }

    /// Captures a snapshot for `scope` and runs `apply`, under a single write lock.
    ///
    /// `apply` checks its preconditions first and must not mutate before
    /// returning an error; on error the snapshot is discarded.
    pub async fn apply_with_snapshot<R>(
        &self,
        scope: SnapshotScope,
        target_lead_id: &str,
        apply: impl FnOnce(&mut StoreState) -> Result<R, DomainError>,
    ) -> Result<(StoreSnapshot, R), DomainError> {
        let mut state = self.state.write().await;
        let snapshot = StoreSnapshot {
            leads: state.leads.clone(),
            opportunities: match scope {
                SnapshotScope::Leads => None,
                SnapshotScope::LeadsAndOpportunities => Some(state.opportunities.clone()),
            },
            selection: state
                .is_selected(target_lead_id)
                .then(|| target_lead_id.to_string()),
        };
        let applied = apply(&mut state)?;
        Ok((snapshot, applied))
    }

    /// Empties leads and opportunities and clears the selection.
    pub async fn clear(&self) {
        *self.state.write().await = StoreState::default();
    }

    /// Writes every captured part of `snapshot` back, all under one write lock.
    pub async fn restore(&self, snapshot: StoreSnapshot) {
        let mut state = self.state.write().await;
        state.leads = snapshot.leads;
        if let Some(opportunities) = snapshot.opportunities {
            state.opportunities = opportunities;
        }
        if let Some(selected) = snapshot.selection {
            state.selected_lead_id = Some(selected);
        }
    }
}

impl Default for DomainStore {
    fn default() -> Self {
        Self::new()
    }
}
