//! Console service: the contract the presentation layer talks to.
//!
//! Read accessors for the projected leads, opportunities, selection,
//! loading/error flags and criteria; commands for loading, selecting, editing,
//! converting and changing criteria. Commands return `DomainError` whose
//! `Display` is the user-facing message.

use crate::domain::{
    ConversionRequest, DomainError, DomainStore, FilterCriteria, Lead, LeadPatch, Opportunity,
    SortDirection, StatusFilter, project,
};
use crate::ports::LeadSource;
use crate::usecases::mutator::OptimisticMutator;
use crate::usecases::preferences::PreferenceService;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LoadStatus {
    is_loading: bool,
    error: Option<String>,
}

pub struct ConsoleService {
    store: Arc<DomainStore>,
    mutator: Arc<OptimisticMutator>,
    preferences: PreferenceService,
    leads: Arc<dyn LeadSource>,
    criteria: RwLock<FilterCriteria>,
    load_status: RwLock<LoadStatus>,
}

impl ConsoleService {
    pub fn new(
        store: Arc<DomainStore>,
        mutator: Arc<OptimisticMutator>,
        preferences: PreferenceService,
        leads: Arc<dyn LeadSource>,
    ) -> Self {
        Self {
            store,
            mutator,
            preferences,
            leads,
            criteria: RwLock::new(FilterCriteria::default()),
            load_status: RwLock::new(LoadStatus {
                is_loading: true,
                error: None,
            }),
        }
    }

    /// Restores saved criteria, then performs the initial lead load.
    pub async fn start(&self) -> Result<usize, DomainError> {
        *self.criteria.write().await = self.preferences.load().await;
        self.reload_leads().await
    }

    /// Fetches the lead collection. On failure the store is left empty (leads,
    /// opportunities and selection) and the error flag stays set until a later
    /// load succeeds.
    pub async fn reload_leads(&self) -> Result<usize, DomainError> {
        self.load_status.write().await.is_loading = true;
        let result = match self.leads.fetch_leads().await {
            Ok(leads) => {
                let count = leads.len();
                self.store.replace_leads(leads).await;
                info!(count, "leads loaded");
                Ok(count)
            }
            Err(e) => {
                self.store.clear().await;
                let err = match e {
                    DomainError::Load(_) => e,
                    other => DomainError::Load(other.to_string()),
                };
                error!(error = ?err, "lead load failed");
                Err(err)
            }
        };

        let mut status = self.load_status.write().await;
        status.is_loading = false;
        status.error = result.as_ref().err().map(|e| e.to_string());
        result
    }

    pub async fn visible_leads(&self) -> Vec<Lead> {
        let criteria = self.criteria().await;
        let leads = self.store.read(|state| project(&state.leads, &criteria)).await;
        debug!(visible = leads.len(), ?criteria, "leads projected");
        leads
    }

    pub async fn opportunities(&self) -> Vec<Opportunity> {
        self.store.read(|state| state.opportunities.clone()).await
    }

    pub async fn selected_lead(&self) -> Option<Lead> {
        self.store.read(|state| state.selected_lead().cloned()).await
    }

    pub async fn is_loading(&self) -> bool {
        self.load_status.read().await.is_loading
    }

    pub async fn error(&self) -> Option<String> {
        self.load_status.read().await.error.clone()
    }

    pub async fn criteria(&self) -> FilterCriteria {
        self.criteria.read().await.clone()
    }

    /// Selects a lead by id, or clears the selection with `None`.
    pub async fn select_lead(&self, lead_id: Option<&str>) -> Result<(), DomainError> {
        if let Some(id) = lead_id {
            let known = self.store.read(|state| state.lead(id).is_some()).await;
            if !known {
                return Err(DomainError::LeadNotFound(id.to_string()));
            }
        }
        self.store.select_lead(lead_id).await;
        Ok(())
    }

    pub async fn update_lead(&self, lead_id: &str, patch: LeadPatch) -> Result<Lead, DomainError> {
        self.mutator.update_lead(lead_id, patch).await
    }

    pub async fn convert_lead(
        &self,
        lead_id: &str,
        request: ConversionRequest,
    ) -> Result<Opportunity, DomainError> {
        self.mutator.convert_to_opportunity(lead_id, request).await
    }

    pub async fn set_search_term(&self, term: &str) {
        self.change_criteria(|c| c.search_term = term.to_string())
            .await;
    }

    pub async fn set_status_filter(&self, filter: StatusFilter) {
        self.change_criteria(|c| c.status_filter = filter).await;
    }

    pub async fn set_sort_direction(&self, direction: SortDirection) {
        self.change_criteria(|c| c.sort_direction = direction).await;
    }

    pub async fn toggle_sort_direction(&self) -> SortDirection {
        let mut toggled = SortDirection::default();
        self.change_criteria(|c| {
            c.sort_direction = c.sort_direction.toggled();
            toggled = c.sort_direction;
        })
        .await;
        toggled
    }

    /// Applies `change` and persists the result if anything actually changed.
    async fn change_criteria(&self, change: impl FnOnce(&mut FilterCriteria)) {
        let updated = {
            let mut criteria = self.criteria.write().await;
            let before = criteria.clone();
            change(&mut criteria);
            (*criteria != before).then(|| criteria.clone())
        };
        if let Some(criteria) = updated {
            self.preferences.save(&criteria).await;
        }
    }
}
