//! Preference persistence for the lead list criteria.
//!
//! Best-effort: storage and parse failures are logged and replaced by defaults,
//! never returned to the caller.

use crate::domain::{FilterCriteria, SortDirection, StatusFilter};
use crate::ports::KeyValueStore;
use crate::shared::config::PREFERENCES_KEY;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Stored shape: `{"search": "...", "status": "All", "sort": "desc"}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredPreferences {
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    sort: Option<String>,
}

impl From<&FilterCriteria> for StoredPreferences {
    fn from(criteria: &FilterCriteria) -> Self {
        Self {
            search: Some(criteria.search_term.clone()),
            status: Some(criteria.status_filter.to_string()),
            sort: Some(criteria.sort_direction.as_str().to_string()),
        }
    }
}

impl StoredPreferences {
    /// Each field falls back on its own when missing, empty or unrecognized.
    fn into_criteria(self) -> FilterCriteria {
        FilterCriteria {
            search_term: self.search.unwrap_or_default(),
            status_filter: self
                .status
                .as_deref()
                .and_then(|s| s.parse::<StatusFilter>().ok())
                .unwrap_or_default(),
            sort_direction: self
                .sort
                .as_deref()
                .and_then(|s| s.parse::<SortDirection>().ok())
                .unwrap_or_default(),
        }
    }
}

pub struct PreferenceService {
    store: Arc<dyn KeyValueStore>,
}

impl PreferenceService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored criteria, or defaults (`""`, All, desc) when absent or unusable.
    pub async fn load(&self) -> FilterCriteria {
        let raw = match self.store.get(PREFERENCES_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return FilterCriteria::default(),
            Err(e) => {
                warn!(error = %e, "could not read preferences, using defaults");
                return FilterCriteria::default();
            }
        };
        match serde_json::from_str::<StoredPreferences>(&raw) {
            Ok(stored) => {
                let criteria = stored.into_criteria();
                debug!(?criteria, "preferences loaded");
                criteria
            }
            Err(e) => {
                warn!(error = %e, "stored preferences malformed, using defaults");
                FilterCriteria::default()
            }
        }
    }

    pub async fn save(&self, criteria: &FilterCriteria) {
        let payload = match serde_json::to_string(&StoredPreferences::from(criteria)) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "could not encode preferences");
                return;
            }
        };
        if let Err(e) = self.store.set(PREFERENCES_KEY, &payload).await {
            warn!(error = %e, "could not save preferences");
        }
    }
}
