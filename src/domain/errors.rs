//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these. The `Display` text of each
//! variant is what the console shows to the user.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Field-level input rejected before any state was touched.
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    #[error("This lead has already been converted")]
    AlreadyConverted { lead_id: String },

    /// Only produced when the per-lead in-flight guard is enabled.
    #[error("A change to lead {0} is still being saved")]
    MutationInFlight(String),

    /// Remote update failed; the optimistic change was rolled back.
    #[error("Failed to update lead. Changes have been reverted.")]
    MutationFailed { lead_id: String, reason: String },

    /// Remote conversion failed; the optimistic change was rolled back.
    #[error("Failed to convert lead. Changes have been reverted.")]
    ConversionFailed { lead_id: String, reason: String },

    #[error("Failed to load leads. Please try again.")]
    Load(String),

    #[error("Remote call failed: {0}")]
    Remote(String),

    #[error("Preference storage error: {0}")]
    Preference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Interactive prompt could not be shown or read.
    #[error("Terminal prompt failed: {0}")]
    Terminal(String),
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// True for failures that happened after an optimistic apply (and were rolled back).
    pub fn is_rolled_back(&self) -> bool {
        matches!(
            self,
            Self::MutationFailed { .. } | Self::ConversionFailed { .. }
        )
    }
}
