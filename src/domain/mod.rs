//! Core domain layer. No external I/O dependencies.
//!
//! Entities, business rules, the in-memory store and the lead projection live here.
//! Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod projector;
pub mod store;
pub mod validation;

pub use entities::{
    ConversionRequest, FilterCriteria, Lead, LeadPatch, LeadStatus, Opportunity,
    OpportunityStage, SortDirection, StatusFilter,
};
pub use errors::DomainError;
pub use projector::project;
pub use store::{DomainStore, SnapshotScope, StoreSnapshot, StoreState};
