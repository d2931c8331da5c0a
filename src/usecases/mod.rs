//! Application use cases. Orchestrate domain logic via ports.

pub mod console_service;
pub mod mutator;
pub mod preferences;

pub use console_service::ConsoleService;
pub use mutator::OptimisticMutator;
pub use preferences::PreferenceService;
