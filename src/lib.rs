//! seller-console: lead triage and lead-to-opportunity conversion with optimistic
//! updates over a simulated backend, laid out as a hexagon.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
