//! Infrastructure adapters. Implement outbound ports and the terminal front end.
//!
//! Simulated backend, lead fixtures, preference storage, clock, UI. Map errors to DomainError.

pub mod clock;
pub mod fixtures;
pub mod persistence;
pub mod remote;
pub mod ui;
