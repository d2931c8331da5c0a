//! Fixture adapters. Implement LeadSource.

pub mod lead_fixture;

pub use lead_fixture::{FixtureLeadSource, parse_leads};
