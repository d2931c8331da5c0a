//! Remote backend adapters. Implement RemoteGateway.
//!
//! Provides the randomized simulated backend and a scripted one for tests.

pub mod scripted;
pub mod simulated;

pub use scripted::{Gate, RemoteCall, ScriptedRemote};
pub use simulated::{SimulatedCall, SimulatedRemote};
