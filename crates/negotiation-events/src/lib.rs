//! Shared data types for the negotiation simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for all other crates in the workspace.

pub mod decision;
pub mod economy;
pub mod event;
pub mod memory;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

// Re-export decision types
pub use decision::{parse_score, ActionKind, AgentId, Decision, DecisionParseError, MAX_SCORE};

// Re-export economy types
pub use economy::{EconomicState, Indicators, StateParseError};

// Re-export memory types
pub use memory::MemoryEntry;

// Re-export event types
pub use event::*;
