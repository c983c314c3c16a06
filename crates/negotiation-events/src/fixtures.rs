//! Sample data fixtures for testing.
//!
//! This module provides ready-made test data for other crates to use.
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // negotiation-events = { path = "../negotiation-events", features = ["test-fixtures"] }
//!
//! use negotiation_events::fixtures;
//!
//! let economy = fixtures::sample_economy();
//! let events = fixtures::sample_events();
//! ```

use crate::{EconomicState, SimEvent};

/// Returns the four-country starting economy.
///
/// Entities: us, china, canada, vietnam; indicators: GDP, unemployment,
/// inflation.
pub fn sample_economy() -> EconomicState {
    let json = include_str!("../tests/fixtures/sample_economy.json");
    serde_json::from_str(json).expect("Failed to parse sample_economy.json")
}

/// Returns the events of a one-round run, one of each event type.
pub fn sample_events() -> Vec<SimEvent> {
    let jsonl = include_str!("../tests/fixtures/sample_events.jsonl");
    jsonl
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            SimEvent::from_jsonl(l).unwrap_or_else(|e| {
                panic!("Failed to parse event line: {}\nError: {}", l, e)
            })
        })
        .collect()
}

/// The roster used by the sample economy, in declaration order.
pub fn sample_roster() -> Vec<String> {
    ["us", "china", "canada", "vietnam"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
