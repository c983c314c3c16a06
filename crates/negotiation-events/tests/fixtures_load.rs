//! Checks that the shared fixtures stay parseable.

#![cfg(feature = "test-fixtures")]

use negotiation_events::{fixtures, EventType, TerminationReason, EventPayload};

#[test]
fn test_sample_economy_loads() {
    let economy = fixtures::sample_economy();
    assert_eq!(economy.len(), 4);
    assert_eq!(economy.indicator("vietnam", "GDP"), Some(0.4));
}

#[test]
fn test_sample_events_cover_every_type() {
    let events = fixtures::sample_events();
    let types: Vec<EventType> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(
        types,
        vec![
            EventType::Stimulus,
            EventType::IterationStart,
            EventType::AgentResponses,
            EventType::AgentAnnounce,
            EventType::EconomicData,
            EventType::IterationEnd,
        ]
    );

    match &events[5].payload {
        EventPayload::IterationEnd(end) => {
            assert_eq!(end.termination_reason, TerminationReason::BelowScoreThreshold)
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[test]
fn test_sample_events_reserialize_identically() {
    let jsonl = include_str!("fixtures/sample_events.jsonl");
    for (line, event) in jsonl.lines().zip(fixtures::sample_events()) {
        let original: serde_json::Value = serde_json::from_str(line).unwrap();
        let reencoded = serde_json::to_value(&event).unwrap();
        assert_eq!(original, reencoded);
    }
}
