//! Decision Types
//!
//! An agent's structured answer to a stimulus, plus the action vocabulary
//! agents are asked to choose from.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque agent identifier, unique within a run's roster.
pub type AgentId = String;

/// Upper bound of the desirability score.
pub const MAX_SCORE: u8 = 100;

/// An agent's decision for one round.
///
/// Produced once per agent per round and never modified after it has been
/// recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Desirability score in `0..=100`
    pub score: u8,
    /// Chosen action label (usually one of [`ActionKind`], free text allowed)
    pub action: String,
    /// Free-text description of what the action entails
    pub action_detail: String,
}

impl Decision {
    /// Creates a decision, clamping the score to `0..=100`.
    pub fn new(score: u8, action: impl Into<String>, action_detail: impl Into<String>) -> Self {
        Self {
            score: score.min(MAX_SCORE),
            action: action.into(),
            action_detail: action_detail.into(),
        }
    }

    /// The zero-score decision substituted when an agent fails to answer.
    pub fn fallback() -> Self {
        Self::default()
    }

    /// Returns the vocabulary entry matching this decision's action, if any.
    pub fn action_kind(&self) -> Option<ActionKind> {
        ActionKind::classify(&self.action)
    }

    /// Parses a decision from the JSON object a decision backend returned.
    ///
    /// `score` may be an integer, a float (rounded) or a numeric string; a
    /// missing or non-numeric score counts as 0 and the action is kept.
    /// `action` and `action_detail` default to empty text.
    pub fn from_value(value: &Value) -> Result<Self, DecisionParseError> {
        let object = value.as_object().ok_or(DecisionParseError::NotAnObject)?;

        let score = object.get("score").and_then(parse_score).unwrap_or(0);

        let text_field = |name: &str| -> Result<String, DecisionParseError> {
            match object.get(name) {
                None | Some(Value::Null) => Ok(String::new()),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(other) => Err(DecisionParseError::InvalidField {
                    field: name.to_string(),
                    value: other.to_string(),
                }),
            }
        };

        Ok(Self {
            score,
            action: text_field("action")?,
            action_detail: text_field("action_detail")?,
        })
    }
}

/// Coerces a JSON score into `0..=100`.
///
/// Accepts integers, finite floats (rounded) and strings holding either.
/// Out-of-range values are clamped. Returns `None` for anything else.
pub fn parse_score(value: &Value) -> Option<u8> {
    let numeric = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i as f64
            } else {
                n.as_f64()?
            }
        }
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if !numeric.is_finite() {
        return None;
    }

    Some(numeric.round().clamp(0.0, MAX_SCORE as f64) as u8)
}

/// Errors from parsing a backend's decision payload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionParseError {
    #[error("decision payload is not a JSON object")]
    NotAnObject,
    #[error("field {field} must be text, got {value}")]
    InvalidField { field: String, value: String },
}

/// The enumerated strategy vocabulary offered to agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Set or adjust import tariffs on specific goods from specific countries
    SetTariff,
    /// Levy extra tariffs against trade practices considered unfair
    RetaliatoryTariff,
    /// Propose or agree to bilateral or multilateral talks
    Negotiate,
    /// Offer, accept or reject a concrete concession during talks
    Concession,
    /// Form, join or leave an economic or political alliance
    Alliance,
    /// Sign new agreements with third countries to hedge against a rival
    HedgingCooperation,
    /// Take no action this round
    WaitAndSee,
}

impl ActionKind {
    /// Returns all vocabulary entries in presentation order.
    pub fn all() -> &'static [ActionKind] {
        &[
            ActionKind::SetTariff,
            ActionKind::RetaliatoryTariff,
            ActionKind::Negotiate,
            ActionKind::Concession,
            ActionKind::Alliance,
            ActionKind::HedgingCooperation,
            ActionKind::WaitAndSee,
        ]
    }

    /// Human-readable action name used in prompts and event payloads.
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::SetTariff => "Set/adjust tariffs",
            ActionKind::RetaliatoryTariff => "Impose retaliatory tariffs",
            ActionKind::Negotiate => "Initiate/respond to negotiation",
            ActionKind::Concession => "Propose/accept/reject concession",
            ActionKind::Alliance => "Form/join/leave alliance",
            ActionKind::HedgingCooperation => "Seek hedging cooperation",
            ActionKind::WaitAndSee => "Wait and see",
        }
    }

    /// One-line description shown to agents next to the label.
    pub fn description(&self) -> &'static str {
        match self {
            ActionKind::SetTariff => {
                "Set or adjust import tariffs on specific goods or sectors from specific countries"
            }
            ActionKind::RetaliatoryTariff => {
                "Levy additional tariffs against trade practices considered unfair"
            }
            ActionKind::Negotiate => {
                "Propose or agree to bilateral or multilateral talks on tariffs or other trade issues"
            }
            ActionKind::Concession => {
                "Put forward a concrete tariff concession or answer the other side's proposal"
            }
            ActionKind::Alliance => {
                "Establish or dissolve a formal economic or political alliance with other countries"
            }
            ActionKind::HedgingCooperation => {
                "Sign new trade agreements with third countries to hedge against tension with a major power"
            }
            ActionKind::WaitAndSee => "Hold position and observe",
        }
    }

    /// Maps free-text action labels onto the vocabulary.
    ///
    /// Matching is keyword based and case-insensitive; more specific
    /// keywords are checked first so "retaliatory tariff" is not read as a
    /// plain tariff change.
    pub fn classify(action: &str) -> Option<ActionKind> {
        let action = action.trim().to_lowercase();
        if action.is_empty() {
            return None;
        }

        if let Some(kind) = ActionKind::all()
            .iter()
            .find(|kind| kind.label().to_lowercase() == action)
        {
            return Some(*kind);
        }

        const KEYWORDS: &[(&str, ActionKind)] = &[
            ("retaliat", ActionKind::RetaliatoryTariff),
            ("hedg", ActionKind::HedgingCooperation),
            ("trade agreement", ActionKind::HedgingCooperation),
            ("concession", ActionKind::Concession),
            ("allian", ActionKind::Alliance),
            ("negotiat", ActionKind::Negotiate),
            ("talks", ActionKind::Negotiate),
            ("tariff", ActionKind::SetTariff),
            ("wait", ActionKind::WaitAndSee),
            ("observe", ActionKind::WaitAndSee),
        ];

        KEYWORDS
            .iter()
            .find(|(keyword, _)| action.contains(keyword))
            .map(|(_, kind)| *kind)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decision_new_clamps_score() {
        let decision = Decision::new(250, "Negotiate", "talks");
        assert_eq!(decision.score, 100);
    }

    #[test]
    fn test_fallback_is_zero_score() {
        let decision = Decision::fallback();
        assert_eq!(decision.score, 0);
        assert!(decision.action.is_empty());
        assert!(decision.action_detail.is_empty());
    }

    #[test]
    fn test_parse_score_variants() {
        assert_eq!(parse_score(&json!(70)), Some(70));
        assert_eq!(parse_score(&json!(69.6)), Some(70));
        assert_eq!(parse_score(&json!("85")), Some(85));
        assert_eq!(parse_score(&json!(" 42.2 ")), Some(42));
        assert_eq!(parse_score(&json!(-5)), Some(0));
        assert_eq!(parse_score(&json!(1000)), Some(100));
        assert_eq!(parse_score(&json!("high")), None);
        assert_eq!(parse_score(&json!(null)), None);
        assert_eq!(parse_score(&json!([1])), None);
    }

    #[test]
    fn test_decision_from_value() {
        let value = json!({
            "score": "70",
            "action": "Negotiate",
            "action_detail": "Open talks with Canada"
        });
        let decision = Decision::from_value(&value).unwrap();
        assert_eq!(decision, Decision::new(70, "Negotiate", "Open talks with Canada"));
    }

    #[test]
    fn test_decision_from_value_defaults_missing_text() {
        let decision = Decision::from_value(&json!({ "score": 12 })).unwrap();
        assert_eq!(decision.score, 12);
        assert_eq!(decision.action, "");
        assert_eq!(decision.action_detail, "");
    }

    #[test]
    fn test_missing_or_non_numeric_score_counts_as_zero() {
        let decision = Decision::from_value(&json!({
            "action": "Wait and see",
            "action_detail": "hold tariffs steady"
        }))
        .unwrap();
        assert_eq!(decision, Decision::new(0, "Wait and see", "hold tariffs steady"));

        let decision =
            Decision::from_value(&json!({ "score": "very", "action": "Negotiate" })).unwrap();
        assert_eq!(decision.score, 0);
        assert_eq!(decision.action, "Negotiate");

        assert_eq!(Decision::from_value(&json!({})).unwrap(), Decision::fallback());
    }

    #[test]
    fn test_decision_from_value_rejects_bad_payloads() {
        assert_eq!(
            Decision::from_value(&json!("score: 10")),
            Err(DecisionParseError::NotAnObject)
        );
        assert!(matches!(
            Decision::from_value(&json!({ "score": 5, "action": 3 })),
            Err(DecisionParseError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_action_kind_classify() {
        assert_eq!(ActionKind::classify("Negotiate"), Some(ActionKind::Negotiate));
        assert_eq!(
            ActionKind::classify("Impose retaliatory tariffs"),
            Some(ActionKind::RetaliatoryTariff)
        );
        assert_eq!(ActionKind::classify("raise tariff on steel"), Some(ActionKind::SetTariff));
        assert_eq!(ActionKind::classify("Wait and see"), Some(ActionKind::WaitAndSee));
        assert_eq!(ActionKind::classify("launch a satellite"), None);
        assert_eq!(ActionKind::classify("   "), None);
    }

    #[test]
    fn test_action_kind_labels_round_trip() {
        for kind in ActionKind::all() {
            assert_eq!(ActionKind::classify(kind.label()), Some(*kind));
        }
    }
}
