//! Economic State
//!
//! The shared macro-economic picture: per-entity named numeric indicators.
//!
//! The indicator set is open-ended. Whatever names the initial state or a
//! transform produces are carried through unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Indicator name to value for a single entity.
pub type Indicators = BTreeMap<String, f64>;

/// Mapping from country/entity key to its indicators.
///
/// Keys are kept sorted so every rendering of the state is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EconomicState {
    entities: BTreeMap<String, Indicators>,
}

impl EconomicState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of an entity and its indicators.
    pub fn with_entity<I, K>(mut self, key: impl Into<String>, indicators: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.insert_entity(
            key,
            indicators.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        );
        self
    }

    /// Inserts or replaces an entity.
    pub fn insert_entity(&mut self, key: impl Into<String>, indicators: Indicators) {
        self.entities.insert(key.into(), indicators);
    }

    /// Returns an entity's indicators.
    pub fn entity(&self, key: &str) -> Option<&Indicators> {
        self.entities.get(key)
    }

    /// Returns a single indicator value.
    pub fn indicator(&self, key: &str, name: &str) -> Option<f64> {
        self.entities.get(key).and_then(|ind| ind.get(name)).copied()
    }

    /// Adds `delta` to an existing indicator. Returns false if it is absent.
    pub fn adjust_indicator(&mut self, key: &str, name: &str, delta: f64) -> bool {
        match self.entities.get_mut(key).and_then(|ind| ind.get_mut(name)) {
            Some(value) => {
                *value += delta;
                true
            }
            None => false,
        }
    }

    /// Iterates entities in key order.
    pub fn entities(&self) -> impl Iterator<Item = (&String, &Indicators)> {
        self.entities.iter()
    }

    /// The set of entity keys.
    pub fn entity_keys(&self) -> BTreeSet<&str> {
        self.entities.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Renders the state one line per entity: `key: name: value name: value`.
    pub fn render(&self) -> String {
        self.entities
            .iter()
            .map(|(key, indicators)| {
                let mut line = format!("{}:", key);
                for (name, value) in indicators {
                    line.push_str(&format!(" {}: {}", name, value));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parses a candidate state from loosely typed JSON.
    ///
    /// The top level must be an object of objects. Indicator values may be
    /// numbers or strings holding a number; anything else is rejected.
    pub fn from_value(value: &Value) -> Result<Self, StateParseError> {
        let object = value.as_object().ok_or(StateParseError::NotAnObject)?;

        let mut state = EconomicState::new();
        for (key, entry) in object {
            let fields = entry
                .as_object()
                .ok_or_else(|| StateParseError::EntityNotAnObject(key.clone()))?;

            let mut indicators = Indicators::new();
            for (name, raw) in fields {
                let value = match raw {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                }
                .filter(|v| v.is_finite())
                .ok_or_else(|| StateParseError::NonNumericIndicator {
                    entity: key.clone(),
                    indicator: name.clone(),
                })?;
                indicators.insert(name.clone(), value);
            }
            state.insert_entity(key.clone(), indicators);
        }

        Ok(state)
    }
}

/// Errors from turning loosely typed JSON into an [`EconomicState`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateParseError {
    #[error("economic state is not a JSON object")]
    NotAnObject,
    #[error("entry for {0} is not an object of indicators")]
    EntityNotAnObject(String),
    #[error("indicator {indicator} of {entity} is not numeric")]
    NonNumericIndicator { entity: String, indicator: String },
}
