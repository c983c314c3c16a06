//! Agent capability and roster.
//!
//! An agent is anything that can turn a stimulus plus a read-only view of
//! the economy into a scored [`Decision`]. Persona text and the model
//! behind it are configuration of a concrete implementation, not part of
//! the capability.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use negotiation_events::{AgentId, Decision, EconomicState};

use crate::config::ConfigError;

/// A participant that reacts to stimuli with scored decisions.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Identifier, unique within the roster.
    fn id(&self) -> &str;

    /// Decides how to respond to `stimulus` given the current economy.
    ///
    /// `state` is a private copy; implementations may not observe changes
    /// made by other agents during the same round.
    async fn decide(&self, stimulus: &str, state: &EconomicState) -> Result<Decision, AgentError>;
}

/// Why an agent produced no usable decision.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    /// The decision backend itself failed (network, provider error, ...)
    #[error("decision backend failed: {0}")]
    Backend(String),
    /// The backend answered but the answer could not be read as a decision
    #[error("unparsable decision: {0}")]
    Unparsable(String),
    /// No answer within the configured per-call limit
    #[error("no decision within {0:?}")]
    Timeout(Duration),
    /// The decision task panicked or was aborted
    #[error("decision task did not complete: {0}")]
    Aborted(String),
}

/// The fixed, ordered set of agents taking part in a run.
///
/// Declaration order is significant: responses are reported in it and it
/// breaks ties between equal winning scores.
#[derive(Clone)]
pub struct Roster {
    agents: Vec<Arc<dyn Agent>>,
}

impl Roster {
    /// Builds a roster, rejecting empty rosters and duplicate ids.
    pub fn new(agents: Vec<Arc<dyn Agent>>) -> Result<Self, ConfigError> {
        if agents.is_empty() {
            return Err(ConfigError::EmptyRoster);
        }

        for (i, agent) in agents.iter().enumerate() {
            if agent.id().trim().is_empty() {
                return Err(ConfigError::BlankAgentId);
            }
            if agents[..i].iter().any(|other| other.id() == agent.id()) {
                return Err(ConfigError::DuplicateAgent(agent.id().to_string()));
            }
        }

        Ok(Self { agents })
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Agents in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Agent>> {
        self.agents.iter()
    }

    /// Agent ids in declaration order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|a| a.id().to_string()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Declaration index of an agent.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.agents.iter().position(|a| a.id() == id)
    }
}

impl std::fmt::Debug for Roster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Roster").field("agents", &self.ids()).finish()
    }
}
