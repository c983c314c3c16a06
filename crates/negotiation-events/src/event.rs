//! Lifecycle Events
//!
//! The ordered stream a simulation run emits to its presentation layer.
//!
//! On the wire every event is an object `{"type", "data", "iteration"}`;
//! the payload shape depends on `type`. Framing (server-sent events, JSON
//! lines) is left to adapters.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::{AgentId, Decision, EconomicState};

/// Event type discriminator carried in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Stimulus,
    IterationStart,
    AgentResponses,
    AgentAnnounce,
    EconomicData,
    IterationEnd,
}

impl EventType {
    /// Returns the wire name of this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Stimulus => "stimulus",
            EventType::IterationStart => "iteration_start",
            EventType::AgentResponses => "agent_responses",
            EventType::AgentAnnounce => "agent_announce",
            EventType::EconomicData => "economic_data",
            EventType::IterationEnd => "iteration_end",
        }
    }
}

/// Why a run stopped scheduling rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The iteration counter passed the configured maximum
    ReachedMaxIterations,
    /// The round's winning score did not exceed the configured threshold
    BelowScoreThreshold,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::ReachedMaxIterations => write!(f, "reached maximum iterations"),
            TerminationReason::BelowScoreThreshold => write!(f, "below minimum score threshold"),
        }
    }
}

/// The externally supplied stimulus that opens a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusData {
    pub source: AgentId,
    pub content: String,
}

/// Announces the round about to be raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationStartData {
    pub iteration_text: String,
    pub initiator: AgentId,
    pub content: String,
}

/// One agent's answer as shown to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRow {
    pub agent: AgentId,
    pub score: u8,
    pub action: String,
    pub action_detail: String,
    /// Set when the agent failed and a zero-score default stood in
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

impl ResponseRow {
    pub fn new(agent: impl Into<AgentId>, decision: &Decision, fallback: bool) -> Self {
        Self {
            agent: agent.into(),
            score: decision.score,
            action: decision.action.clone(),
            action_detail: decision.action_detail.clone(),
            fallback,
        }
    }
}

/// All responses of a round, highest score first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponsesData {
    pub responses: Vec<ResponseRow>,
}

/// A winning agent and the action it executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncedAgent {
    pub agent: AgentId,
    pub action: String,
    pub action_detail: String,
}

/// The round's winners.
///
/// `agents` lists every agent that reached `score`, in roster order. The
/// first entry is the one whose action seeds the next round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAnnounceData {
    pub score: u8,
    pub agents: Vec<AnnouncedAgent>,
}

/// Closing summary of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationEndData {
    pub total_iterations: u32,
    pub termination_reason: TerminationReason,
}

/// Typed payload of a [`SimEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Stimulus(StimulusData),
    IterationStart(IterationStartData),
    AgentResponses(AgentResponsesData),
    AgentAnnounce(AgentAnnounceData),
    EconomicData(EconomicState),
    IterationEnd(IterationEndData),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::Stimulus(_) => EventType::Stimulus,
            EventPayload::IterationStart(_) => EventType::IterationStart,
            EventPayload::AgentResponses(_) => EventType::AgentResponses,
            EventPayload::AgentAnnounce(_) => EventType::AgentAnnounce,
            EventPayload::EconomicData(_) => EventType::EconomicData,
            EventPayload::IterationEnd(_) => EventType::IterationEnd,
        }
    }
}

/// A single lifecycle event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireEvent")]
pub struct SimEvent {
    /// Iteration the event belongs to
    pub iteration: u32,
    /// Typed event data
    pub payload: EventPayload,
}

impl SimEvent {
    pub fn new(iteration: u32, payload: EventPayload) -> Self {
        Self { iteration, payload }
    }

    /// The opening stimulus. Always tagged iteration 0.
    pub fn stimulus(source: impl Into<AgentId>, content: impl Into<String>) -> Self {
        Self::new(
            0,
            EventPayload::Stimulus(StimulusData {
                source: source.into(),
                content: content.into(),
            }),
        )
    }

    pub fn iteration_start(
        iteration: u32,
        initiator: impl Into<AgentId>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(
            iteration,
            EventPayload::IterationStart(IterationStartData {
                iteration_text: iteration_text(iteration),
                initiator: initiator.into(),
                content: content.into(),
            }),
        )
    }

    pub fn agent_responses(iteration: u32, responses: Vec<ResponseRow>) -> Self {
        Self::new(
            iteration,
            EventPayload::AgentResponses(AgentResponsesData { responses }),
        )
    }

    pub fn agent_announce(iteration: u32, score: u8, agents: Vec<AnnouncedAgent>) -> Self {
        Self::new(
            iteration,
            EventPayload::AgentAnnounce(AgentAnnounceData { score, agents }),
        )
    }

    pub fn economic_data(iteration: u32, state: EconomicState) -> Self {
        Self::new(iteration, EventPayload::EconomicData(state))
    }

    pub fn iteration_end(
        iteration: u32,
        total_iterations: u32,
        termination_reason: TerminationReason,
    ) -> Self {
        Self::new(
            iteration,
            EventPayload::IterationEnd(IterationEndData {
                total_iterations,
                termination_reason,
            }),
        )
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// Serializes the event to a JSON line (for JSONL format).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes an event from a JSON line.
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Human-readable label for an iteration.
pub fn iteration_text(iteration: u32) -> String {
    if iteration == 0 {
        "Initial response".to_string()
    } else {
        format!("Iteration {}", iteration)
    }
}

/// Error converting a wire object back into a typed event.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("invalid {event_type} payload: {source}")]
    Payload {
        event_type: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl Serialize for SimEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut wire = serializer.serialize_struct("SimEvent", 3)?;
        wire.serialize_field("type", &self.event_type())?;
        match &self.payload {
            EventPayload::Stimulus(d) => wire.serialize_field("data", d)?,
            EventPayload::IterationStart(d) => wire.serialize_field("data", d)?,
            EventPayload::AgentResponses(d) => wire.serialize_field("data", d)?,
            EventPayload::AgentAnnounce(d) => wire.serialize_field("data", d)?,
            EventPayload::EconomicData(d) => wire.serialize_field("data", d)?,
            EventPayload::IterationEnd(d) => wire.serialize_field("data", d)?,
        }
        wire.serialize_field("iteration", &self.iteration)?;
        wire.end()
    }
}

/// Untyped wire shape of an incoming event.
#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    event_type: EventType,
    data: Value,
    iteration: u32,
}

impl TryFrom<WireEvent> for SimEvent {
    type Error = EventError;

    fn try_from(wire: WireEvent) -> Result<Self, Self::Error> {
        fn decode<T: serde::de::DeserializeOwned>(
            event_type: EventType,
            data: Value,
        ) -> Result<T, EventError> {
            serde_json::from_value(data).map_err(|source| EventError::Payload {
                event_type: event_type.as_str(),
                source,
            })
        }

        let t = wire.event_type;
        let payload = match t {
            EventType::Stimulus => EventPayload::Stimulus(decode(t, wire.data)?),
            EventType::IterationStart => EventPayload::IterationStart(decode(t, wire.data)?),
            EventType::AgentResponses => EventPayload::AgentResponses(decode(t, wire.data)?),
            EventType::AgentAnnounce => EventPayload::AgentAnnounce(decode(t, wire.data)?),
            EventType::EconomicData => EventPayload::EconomicData(decode(t, wire.data)?),
            EventType::IterationEnd => EventPayload::IterationEnd(decode(t, wire.data)?),
        };

        Ok(SimEvent::new(wire.iteration, payload))
    }
}
