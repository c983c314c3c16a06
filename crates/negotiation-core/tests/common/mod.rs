//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use negotiation_core::{
    Agent, AgentError, EconomicTransform, EconomyHolder, MemoryStore, Roster, RoundOrchestrator,
    Simulation, SimulationSettings, TransformError, TransformRequest,
};
use negotiation_events::{Decision, EconomicState};

/// Answers with queued replies, then repeats `fallback_reply`; records every
/// stimulus it is shown.
pub struct ScriptedAgent {
    id: String,
    queue: Mutex<VecDeque<Result<Decision, AgentError>>>,
    repeat: Result<Decision, AgentError>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    pub fn constant(id: &str, score: u8) -> Arc<Self> {
        Self::repeating(
            id,
            Ok(Decision::new(
                score,
                "Initiate/respond to negotiation",
                format!("{id} proposes talks"),
            )),
        )
    }

    pub fn repeating(id: &str, reply: Result<Decision, AgentError>) -> Arc<Self> {
        Self::scripted(id, Vec::new(), reply)
    }

    pub fn scripted(
        id: &str,
        replies: Vec<Result<Decision, AgentError>>,
        repeat: Result<Decision, AgentError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            queue: Mutex::new(replies.into()),
            repeat,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn decide(&self, stimulus: &str, _state: &EconomicState) -> Result<Decision, AgentError> {
        self.seen.lock().unwrap().push(stimulus.to_string());
        let next = self.queue.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.repeat.clone())
    }
}

/// Returns the current state with every GDP raised by 1.
#[derive(Default)]
pub struct GrowthTransform {
    pub calls: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl EconomicTransform for GrowthTransform {
    async fn transform(&self, request: &TransformRequest) -> Result<EconomicState, TransformError> {
        self.calls.lock().unwrap().push((
            request.actor.clone(),
            request.action.clone(),
            request.action_detail.clone(),
        ));
        let mut next = request.current.clone();
        let keys: Vec<String> = next.entity_keys().into_iter().map(str::to_string).collect();
        for key in keys {
            next.adjust_indicator(&key, "GDP", 1.0);
        }
        Ok(next)
    }
}

/// Always answers with the same candidate, valid or not.
pub struct FixedTransform(pub EconomicState);

#[async_trait]
impl EconomicTransform for FixedTransform {
    async fn transform(&self, _: &TransformRequest) -> Result<EconomicState, TransformError> {
        Ok(self.0.clone())
    }
}

pub fn economy() -> EconomicState {
    negotiation_events::fixtures::sample_economy()
}

pub fn settings(initiator: &str, stimulus: &str) -> SimulationSettings {
    SimulationSettings {
        min_score_threshold: 50,
        max_iterations: 5,
        initiator: initiator.to_string(),
        stimulus: stimulus.to_string(),
    }
}

pub fn simulation(
    settings: SimulationSettings,
    agents: Vec<Arc<dyn Agent>>,
    transform: Arc<dyn EconomicTransform>,
) -> Simulation {
    let orchestrator = RoundOrchestrator::new(
        Roster::new(agents).unwrap(),
        MemoryStore::default(),
        EconomyHolder::new(economy(), transform),
    );
    Simulation::new(settings, orchestrator).unwrap()
}
