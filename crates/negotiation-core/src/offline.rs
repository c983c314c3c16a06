//! Offline Backend
//!
//! Model-free collaborators so a run can go end to end without any
//! provider: agents that draw decisions from a seeded generator, and an
//! economic transform that applies a fixed impact table.

use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

use negotiation_events::{ActionKind, AgentId, Decision, EconomicState};

use crate::agent::{Agent, AgentError};
use crate::config::SimulationConfig;
use crate::economy::{EconomicTransform, TransformError, TransformRequest};

/// Indicator names the rule transform knows how to move.
pub const GDP: &str = "GDP";
pub const INFLATION: &str = "inflation";
pub const UNEMPLOYMENT: &str = "unemployment";

/// Relative likelihood of each action for a seeded agent.
const ACTION_WEIGHTS: &[(ActionKind, f32)] = &[
    (ActionKind::SetTariff, 0.20),
    (ActionKind::RetaliatoryTariff, 0.15),
    (ActionKind::Negotiate, 0.20),
    (ActionKind::Concession, 0.10),
    (ActionKind::Alliance, 0.10),
    (ActionKind::HedgingCooperation, 0.15),
    (ActionKind::WaitAndSee, 0.10),
];

/// An agent whose decisions come from a seeded random generator.
///
/// Two agents built with the same seed make the same sequence of
/// decisions for the same sequence of states.
pub struct SeededAgent {
    id: AgentId,
    rng: Mutex<SmallRng>,
}

impl SeededAgent {
    pub fn new(id: impl Into<AgentId>, seed: u64) -> Self {
        Self {
            id: id.into(),
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    fn draw(&self, rng: &mut SmallRng, state: &EconomicState) -> Decision {
        let kind = weighted_action(rng);

        // Average of two uniforms keeps most scores near the middle
        let a: f32 = rng.gen();
        let b: f32 = rng.gen();
        let score = (((a + b) / 2.0) * 100.0).round() as u8;

        let others: Vec<&str> = state
            .entity_keys()
            .into_iter()
            .filter(|key| *key != self.id)
            .collect();
        let target = if others.is_empty() {
            "its partners".to_string()
        } else {
            others[rng.gen_range(0..others.len())].to_string()
        };

        Decision::new(score, kind.label(), action_detail(kind, &self.id, &target))
    }
}

#[async_trait]
impl Agent for SeededAgent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn decide(&self, _stimulus: &str, state: &EconomicState) -> Result<Decision, AgentError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| AgentError::Backend("random generator poisoned".to_string()))?;
        Ok(self.draw(&mut rng, state))
    }
}

impl std::fmt::Debug for SeededAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededAgent").field("id", &self.id).finish()
    }
}

/// Seeded agents for the configured roster; agent `i` uses `seed + i`.
pub fn seeded_roster(config: &SimulationConfig) -> Vec<Arc<dyn Agent>> {
    config
        .agents
        .iter()
        .enumerate()
        .map(|(i, agent)| {
            Arc::new(SeededAgent::new(
                agent.id.clone(),
                config.simulation.seed.wrapping_add(i as u64),
            )) as Arc<dyn Agent>
        })
        .collect()
}

fn weighted_action<R: Rng>(rng: &mut R) -> ActionKind {
    let total: f32 = ACTION_WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen::<f32>() * total;

    for (kind, weight) in ACTION_WEIGHTS {
        roll -= weight;
        if roll <= 0.0 {
            return *kind;
        }
    }

    ActionKind::WaitAndSee
}

fn action_detail(kind: ActionKind, actor: &str, target: &str) -> String {
    match kind {
        ActionKind::SetTariff => format!("{actor} raises tariffs on selected imports from {target}"),
        ActionKind::RetaliatoryTariff => {
            format!("{actor} imposes retaliatory tariffs on goods from {target}")
        }
        ActionKind::Negotiate => format!("{actor} proposes bilateral trade talks with {target}"),
        ActionKind::Concession => {
            format!("{actor} offers to lower tariffs on {target} agricultural goods")
        }
        ActionKind::Alliance => format!("{actor} seeks a closer economic alliance with {target}"),
        ActionKind::HedgingCooperation => {
            format!("{actor} signs a new trade agreement with {target} to diversify exports")
        }
        ActionKind::WaitAndSee => format!("{actor} holds its current measures and watches {target}"),
    }
}

/// Applies a fixed impact table to the acting entity and its targets.
///
/// | action | effect |
/// |---|---|
/// | set/adjust tariffs | own inflation +0.2, each named target GDP -0.2 |
/// | retaliatory tariffs | own GDP -0.1, own unemployment +0.2 |
/// | alliance | own GDP +0.2, own unemployment -0.1 |
/// | hedging cooperation | own GDP +0.1 |
///
/// Targets are the other entities whose key appears in the action detail.
/// Other actions leave the economy unchanged. Values are kept to two
/// decimals.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleTransform;

impl RuleTransform {
    pub fn apply(&self, request: &TransformRequest) -> EconomicState {
        let mut next = request.current.clone();
        let Some(kind) = ActionKind::classify(&request.action) else {
            return next;
        };

        let detail = request.action_detail.to_lowercase();
        let targets: Vec<String> = next
            .entity_keys()
            .into_iter()
            .filter(|key| *key != request.actor && detail.contains(&key.to_lowercase()))
            .map(str::to_string)
            .collect();
        let actor = request.actor.as_str();

        match kind {
            ActionKind::SetTariff => {
                nudge(&mut next, actor, INFLATION, 0.2);
                for target in &targets {
                    nudge(&mut next, target, GDP, -0.2);
                }
            }
            ActionKind::RetaliatoryTariff => {
                nudge(&mut next, actor, GDP, -0.1);
                nudge(&mut next, actor, UNEMPLOYMENT, 0.2);
            }
            ActionKind::Alliance => {
                nudge(&mut next, actor, GDP, 0.2);
                nudge(&mut next, actor, UNEMPLOYMENT, -0.1);
            }
            ActionKind::HedgingCooperation => nudge(&mut next, actor, GDP, 0.1),
            ActionKind::Negotiate | ActionKind::Concession | ActionKind::WaitAndSee => {}
        }

        next
    }
}

#[async_trait]
impl EconomicTransform for RuleTransform {
    async fn transform(&self, request: &TransformRequest) -> Result<EconomicState, TransformError> {
        Ok(self.apply(request))
    }
}

/// Moves an indicator by `delta`, rounding the result to two decimals.
/// Absent indicators are left alone.
fn nudge(state: &mut EconomicState, entity: &str, indicator: &str, delta: f64) {
    if let Some(old) = state.indicator(entity, indicator) {
        let new = ((old + delta) * 100.0).round() / 100.0;
        state.adjust_indicator(entity, indicator, new - old);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn economy() -> EconomicState {
        EconomicState::new()
            .with_entity("us", [("GDP", 21.0), ("inflation", 3.5), ("unemployment", 5.5)])
            .with_entity("china", [("GDP", 18.0), ("inflation", 2.1), ("unemployment", 5.2)])
            .with_entity("canada", [("GDP", 2.1), ("inflation", 4.2), ("unemployment", 5.5)])
    }

    fn request(actor: &str, action: &str, detail: &str) -> TransformRequest {
        TransformRequest {
            actor: actor.to_string(),
            action: action.to_string(),
            action_detail: detail.to_string(),
            current: economy(),
        }
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn test_tariff_hits_named_targets_only() {
        let next = RuleTransform.apply(&request(
            "us",
            "Set/adjust tariffs",
            "25% tariffs on steel from China",
        ));

        assert!(close(next.indicator("us", INFLATION), 3.7));
        assert!(close(next.indicator("china", GDP), 17.8));
        assert!(close(next.indicator("canada", GDP), 2.1));
        assert!(close(next.indicator("us", GDP), 21.0));
    }

    #[test]
    fn test_retaliation_and_alliance_move_own_indicators() {
        let next = RuleTransform.apply(&request("china", "Impose retaliatory tariffs", "on us soybeans"));
        assert!(close(next.indicator("china", GDP), 17.9));
        assert!(close(next.indicator("china", UNEMPLOYMENT), 5.4));
        assert!(close(next.indicator("us", GDP), 21.0));

        let next = RuleTransform.apply(&request("canada", "Form/join/leave alliance", "with china"));
        assert!(close(next.indicator("canada", GDP), 2.3));
        assert!(close(next.indicator("canada", UNEMPLOYMENT), 5.4));
    }

    #[test]
    fn test_unclassified_action_changes_nothing() {
        assert_eq!(RuleTransform.apply(&request("us", "", "")), economy());
        assert_eq!(
            RuleTransform.apply(&request("us", "Initiate/respond to negotiation", "talks with china")),
            economy()
        );
    }

    #[test]
    fn test_missing_indicator_is_ignored() {
        let mut req = request("vietnam", "Seek hedging cooperation", "with canada");
        req.current = req.current.with_entity("vietnam", [("exports", 1.0)]);
        let next = RuleTransform.apply(&req);
        assert_eq!(next.entity("vietnam").unwrap().len(), 1);
        assert_eq!(next.entity_keys(), req.current.entity_keys());
    }

    #[tokio::test]
    async fn test_seeded_agents_are_reproducible() {
        let a = SeededAgent::new("us", 7);
        let b = SeededAgent::new("us", 7);
        let state = economy();

        for _ in 0..5 {
            let da = a.decide("stimulus", &state).await.unwrap();
            let db = b.decide("different stimulus", &state).await.unwrap();
            assert_eq!(da, db);
        }
    }

    #[tokio::test]
    async fn test_seeded_decisions_use_vocabulary() {
        let agent = SeededAgent::new("china", 3);
        let state = economy();

        for _ in 0..20 {
            let decision = agent.decide("s", &state).await.unwrap();
            assert!(decision.score <= 100);
            assert!(decision.action_kind().is_some());
            assert!(decision.action_detail.starts_with("china "));
            assert!(!decision.action_detail.ends_with("china"));
        }
    }
}
