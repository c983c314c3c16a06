//! Round Orchestrator
//!
//! Drives a single round: fan the stimulus out to every agent except the
//! initiator, join all answers, pick the winners, record what happened in
//! everyone's memory and push the winning actions through the economy.
//!
//! # Round sequence
//!
//! ```text
//! raise_round                          announce_winners
//! ┌───────────────┐  join   ┌──────┐   ┌───────────────────────────────┐
//! │ agent B ──────┼────────▶│      │   │ max score, ties kept          │
//! │ agent C ──────┼────────▶│ rows ├──▶│ memory: "X executed: ..."     │
//! │ agent D ──────┼────────▶│      │   │ economy.apply, one at a time  │
//! └───────────────┘         └──────┘   └───────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use negotiation_events::{AgentId, AnnouncedAgent, Decision, EconomicState, MemoryEntry, ResponseRow};

use crate::agent::{Agent, AgentError, Roster};
use crate::economy::{ApplyOutcome, EconomyHolder};
use crate::memory::MemoryStore;

/// One agent's contribution to a round.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentResponse {
    pub agent: AgentId,
    pub decision: Decision,
    /// Present when the agent failed and [`Decision::fallback`] stands in
    pub failure: Option<AgentError>,
}

impl AgentResponse {
    pub fn decided(agent: impl Into<AgentId>, decision: Decision) -> Self {
        Self {
            agent: agent.into(),
            decision,
            failure: None,
        }
    }

    pub fn fallback(agent: impl Into<AgentId>, failure: AgentError) -> Self {
        Self {
            agent: agent.into(),
            decision: Decision::fallback(),
            failure: Some(failure),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.failure.is_some()
    }

    pub fn score(&self) -> u8 {
        self.decision.score
    }

    /// Row form used in the `agent_responses` event.
    pub fn to_row(&self) -> ResponseRow {
        ResponseRow::new(self.agent.clone(), &self.decision, self.is_fallback())
    }
}

/// Outcome of [`RoundOrchestrator::announce_winners`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Announcement {
    /// Every response that reached the winning score, in roster order
    pub winners: Vec<AgentResponse>,
    /// Highest score of the round; 0 when nobody answered
    pub winning_score: u8,
}

impl Announcement {
    /// The winner whose action seeds the next round: the first tied winner
    /// in roster declaration order.
    pub fn leader(&self) -> Option<&AgentResponse> {
        self.winners.first()
    }

    /// Winners in the shape of the `agent_announce` event.
    pub fn announced_agents(&self) -> Vec<AnnouncedAgent> {
        self.winners
            .iter()
            .map(|w| AnnouncedAgent {
                agent: w.agent.clone(),
                action: w.decision.action.clone(),
                action_detail: w.decision.action_detail.clone(),
            })
            .collect()
    }
}

/// Derived record of a completed round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub iteration: u32,
    pub initiator: AgentId,
    pub responses: Vec<AgentResponse>,
    pub winners: Vec<AgentId>,
    pub winning_score: u8,
}

impl RoundResult {
    pub fn new(
        iteration: u32,
        initiator: impl Into<AgentId>,
        responses: Vec<AgentResponse>,
        announcement: &Announcement,
    ) -> Self {
        Self {
            iteration,
            initiator: initiator.into(),
            responses,
            winners: announcement.winners.iter().map(|w| w.agent.clone()).collect(),
            winning_score: announcement.winning_score,
        }
    }

    /// Number of agents whose decision was substituted.
    pub fn fallback_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_fallback()).count()
    }
}

/// Executes rounds against a fixed roster.
///
/// Owns the memory store and the economy holder; nothing else mutates them
/// while a run is in progress.
#[derive(Debug)]
pub struct RoundOrchestrator {
    roster: Roster,
    memory: MemoryStore,
    economy: EconomyHolder,
    decision_timeout: Option<Duration>,
}

impl RoundOrchestrator {
    pub fn new(roster: Roster, memory: MemoryStore, economy: EconomyHolder) -> Self {
        Self {
            roster,
            memory,
            economy,
            decision_timeout: None,
        }
    }

    /// Bounds every decision call; expiry counts as an agent failure.
    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = Some(timeout);
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn economy(&self) -> &EconomyHolder {
        &self.economy
    }

    /// Raises `stimulus` to every agent except `initiator`.
    ///
    /// All decision calls run concurrently and are joined before returning.
    /// Failed calls yield a zero-score fallback instead of aborting the
    /// round. Every participant remembers the raw stimulus afterwards.
    /// Responses come back in roster order.
    pub async fn raise_round(
        &mut self,
        initiator: &str,
        stimulus: &str,
        snapshot: &EconomicState,
        iteration: u32,
    ) -> Vec<AgentResponse> {
        let participants: Vec<(usize, Arc<dyn Agent>)> = self
            .roster
            .iter()
            .enumerate()
            .filter(|(_, agent)| agent.id() != initiator)
            .map(|(index, agent)| (index, Arc::clone(agent)))
            .collect();

        let mut tasks = JoinSet::new();
        let mut owners = HashMap::with_capacity(participants.len());
        for (index, agent) in &participants {
            let agent = Arc::clone(agent);
            let index = *index;
            let enriched = self.memory.enrich(agent.id(), stimulus);
            let snapshot = snapshot.clone();
            let timeout = self.decision_timeout;

            let handle = tasks.spawn(async move {
                let call = agent.decide(&enriched, &snapshot);
                let result = match timeout {
                    Some(limit) => tokio::time::timeout(limit, call)
                        .await
                        .unwrap_or(Err(AgentError::Timeout(limit))),
                    None => call.await,
                };
                (index, result)
            });
            owners.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<Result<Decision, AgentError>>> =
            (0..self.roster.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => match owners.get(&e.id()) {
                    Some(&index) => {
                        slots[index] = Some(Err(AgentError::Aborted(e.to_string())));
                    }
                    None => warn!(iteration, error = %e, "unowned decision task failed"),
                },
            }
        }

        let mut responses = Vec::with_capacity(participants.len());
        for (index, agent) in &participants {
            let id = agent.id();
            let response = match slots[*index].take() {
                Some(Ok(decision)) => {
                    debug!(agent = id, iteration, score = decision.score, action = %decision.action, "decision received");
                    AgentResponse::decided(id, decision)
                }
                Some(Err(error)) => {
                    warn!(agent = id, iteration, %error, "agent decision failed, substituting zero-score default");
                    AgentResponse::fallback(id, error)
                }
                None => {
                    warn!(agent = id, iteration, "decision task lost, substituting zero-score default");
                    AgentResponse::fallback(id, AgentError::Aborted("task lost".to_string()))
                }
            };
            responses.push(response);
        }

        for response in &responses {
            let entry = MemoryEntry::new(initiator, stimulus, iteration);
            if let Err(e) = self.memory.append(&response.agent, entry) {
                warn!(error = %e, "memory append refused");
            }
        }

        responses
    }

    /// Selects the round's winners and enacts their actions.
    ///
    /// Every response at the maximum score wins. For each winner, in roster
    /// order, all other agents remember the executed action and the
    /// economy is updated; updates run one after another because each
    /// reads the state the previous one produced. Fallback winners (only
    /// possible when every answer scored 0) executed nothing and cause no
    /// side effects.
    pub async fn announce_winners(
        &mut self,
        responses: &[AgentResponse],
        iteration: u32,
    ) -> Announcement {
        let Some(winning_score) = responses.iter().map(AgentResponse::score).max() else {
            return Announcement::default();
        };

        let mut winners: Vec<AgentResponse> = responses
            .iter()
            .filter(|r| r.score() == winning_score)
            .cloned()
            .collect();
        winners.sort_by_key(|w| self.roster.position(&w.agent).unwrap_or(usize::MAX));

        info!(
            iteration,
            winning_score,
            winners = ?winners.iter().map(|w| w.agent.as_str()).collect::<Vec<_>>(),
            "round winners selected"
        );

        for winner in &winners {
            if winner.is_fallback() {
                debug!(agent = %winner.agent, "winner has no decision, skipping side effects");
                continue;
            }

            let record = format!(
                "{} executed: {}, detail: {}",
                winner.agent, winner.decision.action, winner.decision.action_detail
            );
            for id in self.roster.ids() {
                if id == winner.agent {
                    continue;
                }
                let entry = MemoryEntry::new(winner.agent.clone(), record.clone(), iteration);
                if let Err(e) = self.memory.append(&id, entry) {
                    warn!(error = %e, "memory append refused");
                }
            }

            let outcome = self
                .economy
                .apply(
                    &winner.agent,
                    &winner.decision.action,
                    &winner.decision.action_detail,
                )
                .await;
            if let ApplyOutcome::Rejected(_) = outcome {
                debug!(agent = %winner.agent, iteration, "winner's action left the economy unchanged");
            }
        }

        Announcement {
            winners,
            winning_score,
        }
    }
}
