//! Simulation Controller
//!
//! Runs rounds until the winning score drops to the threshold or the
//! iteration budget is spent, emitting the lifecycle event stream as it
//! goes.
//!
//! # Event order
//!
//! ```text
//! stimulus
//! ┌ iteration_start ─ agent_responses ─ agent_announce ─ economic_data ┐  × rounds
//! └────────────────────────────────────────────────────────────────────┘
//! iteration_end
//! ```

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use negotiation_events::{AgentId, EconomicState, SimEvent, TerminationReason, MAX_SCORE};

use std::sync::Arc;

use crate::agent::{Agent, Roster};
use crate::config::{ConfigError, SimulationConfig};
use crate::economy::{EconomicTransform, EconomyHolder};
use crate::memory::MemoryStore;
use crate::round::{RoundOrchestrator, RoundResult};

/// Loop limits and the opening stimulus of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSettings {
    /// Rounds continue only while the last winning score is above this
    pub min_score_threshold: u8,
    /// Highest iteration index that may run
    pub max_iterations: u32,
    pub initiator: AgentId,
    pub stimulus: String,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        let config = SimulationConfig::default();
        Self::from(&config)
    }
}

impl From<&SimulationConfig> for SimulationSettings {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            min_score_threshold: config.simulation.min_score_threshold,
            max_iterations: config.simulation.max_iterations,
            initiator: config.stimulus.initiator.clone(),
            stimulus: config.stimulus.content.clone(),
        }
    }
}

/// Lifecycle of a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    Terminated(TerminationReason),
    /// The consumer went away and no further rounds were scheduled
    Abandoned,
}

/// Loop-carried state, mutated only between rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationRunState {
    pub iteration_count: u32,
    pub current_initiator: AgentId,
    pub current_stimulus: String,
    pub highest_score: u8,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(TerminationReason),
    /// The consumer disconnected; the round in flight was finished
    Disconnected,
}

/// What a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    /// Completed rounds
    pub total_iterations: u32,
    pub rounds: Vec<RoundResult>,
    /// Substituted decisions across all rounds
    pub fallbacks: usize,
    pub committed_updates: u32,
    pub rejected_updates: u32,
    pub final_state: EconomicState,
}

impl RunSummary {
    pub fn termination_reason(&self) -> Option<TerminationReason> {
        match self.outcome {
            RunOutcome::Completed(reason) => Some(reason),
            RunOutcome::Disconnected => None,
        }
    }
}

/// Errors from driving a [`Simulation`].
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("simulation already left the idle phase ({0:?})")]
    AlreadyStarted(RunPhase),
    #[error("simulation task failed: {0}")]
    Task(String),
}

/// Receiver side of the lifecycle event stream.
#[async_trait]
pub trait EventSink: Send {
    /// Delivers one event. Returns `false` once the consumer is gone.
    async fn emit(&mut self, event: SimEvent) -> bool;
}

#[async_trait]
impl EventSink for mpsc::Sender<SimEvent> {
    async fn emit(&mut self, event: SimEvent) -> bool {
        self.send(event).await.is_ok()
    }
}

#[async_trait]
impl EventSink for Vec<SimEvent> {
    async fn emit(&mut self, event: SimEvent) -> bool {
        self.push(event);
        true
    }
}

/// One self-contained run: roster, memory and economy are owned here and
/// nowhere else.
#[derive(Debug)]
pub struct Simulation {
    settings: SimulationSettings,
    orchestrator: RoundOrchestrator,
    phase: RunPhase,
}

impl Simulation {
    /// Creates an idle simulation.
    pub fn new(
        settings: SimulationSettings,
        orchestrator: RoundOrchestrator,
    ) -> Result<Self, ConfigError> {
        if settings.min_score_threshold > MAX_SCORE {
            return Err(ConfigError::ThresholdOutOfRange(settings.min_score_threshold));
        }
        if settings.initiator.trim().is_empty() {
            return Err(ConfigError::BlankInitiator);
        }

        Ok(Self {
            settings,
            orchestrator,
            phase: RunPhase::Idle,
        })
    }

    /// Assembles a run from validated configuration and concrete
    /// collaborators. `agents` must follow the configured roster order.
    pub fn from_config(
        config: &SimulationConfig,
        agents: Vec<Arc<dyn Agent>>,
        transform: Arc<dyn EconomicTransform>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let roster = Roster::new(agents)?;
        let memory = MemoryStore::new(config.simulation.memory_preview_chars);
        let economy = EconomyHolder::new(config.economy.clone(), transform);
        let orchestrator = RoundOrchestrator::new(roster, memory, economy)
            .with_decision_timeout(config.decision_timeout());

        Self::new(SimulationSettings::from(config), orchestrator)
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn memory(&self) -> &MemoryStore {
        self.orchestrator.memory()
    }

    pub fn economy(&self) -> &EconomyHolder {
        self.orchestrator.economy()
    }

    /// Runs the round loop to completion, emitting events into `sink`.
    ///
    /// Agent failures and rejected economic updates are absorbed inside the
    /// rounds. If the sink reports the consumer gone, the current round
    /// still finishes but no further round is started and no
    /// `iteration_end` is emitted.
    pub async fn run<S: EventSink>(&mut self, sink: &mut S) -> Result<RunSummary, SimulationError> {
        if self.phase != RunPhase::Idle {
            return Err(SimulationError::AlreadyStarted(self.phase));
        }
        self.phase = RunPhase::Running;

        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        self.drive(run_id, sink).instrument(span).await
    }

    async fn drive<S: EventSink>(
        &mut self,
        run_id: Uuid,
        sink: &mut S,
    ) -> Result<RunSummary, SimulationError> {
        let threshold = self.settings.min_score_threshold;
        let max_iterations = self.settings.max_iterations;
        let mut state = SimulationRunState {
            iteration_count: 0,
            current_initiator: self.settings.initiator.clone(),
            current_stimulus: self.settings.stimulus.clone(),
            highest_score: MAX_SCORE,
        };
        let mut rounds = Vec::new();

        info!(
            initiator = %state.current_initiator,
            agents = self.orchestrator.roster().len(),
            threshold,
            max_iterations,
            "simulation started"
        );

        let mut connected = sink
            .emit(SimEvent::stimulus(
                state.current_initiator.clone(),
                state.current_stimulus.clone(),
            ))
            .await;

        while connected
            && state.highest_score > threshold
            && state.iteration_count <= max_iterations
        {
            let iteration = state.iteration_count;

            connected &= sink
                .emit(SimEvent::iteration_start(
                    iteration,
                    state.current_initiator.clone(),
                    state.current_stimulus.clone(),
                ))
                .await;

            let snapshot = self.orchestrator.economy().read();
            let responses = self
                .orchestrator
                .raise_round(
                    &state.current_initiator,
                    &state.current_stimulus,
                    &snapshot,
                    iteration,
                )
                .await;

            let mut rows: Vec<_> = responses.iter().map(|r| r.to_row()).collect();
            rows.sort_by(|a, b| b.score.cmp(&a.score));
            if connected {
                connected &= sink.emit(SimEvent::agent_responses(iteration, rows)).await;
            }

            let announcement = self.orchestrator.announce_winners(&responses, iteration).await;
            if connected {
                connected &= sink
                    .emit(SimEvent::agent_announce(
                        iteration,
                        announcement.winning_score,
                        announcement.announced_agents(),
                    ))
                    .await;
            }
            if connected {
                connected &= sink
                    .emit(SimEvent::economic_data(
                        iteration,
                        self.orchestrator.economy().read(),
                    ))
                    .await;
            }

            let round = RoundResult::new(
                iteration,
                state.current_initiator.clone(),
                responses,
                &announcement,
            );
            info!(
                iteration,
                winning_score = round.winning_score,
                winners = ?round.winners,
                fallbacks = round.fallback_count(),
                "round complete"
            );
            rounds.push(round);

            if let Some(leader) = announcement.leader().filter(|l| !l.is_fallback()) {
                state.current_initiator = leader.agent.clone();
                state.current_stimulus = leader.decision.action_detail.clone();
            }
            state.highest_score = announcement.winning_score;
            state.iteration_count += 1;
        }

        let outcome = if connected {
            let reason = if state.iteration_count > max_iterations {
                TerminationReason::ReachedMaxIterations
            } else {
                TerminationReason::BelowScoreThreshold
            };
            sink.emit(SimEvent::iteration_end(
                state.iteration_count.saturating_sub(1),
                state.iteration_count,
                reason,
            ))
            .await;
            self.phase = RunPhase::Terminated(reason);
            info!(total_iterations = state.iteration_count, %reason, "simulation finished");
            RunOutcome::Completed(reason)
        } else {
            self.phase = RunPhase::Abandoned;
            warn!(
                completed_iterations = state.iteration_count,
                "event consumer disconnected, no further rounds scheduled"
            );
            RunOutcome::Disconnected
        };

        let economy = self.orchestrator.economy();
        Ok(RunSummary {
            run_id,
            outcome,
            total_iterations: state.iteration_count,
            fallbacks: rounds.iter().map(RoundResult::fallback_count).sum(),
            rounds,
            committed_updates: economy.committed_updates(),
            rejected_updates: economy.rejected_updates(),
            final_state: economy.read(),
        })
    }
}

/// Runs `simulation` on a background task, streaming events through a
/// bounded channel.
///
/// Dropping the receiver stops the run after the round in flight.
pub fn spawn_stream(
    mut simulation: Simulation,
    buffer: usize,
) -> (
    mpsc::Receiver<SimEvent>,
    JoinHandle<Result<RunSummary, SimulationError>>,
) {
    let (mut tx, rx) = mpsc::channel(buffer.max(1));
    let handle = tokio::spawn(async move { simulation.run(&mut tx).await });
    (rx, handle)
}

/// Waits for a run started by [`spawn_stream`].
pub async fn join_stream(
    handle: JoinHandle<Result<RunSummary, SimulationError>>,
) -> Result<RunSummary, SimulationError> {
    handle
        .await
        .map_err(|e| SimulationError::Task(e.to_string()))?
}
