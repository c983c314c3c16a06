//! Round orchestration engine for the negotiation simulation.
//!
//! A run raises a stimulus to every agent except its initiator, keeps the
//! highest-scoring answers, lets the winners act on a shared economy and
//! feeds the leading winner's action back in as the next stimulus, until
//! the scores fall to the threshold or the iteration budget runs out.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  rounds   ┌───────────────────┐  fan-out  ┌──────────┐
//! │ Simulation │ ────────▶ │ RoundOrchestrator │ ────────▶ │ Agent ×N │
//! └─────┬──────┘           └─────────┬─────────┘           └──────────┘
//!       │ SimEvent stream            │ winners
//!       ▼                            ▼
//!   EventSink            MemoryStore + EconomyHolder ──▶ EconomicTransform
//! ```
//!
//! # Modules
//!
//! - [`agent`]: The agent capability and the fixed roster
//! - [`memory`]: Per-agent append-only memory and transcript rendering
//! - [`economy`]: The economic state holder with validate-then-commit updates
//! - [`round`]: One round: fan-out, join, winner selection, side effects
//! - [`simulation`]: The termination loop and event emission
//! - [`config`]: TOML configuration
//! - [`logger`]: JSONL event log
//! - [`offline`]: Seeded agents and a rule-based transform

pub mod agent;
pub mod config;
pub mod economy;
pub mod logger;
pub mod memory;
pub mod offline;
pub mod round;
pub mod simulation;

// Re-export agent types
pub use agent::{Agent, AgentError, Roster};

// Re-export config types
pub use config::{
    builtin_persona, default_config_toml, AgentConfig, Backend, ConfigError, LlmConfig,
    RunConfig, ServerConfig, SimulationConfig, StimulusConfig, DEFAULT_CONFIG_PATH,
};

// Re-export economy types
pub use economy::{
    validate_candidate, ApplyOutcome, EconomicTransform, EconomyHolder, TransformError,
    TransformRequest, UpdateRejection, ValidationError,
};

// Re-export memory types
pub use memory::{MemoryOrderError, MemoryStore, DEFAULT_PREVIEW_CHARS};

// Re-export round types
pub use round::{AgentResponse, Announcement, RoundOrchestrator, RoundResult};

// Re-export simulation types
pub use simulation::{
    join_stream, spawn_stream, EventSink, RunOutcome, RunPhase, RunSummary, Simulation,
    SimulationError, SimulationRunState, SimulationSettings,
};

pub use logger::EventLogger;
pub use offline::{seeded_roster, RuleTransform, SeededAgent};
