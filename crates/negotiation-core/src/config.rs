//! Configuration loading for a negotiation run.
//!
//! Everything a run needs is read from one TOML file: loop limits, the
//! opening stimulus, the starting economy, the roster and the settings of
//! the model backend and HTTP server. Missing sections fall back to the
//! trade-war scenario the engine ships with.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use negotiation_events::EconomicState;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "simulation.toml";

/// Complete run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Loop limits and backend choice
    #[serde(default)]
    pub simulation: RunConfig,
    /// Opening stimulus
    #[serde(default)]
    pub stimulus: StimulusConfig,
    /// Starting economy, entity -> indicator -> value
    #[serde(default = "default_economy")]
    pub economy: EconomicState,
    /// Roster in declaration order
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentConfig>,
    /// Model backend settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            simulation: RunConfig::default(),
            stimulus: StimulusConfig::default(),
            economy: default_economy(),
            agents: default_agents(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Relative `persona_file` paths are resolved against the directory
    /// containing the configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;

        if let Some(base) = path.parent() {
            for agent in &mut config.agents {
                if let Some(file) = agent.persona_file.as_mut() {
                    if file.is_relative() {
                        *file = base.join(&*file);
                    }
                }
            }
        }

        Ok(config)
    }

    /// Parses configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes the configuration back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks everything a run relies on before the first round.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.min_score_threshold > negotiation_events::MAX_SCORE {
            return Err(ConfigError::ThresholdOutOfRange(
                self.simulation.min_score_threshold,
            ));
        }
        if self.simulation.decision_timeout_secs == 0 {
            return Err(ConfigError::ZeroDecisionTimeout);
        }
        if self.llm.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        if self.stimulus.initiator.trim().is_empty() {
            return Err(ConfigError::BlankInitiator);
        }

        if self.economy.is_empty() {
            return Err(ConfigError::EmptyEconomy);
        }
        for (entity, indicators) in self.economy.entities() {
            if indicators.is_empty() {
                return Err(ConfigError::EntityWithoutIndicators(entity.clone()));
            }
            if let Some((name, _)) = indicators.iter().find(|(_, v)| !v.is_finite()) {
                return Err(ConfigError::NonFiniteIndicator {
                    entity: entity.clone(),
                    indicator: name.clone(),
                });
            }
        }

        if self.agents.is_empty() {
            return Err(ConfigError::EmptyRoster);
        }
        for (i, agent) in self.agents.iter().enumerate() {
            if agent.id.trim().is_empty() {
                return Err(ConfigError::BlankAgentId);
            }
            if self.agents[..i].iter().any(|other| other.id == agent.id) {
                return Err(ConfigError::DuplicateAgent(agent.id.clone()));
            }
            if agent.persona.is_some() && agent.persona_file.is_some() {
                return Err(ConfigError::ConflictingPersona(agent.id.clone()));
            }
            if let Some(file) = &agent.persona_file {
                if !file.is_file() {
                    return Err(ConfigError::MissingPersonaFile(file.clone()));
                }
            }
        }

        Ok(())
    }

    /// Agent ids in declaration order.
    pub fn agent_ids(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.id.clone()).collect()
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_secs(self.simulation.decision_timeout_secs)
    }
}

/// Loop limits and backend choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// The loop continues only while the last winning score is above this
    pub min_score_threshold: u8,
    /// Highest iteration index that may run; iterations 0..=max run at most
    pub max_iterations: u32,
    /// Per-agent decision limit; expiry counts as a failed decision
    pub decision_timeout_secs: u64,
    /// Characters of each past message shown in an agent's transcript
    pub memory_preview_chars: usize,
    /// Which collaborators drive agents and the economy
    pub backend: Backend,
    /// Seed for the offline backend
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: 50,
            max_iterations: 5,
            decision_timeout_secs: 120,
            memory_preview_chars: crate::memory::DEFAULT_PREVIEW_CHARS,
            backend: Backend::Llm,
            seed: 42,
        }
    }
}

/// Source of agent decisions and economic transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// OpenAI-compatible chat completions
    #[default]
    Llm,
    /// Seeded random agents and the rule-based transform
    Offline,
}

/// The stimulus that opens iteration 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusConfig {
    /// Usually a roster member, who then sits out the first round; any
    /// other id acts as an external source
    pub initiator: String,
    pub content: String,
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self {
            initiator: "us".to_string(),
            content: DEFAULT_STIMULUS.to_string(),
        }
    }
}

const DEFAULT_STIMULUS: &str = "The US President signs an executive order imposing a 10% tariff on all trading partners, with higher reciprocal tariffs on the countries and regions running the largest trade surpluses with the United States.";

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    /// Inline persona text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    /// Persona text read from a file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_file: Option<PathBuf>,
    /// Overrides `llm.model` for this agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AgentConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            persona: None,
            persona_file: None,
            model: None,
        }
    }

    /// Persona text for this agent.
    ///
    /// Inline text wins, then the persona file, then the bundled persona
    /// for the id. Unknown ids get a one-line generic persona.
    pub fn resolve_persona(&self) -> Result<String, ConfigError> {
        if let Some(text) = &self.persona {
            return Ok(text.clone());
        }
        if let Some(path) = &self.persona_file {
            return std::fs::read_to_string(path).map_err(|source| ConfigError::PersonaFile {
                path: path.clone(),
                source,
            });
        }
        Ok(builtin_persona(&self.id)
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "You represent {}. Respond to every development from its own perspective and interests.",
                    self.id
                )
            }))
    }
}

/// Bundled persona text for the default roster.
pub fn builtin_persona(id: &str) -> Option<&'static str> {
    match id {
        "us" => Some(include_str!("../personas/us.md")),
        "china" => Some(include_str!("../personas/china.md")),
        "canada" => Some(include_str!("../personas/canada.md")),
        "vietnam" => Some(include_str!("../personas/vietnam.md")),
        _ => None,
    }
}

/// OpenAI-compatible backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL up to and including the API version segment
    pub api_base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Default model for agents and the economic transform
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Whole-request limit for one completion
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            request_timeout_secs: 120,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6010,
        }
    }
}

fn default_economy() -> EconomicState {
    EconomicState::new()
        .with_entity(
            "us",
            [("GDP", 21.0), ("unemployment", 5.5), ("inflation", 3.5)],
        )
        .with_entity(
            "china",
            [("GDP", 18.0), ("unemployment", 5.2), ("inflation", 2.1)],
        )
        .with_entity(
            "canada",
            [("GDP", 2.1), ("unemployment", 5.5), ("inflation", 4.2)],
        )
        .with_entity(
            "vietnam",
            [("GDP", 0.4), ("unemployment", 2.3), ("inflation", 3.8)],
        )
}

fn default_agents() -> Vec<AgentConfig> {
    ["us", "china", "canada", "vietnam"]
        .into_iter()
        .map(AgentConfig::new)
        .collect()
}

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("roster is empty")]
    EmptyRoster,
    #[error("agent id must not be blank")]
    BlankAgentId,
    #[error("agent {0} is declared more than once")]
    DuplicateAgent(String),
    #[error("agent {0} sets both persona and persona_file")]
    ConflictingPersona(String),
    #[error("persona file {} does not exist", .0.display())]
    MissingPersonaFile(PathBuf),
    #[error("cannot read persona file {}: {source}", path.display())]
    PersonaFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("initial economy has no entities")]
    EmptyEconomy,
    #[error("entity {0} has no indicators")]
    EntityWithoutIndicators(String),
    #[error("indicator {indicator} of {entity} is not a finite number")]
    NonFiniteIndicator { entity: String, indicator: String },
    #[error("min_score_threshold {0} is outside 0..=100")]
    ThresholdOutOfRange(u8),
    #[error("decision_timeout_secs must be greater than zero")]
    ZeroDecisionTimeout,
    #[error("llm.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,
    #[error("stimulus initiator must not be blank")]
    BlankInitiator,
}

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    format!(
        r#"# Negotiation Simulation Configuration

[simulation]
min_score_threshold = 50
max_iterations = 5
decision_timeout_secs = 120
memory_preview_chars = 100
backend = "llm"
seed = 42

[stimulus]
initiator = "us"
content = "{stimulus}"

[economy.us]
GDP = 21.0
unemployment = 5.5
inflation = 3.5

[economy.china]
GDP = 18.0
unemployment = 5.2
inflation = 2.1

[economy.canada]
GDP = 2.1
unemployment = 5.5
inflation = 4.2

[economy.vietnam]
GDP = 0.4
unemployment = 2.3
inflation = 3.8

# Agents without persona or persona_file use the bundled persona for their id.
[[agents]]
id = "us"

[[agents]]
id = "china"

[[agents]]
id = "canada"

[[agents]]
id = "vietnam"

[llm]
api_base_url = "https://api.openai.com/v1"
api_key_env = "OPENAI_API_KEY"
model = "gpt-4o-mini"
temperature = 0.7
max_tokens = 1024
request_timeout_secs = 120

[server]
host = "0.0.0.0"
port = 6010
"#,
        stimulus = DEFAULT_STIMULUS
    )
}
