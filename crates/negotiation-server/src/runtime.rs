//! Wiring configuration to collaborators.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use negotiation_core::{
    offline, Backend, EconomicTransform, Simulation, SimulationConfig, DEFAULT_CONFIG_PATH,
};
use negotiation_llm::{llm_roster, ChatBackend, ChatClient, LlmTransform};

/// Loads configuration.
///
/// An explicit path must exist. Without one, `simulation.toml` in the
/// working directory is used when present, otherwise the defaults.
pub fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    let config = match path {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                SimulationConfig::from_file(default_path)
                    .with_context(|| format!("failed to load {}", DEFAULT_CONFIG_PATH))?
            } else {
                info!("no {} found, using built-in scenario", DEFAULT_CONFIG_PATH);
                SimulationConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

/// Builds a fresh, idle simulation for `config`.
///
/// Each call constructs new agents and a new economy, so runs never share
/// memory or state.
pub fn build_simulation(config: &SimulationConfig) -> Result<Simulation> {
    match config.simulation.backend {
        Backend::Offline => {
            let simulation = Simulation::from_config(
                config,
                offline::seeded_roster(config),
                Arc::new(offline::RuleTransform),
            )?;
            Ok(simulation)
        }
        Backend::Llm => {
            let client = ChatClient::from_config(&config.llm)
                .context("failed to set up the model client")?;
            info!(endpoint = client.endpoint(), model = %config.llm.model, "using model backend");
            let backend: Arc<dyn ChatBackend> = Arc::new(client);
            build_with_backend(config, backend)
        }
    }
}

/// Builds a model-backed simulation on top of an existing chat backend.
pub fn build_with_backend(
    config: &SimulationConfig,
    backend: Arc<dyn ChatBackend>,
) -> Result<Simulation> {
    let agents = llm_roster(&config.agents, &config.llm, backend.clone())?;
    let transform: Arc<dyn EconomicTransform> =
        Arc::new(LlmTransform::from_config(&config.llm, backend));
    Ok(Simulation::from_config(config, agents, transform)?)
}
