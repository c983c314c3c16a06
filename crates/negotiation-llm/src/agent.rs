//! Model-backed agents.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use negotiation_core::{Agent, AgentConfig, AgentError, ConfigError, LlmConfig};
use negotiation_events::{AgentId, Decision, EconomicState};

use crate::client::{ChatBackend, ChatRequest, ModelParams};
use crate::extract::{excerpt, extract_json_object};
use crate::prompts::{agent_system_prompt, agent_user_message};

/// Longest slice of raw model output quoted in an error.
const ERROR_EXCERPT_CHARS: usize = 200;

/// An agent whose decisions come from a chat model guided by a persona.
pub struct LlmAgent {
    id: AgentId,
    system_prompt: String,
    params: ModelParams,
    backend: Arc<dyn ChatBackend>,
}

impl LlmAgent {
    pub fn new(
        id: impl Into<AgentId>,
        persona: &str,
        params: ModelParams,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            id: id.into(),
            system_prompt: agent_system_prompt(persona),
            params,
            backend,
        }
    }

    /// Builds an agent from its roster entry, resolving its persona.
    pub fn from_config(
        agent: &AgentConfig,
        llm: &LlmConfig,
        backend: Arc<dyn ChatBackend>,
    ) -> Result<Self, ConfigError> {
        let persona = agent.resolve_persona()?;
        Ok(Self::new(
            agent.id.clone(),
            &persona,
            ModelParams::from_config(llm, agent.model.as_deref()),
            backend,
        ))
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn model(&self) -> &str {
        &self.params.model
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn decide(&self, stimulus: &str, state: &EconomicState) -> Result<Decision, AgentError> {
        let request = ChatRequest::new(
            &self.params,
            self.system_prompt.clone(),
            agent_user_message(stimulus, state),
        );

        let text = self
            .backend
            .complete(&request)
            .await
            .map_err(|e| AgentError::Backend(e.to_string()))?;
        debug!(agent = %self.id, chars = text.len(), "Model answered");

        let value = extract_json_object(&text).ok_or_else(|| {
            AgentError::Unparsable(format!(
                "no JSON object in: {}",
                excerpt(&text, ERROR_EXCERPT_CHARS)
            ))
        })?;

        Decision::from_value(&value).map_err(|e| AgentError::Unparsable(e.to_string()))
    }
}

impl std::fmt::Debug for LlmAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmAgent")
            .field("id", &self.id)
            .field("model", &self.params.model)
            .finish_non_exhaustive()
    }
}

/// Model-backed agents for every roster entry, in roster order.
pub fn llm_roster(
    agents: &[AgentConfig],
    llm: &LlmConfig,
    backend: Arc<dyn ChatBackend>,
) -> Result<Vec<Arc<dyn Agent>>, ConfigError> {
    agents
        .iter()
        .map(|agent| {
            LlmAgent::from_config(agent, llm, backend.clone()).map(|a| Arc::new(a) as Arc<dyn Agent>)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LlmError;
    use std::sync::Mutex;

    /// Returns canned completions and records the requests it saw.
    struct Canned {
        reply: Result<String, u16>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl Canned {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn status(code: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(code),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for Canned {
        async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(LlmError::Status {
                    status: *status,
                    body: "rate limited".into(),
                }),
            }
        }
    }

    fn agent(backend: Arc<Canned>) -> LlmAgent {
        LlmAgent::new(
            "canada",
            "You represent Canada.",
            ModelParams::from_config(&LlmConfig::default(), None),
            backend,
        )
    }

    fn state() -> EconomicState {
        EconomicState::new().with_entity("canada", [("GDP", 2.1)])
    }

    #[tokio::test]
    async fn test_decision_from_fenced_reply() {
        let backend = Canned::ok(
            "```json\n{\"score\": \"75\", \"action\": \"Initiate/respond to negotiation\", \"action_detail\": \"talks with us\"}\n```",
        );
        let decision = agent(backend.clone()).decide("tariffs", &state()).await.unwrap();

        assert_eq!(
            decision,
            Decision::new(75, "Initiate/respond to negotiation", "talks with us")
        );

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].role, "system");
        assert!(requests[0].messages[1]
            .content
            .as_deref()
            .unwrap()
            .ends_with("tariffs"));
    }

    #[tokio::test]
    async fn test_prose_reply_is_unparsable() {
        let err = agent(Canned::ok("I would rather not say."))
            .decide("tariffs", &state())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Unparsable(msg) if msg.contains("rather not say")));
    }

    #[tokio::test]
    async fn test_reply_without_score_keeps_action_at_zero() {
        let decision = agent(Canned::ok(r#"{"action": "Wait and see", "action_detail": "hold"}"#))
            .decide("tariffs", &state())
            .await
            .unwrap();
        assert_eq!(decision, Decision::new(0, "Wait and see", "hold"));
    }

    #[tokio::test]
    async fn test_non_text_action_is_unparsable() {
        let err = agent(Canned::ok(r#"{"score": 60, "action": ["tariffs"]}"#))
            .decide("tariffs", &state())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Unparsable(_)));
    }

    #[tokio::test]
    async fn test_backend_failure_maps_to_backend_error() {
        let err = agent(Canned::status(429))
            .decide("tariffs", &state())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Backend(msg) if msg.contains("429")));
    }

    #[test]
    fn test_roster_follows_config() {
        let mut custom = AgentConfig::new("mexico");
        custom.persona = Some("You represent Mexico.".into());
        custom.model = Some("local-model".into());
        let agents = vec![AgentConfig::new("us"), custom];

        let roster = llm_roster(&agents, &LlmConfig::default(), Canned::ok("{}")).unwrap();
        let ids: Vec<&str> = roster.iter().map(|a| a.id()).collect();
        assert_eq!(ids, vec!["us", "mexico"]);

        let mexico = LlmAgent::from_config(&agents[1], &LlmConfig::default(), Canned::ok("{}")).unwrap();
        assert_eq!(mexico.model(), "local-model");
        assert!(mexico.system_prompt().starts_with("You represent Mexico."));
    }
}
