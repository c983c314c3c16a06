//! Model-backed economic transform.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use negotiation_core::{EconomicTransform, LlmConfig, TransformError, TransformRequest};
use negotiation_events::EconomicState;

use crate::client::{ChatBackend, ChatRequest, ModelParams};
use crate::extract::{excerpt, extract_json_object};
use crate::prompts::{transform_user_message, TRANSFORM_SYSTEM_PROMPT};

/// Asks a chat model for the economy that follows an action.
///
/// Only parses the answer; structural checks against the current state
/// are left to the holder.
pub struct LlmTransform {
    params: ModelParams,
    backend: Arc<dyn ChatBackend>,
}

impl LlmTransform {
    pub fn new(params: ModelParams, backend: Arc<dyn ChatBackend>) -> Self {
        Self { params, backend }
    }

    pub fn from_config(llm: &LlmConfig, backend: Arc<dyn ChatBackend>) -> Self {
        Self::new(ModelParams::from_config(llm, None), backend)
    }
}

#[async_trait]
impl EconomicTransform for LlmTransform {
    async fn transform(&self, request: &TransformRequest) -> Result<EconomicState, TransformError> {
        let chat = ChatRequest::new(
            &self.params,
            TRANSFORM_SYSTEM_PROMPT,
            transform_user_message(request),
        );

        let text = self
            .backend
            .complete(&chat)
            .await
            .map_err(|e| TransformError::Backend(e.to_string()))?;
        debug!(actor = %request.actor, chars = text.len(), "Transform answered");

        let value = extract_json_object(&text).ok_or_else(|| {
            TransformError::Malformed(format!("no JSON object in: {}", excerpt(&text, 200)))
        })?;

        EconomicState::from_value(&value).map_err(|e| TransformError::Malformed(e.to_string()))
    }
}

impl std::fmt::Debug for LlmTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmTransform")
            .field("model", &self.params.model)
            .finish_non_exhaustive()
    }
}
