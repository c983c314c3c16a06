//! Chat-model collaborators for the negotiation simulation.
//!
//! Provides an [`Agent`](negotiation_core::Agent) and an
//! [`EconomicTransform`](negotiation_core::EconomicTransform) backed by an
//! OpenAI-compatible chat completions endpoint.
//!
//! # Modules
//!
//! - [`client`]: HTTP client and the [`ChatBackend`] seam
//! - [`extract`]: Finding a JSON object in model output
//! - [`prompts`]: System and user messages
//! - [`agent`]: Persona-driven agents
//! - [`transform`]: Model-mediated economic updates

pub mod agent;
pub mod client;
pub mod extract;
pub mod prompts;
pub mod transform;

// Re-export client types
pub use client::{ChatBackend, ChatClient, ChatMessage, ChatRequest, LlmError, ModelParams};

pub use agent::{llm_roster, LlmAgent};
pub use extract::extract_json_object;
pub use transform::LlmTransform;
