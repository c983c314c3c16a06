//! Memory entry type.

use serde::{Deserialize, Serialize};

use crate::AgentId;

/// One remembered event in an agent's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Who raised the stimulus or executed the action
    pub initiator: AgentId,
    /// What was said or done
    pub content: String,
    /// Iteration in which the entry was recorded
    pub iteration: u32,
}

impl MemoryEntry {
    pub fn new(initiator: impl Into<AgentId>, content: impl Into<String>, iteration: u32) -> Self {
        Self {
            initiator: initiator.into(),
            content: content.into(),
            iteration,
        }
    }

    /// Returns the first `max_chars` characters of the content, with `...`
    /// appended when anything was cut.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}
