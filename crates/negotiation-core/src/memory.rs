//! Memory Store
//!
//! Per-agent append-only logs of past stimuli and executed actions. The
//! rendered log is appended to every stimulus an agent receives, so agents
//! react with the history of the negotiation in view.

use std::collections::HashMap;

use negotiation_events::{AgentId, MemoryEntry};

/// Default number of characters of each past message shown to agents.
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

/// Append-only memory logs keyed by agent.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    logs: HashMap<AgentId, Vec<MemoryEntry>>,
    preview_chars: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_CHARS)
    }
}

impl MemoryStore {
    /// Creates an empty store that previews at most `preview_chars`
    /// characters of each entry.
    pub fn new(preview_chars: usize) -> Self {
        Self {
            logs: HashMap::new(),
            preview_chars,
        }
    }

    /// Appends an entry to an agent's log.
    ///
    /// Entries must arrive in non-decreasing iteration order; an entry
    /// older than the agent's latest one is refused.
    pub fn append(&mut self, agent: &str, entry: MemoryEntry) -> Result<(), MemoryOrderError> {
        let log = self.logs.entry(agent.to_string()).or_default();
        if let Some(last) = log.last() {
            if entry.iteration < last.iteration {
                return Err(MemoryOrderError {
                    agent: agent.to_string(),
                    latest: last.iteration,
                    attempted: entry.iteration,
                });
            }
        }
        log.push(entry);
        Ok(())
    }

    /// An agent's log, oldest first.
    pub fn entries(&self, agent: &str) -> &[MemoryEntry] {
        self.logs.get(agent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total entries across all agents.
    pub fn total_entries(&self) -> usize {
        self.logs.values().map(Vec::len).sum()
    }

    /// Renders an agent's log as a transcript block.
    ///
    /// Empty when the agent remembers nothing.
    pub fn render_transcript(&self, agent: &str) -> String {
        let entries = self.entries(agent);
        if entries.is_empty() {
            return String::new();
        }

        let lines: Vec<String> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                format!(
                    "Iteration {}: {} said: {}",
                    i + 1,
                    entry.initiator,
                    entry.preview(self.preview_chars)
                )
            })
            .collect();

        format!("\n\nInteraction history:\n{}", lines.join("\n"))
    }

    /// Stimulus as seen by `agent`: the raw content followed by its transcript.
    pub fn enrich(&self, agent: &str, content: &str) -> String {
        format!("{}{}", content, self.render_transcript(agent))
    }
}

/// An append that would break the iteration ordering of a log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("memory for {agent} is at iteration {latest}, refusing entry for iteration {attempted}")]
pub struct MemoryOrderError {
    pub agent: AgentId,
    pub latest: u32,
    pub attempted: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_agent_has_no_transcript() {
        let store = MemoryStore::default();
        assert_eq!(store.render_transcript("us"), "");
        assert_eq!(store.enrich("us", "tariffs"), "tariffs");
        assert!(store.entries("us").is_empty());
    }

    #[test]
    fn test_transcript_format() {
        let mut store = MemoryStore::default();
        store.append("china", MemoryEntry::new("us", "10% tariffs", 0)).unwrap();
        store
            .append("china", MemoryEntry::new("canada", "canada executed: Negotiate, detail: talks", 0))
            .unwrap();

        assert_eq!(
            store.render_transcript("china"),
            "\n\nInteraction history:\nIteration 1: us said: 10% tariffs\nIteration 2: canada said: canada executed: Negotiate, detail: talks"
        );
    }

    #[test]
    fn test_enrich_truncates_long_entries() {
        let mut store = MemoryStore::new(10);
        store.append("us", MemoryEntry::new("china", "a".repeat(30), 0)).unwrap();

        let enriched = store.enrich("us", "new stimulus");
        assert!(enriched.starts_with("new stimulus\n\nInteraction history:\n"));
        assert!(enriched.ends_with(&format!("{}...", "a".repeat(10))));
    }

    #[test]
    fn test_append_refuses_older_iteration() {
        let mut store = MemoryStore::default();
        store.append("us", MemoryEntry::new("china", "x", 2)).unwrap();
        store.append("us", MemoryEntry::new("china", "y", 2)).unwrap();

        let err = store.append("us", MemoryEntry::new("china", "z", 1)).unwrap_err();
        assert_eq!(err.latest, 2);
        assert_eq!(err.attempted, 1);
        assert_eq!(store.entries("us").len(), 2);
    }

    #[test]
    fn test_logs_are_per_agent() {
        let mut store = MemoryStore::default();
        store.append("us", MemoryEntry::new("china", "x", 0)).unwrap();
        store.append("canada", MemoryEntry::new("china", "x", 0)).unwrap();
        store.append("canada", MemoryEntry::new("us", "y", 1)).unwrap();

        assert_eq!(store.entries("us").len(), 1);
        assert_eq!(store.entries("canada").len(), 2);
        assert_eq!(store.total_entries(), 3);
    }
}
