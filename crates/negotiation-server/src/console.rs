//! Console Output
//!
//! Human-readable rendering of the event stream for `run`, with an
//! optional JSONL copy of every event.

use async_trait::async_trait;
use std::io::Write;
use tracing::warn;

use negotiation_core::{EventLogger, EventSink};
use negotiation_events::{EconomicState, EventPayload, ResponseRow, SimEvent};

/// Widest action detail shown in the response table.
pub const DETAIL_WIDTH: usize = 40;

/// Shortens `text` to `max_chars`, ending in `...` when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("...");
    cut
}

/// Renders one event as console text.
pub fn render_event(event: &SimEvent) -> String {
    match &event.payload {
        EventPayload::Stimulus(stimulus) => {
            format!("Stimulus from {}:\n{}\n", stimulus.source, stimulus.content)
        }
        EventPayload::IterationStart(start) => format!(
            "\n=== {} ===\nInitiator: {}\n{}\n",
            start.iteration_text, start.initiator, start.content
        ),
        EventPayload::AgentResponses(data) => render_table(&data.responses),
        EventPayload::AgentAnnounce(announce) => {
            if announce.agents.is_empty() {
                return "No agent responded this round\n".to_string();
            }
            let mut out = String::new();
            for agent in &announce.agents {
                out.push_str(&format!(
                    "Executed (score {}): {} - {}: {}\n",
                    announce.score, agent.agent, agent.action, agent.action_detail
                ));
            }
            out
        }
        EventPayload::EconomicData(state) => render_economy(state),
        EventPayload::IterationEnd(end) => format!(
            "\nSimulation finished after {} iteration(s): {}\n",
            end.total_iterations, end.termination_reason
        ),
    }
}

fn render_table(rows: &[ResponseRow]) -> String {
    let mut out = format!(
        "{:<12} {:>5}  {:<34} {}\n",
        "Agent", "Score", "Action", "Detail"
    );
    out.push_str(&format!("{}\n", "-".repeat(12 + 1 + 5 + 2 + 34 + 1 + DETAIL_WIDTH)));
    for row in rows {
        let action = if row.fallback {
            "(no decision)".to_string()
        } else {
            row.action.clone()
        };
        out.push_str(&format!(
            "{:<12} {:>5}  {:<34} {}\n",
            row.agent,
            row.score,
            action,
            truncate(&row.action_detail, DETAIL_WIDTH)
        ));
    }
    out
}

fn render_economy(state: &EconomicState) -> String {
    let mut out = String::from("Economic data:\n");
    for line in state.render().lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Prints events to a writer and mirrors them into an event log.
pub struct ConsoleSink<W: Write + Send> {
    out: W,
    logger: EventLogger,
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, logger: EventLogger) -> Self {
        Self { out, logger }
    }

    pub fn logger(&self) -> &EventLogger {
        &self.logger
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> EventSink for ConsoleSink<W> {
    async fn emit(&mut self, event: SimEvent) -> bool {
        if let Err(e) = self.logger.log(&event) {
            warn!(error = %e, "failed to write event log");
        }
        // A closed console is not a reason to stop the run
        if let Err(e) = self.out.write_all(render_event(&event).as_bytes()) {
            warn!(error = %e, "failed to write console output");
        }
        true
    }
}
