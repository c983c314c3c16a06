//! Prompt construction for agents and the economic transform.

use negotiation_core::TransformRequest;
use negotiation_events::{ActionKind, EconomicState};

/// System prompt for the economic transform.
pub const TRANSFORM_SYSTEM_PROMPT: &str = "\
You are an expert in the analysis of world economic impacts.
Given an action and the current economic data, analyse and update every country's economic indicators.
A country's actions affect both itself and other countries; adjust the figures according to sound economic reasoning.

Reference impacts (not mandatory):
- Set/adjust tariffs: own inflation may rise (+0.1 to 0.3), target country GDP may fall (-0.1 to 0.3)
- Impose retaliatory tariffs: own GDP may dip (-0.1), own unemployment may rise (+0.1 to 0.3)
- Form/join a trade alliance: own GDP may rise (+0.1 to 0.3), own unemployment may fall (-0.1)
- Leave a trade alliance: GDP may fall in the short term (-0.1 to 0.2)
- Impose trade restrictions: own unemployment may rise (+0.1), target country GDP may fall (-0.1 to 0.2)
- Provide subsidies: inflation may rise (+0.1), unemployment may fall (-0.1)

Assess the impact of the current action and return the complete updated economic data as JSON.
Keep every country and every indicator from the current data; change values only.

For example:
{
  \"china\": {\"GDP\": 6.8, \"unemployment\": 3.9, \"inflation\": 2.1},
  \"us\": {\"GDP\": 3.5, \"unemployment\": 4.2, \"inflation\": 2.8}
}
";

/// Builds an agent's system prompt from its persona.
///
/// The persona is followed by the strategy vocabulary and the required
/// response shape.
pub fn agent_system_prompt(persona: &str) -> String {
    let mut prompt = String::with_capacity(persona.len() + 1024);
    prompt.push_str(persona.trim_end());

    prompt.push_str("\n\n<strategies>\nAction\tDescription\n");
    for kind in ActionKind::all() {
        prompt.push_str(kind.label());
        prompt.push('\t');
        prompt.push_str(kind.description());
        prompt.push('\n');
    }
    prompt.push_str("</strategies>\n\n");

    prompt.push_str(
        "<response>\n\
         Reply with a single JSON object:\n\
         {\n\
         \x20   \"score\": \"willingness to act, an integer from 0 to 100\",\n\
         \x20   \"action\": \"the action name that best fits your position\",\n\
         \x20   \"action_detail\": \"the concrete content of the action\"\n\
         }\n\
         </response>\n",
    );

    prompt
}

/// User message for an agent: the current state followed by the
/// (already memory-enriched) stimulus.
pub fn agent_user_message(stimulus: &str, state: &EconomicState) -> String {
    if state.is_empty() {
        return stimulus.to_string();
    }
    format!("Current state:\n{}\n\n{}", state.render(), stimulus)
}

/// User message for the economic transform.
pub fn transform_user_message(request: &TransformRequest) -> String {
    format!(
        "{}\n\nAnalyse the impact of this action on each country's economic indicators and return the complete updated economic data.",
        request.render()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_prompt_lists_vocabulary() {
        let prompt = agent_system_prompt("You represent Canada.\n");

        assert!(prompt.starts_with("You represent Canada.\n\n<strategies>"));
        for kind in ActionKind::all() {
            assert!(prompt.contains(kind.label()), "missing {}", kind.label());
        }
        assert!(prompt.contains("\"action_detail\""));
    }

    #[test]
    fn test_agent_message_puts_state_first() {
        let state = EconomicState::new().with_entity("us", [("GDP", 21.0)]);
        let message = agent_user_message("tariffs announced", &state);

        assert!(message.starts_with("Current state:\n"));
        assert!(message.ends_with("\n\ntariffs announced"));
        assert!(message.contains(&state.render()));
    }

    #[test]
    fn test_agent_message_without_state() {
        assert_eq!(agent_user_message("hello", &EconomicState::new()), "hello");
    }

    #[test]
    fn test_transform_message_includes_request() {
        let request = TransformRequest {
            actor: "us".into(),
            action: "Wait and see".into(),
            action_detail: "hold".into(),
            current: EconomicState::new().with_entity("us", [("GDP", 21.0)]),
        };
        let message = transform_user_message(&request);
        assert!(message.starts_with(&request.render()));
        assert!(message.contains("complete updated economic data"));
    }
}
