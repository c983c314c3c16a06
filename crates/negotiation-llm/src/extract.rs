//! Pulling a JSON object out of free-form model output.

use serde_json::Value;

/// Finds the first JSON object in `text`.
///
/// Models often wrap their answer in a fenced code block or surround it
/// with prose. Candidates are tried in order: the whole text, the body of
/// each fenced block, then the span from the first `{` to the last `}`.
/// Only objects are accepted.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Some(value) = parse_object(trimmed) {
        return Some(value);
    }

    // Odd segments of a split on fences are block bodies
    for block in trimmed.split("```").skip(1).step_by(2) {
        let body = strip_language_tag(block);
        if let Some(value) = parse_object(body) {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&trimmed[start..=end])
}

fn parse_object(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(Value::is_object)
}

fn strip_language_tag(block: &str) -> &str {
    let block = block.trim_start();
    let lowered = block.get(..4).map(str::to_ascii_lowercase);
    if lowered.as_deref() == Some("json") {
        block[4..].trim()
    } else {
        block.trim()
    }
}

/// Shortens model output for error messages.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    }
}
