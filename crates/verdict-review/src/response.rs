//! Extraction of the review text from whatever the agent sent back.
//!
//! The agent's `/run` reply has no fixed schema. Four shapes are recognized:
//!
//! 1. a bare list of events, where the most recent event with text wins;
//! 2. an object with an `events` list, scanned newest-first;
//! 3. a single message object with `content.parts[0].text`;
//! 4. anything else, which is posted as pretty-printed JSON.
//!
//! Only an empty reply (or an event list with no text at all) yields `None`.

use serde_json::Value;

/// Maximum characters of a raw response kept for error reports.
pub const SNAPSHOT_CHARS: usize = 1000;

/// A parsed `/run` reply, classified by shape.
///
/// # Examples
///
/// ```
/// use verdict_review::response::AgentResponse;
///
/// let response = AgentResponse::from_body(r#"{"content": {"parts": [{"text": "ok"}]}}"#);
/// assert_eq!(response.extract_text().as_deref(), Some("ok"));
///
/// assert_eq!(AgentResponse::from_body("null").extract_text(), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum AgentResponse {
    /// Empty body or JSON `null`.
    Empty,
    /// A top-level JSON array of events.
    Events(Vec<Value>),
    /// An object carrying an `events` array.
    Envelope { events: Vec<Value>, raw: Value },
    /// An object whose `content.parts[0].text` is a non-empty string.
    Message(String),
    /// A body that was not JSON, or a bare JSON string.
    Text(String),
    /// Valid JSON in no recognized shape.
    Unrecognized(Value),
}

impl AgentResponse {
    /// Classify a raw response body. Non-JSON bodies are kept as text.
    pub fn from_body(body: &str) -> Self {
        if body.trim().is_empty() {
            return Self::Empty;
        }
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::from_value(value),
            Err(_) => Self::Text(body.to_string()),
        }
    }

    /// Classify an already parsed JSON value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::Array(events) => Self::Events(events),
            Value::String(text) if text.is_empty() => Self::Empty,
            Value::String(text) => Self::Text(text),
            Value::Object(map) => {
                let raw = Value::Object(map);
                if let Some(events) = raw.get("events").and_then(Value::as_array) {
                    let events = events.clone();
                    return Self::Envelope { events, raw };
                }
                if let Some(text) = message_text(&raw).map(str::to_string) {
                    return Self::Message(text);
                }
                Self::Unrecognized(raw)
            }
            other => Self::Unrecognized(other),
        }
    }

    /// Pick the single text to post, or `None` when there is nothing to say.
    ///
    /// A returned string is never empty.
    pub fn extract_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Events(events) => events
                .iter()
                .filter_map(message_text)
                .filter(|text| !text.trim().is_empty())
                .last()
                .map(str::to_string),
            Self::Envelope { events, raw } => events
                .iter()
                .rev()
                .find_map(message_text)
                .or_else(|| message_text(raw))
                .map(str::to_string)
                .or_else(|| Some(pretty(raw))),
            Self::Message(text) => Some(text.clone()),
            Self::Text(text) => Some(text.clone()),
            Self::Unrecognized(raw) => Some(pretty(raw)),
        }
    }

    /// Compact JSON rendering of the response, cut to `max_chars` characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use verdict_review::response::AgentResponse;
    ///
    /// let response = AgentResponse::from_body("[]");
    /// assert_eq!(response.snapshot(1000), "[]");
    /// ```
    pub fn snapshot(&self, max_chars: usize) -> String {
        let rendered = match self {
            Self::Empty => "null".to_string(),
            Self::Events(events) => Value::Array(events.clone()).to_string(),
            Self::Envelope { raw, .. } | Self::Unrecognized(raw) => raw.to_string(),
            Self::Message(text) | Self::Text(text) => Value::String(text.clone()).to_string(),
        };
        truncate_chars(&rendered, max_chars)
    }
}

/// `content.parts[0].text` of an event or message, when it is a non-empty string.
fn message_text(value: &Value) -> Option<&str> {
    value
        .get("content")?
        .get("parts")?
        .as_array()?
        .first()?
        .get("text")?
        .as_str()
        .filter(|text| !text.is_empty())
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Cut `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(text: Option<&str>) -> Value {
        match text {
            Some(t) => json!({ "author": "reviewer", "content": { "role": "model", "parts": [{ "text": t }] } }),
            None => json!({ "author": "reviewer", "actions": {} }),
        }
    }

    #[test]
    fn event_list_last_non_blank_wins() {
        let events = vec![
            event(None),
            event(Some("first draft")),
            event(Some("   ")),
            event(None),
            event(Some("final review")),
            event(Some("\n\t")),
        ];
        let response = AgentResponse::from_value(Value::Array(events));
        assert!(matches!(response, AgentResponse::Events(_)));
        assert_eq!(response.extract_text().as_deref(), Some("final review"));
    }

    #[test]
    fn event_list_without_text_is_none() {
        let response = AgentResponse::from_value(json!([
            { "content": { "parts": [] } },
            { "content": { "parts": [{ "functionCall": { "name": "lint" } }] } },
            { "content": { "parts": [{ "text": "  " }] } },
            "not an event"
        ]));
        assert_eq!(response.extract_text(), None);
    }

    #[test]
    fn event_list_only_reads_first_part() {
        let response = AgentResponse::from_value(json!([
            { "content": { "parts": [{ "functionCall": {} }, { "text": "hidden" }] } }
        ]));
        assert_eq!(response.extract_text(), None);
    }

    #[test]
    fn envelope_scans_newest_first() {
        let response = AgentResponse::from_value(json!({
            "events": [event(None), event(Some("middle")), event(None)]
        }));
        assert!(matches!(response, AgentResponse::Envelope { .. }));
        assert_eq!(response.extract_text().as_deref(), Some("middle"));

        let response = AgentResponse::from_value(json!({
            "events": [event(Some("older")), event(Some("newer")), event(None)]
        }));
        assert_eq!(response.extract_text().as_deref(), Some("newer"));
    }

    #[test]
    fn envelope_keeps_whitespace_only_text() {
        let response = AgentResponse::from_value(json!({
            "events": [event(Some("older")), event(Some(" "))]
        }));
        assert_eq!(response.extract_text().as_deref(), Some(" "));
    }

    #[test]
    fn envelope_without_text_falls_back_to_content_then_dump() {
        let response = AgentResponse::from_value(json!({
            "events": [],
            "content": { "parts": [{ "text": "summary" }] }
        }));
        assert_eq!(response.extract_text().as_deref(), Some("summary"));

        let response = AgentResponse::from_value(json!({ "events": [event(None)] }));
        let text = response.extract_text().unwrap();
        assert!(text.starts_with("{\n  \"events\": ["));
    }

    #[test]
    fn single_message_returns_text() {
        let response = AgentResponse::from_value(json!({ "content": { "parts": [{ "text": "ok" }] } }));
        assert_eq!(response, AgentResponse::Message("ok".into()));
        assert_eq!(response.extract_text().as_deref(), Some("ok"));
    }

    #[test]
    fn null_is_none_and_empty_object_is_dumped() {
        assert_eq!(AgentResponse::from_value(Value::Null).extract_text(), None);

        let text = AgentResponse::from_value(json!({})).extract_text();
        assert_eq!(text.as_deref(), Some("{}"));
    }

    #[test]
    fn unrecognized_object_is_pretty_printed() {
        let response = AgentResponse::from_value(json!({ "detail": "Session not found" }));
        assert_eq!(
            response.extract_text().as_deref(),
            Some("{\n  \"detail\": \"Session not found\"\n}")
        );
    }

    #[test]
    fn empty_message_text_is_not_a_message() {
        let response = AgentResponse::from_value(json!({ "content": { "parts": [{ "text": "" }] } }));
        assert!(matches!(response, AgentResponse::Unrecognized(_)));
        assert!(response.extract_text().is_some());
    }

    #[test]
    fn non_json_body_is_kept_as_text() {
        let response = AgentResponse::from_body("Internal Server Error");
        assert_eq!(response, AgentResponse::Text("Internal Server Error".into()));
        assert_eq!(
            response.extract_text().as_deref(),
            Some("Internal Server Error")
        );
    }

    #[test]
    fn empty_body_is_empty() {
        assert_eq!(AgentResponse::from_body(""), AgentResponse::Empty);
        assert_eq!(AgentResponse::from_body("  \n"), AgentResponse::Empty);
        assert_eq!(AgentResponse::from_body("null"), AgentResponse::Empty);
        assert_eq!(AgentResponse::from_body("\"\""), AgentResponse::Empty);
    }

    #[test]
    fn scalars_are_dumped() {
        assert_eq!(
            AgentResponse::from_body("42").extract_text().as_deref(),
            Some("42")
        );
        assert_eq!(
            AgentResponse::from_body("true").extract_text().as_deref(),
            Some("true")
        );
    }

    #[test]
    fn snapshot_is_truncated_on_char_boundary() {
        let long = "é".repeat(SNAPSHOT_CHARS + 50);
        let response = AgentResponse::Text(long);
        let snap = response.snapshot(SNAPSHOT_CHARS);
        assert_eq!(snap.chars().count(), SNAPSHOT_CHARS);
        assert!(snap.starts_with("\"é"));
    }

    #[test]
    fn truncate_chars_short_input_unchanged() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }
}
