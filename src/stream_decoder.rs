//! Decoder for the NoteGPT chat stream.
//!
//! The upstream answers with newline separated records, some of them prefixed
//! with `data:` and carrying a JSON object with optional `text` and
//! `reasoning` fragments. The whole body is buffered before decoding, so this
//! works on a complete string rather than a byte stream.

use serde_json::{Map, Value};

pub const DATA_PREFIX: &str = "data:";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedStream {
    pub text: String,
    pub reasoning: String,
}

impl DecodedStream {
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn reasoning(&self) -> Option<&str> {
        if self.reasoning.is_empty() {
            None
        } else {
            Some(self.reasoning.as_str())
        }
    }
}

/// Fragments carried by one event line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPayload {
    pub text: Option<String>,
    pub reasoning: Option<String>,
}

impl EventPayload {
    /// `text` is read before `reasoning`. A non-string `text` that carries a
    /// value rejects the whole line; the same problem in `reasoning` only
    /// drops the reasoning fragment, since `text` was already taken.
    fn from_object(obj: &Map<String, Value>) -> Result<Self, LineError> {
        let text = fragment(obj, "text")?;
        let reasoning = fragment(obj, "reasoning").ok().flatten();
        Ok(Self { text, reasoning })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("line has no data marker")]
    NotData,
    #[error("data line is empty")]
    Empty,
    #[error("malformed json: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("payload is not a json object")]
    NotAnObject,
    #[error("field `{0}` is not a string")]
    NotAString(&'static str),
}

/// Parses one line of the upstream body.
///
/// Only the leading `data:` marker is removed; the same text inside the JSON
/// payload is part of the fragment.
pub fn parse_event_line(line: &str) -> Result<EventPayload, LineError> {
    let rest = line.strip_prefix(DATA_PREFIX).ok_or(LineError::NotData)?;
    let raw = rest.trim();
    if raw.is_empty() {
        return Err(LineError::Empty);
    }
    let value: Value = serde_json::from_str(raw)?;
    let obj = value.as_object().ok_or(LineError::NotAnObject)?;
    EventPayload::from_object(obj)
}

/// Accumulates every `text` and `reasoning` fragment in line order.
///
/// A line that fails to parse is skipped; it never aborts the rest of the
/// body. Both buffers are trimmed once all lines are consumed.
pub fn decode_event_stream(body: &str) -> DecodedStream {
    let mut text = String::new();
    let mut reasoning = String::new();
    let mut skipped = 0usize;

    for line in body.split('\n') {
        let payload = match parse_event_line(line) {
            Ok(payload) => payload,
            Err(LineError::NotData) | Err(LineError::Empty) => continue,
            Err(err) => {
                skipped += 1;
                tracing::trace!(error = %err, "skipping undecodable event line");
                continue;
            }
        };
        if let Some(fragment) = payload.text {
            text.push_str(&fragment);
        }
        if let Some(fragment) = payload.reasoning {
            reasoning.push_str(&fragment);
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, "event stream contained undecodable lines");
    }

    DecodedStream {
        text: text.trim().to_string(),
        reasoning: reasoning.trim().to_string(),
    }
}

/// Empty or falsy values (`null`, `""`, `0`, `false`, `[]`, `{}`) contribute
/// nothing; any other non-string value is an error.
fn fragment(obj: &Map<String, Value>, key: &'static str) -> Result<Option<String>, LineError> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(Some(s.clone())),
        Some(value) if is_truthy(value) => Err(LineError::NotAString(key)),
        _ => Ok(None),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_text_and_reasoning_in_order() {
        let body = "data: {\"text\":\"Hello\"}\ndata: {\"text\":\" world\",\"reasoning\":\"r1\"}\n";
        let decoded = decode_event_stream(body);
        assert_eq!(decoded.text, "Hello world");
        assert_eq!(decoded.reasoning, "r1");
    }

    #[test]
    fn malformed_line_does_not_abort_decoding() {
        let body = "data: {bad json\ndata: {\"text\":\"ok\"}";
        let decoded = decode_event_stream(body);
        assert_eq!(decoded.text, "ok");
        assert_eq!(decoded.reasoning(), None);
    }

    #[test]
    fn decoding_is_repeatable() {
        let body = "data: {\"text\":\"a\",\"reasoning\":\"x\"}\ndata: {\"text\":\"b\"}";
        let first = decode_event_stream(body);
        let second = decode_event_stream(body);
        assert_eq!(first, second);
        assert_eq!(first.text, "ab");
    }

    #[test]
    fn lines_without_marker_are_ignored() {
        let body = "event: message\n{\"text\":\"nope\"}\n: keep-alive\ndata: {\"text\":\"yes\"}\n";
        assert_eq!(decode_event_stream(body).text, "yes");
    }

    #[test]
    fn tolerates_crlf_and_missing_space_after_marker() {
        let body = "data:{\"text\":\"one\"}\r\ndata: {\"text\":\" two\"}\r\n\r\n";
        assert_eq!(decode_event_stream(body).text, "one two");
    }

    #[test]
    fn non_object_payloads_are_skipped() {
        let body = "data: [DONE]\ndata: [\"a\",\"b\"]\ndata: \"str\"\ndata: {\"text\":\"kept\"}";
        assert_eq!(decode_event_stream(body).text, "kept");
    }

    #[test]
    fn empty_and_non_string_fields_contribute_nothing() {
        let body = "data: {\"text\":\"\"}\ndata: {\"text\":null,\"reasoning\":\"think\"}\ndata: {\"text\":5}";
        let decoded = decode_event_stream(body);
        assert!(!decoded.has_text());
        assert_eq!(decoded.reasoning(), Some("think"));
    }

    #[test]
    fn non_string_text_drops_the_whole_line() {
        let body = "data: {\"text\":5,\"reasoning\":\"lost\"}\ndata: {\"text\":\"ok\"}";
        let decoded = decode_event_stream(body);
        assert_eq!(decoded.text, "ok");
        assert_eq!(decoded.reasoning(), None);
    }

    #[test]
    fn falsy_text_keeps_reasoning() {
        let body = "data: {\"text\":0,\"reasoning\":\"a\"}\ndata: {\"text\":false,\"reasoning\":\"b\"}\ndata: {\"text\":[],\"reasoning\":\"c\"}";
        assert_eq!(decode_event_stream(body).reasoning, "abc");
    }

    #[test]
    fn non_string_reasoning_keeps_text() {
        let body = "data: {\"text\":\"kept\",\"reasoning\":{\"x\":1}}";
        let decoded = decode_event_stream(body);
        assert_eq!(decoded.text, "kept");
        assert_eq!(decoded.reasoning(), None);
    }

    #[test]
    fn buffers_are_trimmed_once_at_the_end() {
        let body = "data: {\"text\":\"  padded \"}\ndata: {\"text\":\" tail\\n\"}";
        assert_eq!(decode_event_stream(body).text, "padded  tail");
    }

    #[test]
    fn marker_inside_payload_is_preserved() {
        let body = "data: {\"text\":\"data: literal\"}";
        assert_eq!(decode_event_stream(body).text, "data: literal");
    }

    #[test]
    fn parse_event_line_reports_each_failure() {
        assert!(matches!(parse_event_line("id: 1"), Err(LineError::NotData)));
        assert!(matches!(parse_event_line("data:   "), Err(LineError::Empty)));
        assert!(matches!(
            parse_event_line("data: {oops"),
            Err(LineError::Malformed(_))
        ));
        assert!(matches!(
            parse_event_line("data: 42"),
            Err(LineError::NotAnObject)
        ));
        assert!(matches!(
            parse_event_line("data: {\"text\":true}"),
            Err(LineError::NotAString("text"))
        ));
        let payload = parse_event_line("data: {\"text\":\"t\",\"reasoning\":\"r\"}").unwrap();
        assert_eq!(payload.text.as_deref(), Some("t"));
        assert_eq!(payload.reasoning.as_deref(), Some("r"));
    }

    #[test]
    fn unicode_fragments_survive() {
        let body = "data: {\"text\":\"¿Qué tal? \"}\ndata: {\"text\":\"niño 🙂\"}";
        assert_eq!(decode_event_stream(body).text, "¿Qué tal? niño 🙂");
    }
}
