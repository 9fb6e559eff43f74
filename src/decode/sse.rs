//! Event-stream framing.

use serde::Serialize;
use serde_json::Value;

/// One event of a `text/event-stream` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SseEvent {
    pub event: Option<String>,
    /// Parsed JSON when the data line holds JSON, the raw text otherwise
    pub data: Option<Value>,
}

/// Which `data:` line carries the search result.
///
/// The streamed initial search puts the result list in its first event; a
/// refine search ends with the complete list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseSelection {
    First,
    Last,
}

/// Whether `text` uses event-stream framing at all.
pub fn has_data_lines(text: &str) -> bool {
    data_lines(text).next().is_some()
}

/// Payloads of every `data:` line, trimmed, in order.
pub fn data_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
}

/// Payload of the selected `data:` line that parses as JSON.
pub fn select_data(text: &str, selection: SseSelection) -> Option<Value> {
    let mut parsed = data_lines(text).filter_map(|data| serde_json::from_str::<Value>(data).ok());
    match selection {
        SseSelection::First => parsed.next(),
        SseSelection::Last => parsed.last(),
    }
}

/// Splits a body into events. Blank lines terminate an event.
pub fn parse_events(text: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();
    let mut current = SseEvent {
        event: None,
        data: None,
    };

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if current.event.is_some() || current.data.is_some() {
                events.push(std::mem::replace(
                    &mut current,
                    SseEvent {
                        event: None,
                        data: None,
                    },
                ));
            }
            continue;
        }
        if let Some(name) = line.strip_prefix("event:") {
            current.event = Some(name.trim().to_string());
        } else if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            current.data = Some(
                serde_json::from_str(data).unwrap_or_else(|_| Value::String(data.to_string())),
            );
        }
    }
    if current.event.is_some() || current.data.is_some() {
        events.push(current);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STREAM: &str = "event: searchResult\ndata: {\"n\":1}\n\n\
                          event: heartbeat\ndata: ping\n\n\
                          event: searchResult\ndata: {\"n\":2}\n\n";

    #[test]
    fn test_select_first_and_last_json_lines() {
        assert_eq!(select_data(STREAM, SseSelection::First), Some(json!({"n": 1})));
        assert_eq!(select_data(STREAM, SseSelection::Last), Some(json!({"n": 2})));
    }

    #[test]
    fn test_select_skips_non_json_lines() {
        let text = "data: [DONE]\ndata: {\"ok\":true}\ndata: bye";
        assert_eq!(select_data(text, SseSelection::First), Some(json!({"ok": true})));
        assert_eq!(select_data(text, SseSelection::Last), Some(json!({"ok": true})));
        assert_eq!(select_data("data: nope", SseSelection::First), None);
    }

    #[test]
    fn test_has_data_lines() {
        assert!(has_data_lines("  data: {}"));
        assert!(!has_data_lines("{\"data\": 1}"));
    }

    #[test]
    fn test_parse_events() {
        let events = parse_events(STREAM);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event.as_deref(), Some("searchResult"));
        assert_eq!(events[1].data, Some(Value::String("ping".to_string())));
        assert_eq!(events[2].data, Some(json!({"n": 2})));
    }

    #[test]
    fn test_parse_events_without_trailing_blank_line() {
        let events = parse_events("data: {\"a\":1}");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, None);
    }
}
