//! Server-Sent-Events parsing for streamed JSON-RPC responses.

use super::RequestId;
use serde_json::Value;

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name, when the stream named it.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

/// Splits an SSE body into events.
///
/// Events end at a blank line or at the end of the body. Comment lines and
/// unknown fields are ignored; events without data are dropped.
#[must_use]
pub fn parse_events(body: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();
    let mut event_name: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for raw_line in body.split('\n') {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

        if line.is_empty() {
            flush(&mut events, &mut event_name, &mut data_lines);
            continue;
        }
        if line.starts_with(':') {
            continue;
        }

        let (field, raw_value) = line.split_once(':').unwrap_or((line, ""));
        let value = raw_value.strip_prefix(' ').unwrap_or(raw_value);
        match field {
            "data" => data_lines.push(value),
            "event" => event_name = Some(value.to_owned()),
            _ => {}
        }
    }
    flush(&mut events, &mut event_name, &mut data_lines);

    events
}

fn flush(events: &mut Vec<SseEvent>, event_name: &mut Option<String>, data_lines: &mut Vec<&str>) {
    if data_lines.is_empty() {
        *event_name = None;
        return;
    }
    events.push(SseEvent {
        event: event_name.take(),
        data: data_lines.join("\n"),
    });
    data_lines.clear();
}

/// Picks the JSON payload answering `id` from an SSE body.
///
/// Returns the last payload whose `id` matches, falling back to the last
/// JSON payload of the stream. Non-JSON events are skipped.
#[must_use]
pub fn select_payload(body: &str, id: RequestId) -> Option<Value> {
    let mut last_matching = None;
    let mut last_any = None;

    for event in parse_events(body) {
        let Ok(payload) = serde_json::from_str::<Value>(&event.data) else {
            continue;
        };
        if payload.get("id").is_some_and(|wire_id| id.matches(wire_id)) {
            last_matching = Some(payload.clone());
        }
        last_any = Some(payload);
    }

    last_matching.or(last_any)
}
