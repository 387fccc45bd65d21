//! Decode TD frame bodies into typed event records.
//!
//! A TD frame body is a JSON array of single-key wrapper objects, e.g.
//! `[{"CA_MSG": {...}}, {"CT_MSG": {...}}]`. The wrapper key repeats the
//! message class and is ignored; only the inner object is decoded.

use serde_json::Value;

use crate::types::{Result, TdError, TdEvent, TdMessageType};

/// Decode one frame body into its event records.
///
/// Returns an error only when the body itself is not a JSON array. A
/// malformed element (missing `msg_type`, `time`, or `area_id`) is skipped
/// with a warning; its siblings still decode. Stateless, so decoding the
/// same body twice yields identical results.
pub fn decode_body(body: &str) -> Result<Vec<TdEvent>> {
    let parsed: Value = serde_json::from_str(body)?;
    let elements = parsed
        .as_array()
        .ok_or_else(|| TdError::InvalidBody(format!("got {}", json_kind(&parsed))))?;

    let mut events = Vec::with_capacity(elements.len());
    for (idx, outer) in elements.iter().enumerate() {
        match decode_element(outer) {
            Ok(event) => events.push(event),
            Err(reason) => log::warn!("skipping malformed TD element {idx}: {reason}"),
        }
    }
    Ok(events)
}

/// Decode one wrapper element. The error string is a diagnostic, not a
/// control-flow signal beyond "skip this element".
fn decode_element(outer: &Value) -> std::result::Result<TdEvent, String> {
    let inner = outer
        .as_object()
        .and_then(|wrapper| wrapper.values().next())
        .ok_or("wrapper is not a single-key object")?;
    let message = inner.as_object().ok_or("wrapped value is not an object")?;

    let code = message
        .get("msg_type")
        .and_then(Value::as_str)
        .ok_or("missing msg_type")?;
    let time_ms = message
        .get("time")
        .and_then(parse_time_ms)
        .ok_or("missing or unparseable time")?;
    let area_id = message
        .get("area_id")
        .and_then(Value::as_str)
        .ok_or("missing area_id")?
        .to_string();

    let msg_type = TdMessageType::from_code(code);
    let event = if msg_type.is_berth() {
        TdEvent {
            msg_type,
            time_ms,
            area_id,
            description: str_field(message, "descr"),
            from_berth: str_field(message, "from"),
            to_berth: str_field(message, "to"),
        }
    } else {
        // Heartbeats and S-class messages: free-form data plus the
        // describer address, mapped into the same record shape.
        TdEvent {
            msg_type,
            time_ms,
            area_id,
            description: str_field(message, "data"),
            from_berth: str_field(message, "address"),
            to_berth: String::new(),
        }
    };
    Ok(event)
}

/// The feed serializes `time` as a decimal string, but accept a bare number
/// too. Epoch milliseconds either way.
fn parse_time_ms(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

/// Optional string field, empty default. Non-string values count as absent.
fn str_field(message: &serde_json::Map<String, Value>, key: &str) -> String {
    message
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
