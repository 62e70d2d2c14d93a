//! Record model and the parsing rules for ids and request bodies.
//!
//! A record is any JSON object; the store only cares about its integer `id`.

use serde_json::{Map, Value};

use crate::errors::ServiceError;

/// One entry of the collection. Field order is kept as inserted.
pub type Record = Map<String, Value>;

pub const ID_FIELD: &str = "id";

/// Integer id of a record, if it carries one.
pub fn record_id(record: &Record) -> Option<i64> {
    record.get(ID_FIELD).and_then(Value::as_i64)
}

/// Parse an `id` query value as a leading integer.
///
/// Leading whitespace and an optional sign are accepted, `0x`/`0X` switches to
/// base 16, and parsing stops at the first non-digit, so `"12abc"` is 12 and
/// `"1.5"` is 1. Returns `None` when no digit is found or the value overflows.
pub fn parse_id(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, s) = if s.starts_with("0x") || s.starts_with("0X") {
        (16, &s[2..])
    } else {
        (10, s)
    };

    let digits: &str = {
        let end = s
            .char_indices()
            .find(|(_, c)| !c.is_digit(radix))
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        &s[..end]
    };
    if digits.is_empty() {
        return None;
    }

    let value = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -value } else { value })
}

/// First `id` among already-decoded query pairs, parsed with [`parse_id`].
pub fn id_from_pairs(pairs: &[(String, String)]) -> Option<i64> {
    pairs
        .iter()
        .find(|(k, _)| k == ID_FIELD)
        .and_then(|(_, v)| parse_id(v))
}

/// Parse a request body; anything but a JSON object is rejected.
pub fn parse_body(bytes: &[u8]) -> Result<Record, ServiceError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ServiceError::InvalidBody(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
        Err(e) => Err(ServiceError::InvalidBody(e.to_string())),
    }
}

/// Overwrite `target` key by key with `patch`. The `id` key is never taken
/// from a patch.
pub fn merge(target: &mut Record, patch: Record) {
    for (key, value) in patch {
        if key == ID_FIELD {
            continue;
        }
        target.insert(key, value);
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
