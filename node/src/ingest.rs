// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Turns an incoming HTTP request into a log [`Entry`].

use axum::http::HeaderMap;
use echo_log::{Attributes, Entry};
use serde_json::Value;

use crate::errors::ApiError;

/// Header values as strings. Repeated headers are joined with `", "`.
pub fn header_attributes(headers: &HeaderMap) -> Attributes {
    let mut attrs = Attributes::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match attrs.get_mut(name.as_str()) {
            Some(Value::String(existing)) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            _ => {
                attrs.insert(name.as_str().to_owned(), Value::String(value));
            }
        }
    }
    attrs
}

/// Query parameters as strings. The last occurrence of a key wins.
pub fn query_attributes(params: Vec<(String, String)>) -> Attributes {
    params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

/// The request body must be empty or a JSON object.
pub fn body_attributes(body: &[u8]) -> Result<Attributes, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Attributes::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::InvalidInput("Body must be a JSON object".into())),
        Err(e) => Err(ApiError::InvalidInput(format!("Body is not valid JSON: {}", e))),
    }
}

/// Capture a request as an entry stamped with the current time.
pub fn parse_entry(
    headers: &HeaderMap,
    params: Vec<(String, String)>,
    body: &[u8],
) -> Result<Entry, ApiError> {
    Ok(Entry::new(
        Some(header_attributes(headers)),
        Some(query_attributes(params)),
        Some(body_attributes(body)?),
    ))
}
