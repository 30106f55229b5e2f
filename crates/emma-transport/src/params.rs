//! Request parameters and response interpretation.

use serde_json::Value;

/// Query parameters or JSON body of a request.
pub type Params = serde_json::Map<String, Value>;

/// Whether a decoded response counts as success.
///
/// The service answers most mutations with a bare boolean, a list of ids or an
/// object; `null`, `false`, `0`, `""`, `[]` and `{}` all mean failure.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Percent-encodes `raw` as a single path segment.
///
/// `/`, `?` and `#` are escaped along with every other reserved byte, so a
/// value such as an email address can neither split the path nor start a
/// query or fragment.
#[must_use]
pub fn path_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Flattens params into query-string pairs.
///
/// Lists are comma-joined, booleans become `true`/`false`, nulls are skipped.
#[must_use]
pub fn query_pairs(params: &Params) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| scalar(value).map(|v| (key.clone(), v)))
        .collect()
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(scalar)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}
