//! Path and query-string helpers used when assembling request URLs.

use serde_json::{Map, Value};
use url::form_urlencoded;

/// Prefix `path` with `/` unless it already starts with one.
pub fn force_slash_prefix(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Append `params` to `url` as a query string.
///
/// Uses `?` when `url` has no query yet and `&` otherwise. The existing query
/// is copied through untouched. Null values are skipped; if nothing remains
/// the URL is returned unchanged.
pub fn append_params_to_url(url: &str, params: &Map<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut appended = 0;
    for (key, value) in params {
        if let Some(rendered) = render_query_value(value) {
            serializer.append_pair(key, &rendered);
            appended += 1;
        }
    }
    if appended == 0 {
        return url.to_string();
    }

    let query = serializer.finish();
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

/// Render a JSON value the way the API expects it in a query string.
pub fn render_query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}
