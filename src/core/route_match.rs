//! Templated route matching for REST-to-gRPC mappings.
//!
//! Patterns are `/`-separated with literal segments and template segments of
//! the form `{name}` or `{name:type}`. A template segment matches exactly one
//! non-empty path segment; its captured value is coerced by the type hint.
use serde_json::{Map, Value};

use crate::core::model::Route;

/// Parameters extracted from a matched route: field name to JSON value.
pub type Params = Map<String, Value>;

/// Select the best route for `method` + `path` from a service's route list.
///
/// Candidates must match the request method (case-insensitive) and the full
/// path; among them the longest `path_pattern` wins.
pub fn select_route<'a>(routes: &'a [Route], method: &str, path: &str) -> Option<(&'a Route, Params)> {
    let method = method.to_ascii_uppercase();
    let mut best: Option<(&Route, Params)> = None;
    for route in routes {
        if route.method.to_ascii_uppercase() != method {
            continue;
        }
        if let Some(params) = match_pattern(&route.path, path) {
            let better = match &best {
                Some((current, _)) => route.path.len() > current.path.len(),
                None => true,
            };
            if better {
                best = Some((route, params));
            }
        }
    }
    best
}

/// Match a request path against a template pattern, extracting params.
///
/// Both sides are compared segment-wise after stripping one trailing `/`;
/// lengths must be equal. Returns `None` on any mismatch, including a
/// template segment with an empty name.
pub fn match_pattern(pattern: &str, path: &str) -> Option<Params> {
    let pattern = non_empty(pattern.trim_end_matches('/'));
    let path = non_empty(path.trim_end_matches('/'));

    let pattern_segs: Vec<&str> = pattern.trim_start_matches('/').split('/').collect();
    let path_segs: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    if pattern_segs.len() != path_segs.len() {
        return None;
    }

    let mut params = Params::new();
    for (seg_p, seg_u) in pattern_segs.iter().zip(path_segs.iter()) {
        if let Some(spec) = seg_p
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
        {
            let (key, typ) = match spec.split_once(':') {
                Some((k, t)) => (k, t),
                None => (spec, ""),
            };
            if key.is_empty() {
                return None;
            }
            params.insert(key.to_string(), coerce(seg_u, typ));
        } else if seg_p != seg_u {
            return None;
        }
    }
    Some(params)
}

/// Merge a route's query mapping into `params` from the request query string.
///
/// For each mapped query key present in the query, the first value is coerced
/// and placed under the mapped field name. Path captures already in `params`
/// are never overwritten.
pub fn merge_query_params(params: &mut Params, query: Option<&str>, route: &Route) {
    let Some(mapping) = &route.query_mapping else {
        return;
    };
    let Some(query) = query else {
        return;
    };
    for (raw_key, raw_value) in parse_query(query) {
        if let Some(entry) = mapping.get(raw_key.as_str()) {
            if entry.field.is_empty() || params.contains_key(&entry.field) {
                continue;
            }
            params.insert(entry.field.clone(), coerce(&raw_value, &entry.r#type));
        }
    }
}

/// Coerce a captured string by type hint. Unknown hints and failed parses
/// fall back to the raw string.
pub fn coerce(value: &str, typ: &str) -> Value {
    match typ.to_ascii_lowercase().as_str() {
        "int" | "integer" => value
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(value)),
        "float" | "double" | "number" => value
            .parse::<f64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(value)),
        "bool" | "boolean" => value
            .parse::<bool>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(value)),
        _ => Value::from(value),
    }
}

fn non_empty(s: &str) -> &str {
    if s.is_empty() { "/" } else { s }
}

/// Decode a query string into (key, value) pairs, keeping first-seen order.
/// Percent-decoding covers the characters that matter for parameter values.
fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((k, v)) => (percent_decode(k), percent_decode(v)),
            None => (percent_decode(part), String::new()),
        })
        .collect()
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let decoded = bytes
                    .get(i + 1)
                    .copied()
                    .and_then(hex_val)
                    .zip(bytes.get(i + 2).copied().and_then(hex_val));
                if let Some((hi, lo)) = decoded {
                    out.push(hi * 16 + lo);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
