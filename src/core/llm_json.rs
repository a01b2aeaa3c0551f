use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::models::ExtractedProfile;

// Greedy: first `{` through the last `}` in the blob.
static JSON_SPAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Pulls the JSON object a model response wraps in commentary. Nested or
/// disjoint fragments inside the outer span are not repaired; a span that does
/// not parse as strict JSON is simply a miss.
pub fn extract_json_object(raw: Option<&str>) -> Option<Value> {
    let raw = raw?;
    let span = JSON_SPAN_RE.find(raw)?;
    serde_json::from_str::<Value>(span.as_str()).ok()
}

pub fn extract_profile(raw: Option<&str>) -> Option<ExtractedProfile> {
    match extract_json_object(raw)? {
        Value::Object(fields) => Some(ExtractedProfile::new(fields)),
        _ => None,
    }
}
