use serde_json::{Map, Value};

use super::models::{CanonicalRecord, RawRecord, RecordId};

// Alternate spellings per canonical field, highest priority first.
pub const ID_KEYS: &[&str] = &["id"];
pub const FILENAME_KEYS: &[&str] = &["file_name", "filename", "file", "fileName"];
pub const NAME_KEYS: &[&str] = &["name", "display_name", "displayName"];
pub const EMAIL_KEYS: &[&str] = &["email"];
pub const PHONE_KEYS: &[&str] = &["phone"];
pub const UPLOADED_AT_KEYS: &[&str] = &["uploaded_at", "uploadedAt", "created_at"];
pub const SCORE_KEYS: &[&str] = &["resume_rating", "resumeRating"];
pub const RAW_TEXT_KEYS: &[&str] = &["llm_raw", "llm"];

pub fn normalize_record(record: &RawRecord) -> CanonicalRecord {
    CanonicalRecord {
        id: resolve_id(record),
        filename: resolve_text(record, FILENAME_KEYS),
        name: resolve_text(record, NAME_KEYS),
        email: resolve_text(record, EMAIL_KEYS),
        phone: resolve_text(record, PHONE_KEYS),
        uploaded_at: resolve_text(record, UPLOADED_AT_KEYS),
        score: resolve_score(record, SCORE_KEYS),
        raw_text: resolve_text(record, RAW_TEXT_KEYS),
        source: record.clone(),
    }
}

pub fn normalize_records(records: &[RawRecord]) -> Vec<CanonicalRecord> {
    records.iter().map(normalize_record).collect()
}

/// First key whose value reads as non-blank text.
pub fn resolve_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find_map(value_as_text)
}

/// First key whose value reads as a rating.
pub fn resolve_score(fields: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find_map(value_as_score)
}

pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Ratings arrive as integers, floats or numeric strings ("8", "7.5").
pub fn value_as_score(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite()).map(|v| v.round() as i64)),
        Value::String(text) => {
            let trimmed = text.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(|v| v.round() as i64)
            })
        }
        _ => None,
    }
}

fn resolve_id(record: &RawRecord) -> Option<RecordId> {
    resolve_text(record, ID_KEYS).map(RecordId::new)
}
