use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema-loose record exactly as the backend delivered it.
pub type RawRecord = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-shape record produced by the normalizer. Every field except `id` may
/// be absent; `source` keeps the untouched backend record for later fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub id: Option<RecordId>,
    pub filename: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub uploaded_at: Option<String>,
    pub score: Option<i64>,
    pub raw_text: Option<String>,
    pub source: RawRecord,
}

/// Structured object recovered from free text. Nothing about its shape is
/// guaranteed; lookups go through the view-model key tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedProfile(Map<String, Value>);

impl ExtractedProfile {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    pub heading: String,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub heading: String,
    pub period: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEntry {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub name: String,
    pub title: String,
    pub email: String,
    pub phone: String,
    pub score: i64,
    pub links: Vec<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub summary: String,
    pub education: Vec<EducationEntry>,
    pub technical_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub projects: Vec<ProjectEntry>,
    pub certifications: Vec<String>,
    pub improvement_areas: String,
    pub upskill_suggestions: Vec<String>,
}

/// A document chosen for upload, held in memory until submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    pub api_base: String,
    pub notice_ttl_ms: u64,
    pub request_timeout_seconds: u64,
    pub notify_detail_errors: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".to_string(),
            notice_ttl_ms: 2000,
            request_timeout_seconds: 120,
            notify_detail_errors: false,
        }
    }
}
