use serde_json::{Map, Value};

use super::field_extractor::{classify_link, extract_links, LinkKind};
use super::llm_json::extract_profile;
use super::models::{CanonicalRecord, EducationEntry, ExperienceEntry, ProjectEntry, ViewModel};
use super::normalizer::{resolve_score, resolve_text, value_as_text};

pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "-";

const MAX_LINKS: usize = 4;
const MAX_TECHNICAL_SKILLS: usize = 30;
const MIN_DERIVED_SCORE: i64 = 5;
const MAX_DERIVED_SCORE: i64 = 9;

const NAME_KEYS: &[&str] = &["name", "display_name"];
const TITLE_KEYS: &[&str] = &["title", "role", "current_title"];
const EMAIL_KEYS: &[&str] = &["email"];
const PHONE_KEYS: &[&str] = &["phone"];
const SCORE_KEYS: &[&str] = &["resume_rating", "resumeRating"];
const SUMMARY_KEYS: &[&str] = &["summary"];
const IMPROVEMENT_KEYS: &[&str] = &["improvement_areas"];
const LINKEDIN_KEYS: &[&str] = &["linkedin_url", "linkedin"];
const PORTFOLIO_KEYS: &[&str] = &["portfolio_url/github", "portfolio_url", "portfolio", "github"];

const EDUCATION_KEYS: &[&str] = &["education"];
const TECHNICAL_SKILL_KEYS: &[&str] = &["technical_skills", "technicalSkills", "core_skills"];
const SCORING_SKILL_KEYS: &[&str] = &["technical_skills", "core_skills"];
const SOFT_SKILL_KEYS: &[&str] = &["soft_skills", "softSkills"];
const EXPERIENCE_KEYS: &[&str] = &["work_experience", "experience"];
const PROJECT_KEYS: &[&str] = &["projects"];
const CERTIFICATION_KEYS: &[&str] = &["certifications"];
const UPSKILL_KEYS: &[&str] = &["upskill_suggestions"];

const EDUCATION_HEADING_KEYS: &[&str] = &["institution", "degree"];
const EXPERIENCE_HEADING_KEYS: &[&str] = &["role", "title", "company"];
const EXPERIENCE_BULLET_KEYS: &[&str] = &["description", "bullets"];

/// Builds the display profile for one record. Attributes prefer the JSON
/// recovered from the record's raw text, then the canonical fields, then a
/// placeholder. Without recoverable JSON the backend record itself is read as
/// the profile.
pub fn derive_view_model(record: &CanonicalRecord) -> ViewModel {
    let extracted = extract_profile(record.raw_text.as_deref());
    let profile: &Map<String, Value> = extracted
        .as_ref()
        .map(|profile| profile.fields())
        .unwrap_or(&record.source);

    let links: Vec<String> = extract_links(record.raw_text.as_deref())
        .into_iter()
        .take(MAX_LINKS)
        .collect();

    let score = resolve_score(profile, SCORE_KEYS)
        .or(record.score)
        .unwrap_or_else(|| derive_score(first_array(profile, SCORING_SKILL_KEYS).map_or(0, Vec::len)));

    ViewModel {
        name: resolve_text(profile, NAME_KEYS)
            .or_else(|| record.name.clone())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        title: resolve_text(profile, TITLE_KEYS).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        email: resolve_text(profile, EMAIL_KEYS)
            .or_else(|| record.email.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        phone: resolve_text(profile, PHONE_KEYS)
            .or_else(|| record.phone.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        score,
        linkedin_url: resolve_text(profile, LINKEDIN_KEYS)
            .or_else(|| first_link_of_kind(&links, LinkKind::LinkedIn)),
        portfolio_url: resolve_text(profile, PORTFOLIO_KEYS)
            .or_else(|| first_link_of_kind(&links, LinkKind::GitHub)),
        links,
        summary: resolve_text(profile, SUMMARY_KEYS).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        education: first_array(profile, EDUCATION_KEYS)
            .map(|entries| entries.iter().filter_map(education_entry).collect())
            .unwrap_or_default(),
        technical_skills: text_list(profile, TECHNICAL_SKILL_KEYS)
            .into_iter()
            .take(MAX_TECHNICAL_SKILLS)
            .collect(),
        soft_skills: text_list(profile, SOFT_SKILL_KEYS),
        experience: first_array(profile, EXPERIENCE_KEYS)
            .map(|entries| entries.iter().filter_map(experience_entry).collect())
            .unwrap_or_default(),
        projects: first_array(profile, PROJECT_KEYS)
            .map(|entries| entries.iter().filter_map(project_entry).collect())
            .unwrap_or_default(),
        certifications: text_list(profile, CERTIFICATION_KEYS),
        improvement_areas: improvement_areas(profile),
        upskill_suggestions: text_list(profile, UPSKILL_KEYS),
    }
}

/// Fallback rating from the number of technical skills, kept within 5..=9.
pub fn derive_score(skill_count: usize) -> i64 {
    let base = (skill_count as f64 / 3.0).round() as i64 + MIN_DERIVED_SCORE;
    base.clamp(MIN_DERIVED_SCORE, MAX_DERIVED_SCORE)
}

fn first_array<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find_map(Value::as_array)
}

fn text_list(fields: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    first_array(fields, keys)
        .map(|items| items.iter().filter_map(value_as_text).collect())
        .unwrap_or_default()
}

fn first_link_of_kind(links: &[String], kind: LinkKind) -> Option<String> {
    links.iter().find(|link| classify_link(link) == kind).cloned()
}

fn improvement_areas(fields: &Map<String, Value>) -> String {
    if let Some(text) = resolve_text(fields, IMPROVEMENT_KEYS) {
        return text;
    }

    let items = text_list(fields, IMPROVEMENT_KEYS);
    if items.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        items.join("; ")
    }
}

fn education_entry(value: &Value) -> Option<EducationEntry> {
    match value {
        Value::Object(entry) => {
            let start = resolve_text(entry, &["start"]).unwrap_or_default();
            let period = match resolve_text(entry, &["end"]) {
                Some(end) => format!("{start} — {end}"),
                None => start,
            };

            Some(EducationEntry {
                heading: resolve_text(entry, EDUCATION_HEADING_KEYS)
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                period,
            })
        }
        other => value_as_text(other).map(|heading| EducationEntry {
            heading,
            period: String::new(),
        }),
    }
}

fn experience_entry(value: &Value) -> Option<ExperienceEntry> {
    let Value::Object(entry) = value else {
        return value_as_text(value).map(|heading| ExperienceEntry {
            heading,
            period: String::new(),
            bullets: Vec::new(),
        });
    };

    let period = resolve_text(entry, &["duration"])
        .or_else(|| {
            resolve_text(entry, &["start"]).map(|start| {
                let end = resolve_text(entry, &["end"]).unwrap_or_default();
                format!("{start} — {end}")
            })
        })
        .unwrap_or_default();

    let bullets = match first_array(entry, EXPERIENCE_BULLET_KEYS) {
        Some(items) => items.iter().filter_map(value_as_text).collect(),
        None => resolve_text(entry, EXPERIENCE_BULLET_KEYS)
            .map(|single| vec![single])
            .unwrap_or_default(),
    };

    Some(ExperienceEntry {
        heading: resolve_text(entry, EXPERIENCE_HEADING_KEYS)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        period,
        bullets,
    })
}

fn project_entry(value: &Value) -> Option<ProjectEntry> {
    match value {
        Value::Object(entry) => Some(ProjectEntry {
            name: resolve_text(entry, &["name"]).unwrap_or_default(),
            description: resolve_text(entry, &["description"]).unwrap_or_default(),
        }),
        other => value_as_text(other).map(|name| ProjectEntry {
            name,
            description: String::new(),
        }),
    }
}
