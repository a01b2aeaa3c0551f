use chrono::{DateTime, Local, NaiveDateTime};

use super::field_extractor::link_label;
use super::models::{CanonicalRecord, ViewModel};
use super::view_model::NOT_AVAILABLE;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Local-time rendering of a backend timestamp; unknown formats are shown as-is.
pub fn format_timestamp(value: Option<&str>) -> String {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return NOT_AVAILABLE.to_string();
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return parsed.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string();
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|parsed| parsed.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| value.to_string())
}

pub fn render_profile(view: &ViewModel) -> String {
    let mut lines = Vec::new();

    lines.push(format!("{}  ·  {}    [score {}]", view.name, view.title, view.score));

    let mut contact = vec![view.email.clone(), view.phone.clone()];
    contact.extend(view.links.iter().map(|link| link_label(link)));
    lines.push(contact.join(" | "));
    if let Some(linkedin) = &view.linkedin_url {
        lines.push(format!("LinkedIn: {linkedin}"));
    }
    if let Some(portfolio) = &view.portfolio_url {
        lines.push(format!("Portfolio: {portfolio}"));
    }

    lines.push(String::new());
    lines.push("Education".to_string());
    if view.education.is_empty() {
        lines.push("  No education parsed".to_string());
    }
    for entry in &view.education {
        lines.push(with_period(&entry.heading, &entry.period));
    }

    lines.push(String::new());
    lines.push("Summary".to_string());
    lines.push(format!("  {}", view.summary));

    lines.push(String::new());
    lines.push(format!("Technical skills: {}", chips(&view.technical_skills)));
    lines.push(format!("Soft skills: {}", chips(&view.soft_skills)));

    lines.push(String::new());
    lines.push("Experience".to_string());
    if view.experience.is_empty() {
        lines.push("  No experience parsed".to_string());
    }
    for entry in &view.experience {
        lines.push(with_period(&entry.heading, &entry.period));
        lines.extend(entry.bullets.iter().map(|bullet| format!("    • {bullet}")));
    }

    lines.push(String::new());
    lines.push("Projects".to_string());
    if view.projects.is_empty() {
        lines.push("  None".to_string());
    }
    for project in &view.projects {
        if project.description.is_empty() {
            lines.push(format!("  {}", project.name));
        } else {
            lines.push(format!("  {}: {}", project.name, project.description));
        }
    }

    if !view.certifications.is_empty() {
        lines.push(String::new());
        lines.push(format!("Certifications: {}", chips(&view.certifications)));
    }

    lines.push(String::new());
    lines.push("Improvement".to_string());
    lines.push(format!("  {}", view.improvement_areas));
    if !view.upskill_suggestions.is_empty() {
        lines.push(format!("  Upskill: {}", chips(&view.upskill_suggestions)));
    }

    lines.join("\n")
}

pub fn render_history(rows: &[CanonicalRecord]) -> String {
    let mut lines = vec![format!(
        "{:<8} {:<28} {:<24} {:<30} {}",
        "Id", "File", "Name", "Email", "Uploaded"
    )];

    for row in rows {
        lines.push(format!(
            "{:<8} {:<28} {:<24} {:<30} {}",
            row.id.as_ref().map(|id| id.to_string()).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            row.filename.as_deref().unwrap_or(NOT_AVAILABLE),
            row.name.as_deref().unwrap_or(NOT_AVAILABLE),
            row.email.as_deref().unwrap_or(NOT_AVAILABLE),
            format_timestamp(row.uploaded_at.as_deref()),
        ));
    }

    lines.join("\n")
}

fn with_period(heading: &str, period: &str) -> String {
    if period.is_empty() {
        format!("  {heading}")
    } else {
        format!("  {heading} ({period})")
    }
}

fn chips(items: &[String]) -> String {
    if items.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        items.join(", ")
    }
}
