use once_cell::sync::Lazy;
use regex::Regex;

// Stops at whitespace, commas and closing brackets so markdown links and
// prose punctuation stay out of the match.
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s,\)\]]+").unwrap());
static SCHEME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://").unwrap());

static LINKEDIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://(?:[a-z]{2,3}\.)?(?:www\.)?linkedin\.com/").unwrap());
static GITHUB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://(?:www\.)?github\.com/[A-Za-z0-9-]{1,39}").unwrap());

const LINK_LABEL_MAX_CHARS: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    LinkedIn,
    GitHub,
    Other,
}

/// Absolute http(s) URLs in first-seen order, each reported once.
pub fn extract_links(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let mut links: Vec<String> = Vec::new();
    for m in URL_RE.find_iter(raw) {
        let value = m.as_str();
        if !links.iter().any(|existing| existing == value) {
            links.push(value.to_string());
        }
    }

    links
}

pub fn link_label(url: &str) -> String {
    SCHEME_RE
        .replace(url, "")
        .chars()
        .take(LINK_LABEL_MAX_CHARS)
        .collect()
}

pub fn classify_link(url: &str) -> LinkKind {
    if LINKEDIN_RE.is_match(url) {
        LinkKind::LinkedIn
    } else if GITHUB_RE.is_match(url) {
        LinkKind::GitHub
    } else {
        LinkKind::Other
    }
}
