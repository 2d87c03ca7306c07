//! Line classification for submission messages.
//!
//! Recognized lines (case-insensitive, spaces around `-` ignored):
//! - `Repo: <url>`, `Front - repo: <url>`, `Back - repo: <url>`
//! - `Prod: <url>`, `Front - prod: <url>`, `Back - prod: <url>`
//! - any line containing `de grupo`, e.g. `De grupo: Ana - Luis`

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use deliverybot_shared::{ParsedLine, RepoSide};

use crate::extractor::normalize_nickname;

/// Group label up to the first `:`.
static GROUP_LABEL_COLON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^:]*:").expect("group label regex"));

/// Group label without a colon: everything through `de grupo`, plus a
/// trailing `-`, `con` or `with` connective.
static GROUP_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^.*?de\s+grupo(?:\s*[-–]|\s+(?:con|with)\b)?")
        .expect("group label regex")
});

/// Separators between member names.
static MEMBER_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:,|&|/|\s[-–]\s|\s+(?:y|and)\s+)\s*").expect("member separator regex")
});

/// Classify every line of a message body, in order.
pub fn classify_message(body: &str) -> Vec<ParsedLine> {
    body.lines().map(classify_line).collect()
}

/// Classify a single line.
pub fn classify_line(line: &str) -> ParsedLine {
    let trimmed = line.trim();
    let lower = trimmed.to_lowercase();
    let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();

    if let Some(side) = labeled_side(&lower, &compact, "repo:") {
        return match extract_url(trimmed) {
            Some(url) => ParsedLine::Repo { side, url },
            None => {
                debug!(line = trimmed, "repo line without URL");
                ParsedLine::Other
            }
        };
    }

    if let Some(side) = labeled_side(&lower, &compact, "prod:") {
        return match extract_url(trimmed) {
            Some(url) => ParsedLine::Prod { side, url },
            None => {
                debug!(line = trimmed, "prod line without URL");
                ParsedLine::Other
            }
        };
    }

    if lower.contains("de grupo") {
        return ParsedLine::Group {
            members: parse_group_members(trimmed),
        };
    }

    ParsedLine::Other
}

/// Match `<label>`, `front-<label>` or `back-<label>` at the start of a line.
fn labeled_side(lower: &str, compact: &str, label: &str) -> Option<RepoSide> {
    if lower.starts_with(label) {
        Some(RepoSide::Single)
    } else if compact
        .strip_prefix("front-")
        .is_some_and(|rest| rest.starts_with(label))
    {
        Some(RepoSide::Front)
    } else if compact
        .strip_prefix("back-")
        .is_some_and(|rest| rest.starts_with(label))
    {
        Some(RepoSide::Back)
    } else {
        None
    }
}

/// Extract the URL starting at the first `http://` or `https://`.
///
/// The URL ends at the first whitespace; Discord's `<url>` embed suppression
/// brackets are dropped.
pub fn extract_url(line: &str) -> Option<String> {
    let start = line.char_indices().map(|(i, _)| i).find(|&i| {
        let rest = &line[i..];
        starts_with_ignore_case(rest, "https://") || starts_with_ignore_case(rest, "http://")
    })?;

    let url = line[start..]
        .split_whitespace()
        .next()?
        .trim_end_matches('>');
    Some(url.to_string())
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Strip the group label and split the remainder into normalized identifiers.
fn parse_group_members(line: &str) -> Vec<String> {
    let names = if GROUP_LABEL_COLON_RE.is_match(line) {
        GROUP_LABEL_COLON_RE.replace(line, "")
    } else {
        GROUP_LABEL_RE.replace(line, "")
    };

    let mut members: Vec<String> = Vec::new();
    for name in MEMBER_SEPARATOR_RE.split(names.trim()) {
        let id = normalize_nickname(name);
        if !id.is_empty() && !members.contains(&id) {
            members.push(id);
        }
    }
    members
}
