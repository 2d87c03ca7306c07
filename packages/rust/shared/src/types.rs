//! Core domain types for DeliveryBot.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DeliveryBotError;

// ---------------------------------------------------------------------------
// ChallengeCode
// ---------------------------------------------------------------------------

/// Matches `w<week>ch<n|we>`, e.g. `w1ch2` or `w3chwe`.
static CHALLENGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^w(?P<week>\d+)ch(?P<slot>\d+|we)$").expect("challenge code regex")
});

/// Which challenge of the week a code refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeSlot {
    /// A numbered weekday challenge.
    Number(u32),
    /// The weekend challenge.
    Weekend,
}

impl fmt::Display for ChallengeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Weekend => f.write_str("weekend"),
        }
    }
}

/// A parsed challenge code: week number plus challenge slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChallengeCode {
    pub week: u32,
    pub slot: ChallengeSlot,
}

impl ChallengeCode {
    /// Name of the chat category holding the week's channels (`Week 3`).
    pub fn category_name(&self) -> String {
        format!("Week {}", self.week)
    }

    /// Name of the challenge channel (`challenge-2`, `challenge-weekend`).
    pub fn channel_name(&self) -> String {
        format!("challenge-{}", self.slot)
    }
}

impl fmt::Display for ChallengeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot {
            ChallengeSlot::Number(n) => write!(f, "w{}ch{n}", self.week),
            ChallengeSlot::Weekend => write!(f, "w{}chwe", self.week),
        }
    }
}

impl FromStr for ChallengeCode {
    type Err = DeliveryBotError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let input = s.trim();
        let caps = CHALLENGE_RE.captures(input).ok_or_else(|| {
            DeliveryBotError::validation(format!(
                "invalid challenge code '{input}': expected w<week>ch<number|we>, e.g. w1ch2"
            ))
        })?;

        let week = caps["week"].parse::<u32>().map_err(|e| {
            DeliveryBotError::validation(format!("invalid week in '{input}': {e}"))
        })?;

        let slot = match &caps["slot"] {
            s if s.eq_ignore_ascii_case("we") => ChallengeSlot::Weekend,
            n => ChallengeSlot::Number(n.parse::<u32>().map_err(|e| {
                DeliveryBotError::validation(format!("invalid challenge in '{input}': {e}"))
            })?),
        };

        Ok(Self { week, slot })
    }
}

// ---------------------------------------------------------------------------
// Submission & parsed lines
// ---------------------------------------------------------------------------

/// One chat message reduced to its author and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Normalized author identifier (see `normalize_nickname`).
    pub nickname: String,
    /// Trimmed message body.
    pub raw_text: String,
}

/// Which half of a project a repo/prod line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoSide {
    Single,
    Front,
    Back,
}

impl RepoSide {
    /// Suffix appended to the folder name so front/back clones don't collide.
    pub fn folder_suffix(&self) -> &'static str {
        match self {
            Self::Single => "",
            Self::Front => "-front",
            Self::Back => "-back",
        }
    }
}

/// Classification of a single message line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// `Repo: <url>` (or `Front - repo:` / `Back - repo:`).
    Repo { side: RepoSide, url: String },
    /// `Prod: <url>` (or `Front - prod:` / `Back - prod:`).
    Prod { side: RepoSide, url: String },
    /// A group declaration with normalized member identifiers.
    Group { members: Vec<String> },
    /// Anything else.
    Other,
}
