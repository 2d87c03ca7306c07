//! The list of students expected to deliver.

use std::path::Path;

use deliverybot_shared::{DeliveryBotError, Result};

use crate::extractor::normalize_nickname;

/// Ordered, de-duplicated list of normalized student identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    students: Vec<String>,
}

impl Roster {
    /// Build a roster from raw names. Names are normalized; blanks and
    /// repeats are dropped, keeping the first occurrence.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut students: Vec<String> = Vec::new();
        for name in names {
            let id = normalize_nickname(name.as_ref());
            if !id.is_empty() && !students.contains(&id) {
                students.push(id);
            }
        }
        Self { students }
    }

    /// Parse a roster file body: one student per line, `#` starts a comment.
    pub fn parse(content: &str) -> Self {
        Self::new(
            content
                .lines()
                .map(|line| line.split('#').next().unwrap_or_default())
                .filter(|line| !line.trim().is_empty()),
        )
    }

    /// Read and parse a roster file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| DeliveryBotError::io(path, e))?;
        let roster = Self::parse(&content);
        tracing::debug!(path = %path.display(), students = roster.len(), "loaded roster");
        Ok(roster)
    }

    pub fn students(&self) -> &[String] {
        &self.students
    }

    pub fn contains(&self, id: &str) -> bool {
        self.students.iter().any(|s| s == id)
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_comments_blanks_and_repeats() {
        let roster = Roster::parse(
            "# Spring cohort\nAna García\n\nLuis   # team lead\nana garcía\n  Núria Coll  \n",
        );
        assert_eq!(roster.students(), ["ana-garcia", "luis", "nuria-coll"]);
        assert!(roster.contains("luis"));
        assert!(!roster.contains("Luis"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let path = std::env::temp_dir().join(format!("db_roster_{}.txt", uuid::Uuid::now_v7()));
        let err = Roster::load(&path).unwrap_err();
        assert!(matches!(err, DeliveryBotError::Io { .. }));
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join(format!("db_roster_{}.txt", uuid::Uuid::now_v7()));
        std::fs::write(&path, "marta\npau\n").unwrap();
        let roster = Roster::load(&path).unwrap();
        assert_eq!(roster.len(), 2);
    }
}
