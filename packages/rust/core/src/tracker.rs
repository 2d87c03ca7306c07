//! Delivery bookkeeping against the roster.
//!
//! [`DeliveryTracker`] is the accumulator threaded through a collect run. It
//! owns the delivered flag of every roster student, remembers identifiers
//! that delivered without being on the roster, and expands group
//! declarations so every member of a group counts as delivered.

use std::collections::HashMap;

use tracing::{debug, info};

use deliverybot_shared::{ParsedLine, Submission};

use crate::roster::Roster;

/// Who a recorded submission is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    /// Identifier of the poster.
    pub submitter: String,
    /// Everyone credited, submitter first. A single entry unless grouped.
    pub members: Vec<String>,
    /// Folder the submission's repos are cloned into.
    pub folder: String,
}

impl Attribution {
    pub fn is_group(&self) -> bool {
        self.members.len() > 1
    }
}

/// Accumulates deliveries for one challenge.
#[derive(Debug, Clone)]
pub struct DeliveryTracker {
    roster: Roster,
    delivered: HashMap<String, bool>,
    unlisted: Vec<String>,
    duplicates: usize,
}

impl DeliveryTracker {
    /// Start with every roster student marked as not delivered.
    pub fn new(roster: Roster) -> Self {
        let delivered = roster
            .students()
            .iter()
            .map(|s| (s.clone(), false))
            .collect();
        Self {
            roster,
            delivered,
            unlisted: Vec::new(),
            duplicates: 0,
        }
    }

    /// Whether `id` has already been credited with a delivery.
    pub fn is_delivered(&self, id: &str) -> bool {
        self.delivered.get(id).copied().unwrap_or(false)
    }

    /// Record a submission and its parsed lines.
    ///
    /// Returns `None` when the submitter already delivered (on their own or
    /// as part of an earlier group); the duplicate is logged and counted.
    pub fn record(&mut self, submission: &Submission, lines: &[ParsedLine]) -> Option<Attribution> {
        let submitter = submission.nickname.clone();
        if self.is_delivered(&submitter) {
            info!(nickname = %submitter, "duplicate submission, skipping");
            self.duplicates += 1;
            return None;
        }

        let mut members = vec![submitter.clone()];
        for line in lines {
            if let ParsedLine::Group { members: listed } = line {
                for id in listed {
                    if !members.contains(id) {
                        members.push(id.clone());
                    }
                }
            }
        }

        for id in &members {
            if self.is_delivered(id) {
                debug!(member = %id, "group member had already delivered");
            }
            self.mark_delivered(id);
        }

        let folder = members.join("-");
        if members.len() > 1 {
            info!(%folder, members = members.len(), "group submission");
        }

        Some(Attribution {
            submitter,
            members,
            folder,
        })
    }

    fn mark_delivered(&mut self, id: &str) {
        match self.delivered.get_mut(id) {
            Some(flag) => *flag = true,
            None => {
                debug!(id, "delivery from someone not on the roster");
                self.delivered.insert(id.to_string(), true);
                self.unlisted.push(id.to_string());
            }
        }
    }

    /// Roster students with no delivery, in roster order.
    pub fn missing(&self) -> Vec<String> {
        self.roster
            .students()
            .iter()
            .filter(|s| !self.is_delivered(s))
            .cloned()
            .collect()
    }

    /// Roster students that delivered.
    pub fn delivered_count(&self) -> usize {
        self.roster
            .students()
            .iter()
            .filter(|s| self.is_delivered(s))
            .count()
    }

    /// Identifiers credited with a delivery that are not on the roster.
    pub fn unlisted(&self) -> &[String] {
        &self.unlisted
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(nickname: &str) -> Submission {
        Submission {
            nickname: nickname.into(),
            raw_text: String::new(),
        }
    }

    fn repo(url: &str) -> ParsedLine {
        ParsedLine::Repo {
            side: deliverybot_shared::RepoSide::Single,
            url: url.into(),
        }
    }

    #[test]
    fn duplicate_submission_recorded_once() {
        let mut tracker = DeliveryTracker::new(Roster::new(["ana", "luis"]));

        let first = tracker.record(&submission("ana"), &[repo("https://github.com/a/1")]);
        let second = tracker.record(&submission("ana"), &[repo("https://github.com/a/2")]);

        assert_eq!(first.unwrap().folder, "ana");
        assert!(second.is_none());
        assert_eq!(tracker.duplicates(), 1);
        assert_eq!(tracker.delivered_count(), 1);
    }

    #[test]
    fn group_marks_every_member() {
        let mut tracker = DeliveryTracker::new(Roster::new(["ana", "luis", "marta"]));
        let group = ParsedLine::Group {
            members: vec!["ana".into(), "luis".into()],
        };

        let att = tracker
            .record(&submission("luis"), &[group, repo("https://github.com/l/r")])
            .unwrap();

        assert!(tracker.is_delivered("ana"));
        assert!(tracker.is_delivered("luis"));
        assert!(att.is_group());
        assert_eq!(att.members, ["luis", "ana"]);
        assert_eq!(att.folder, "luis-ana");
        assert_eq!(tracker.missing(), ["marta"]);
    }

    #[test]
    fn later_post_by_group_member_is_duplicate() {
        let mut tracker = DeliveryTracker::new(Roster::new(["ana", "luis"]));
        let group = ParsedLine::Group {
            members: vec!["ana".into(), "luis".into()],
        };
        tracker.record(&submission("ana"), &[group]).unwrap();

        assert!(tracker.record(&submission("luis"), &[]).is_none());
        assert_eq!(tracker.duplicates(), 1);
    }

    #[test]
    fn missing_preserves_roster_order() {
        let roster = Roster::new(["zoe", "ana", "pau", "luis", "marta"]);
        let mut tracker = DeliveryTracker::new(roster);
        tracker.record(&submission("pau"), &[]);
        tracker.record(&submission("zoe"), &[]);

        assert_eq!(tracker.delivered_count(), 2);
        assert_eq!(tracker.missing(), ["ana", "luis", "marta"]);
    }

    #[test]
    fn unlisted_deliveries_are_kept_apart() {
        let mut tracker = DeliveryTracker::new(Roster::new(["ana"]));
        let group = ParsedLine::Group {
            members: vec!["ana".into(), "guest".into()],
        };
        tracker.record(&submission("mentor"), &[]);
        tracker.record(&submission("ana"), &[group]);

        assert_eq!(tracker.unlisted(), ["mentor", "guest"]);
        assert!(tracker.missing().is_empty());
        assert_eq!(tracker.delivered_count(), 1);
    }
}
