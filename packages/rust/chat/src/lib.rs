//! Chat-platform access for DeliveryBot.
//!
//! This crate provides:
//! - [`ChatSource`]: the narrow interface the pipeline needs (channels,
//!   messages, member lookup)
//! - [`DiscordClient`]: a [`ChatSource`] backed by the Discord REST API
//! - Wire types ([`Channel`], [`ChatMessage`], [`Member`])

mod discord;

use std::future::Future;

use chrono::{DateTime, Utc};
use deliverybot_shared::Result;
use serde::Deserialize;

pub use discord::DiscordClient;

/// Discord channel type for categories.
pub const CATEGORY_KIND: u8 = 4;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A guild channel or category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Channel {
    pub fn is_category(&self) -> bool {
        self.kind == CATEGORY_KIND
    }
}

/// The user who posted a message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
}

/// A message posted to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub author: Author,
    pub timestamp: DateTime<Utc>,
}

/// A guild member as returned by a member lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    /// Guild-specific nickname, if the member set one.
    #[serde(default)]
    pub nick: Option<String>,
    pub user: Author,
}

impl Member {
    /// Nickname when set, otherwise the account username.
    pub fn display_name(&self) -> &str {
        self.nick
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.user.username)
    }
}

// ---------------------------------------------------------------------------
// ChatSource
// ---------------------------------------------------------------------------

/// Read access to a chat guild.
pub trait ChatSource: Send + Sync {
    /// All channels and categories of the guild.
    fn list_channels(&self) -> impl Future<Output = Result<Vec<Channel>>> + Send;

    /// Up to `limit` messages of a channel, newest first.
    fn fetch_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ChatMessage>>> + Send;

    /// Look up a guild member by user id.
    fn fetch_member(&self, user_id: &str) -> impl Future<Output = Result<Member>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_nick() {
        let member: Member = serde_json::from_str(
            r#"{"nick": "Ana García", "user": {"id": "1", "username": "ana_g"}}"#,
        )
        .expect("deserialize member");
        assert_eq!(member.display_name(), "Ana García");
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let member: Member =
            serde_json::from_str(r#"{"nick": null, "user": {"id": "1", "username": "ana_g"}}"#)
                .expect("deserialize member");
        assert_eq!(member.display_name(), "ana_g");

        let member: Member =
            serde_json::from_str(r#"{"user": {"id": "1", "username": "luis"}}"#)
                .expect("deserialize member without nick");
        assert_eq!(member.display_name(), "luis");
    }

    #[test]
    fn channel_deserializes_discord_shape() {
        let channels: Vec<Channel> = serde_json::from_str(
            r#"[
                {"id": "10", "type": 4, "name": "Week 1", "parent_id": null, "position": 0},
                {"id": "11", "type": 0, "name": "challenge-2", "parent_id": "10"}
            ]"#,
        )
        .expect("deserialize channels");
        assert!(channels[0].is_category());
        assert!(!channels[1].is_category());
        assert_eq!(channels[1].parent_id.as_deref(), Some("10"));
    }
}
