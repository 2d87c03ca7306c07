//! Resolves a challenge code to its week category and challenge channel.

use tracing::{info, instrument};

use deliverybot_chat::{Channel, ChatSource};
use deliverybot_shared::{ChallengeCode, DeliveryBotError, Result};

/// The category/channel pair a challenge's submissions are posted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLocation {
    pub category: Channel,
    pub channel: Channel,
}

/// Find the challenge channel among `channels`.
///
/// The category matches `Week <n>` case-insensitively; the channel must be
/// named exactly `challenge-<n|weekend>` and live under that category.
pub fn locate_in(code: &ChallengeCode, channels: &[Channel]) -> Result<ChannelLocation> {
    let category_name = code.category_name();
    let channel_name = code.channel_name();

    let category = channels
        .iter()
        .find(|c| c.is_category() && c.name.eq_ignore_ascii_case(&category_name))
        .ok_or_else(|| DeliveryBotError::lookup(format!("category '{category_name}'")))?;

    let channel = channels
        .iter()
        .find(|c| c.name == channel_name && c.parent_id.as_deref() == Some(category.id.as_str()))
        .ok_or_else(|| {
            DeliveryBotError::lookup(format!(
                "channel '{channel_name}' in category '{}'",
                category.name
            ))
        })?;

    Ok(ChannelLocation {
        category: category.clone(),
        channel: channel.clone(),
    })
}

/// Fetch the guild's channels and locate the challenge channel.
#[instrument(skip(source), fields(challenge = %code))]
pub async fn locate<S: ChatSource>(source: &S, code: &ChallengeCode) -> Result<ChannelLocation> {
    let channels = source.list_channels().await?;
    let location = locate_in(code, &channels)?;
    info!(
        category = %location.category.name,
        channel = %location.channel.name,
        "located challenge channel"
    );
    Ok(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deliverybot_chat::CATEGORY_KIND;

    fn channel(id: &str, name: &str, kind: u8, parent: Option<&str>) -> Channel {
        Channel {
            id: id.into(),
            name: name.into(),
            kind,
            parent_id: parent.map(String::from),
        }
    }

    fn guild() -> Vec<Channel> {
        vec![
            channel("1", "WEEK 1", CATEGORY_KIND, None),
            channel("2", "Week 2", CATEGORY_KIND, None),
            channel("11", "challenge-1", 0, Some("1")),
            channel("12", "challenge-weekend", 0, Some("1")),
            channel("21", "challenge-1", 0, Some("2")),
        ]
    }

    #[test]
    fn finds_channel_under_its_week() {
        let code: ChallengeCode = "w2ch1".parse().unwrap();
        let loc = locate_in(&code, &guild()).unwrap();
        assert_eq!(loc.category.id, "2");
        assert_eq!(loc.channel.id, "21");
    }

    #[test]
    fn category_match_ignores_case() {
        let code: ChallengeCode = "w1chwe".parse().unwrap();
        let loc = locate_in(&code, &guild()).unwrap();
        assert_eq!(loc.category.name, "WEEK 1");
        assert_eq!(loc.channel.id, "12");
    }

    #[test]
    fn missing_category_is_lookup_error() {
        let code: ChallengeCode = "w7ch1".parse().unwrap();
        let err = locate_in(&code, &guild()).unwrap_err();
        assert!(err.is_lookup());
        assert!(err.to_string().contains("Week 7"));
    }

    #[test]
    fn missing_channel_is_lookup_error() {
        let code: ChallengeCode = "w2chwe".parse().unwrap();
        let err = locate_in(&code, &guild()).unwrap_err();
        assert!(err.is_lookup());
        assert!(err.to_string().contains("challenge-weekend"));
    }
}
