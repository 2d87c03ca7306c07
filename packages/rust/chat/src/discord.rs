//! Discord REST API v10 client.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use deliverybot_shared::{DeliveryBotError, Result};

use crate::{Channel, ChatMessage, ChatSource, Member};

/// User-Agent string; Discord rejects requests without a bot-style agent.
const USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/deliverybot, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Discord caps a single messages page at 100.
const MAX_PAGE_SIZE: usize = 100;

/// Default timeout in seconds for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A [`ChatSource`] bound to one guild.
pub struct DiscordClient {
    client: Client,
    api_base: String,
    token: String,
    guild_id: String,
}

impl DiscordClient {
    /// Create a client for `guild_id` authenticated with a bot token.
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        guild_id: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| DeliveryBotError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            guild_id: guild_id.into(),
        })
    }

    /// GET `path` and decode the JSON body. 404 maps to a lookup error.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let url = format!("{}{path}", self.api_base);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .query(query)
            .send()
            .await
            .map_err(|e| DeliveryBotError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DeliveryBotError::lookup(what));
        }
        if !status.is_success() {
            return Err(DeliveryBotError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DeliveryBotError::Network(format!("{url}: invalid response body: {e}")))
    }
}

impl ChatSource for DiscordClient {
    #[instrument(skip_all, fields(guild = %self.guild_id))]
    async fn list_channels(&self) -> Result<Vec<Channel>> {
        let path = format!("/guilds/{}/channels", self.guild_id);
        let channels: Vec<Channel> = self
            .get_json(&path, &[], &format!("guild {}", self.guild_id))
            .await?;
        debug!(count = channels.len(), "fetched guild channels");
        Ok(channels)
    }

    #[instrument(skip(self))]
    async fn fetch_messages(&self, channel_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let path = format!("/channels/{channel_id}/messages");
        let mut messages: Vec<ChatMessage> = Vec::new();
        let mut before: Option<String> = None;

        while messages.len() < limit {
            let page_size = (limit - messages.len()).min(MAX_PAGE_SIZE);
            let mut query = vec![("limit", page_size.to_string())];
            if let Some(id) = &before {
                query.push(("before", id.clone()));
            }

            let page: Vec<ChatMessage> = self
                .get_json(&path, &query, &format!("channel {channel_id}"))
                .await?;
            let fetched = page.len();
            before = page.last().map(|m| m.id.clone());
            messages.extend(page);

            debug!(fetched, total = messages.len(), "fetched messages page");
            if fetched < page_size {
                break;
            }
        }

        Ok(messages)
    }

    #[instrument(skip(self))]
    async fn fetch_member(&self, user_id: &str) -> Result<Member> {
        let path = format!("/guilds/{}/members/{user_id}", self.guild_id);
        self.get_json(&path, &[], &format!("member {user_id}")).await
    }
}
