//! Client for a W3C Nu compatible HTML validation service.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use deliverybot_shared::{DeliveryBotError, Result};

/// A single diagnostic returned by the validator.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, rename = "subType")]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl ValidationMessage {
    fn is_error(&self) -> bool {
        self.kind == "error"
    }

    fn is_warning(&self) -> bool {
        self.kind == "info" && self.sub_type.as_deref() == Some("warning")
    }
}

#[derive(Debug, Deserialize)]
struct ValidatorResponse {
    #[serde(default)]
    messages: Vec<ValidationMessage>,
}

/// Error and warning counts for one validated page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub errors: usize,
    pub warnings: usize,
}

impl ValidationSummary {
    fn from_messages(messages: &[ValidationMessage]) -> Self {
        messages.iter().fold(Self::default(), |mut acc, m| {
            if m.is_error() {
                acc.errors += 1;
            } else if m.is_warning() {
                acc.warnings += 1;
            }
            acc
        })
    }
}

/// Ask the validator at `validator_url` to check the page at `doc_url`.
pub(crate) async fn validate(
    client: &Client,
    validator_url: &str,
    doc_url: &str,
) -> Result<ValidationSummary> {
    let response = client
        .get(validator_url)
        .query(&[("doc", doc_url), ("out", "json")])
        .send()
        .await
        .map_err(|e| DeliveryBotError::Network(format!("validator: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DeliveryBotError::Network(format!(
            "validator: HTTP {status} for {doc_url}"
        )));
    }

    let body: ValidatorResponse = response
        .json()
        .await
        .map_err(|e| DeliveryBotError::Network(format!("validator: invalid response: {e}")))?;

    debug!(messages = body.messages.len(), "validator responded");
    Ok(ValidationSummary::from_messages(&body.messages))
}
