//! Production URL checks and HTML validation.
//!
//! Students post the URL where their project is deployed. [`ProdChecker`]
//! issues a GET against it and, when asked, forwards the URL to a W3C Nu
//! compatible validation service and counts the reported errors and warnings.
//!
//! Nothing the remote side does is an error here: a 404 is reported as
//! [`ProdStatus::NotFound`], any other non-2xx as [`ProdStatus::Unexpected`],
//! and a transport failure (DNS, connect, timeout) as
//! [`ProdStatus::Unreachable`]. A failing validator is recorded in
//! [`ProdCheck::validation_error`]. Only a malformed URL surfaces as `Err`.

mod validator;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{info, instrument, warn};
use url::Url;

use deliverybot_shared::{CheckerConfig, DeliveryBotError, Result};

pub use validator::{ValidationMessage, ValidationSummary};

/// Maximum number of redirects to follow for a production URL.
const MAX_REDIRECTS: usize = 5;

/// User-Agent string for check requests.
const USER_AGENT: &str = concat!("DeliveryBot/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// How the production URL answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProdStatus {
    /// 2xx response.
    Ok(u16),
    /// 404: the deploy is missing.
    NotFound,
    /// Any other non-2xx status.
    Unexpected(u16),
    /// The request never got a response.
    Unreachable(String),
}

impl ProdStatus {
    fn from_status(status: StatusCode) -> Self {
        if status.is_success() {
            Self::Ok(status.as_u16())
        } else if status == StatusCode::NOT_FOUND {
            Self::NotFound
        } else {
            Self::Unexpected(status.as_u16())
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Outcome of checking one production URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProdCheck {
    pub url: String,
    pub status: ProdStatus,
    /// Present when validation was requested and the page answered 2xx.
    pub validation: Option<ValidationSummary>,
    /// Set instead of `validation` when the validator could not be used.
    pub validation_error: Option<String>,
}

impl ProdCheck {
    /// A check that never reached the page.
    pub fn unreachable(url: &str, reason: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            status: ProdStatus::Unreachable(reason.into()),
            validation: None,
            validation_error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ProdChecker
// ---------------------------------------------------------------------------

/// HTTP checker for deployed student projects.
pub struct ProdChecker {
    client: Client,
    validator_url: String,
}

impl ProdChecker {
    /// Create a checker from the `[checker]` config section.
    pub fn new(config: &CheckerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DeliveryBotError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            validator_url: config.validator_url.clone(),
        })
    }

    /// GET `url`; when `validate` is set, also run it through the validator.
    #[instrument(skip(self))]
    pub async fn check(&self, url: &str, validate: bool) -> Result<ProdCheck> {
        let parsed = Url::parse(url)
            .map_err(|e| DeliveryBotError::validation(format!("invalid prod URL '{url}': {e}")))?;

        let response = match self.client.get(parsed.as_str()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "prod URL unreachable");
                return Ok(ProdCheck::unreachable(url, e.to_string()));
            }
        };

        let status = ProdStatus::from_status(response.status());
        match &status {
            ProdStatus::Ok(code) => info!(url, code, "prod URL is up"),
            ProdStatus::NotFound => warn!(url, "prod URL answered 404"),
            ProdStatus::Unexpected(code) => warn!(url, code, "prod URL answered unexpected status"),
            ProdStatus::Unreachable(_) => {}
        }

        let mut validation = None;
        let mut validation_error = None;
        if validate && status.is_ok() {
            match validator::validate(&self.client, &self.validator_url, url).await {
                Ok(summary) => {
                    info!(
                        url,
                        errors = summary.errors,
                        warnings = summary.warnings,
                        "HTML validation finished"
                    );
                    validation = Some(summary);
                }
                Err(e) => {
                    warn!(url, error = %e, "HTML validation failed");
                    validation_error = Some(e.to_string());
                }
            }
        }

        Ok(ProdCheck {
            url: url.to_string(),
            status,
            validation,
            validation_error,
        })
    }
}
