//! Error types for DeliveryBot.
//!
//! Library crates use [`DeliveryBotError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all DeliveryBot operations.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryBotError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the chat platform or a checked URL.
    #[error("network error: {0}")]
    Network(String),

    /// A category, channel or member could not be found.
    #[error("not found: {what}")]
    Lookup { what: String },

    /// Message text or challenge code could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// `git clone` failed for a submitted repository.
    #[error("could not clone the repo {url}: {detail}")]
    Clone { url: String, detail: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (malformed input, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DeliveryBotError>;

impl DeliveryBotError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a lookup (not found) error.
    pub fn lookup(what: impl Into<String>) -> Self {
        Self::Lookup { what: what.into() }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a clone error for `url`.
    pub fn clone_failed(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Clone {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should abort a whole run rather than a single message.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup { .. })
    }
}
