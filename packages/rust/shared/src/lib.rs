//! Shared types, error model, and configuration for DeliveryBot.
//!
//! This crate is the foundation depended on by all other DeliveryBot crates.
//! It provides:
//! - [`DeliveryBotError`]: the unified error type
//! - Domain types ([`ChallengeCode`], [`Submission`], [`ParsedLine`])
//! - Configuration ([`AppConfig`], config loading, env overrides)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CheckerConfig, DatabaseConfig, DiscordConfig, PathsConfig, RosterConfig,
    apply_env_overrides, config_dir, config_file_path, expand_home, init_config, load_config,
    load_config_from, resolve_token, validate_for_collect,
};
pub use error::{DeliveryBotError, Result};
pub use types::{ChallengeCode, ChallengeSlot, ParsedLine, RepoSide, Submission};
