//! Application configuration for DeliveryBot.
//!
//! User config lives at `~/.deliverybot/deliverybot.toml`.
//! Environment variables override config file values, which override defaults.
//! CLI flags override both.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DeliveryBotError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "deliverybot.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".deliverybot";

/// Env var overriding `[paths] bootcamp_path`.
pub const BOOTCAMP_PATH_ENV: &str = "BOOTCAMP_PATH";

/// Env var overriding `[paths] bootcamp`.
pub const BOOTCAMP_ENV: &str = "BOOTCAMP";

/// Env var overriding `[database] path`.
pub const DATABASE_ENV: &str = "DELIVERYBOT_DB";

// ---------------------------------------------------------------------------
// Config structs (matching deliverybot.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat platform access.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Where submissions get cloned.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Production URL checks.
    #[serde(default)]
    pub checker: CheckerConfig,

    /// Student roster.
    #[serde(default)]
    pub roster: RosterConfig,

    /// Optional persistence of challenge/project records.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// `[discord]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Guild (server) holding the week categories.
    #[serde(default)]
    pub guild_id: String,

    /// Name of the env var holding the bot token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Display name of the bot that forwards submissions on behalf of students.
    #[serde(default = "default_forwarder_name")]
    pub forwarder_name: String,

    /// Maximum number of channel messages to fetch.
    #[serde(default = "default_message_limit")]
    pub message_limit: usize,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            guild_id: String::new(),
            token_env: default_token_env(),
            api_base: default_api_base(),
            forwarder_name: default_forwarder_name(),
            message_limit: default_message_limit(),
        }
    }
}

fn default_token_env() -> String {
    "DISCORD_TOKEN".into()
}
fn default_api_base() -> String {
    "https://discord.com/api/v10".into()
}
fn default_forwarder_name() -> String {
    "Delivery Cat".into()
}
fn default_message_limit() -> usize {
    200
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root directory holding every bootcamp checkout.
    #[serde(default = "default_bootcamp_path")]
    pub bootcamp_path: String,

    /// Bootcamp (edition) directory under `bootcamp_path`.
    #[serde(default)]
    pub bootcamp: String,

    /// Git executable used for clones.
    #[serde(default = "default_git_cmd")]
    pub git_cmd: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            bootcamp_path: default_bootcamp_path(),
            bootcamp: String::new(),
            git_cmd: default_git_cmd(),
        }
    }
}

fn default_bootcamp_path() -> String {
    "~/bootcamps".into()
}
fn default_git_cmd() -> String {
    "git".into()
}

/// `[checker]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// HTML validation service endpoint (W3C Nu compatible).
    #[serde(default = "default_validator_url")]
    pub validator_url: String,

    /// Timeout in seconds for production and validator requests.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            validator_url: default_validator_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_validator_url() -> String {
    "https://validator.w3.org/nu/".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[roster]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Plain-text roster file, one student per line.
    #[serde(default = "default_roster_path")]
    pub path: String,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            path: default_roster_path(),
        }
    }
}

fn default_roster_path() -> String {
    "~/.deliverybot/roster.txt".into()
}

/// `[database]` section. Persistence is off unless a path is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.deliverybot/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DeliveryBotError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.deliverybot/deliverybot.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk, then apply env overrides.
/// Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    let mut config = if path.exists() {
        load_config_from(&path)?
    } else {
        tracing::debug!(?path, "config file not found, using defaults");
        AppConfig::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DeliveryBotError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DeliveryBotError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Apply `BOOTCAMP_PATH`, `BOOTCAMP` and `DELIVERYBOT_DB` on top of file values.
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty(BOOTCAMP_PATH_ENV) {
        config.paths.bootcamp_path = v;
    }
    if let Some(v) = non_empty(BOOTCAMP_ENV) {
        config.paths.bootcamp = v;
    }
    if let Some(v) = non_empty(DATABASE_ENV) {
        config.database.path = Some(v);
    }
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DeliveryBotError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DeliveryBotError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DeliveryBotError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the Discord bot token from the configured env var.
pub fn resolve_token(config: &AppConfig) -> Result<String> {
    let var_name = &config.discord.token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(DeliveryBotError::config(format!(
            "Discord token not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check the settings a `collect` run cannot do without.
pub fn validate_for_collect(config: &AppConfig) -> Result<()> {
    if config.discord.guild_id.trim().is_empty() {
        return Err(DeliveryBotError::config(
            "[discord] guild_id is not set; run `deliverybot config init` and edit the file",
        ));
    }
    if config.paths.bootcamp.trim().is_empty() {
        return Err(DeliveryBotError::config(format!(
            "[paths] bootcamp is not set (or export {BOOTCAMP_ENV})"
        )));
    }
    Ok(())
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
