//! # Feature: Configuration System
//!
//! Environment-driven configuration for the moderation bot. A `.env` file is
//! loaded by the binary before this module reads anything.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use anyhow::Result;
use log::warn;
use serenity::model::id::{ChannelId, UserId};
use std::env;
use std::path::PathBuf;

/// Command prefix used when `PREFIX` is unset
pub const DEFAULT_PREFIX: &str = "d!";

/// Log filter used when `LOG_LEVEL` is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Bot configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub owner_ids: Vec<UserId>,
    pub prefix: String,
    /// Parsed and reported at startup; nothing is posted to it
    pub mod_log_channel_id: Option<ChannelId>,
    pub log_level: String,
    pub audit_log_path: PathBuf,
    pub archive_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("BOT_TOKEN missing in environment, add it then restart"))?;

        let prefix = lookup("PREFIX")
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        let mod_log_channel_id = lookup("MOD_LOG_CHANNEL_ID")
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| match raw.trim().parse::<u64>() {
                Ok(id) => Some(ChannelId(id)),
                Err(_) => {
                    warn!("Ignoring invalid MOD_LOG_CHANNEL_ID '{}'", raw);
                    None
                }
            });

        Ok(Config {
            bot_token,
            owner_ids: parse_owner_ids(&lookup("OWNER_IDS").unwrap_or_default()),
            prefix,
            mod_log_channel_id,
            log_level: log_level(&lookup),
            audit_log_path: lookup("AUDIT_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("moderation.log")),
            archive_dir: lookup("ARCHIVE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("archives")),
        })
    }

    /// Check whether a user is one of the configured bot owners
    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.owner_ids.contains(&user_id)
    }
}

/// Log filter from `LOG_LEVEL`. Read on its own so the logger can be
/// installed before the rest of the configuration emits warnings.
pub fn log_level<F>(lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("LOG_LEVEL")
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// Parse a comma-separated owner list, skipping blanks and non-numeric entries
pub fn parse_owner_ids(raw: &str) -> Vec<UserId> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.parse::<u64>() {
            Ok(id) => Some(UserId(id)),
            Err(_) => {
                warn!("Ignoring invalid owner id '{}'", entry);
                None
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
