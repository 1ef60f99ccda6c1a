//! # Feature: Local Archives
//!
//! Write-once JSON snapshots of channel messages and guild structure.
//! Every file name embeds the originating guild/channel and a millisecond
//! timestamp that is unique for the lifetime of the process.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, GuildId};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

/// One message as stored in a channel archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedMessage {
    pub id: String,
    pub author_id: String,
    pub author_tag: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub attachments: Vec<String>,
}

/// Channel entry of a guild snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u64,
    pub parent_id: Option<String>,
    pub nsfw: bool,
}

/// Role entry of a guild snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRecord {
    pub id: String,
    pub name: String,
    /// `None` for the default (uncoloured) role colour
    pub color: Option<u32>,
    pub hoist: bool,
    pub position: i64,
    /// Permission bitfield as a decimal string
    pub permissions: String,
}

/// Point-in-time dump of a guild's channels and roles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildSnapshot {
    pub guild_id: String,
    pub guild_name: String,
    pub owner_id: String,
    pub timestamp: DateTime<Utc>,
    pub channel_count: usize,
    pub role_count: usize,
    pub channels: Vec<ChannelRecord>,
    pub roles: Vec<RoleRecord>,
}

impl GuildSnapshot {
    pub fn new(
        guild_id: String,
        guild_name: String,
        owner_id: String,
        channels: Vec<ChannelRecord>,
        roles: Vec<RoleRecord>,
    ) -> Self {
        Self {
            guild_id,
            guild_name,
            owner_id,
            timestamp: Utc::now(),
            channel_count: channels.len(),
            role_count: roles.len(),
            channels,
            roles,
        }
    }
}

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// Current time in milliseconds, strictly increasing across calls
pub fn unique_millis() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// File name for a channel message archive
pub fn message_archive_name(guild_id: Option<GuildId>, channel_id: ChannelId, millis: i64) -> String {
    let guild = guild_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "dm".to_string());
    format!("archive_{}_{}_{}.json", guild, channel_id, millis)
}

/// File name for a guild structure snapshot
pub fn guild_snapshot_name(guild_id: GuildId, millis: i64) -> String {
    format!("nuke_snapshot_{}_{}.json", guild_id, millis)
}

/// Writes JSON snapshots into a single local directory
pub struct ArchiveWriter {
    dir: PathBuf,
}

impl ArchiveWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the archive directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<()> {
        if !tokio::fs::try_exists(&self.dir).await.unwrap_or(false) {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .with_context(|| format!("Failed to create archive directory: {}", self.dir.display()))?;
            info!("Created archive directory {}", self.dir.display());
        }
        Ok(())
    }

    /// Serializes `value` as pretty JSON into `file_name`, returning the full path
    pub async fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        self.ensure_dir().await?;

        let path = self.dir.join(file_name);
        let json = serde_json::to_string_pretty(value)?;

        // create_new keeps archives write-once
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to create archive file: {}", path.display()))?;
        tokio::io::AsyncWriteExt::write_all(&mut file, json.as_bytes())
            .await
            .with_context(|| format!("Failed to write archive file: {}", path.display()))?;

        Ok(path)
    }
}
