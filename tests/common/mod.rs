//! Shared fixtures for the integration tests: a recording platform fake and
//! a throwaway directory for audit/archive files.

#![allow(dead_code)]

use anyhow::Result;
use chrono::{TimeZone, Utc};
use modkeeper::archive::{ArchiveWriter, ArchivedMessage, ChannelRecord, RoleRecord};
use modkeeper::audit::AuditLog;
use modkeeper::config::Config;
use modkeeper::platform::{Author, ChatPlatform, GuildStructure, IncomingMessage, PostedMessage, DISCORD_EPOCH_MS};
use modkeeper::CommandContext;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use serenity::model::permissions::Permissions;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const GUILD: GuildId = GuildId(100);
pub const CHANNEL: ChannelId = ChannelId(200);
pub const INVOKER: UserId = UserId(300);
pub const TARGET: UserId = UserId(400);

/// Every call the fake received, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send { channel: ChannelId, content: String },
    Reply { content: String },
    Edit { message: MessageId, content: String },
    Delete { message: MessageId },
    BulkDelete { count: u64 },
    Fetch { limit: u64 },
    Permissions { user: UserId },
    DirectMessage { user: UserId, content: String, attachment: Option<PathBuf> },
    GuildName,
    ChannelName,
    GuildStructure,
}

pub struct FakePlatform {
    pub calls: Mutex<Vec<Call>>,
    pub next_sequence: AtomicU64,
    pub permissions: Permissions,
    /// Channel history, newest first
    pub history: Vec<ArchivedMessage>,
    pub failing_dms: HashSet<UserId>,
    pub fail_bulk_delete: bool,
    pub fail_fetch: bool,
    pub guild: Option<GuildStructure>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_sequence: AtomicU64::new(1),
            permissions: Permissions::empty(),
            history: Vec::new(),
            failing_dms: HashSet::new(),
            fail_bulk_delete: false,
            fail_fetch: false,
            guild: None,
        }
    }
}

impl FakePlatform {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn direct_messages(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::DirectMessage { .. }))
            .collect()
    }

    pub fn has_bulk_delete(&self) -> bool {
        self.calls().iter().any(|c| matches!(c, Call::BulkDelete { .. }))
    }

    pub fn replies(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Reply { content } => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn sent(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send { content, .. } => Some(content),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn posted(&self, channel_id: ChannelId) -> PostedMessage {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        PostedMessage {
            id: MessageId(snowflake_now() + sequence),
            channel_id,
        }
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<PostedMessage> {
        self.record(Call::Send {
            channel: channel_id,
            content: content.to_string(),
        });
        Ok(self.posted(channel_id))
    }

    async fn reply(&self, source: &IncomingMessage, content: &str) -> Result<PostedMessage> {
        self.record(Call::Reply {
            content: content.to_string(),
        });
        Ok(self.posted(source.channel_id))
    }

    async fn edit_message(&self, _channel_id: ChannelId, message_id: MessageId, content: &str) -> Result<()> {
        self.record(Call::Edit {
            message: message_id,
            content: content.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, _channel_id: ChannelId, message_id: MessageId) -> Result<()> {
        self.record(Call::Delete { message: message_id });
        Ok(())
    }

    async fn bulk_delete_recent(&self, _channel_id: ChannelId, count: u64) -> Result<usize> {
        self.record(Call::BulkDelete { count });
        if self.fail_bulk_delete {
            anyhow::bail!("Messages older than 14 days");
        }
        Ok(self.history.len().min(count as usize))
    }

    async fn fetch_recent_messages(&self, _channel_id: ChannelId, limit: u64) -> Result<Vec<ArchivedMessage>> {
        self.record(Call::Fetch { limit });
        if self.fail_fetch {
            anyhow::bail!("Missing access");
        }
        Ok(self.history.iter().take(limit as usize).cloned().collect())
    }

    async fn member_permissions(&self, _guild_id: GuildId, user_id: UserId) -> Result<Permissions> {
        self.record(Call::Permissions { user: user_id });
        Ok(self.permissions)
    }

    async fn send_direct_message(&self, user_id: UserId, content: &str, attachment: Option<&Path>) -> Result<()> {
        self.record(Call::DirectMessage {
            user: user_id,
            content: content.to_string(),
            attachment: attachment.map(Path::to_path_buf),
        });
        if self.failing_dms.contains(&user_id) {
            anyhow::bail!("Cannot send messages to this user");
        }
        Ok(())
    }

    async fn guild_name(&self, _guild_id: GuildId) -> Result<String> {
        self.record(Call::GuildName);
        Ok("Test Guild".to_string())
    }

    async fn channel_name(&self, _channel_id: ChannelId) -> Result<String> {
        self.record(Call::ChannelName);
        Ok("general".to_string())
    }

    async fn guild_structure(&self, _guild_id: GuildId) -> Result<GuildStructure> {
        self.record(Call::GuildStructure);
        self.guild
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Unknown guild"))
    }
}

/// Snowflake for the current instant
pub fn snowflake_now() -> u64 {
    let millis = Utc::now().timestamp_millis() as u64 - DISCORD_EPOCH_MS;
    millis << 22
}

/// Temporary directory removed on drop
pub struct Sandbox {
    pub dir: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("modkeeper-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    pub fn audit_path(&self) -> PathBuf {
        self.dir.join("moderation.log")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.dir.join("archives")
    }

    pub fn audit_lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.audit_path())
            .map(|content| content.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn archive_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.archive_dir())
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default();
        files.sort();
        files
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

pub fn config(owners: &[UserId]) -> Config {
    Config {
        bot_token: "token".to_string(),
        owner_ids: owners.to_vec(),
        prefix: "d!".to_string(),
        mod_log_channel_id: None,
        log_level: "debug".to_string(),
        audit_log_path: PathBuf::from("unused.log"),
        archive_dir: PathBuf::from("unused"),
    }
}

pub fn context(platform: Arc<FakePlatform>, sandbox: &Sandbox, owners: &[UserId]) -> CommandContext {
    CommandContext {
        platform,
        config: Arc::new(config(owners)),
        audit: Arc::new(AuditLog::new(sandbox.audit_path())),
        archives: Arc::new(ArchiveWriter::new(sandbox.archive_dir())),
    }
}

pub fn author(id: UserId, tag: &str) -> Author {
    Author {
        id,
        tag: tag.to_string(),
        bot: false,
    }
}

/// A guild message from the default invoker
pub fn message(content: &str) -> IncomingMessage {
    IncomingMessage {
        id: MessageId(snowflake_now()),
        channel_id: CHANNEL,
        guild_id: Some(GUILD),
        author: author(INVOKER, "mod#0001"),
        content: content.to_string(),
        mentions: Vec::new(),
    }
}

pub fn history(count: usize) -> Vec<ArchivedMessage> {
    (0..count)
        .map(|i| ArchivedMessage {
            id: (1000 + count - i).to_string(),
            author_id: "500".to_string(),
            author_tag: "chatter#1111".to_string(),
            content: format!("message {}", count - i),
            created_at: Utc.timestamp_opt(1_700_000_000 - i as i64, 0).unwrap(),
            attachments: if i == 0 {
                vec!["https://cdn.example/file.png".to_string()]
            } else {
                Vec::new()
            },
        })
        .collect()
}

pub fn guild_structure() -> GuildStructure {
    GuildStructure {
        id: GUILD,
        name: "Test Guild".to_string(),
        owner_id: UserId(999),
        channels: vec![
            ChannelRecord {
                id: "201".to_string(),
                name: "Text Channels".to_string(),
                kind: 4,
                parent_id: None,
                nsfw: false,
            },
            ChannelRecord {
                id: "200".to_string(),
                name: "general".to_string(),
                kind: 0,
                parent_id: Some("201".to_string()),
                nsfw: false,
            },
            ChannelRecord {
                id: "202".to_string(),
                name: "after-dark".to_string(),
                kind: 0,
                parent_id: Some("201".to_string()),
                nsfw: true,
            },
        ],
        roles: vec![
            RoleRecord {
                id: "100".to_string(),
                name: "@everyone".to_string(),
                color: None,
                hoist: false,
                position: 0,
                permissions: "104324673".to_string(),
            },
            RoleRecord {
                id: "150".to_string(),
                name: "Moderators".to_string(),
                color: Some(0x3498db),
                hoist: true,
                position: 1,
                permissions: "8".to_string(),
            },
        ],
    }
}
