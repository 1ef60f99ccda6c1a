//! Chat platform capability consumed by the command handlers.
//!
//! Handlers never talk to serenity directly; they go through [`ChatPlatform`],
//! which is implemented for Discord in [`crate::discord`] and by a recording
//! fake in the integration tests.

use crate::archive::{ArchivedMessage, ChannelRecord, RoleRecord};
use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use serenity::model::permissions::Permissions;
use serenity::model::user::User;
use std::path::Path;

/// Discord epoch (2015-01-01T00:00:00Z) in unix milliseconds
pub const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Creation time encoded in a snowflake id, in unix milliseconds
pub fn snowflake_millis(id: u64) -> i64 {
    ((id >> 22) + DISCORD_EPOCH_MS) as i64
}

/// Creation time encoded in a snowflake id
pub fn snowflake_time(id: u64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(snowflake_millis(id))
        .single()
        .unwrap_or_else(Utc::now)
}

/// A user as seen by the handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub tag: String,
    pub bot: bool,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            tag: user.tag(),
            bot: user.bot,
        }
    }
}

/// An inbound text message, reduced to what command handling needs
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub author: Author,
    pub content: String,
    pub mentions: Vec<Author>,
}

impl IncomingMessage {
    pub fn created_at_millis(&self) -> i64 {
        snowflake_millis(self.id.0)
    }
}

impl From<&Message> for IncomingMessage {
    fn from(msg: &Message) -> Self {
        Self {
            id: msg.id,
            channel_id: msg.channel_id,
            guild_id: msg.guild_id,
            author: Author::from(&msg.author),
            content: msg.content.clone(),
            mentions: msg.mentions.iter().map(Author::from).collect(),
        }
    }
}

/// A message the bot has posted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostedMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
}

impl PostedMessage {
    pub fn created_at_millis(&self) -> i64 {
        snowflake_millis(self.id.0)
    }
}

impl From<&Message> for PostedMessage {
    fn from(msg: &Message) -> Self {
        Self {
            id: msg.id,
            channel_id: msg.channel_id,
        }
    }
}

/// Channels and roles of a guild, as read from the platform
#[derive(Debug, Clone)]
pub struct GuildStructure {
    pub id: GuildId,
    pub name: String,
    pub owner_id: UserId,
    pub channels: Vec<ChannelRecord>,
    pub roles: Vec<RoleRecord>,
}

/// Every platform operation the command handlers rely on
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Posts a plain message in a channel
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<PostedMessage>;

    /// Posts a message that replies to `source`
    async fn reply(&self, source: &IncomingMessage, content: &str) -> Result<PostedMessage>;

    async fn edit_message(&self, channel_id: ChannelId, message_id: MessageId, content: &str) -> Result<()>;

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()>;

    /// Deletes up to `count` of the most recent messages, skipping ones too old
    /// to bulk delete. Returns how many were deleted.
    async fn bulk_delete_recent(&self, channel_id: ChannelId, count: u64) -> Result<usize>;

    /// Fetches up to `limit` of the most recent messages, newest first
    async fn fetch_recent_messages(&self, channel_id: ChannelId, limit: u64) -> Result<Vec<ArchivedMessage>>;

    /// Guild-level permissions of a member
    async fn member_permissions(&self, guild_id: GuildId, user_id: UserId) -> Result<Permissions>;

    /// Sends a direct message, optionally attaching a local file
    async fn send_direct_message(&self, user_id: UserId, content: &str, attachment: Option<&Path>) -> Result<()>;

    async fn guild_name(&self, guild_id: GuildId) -> Result<String>;

    async fn channel_name(&self, channel_id: ChannelId) -> Result<String>;

    async fn guild_structure(&self, guild_id: GuildId) -> Result<GuildStructure>;
}
