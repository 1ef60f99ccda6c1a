//! # Feature: Discord Platform
//!
//! [`ChatPlatform`] over serenity's HTTP client. Guild data is fetched over
//! HTTP on demand, so no gateway cache is required.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use crate::archive::{ArchivedMessage, ChannelRecord, RoleRecord};
use crate::permissions::combine_role_permissions;
use crate::platform::{snowflake_time, ChatPlatform, GuildStructure, IncomingMessage, PostedMessage};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serenity::async_trait;
use serenity::http::Http;
use serenity::model::channel::Channel;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use serenity::model::permissions::Permissions;
use std::path::Path;
use std::sync::Arc;

/// Discord refuses to bulk delete messages older than this many days
pub const BULK_DELETE_MAX_AGE_DAYS: i64 = 14;

/// Ids young enough for bulk deletion at `now`, in their original order
pub fn bulk_deletable<I>(ids: I, now: DateTime<Utc>) -> Vec<MessageId>
where
    I: IntoIterator<Item = MessageId>,
{
    let cutoff = now - Duration::days(BULK_DELETE_MAX_AGE_DAYS);
    ids.into_iter()
        .filter(|id| snowflake_time(id.0) > cutoff)
        .collect()
}

/// Which endpoint a delete needs. The bulk endpoint only accepts 2..=100 ids.
#[derive(Debug, PartialEq, Eq)]
pub enum DeletePlan<'a> {
    Nothing,
    Single(MessageId),
    Bulk(&'a [MessageId]),
}

impl<'a> DeletePlan<'a> {
    pub fn for_ids(ids: &'a [MessageId]) -> Self {
        match ids {
            [] => DeletePlan::Nothing,
            [single] => DeletePlan::Single(*single),
            _ => DeletePlan::Bulk(ids),
        }
    }
}

/// Discord-backed chat platform
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<PostedMessage> {
        let msg = channel_id.say(&self.http, content).await?;
        Ok(PostedMessage::from(&msg))
    }

    async fn reply(&self, source: &IncomingMessage, content: &str) -> Result<PostedMessage> {
        let msg = source
            .channel_id
            .send_message(&self.http, |m| {
                m.content(content)
                    .reference_message((source.channel_id, source.id))
            })
            .await?;
        Ok(PostedMessage::from(&msg))
    }

    async fn edit_message(&self, channel_id: ChannelId, message_id: MessageId, content: &str) -> Result<()> {
        channel_id
            .edit_message(&self.http, message_id, |m| m.content(content))
            .await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()> {
        channel_id.delete_message(&self.http, message_id).await?;
        Ok(())
    }

    async fn bulk_delete_recent(&self, channel_id: ChannelId, count: u64) -> Result<usize> {
        let messages = channel_id
            .messages(&self.http, |retriever| retriever.limit(count))
            .await?;

        let ids = bulk_deletable(messages.iter().map(|m| m.id), Utc::now());

        debug!(
            "Bulk delete in {}: {} fetched, {} young enough",
            channel_id,
            messages.len(),
            ids.len()
        );

        match DeletePlan::for_ids(&ids) {
            DeletePlan::Nothing => {}
            DeletePlan::Single(id) => channel_id.delete_message(&self.http, id).await?,
            DeletePlan::Bulk(ids) => channel_id.delete_messages(&self.http, ids).await?,
        }

        Ok(ids.len())
    }

    async fn fetch_recent_messages(&self, channel_id: ChannelId, limit: u64) -> Result<Vec<ArchivedMessage>> {
        let messages = channel_id
            .messages(&self.http, |retriever| retriever.limit(limit))
            .await?;

        Ok(messages
            .iter()
            .map(|m| ArchivedMessage {
                id: m.id.to_string(),
                author_id: m.author.id.to_string(),
                author_tag: m.author.tag(),
                content: m.content.clone(),
                created_at: snowflake_time(m.id.0),
                attachments: m.attachments.iter().map(|a| a.url.clone()).collect(),
            })
            .collect())
    }

    async fn member_permissions(&self, guild_id: GuildId, user_id: UserId) -> Result<Permissions> {
        let guild = guild_id.to_partial_guild(&self.http).await?;
        let member = guild_id.member(&self.http, user_id).await?;

        let everyone = guild
            .roles
            .get(&RoleId(guild_id.0))
            .map(|role| role.permissions)
            .unwrap_or_else(Permissions::empty);
        let member_roles = member
            .roles
            .iter()
            .filter_map(|role_id| guild.roles.get(role_id))
            .map(|role| role.permissions);

        Ok(combine_role_permissions(
            guild.owner_id == user_id,
            everyone,
            member_roles,
        ))
    }

    async fn send_direct_message(&self, user_id: UserId, content: &str, attachment: Option<&Path>) -> Result<()> {
        let dm = user_id.create_dm_channel(&self.http).await?;
        match attachment {
            Some(path) => {
                dm.id
                    .send_files(&self.http, vec![path], |m| m.content(content))
                    .await?;
            }
            None => {
                dm.say(&self.http, content).await?;
            }
        }
        info!("Sent direct message to {}", user_id);
        Ok(())
    }

    async fn guild_name(&self, guild_id: GuildId) -> Result<String> {
        Ok(guild_id.to_partial_guild(&self.http).await?.name)
    }

    async fn channel_name(&self, channel_id: ChannelId) -> Result<String> {
        match channel_id.to_channel(&self.http).await? {
            Channel::Guild(channel) => Ok(channel.name),
            Channel::Category(category) => Ok(category.name),
            _ => Ok("direct-message".to_string()),
        }
    }

    async fn guild_structure(&self, guild_id: GuildId) -> Result<GuildStructure> {
        let guild = guild_id.to_partial_guild(&self.http).await?;

        let mut channels: Vec<_> = guild_id.channels(&self.http).await?.into_values().collect();
        channels.sort_by_key(|c| (c.position, c.id));

        let mut roles: Vec<_> = guild.roles.values().cloned().collect();
        roles.sort_by_key(|r| (r.position, r.id));

        Ok(GuildStructure {
            id: guild.id,
            name: guild.name.clone(),
            owner_id: guild.owner_id,
            channels: channels
                .into_iter()
                .map(|c| ChannelRecord {
                    id: c.id.to_string(),
                    name: c.name,
                    kind: c.kind.num(),
                    parent_id: c.parent_id.map(|p| p.to_string()),
                    nsfw: c.nsfw,
                })
                .collect(),
            roles: roles
                .into_iter()
                .map(|r| RoleRecord {
                    id: r.id.to_string(),
                    name: r.name,
                    color: (r.colour.0 != 0).then_some(r.colour.0),
                    hoist: r.hoist,
                    position: r.position,
                    permissions: r.permissions.bits().to_string(),
                })
                .collect(),
        })
    }
}
