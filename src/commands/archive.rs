//! Archival commands: channel message archive and the owner-only guild snapshot.
//!
//! `nuke` keeps its historical name but is read-only: it snapshots channels
//! and roles and never deletes, bans, or edits anything.

use super::{parse_leading_int, CommandContext, Invocation};
use crate::archive::{guild_snapshot_name, message_archive_name, unique_millis, GuildSnapshot};
use crate::audit::{AuditAction, AuditRecord};
use anyhow::Result;
use futures::future::join_all;
use log::{error, info};
use serenity::model::id::{GuildId, UserId};
use std::fmt;
use std::path::{Path, PathBuf};

pub const ARCHIVE_DEFAULT: u64 = 50;
pub const ARCHIVE_MAX: u64 = 100;

/// Resolves the archive size: default for missing/invalid/zero, clamped to `1..=ARCHIVE_MAX`
pub fn archive_limit(arg: Option<&str>) -> u64 {
    match arg.and_then(parse_leading_int) {
        None | Some(0) => ARCHIVE_DEFAULT,
        Some(n) => n.clamp(1, ARCHIVE_MAX as i64) as u64,
    }
}

pub async fn archive(ctx: &CommandContext, invocation: &Invocation) -> Result<()> {
    let limit = archive_limit(invocation.arg(0));

    let written = write_message_archive(ctx, invocation, limit).await;
    let (count, file_name) = match written {
        Ok(written) => written,
        Err(e) => {
            error!(
                "Archive of {} messages in {} failed: {:#}",
                limit, invocation.message.channel_id, e
            );
            ctx.reply(invocation, "Failed to archive messages.").await?;
            return Ok(());
        }
    };

    let channel = ctx.channel_label(invocation).await;
    ctx.audit(AuditRecord::now(
        AuditAction::Archive,
        invocation.message.author.tag.clone(),
        format!("in #{} - {} messages -> {}", channel, count, file_name),
    ))
    .await;

    ctx.reply(
        invocation,
        &format!("Archived {} messages to `{}`.", count, display_path(ctx, &file_name)),
    )
    .await?;
    Ok(())
}

async fn write_message_archive(ctx: &CommandContext, invocation: &Invocation, limit: u64) -> Result<(usize, String)> {
    let messages = ctx
        .platform
        .fetch_recent_messages(invocation.message.channel_id, limit)
        .await?;

    let file_name = message_archive_name(
        invocation.message.guild_id,
        invocation.message.channel_id,
        unique_millis(),
    );
    ctx.archives.write_json(&file_name, &messages).await?;

    Ok((messages.len(), file_name))
}

/// Outcome of one owner DM during a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerDelivery {
    pub owner: UserId,
    pub delivered: bool,
}

impl fmt::Display for OwnerDelivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.delivered {
            write!(f, "delivered to {}", self.owner)
        } else {
            write!(f, "failed for {}", self.owner)
        }
    }
}

pub async fn nuke(ctx: &CommandContext, invocation: &Invocation) -> Result<()> {
    // Owner set only; no platform permission lookup
    if !ctx.config.is_owner(invocation.message.author.id) {
        ctx.reply(invocation, "Only the configured bot owner(s) can run this command.")
            .await?;
        return Ok(());
    }

    let Some(guild_id) = invocation.message.guild_id else {
        ctx.reply(invocation, "This command must be run in a server (guild).")
            .await?;
        return Ok(());
    };

    let (snapshot, path, file_name) = match write_guild_snapshot(ctx, guild_id).await {
        Ok(written) => written,
        Err(e) => {
            error!("Snapshot of guild {} failed: {:#}", guild_id, e);
            ctx.reply(invocation, "Failed to create safe snapshot.").await?;
            return Ok(());
        }
    };
    info!(
        "Wrote snapshot of {} ({} channels, {} roles) to {}",
        snapshot.guild_name,
        snapshot.channel_count,
        snapshot.role_count,
        path.display()
    );

    let notice = format!(
        "Safe snapshot for server **{}** ({}) - requested by {}",
        snapshot.guild_name, snapshot.guild_id, invocation.message.author.tag
    );
    let deliveries = deliver_to_owners(ctx, &ctx.config.owner_ids, &notice, &path).await;

    ctx.reply(
        invocation,
        &format!(
            "Safe snapshot created and sent to owners. File: `{}`",
            display_path(ctx, &file_name)
        ),
    )
    .await?;

    let outcomes = if deliveries.is_empty() {
        "none".to_string()
    } else {
        deliveries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    };
    ctx.audit(AuditRecord::now(
        AuditAction::SafeNuke,
        invocation.message.author.tag.clone(),
        format!(
            "in {} -> {} | owner DM results: {}",
            snapshot.guild_name, file_name, outcomes
        ),
    ))
    .await;

    Ok(())
}

async fn write_guild_snapshot(
    ctx: &CommandContext,
    guild_id: GuildId,
) -> Result<(GuildSnapshot, PathBuf, String)> {
    let structure = ctx.platform.guild_structure(guild_id).await?;
    let snapshot = GuildSnapshot::new(
        structure.id.to_string(),
        structure.name,
        structure.owner_id.to_string(),
        structure.channels,
        structure.roles,
    );

    let file_name = guild_snapshot_name(guild_id, unique_millis());
    let path = ctx.archives.write_json(&file_name, &snapshot).await?;

    Ok((snapshot, path, file_name))
}

/// DMs every owner concurrently. One failure never cancels the others;
/// outcomes come back in owner order.
async fn deliver_to_owners(
    ctx: &CommandContext,
    owners: &[UserId],
    notice: &str,
    attachment: &Path,
) -> Vec<OwnerDelivery> {
    let platform = ctx.platform.as_ref();

    join_all(owners.iter().map(|&owner| async move {
        match platform
            .send_direct_message(owner, notice, Some(attachment))
            .await
        {
            Ok(()) => OwnerDelivery {
                owner,
                delivered: true,
            },
            Err(e) => {
                error!("Snapshot DM to owner {} failed: {:#}", owner, e);
                OwnerDelivery {
                    owner,
                    delivered: false,
                }
            }
        }
    }))
    .await
}

/// Archive file path as shown in replies
fn display_path(ctx: &CommandContext, file_name: &str) -> String {
    ctx.archives.dir().join(file_name).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_limit() {
        assert_eq!(archive_limit(None), 50);
        assert_eq!(archive_limit(Some("abc")), 50);
        assert_eq!(archive_limit(Some("0")), 50);
        assert_eq!(archive_limit(Some("10")), 10);
        assert_eq!(archive_limit(Some("100")), 100);
        assert_eq!(archive_limit(Some("250")), 100);
        assert_eq!(archive_limit(Some("-4")), 1);
    }

    #[test]
    fn test_owner_delivery_display() {
        let ok = OwnerDelivery {
            owner: UserId(1),
            delivered: true,
        };
        let failed = OwnerDelivery {
            owner: UserId(2),
            delivered: false,
        };
        assert_eq!(ok.to_string(), "delivered to 1");
        assert_eq!(failed.to_string(), "failed for 2");
    }
}
