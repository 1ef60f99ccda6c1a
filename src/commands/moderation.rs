//! Moderation commands: prune and warn
//!
//! Both require a platform permission. Warn never mutates the target: its
//! only durable effects are the DM attempt and the audit line.

use super::{parse_leading_int, CommandContext, Invocation};
use crate::audit::{AuditAction, AuditRecord};
use crate::permissions::{AuthorizationContext, Capability};
use crate::platform::{ChatPlatform, PostedMessage};
use anyhow::Result;
use log::{error, warn};
use std::sync::Arc;
use std::time::Duration;

/// Largest prune request accepted
pub const PRUNE_MAX: u64 = 50;

/// How long the prune confirmation stays visible
pub const CONFIRMATION_TTL: Duration = Duration::from_secs(5);

pub const DEFAULT_WARN_REASON: &str = "No reason provided";

/// Validates the prune argument. Only whole numbers in `1..=PRUNE_MAX` pass.
pub fn prune_count(arg: Option<&str>) -> Option<u64> {
    let value = arg.and_then(parse_leading_int)?;
    (1..=PRUNE_MAX as i64)
        .contains(&value)
        .then_some(value as u64)
}

/// Reason text: every argument after the mention
pub fn warn_reason(args: &[String]) -> String {
    let reason = args.iter().skip(1).map(String::as_str).collect::<Vec<_>>().join(" ");
    if reason.is_empty() {
        DEFAULT_WARN_REASON.to_string()
    } else {
        reason
    }
}

pub async fn prune(ctx: &CommandContext, invocation: &Invocation) -> Result<()> {
    let auth = AuthorizationContext::resolve(ctx.platform.as_ref(), &invocation.message).await;
    if !auth.allows(Capability::ManageMessages) {
        ctx.reply(
            invocation,
            &format!("You need the {} permission to use this.", Capability::ManageMessages),
        )
        .await?;
        return Ok(());
    }

    let Some(count) = prune_count(invocation.arg(0)) else {
        ctx.reply(
            invocation,
            &format!("Usage: {}prune <1-{}>", ctx.config.prefix, PRUNE_MAX),
        )
        .await?;
        return Ok(());
    };

    // One extra for the command message itself
    let deleted = match ctx
        .platform
        .bulk_delete_recent(invocation.message.channel_id, count + 1)
        .await
    {
        Ok(deleted) => deleted.saturating_sub(1),
        Err(e) => {
            error!(
                "Prune of {} messages in {} failed: {:#}",
                count, invocation.message.channel_id, e
            );
            ctx.reply(
                invocation,
                "Could not prune messages. Note: messages older than 14 days cannot be bulk deleted.",
            )
            .await?;
            return Ok(());
        }
    };

    let channel = ctx.channel_label(invocation).await;
    ctx.audit(AuditRecord::now(
        AuditAction::Prune,
        invocation.message.author.tag.clone(),
        format!("in #{} - {} messages", channel, deleted),
    ))
    .await;

    let confirmation = ctx
        .say(invocation, &format!("Safely deleted {} messages.", deleted))
        .await?;
    delete_after(ctx.platform.clone(), confirmation, CONFIRMATION_TTL);

    Ok(())
}

/// Deletes a message once `delay` has passed, on a detached task
fn delete_after(platform: Arc<dyn ChatPlatform>, message: PostedMessage, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = platform.delete_message(message.channel_id, message.id).await {
            warn!("Failed to remove confirmation {}: {:#}", message.id, e);
        }
    });
}

pub async fn warn(ctx: &CommandContext, invocation: &Invocation) -> Result<()> {
    let auth = AuthorizationContext::resolve(ctx.platform.as_ref(), &invocation.message).await;
    if !auth.allows(Capability::KickMembers) {
        ctx.reply(
            invocation,
            &format!("You need the {} permission to warn users.", Capability::KickMembers),
        )
        .await?;
        return Ok(());
    }

    let Some(target) = invocation.message.mentions.first() else {
        ctx.reply(
            invocation,
            &format!("Usage: {}warn @user <reason>", ctx.config.prefix),
        )
        .await?;
        return Ok(());
    };

    let reason = warn_reason(&invocation.args);
    let server = match invocation.message.guild_id {
        Some(guild_id) => ctx.platform.guild_name(guild_id).await.unwrap_or_else(|e| {
            warn!("Failed to resolve name of guild {}: {:#}", guild_id, e);
            "a server".to_string()
        }),
        None => "a server".to_string(),
    };

    let notice = format!("You have been warned in **{}** for: {}", server, reason);
    let details = format!("-> {} | {}", target.tag, reason);
    let actor = invocation.message.author.tag.clone();

    match ctx.platform.send_direct_message(target.id, &notice, None).await {
        Ok(()) => {
            ctx.audit(AuditRecord::now(AuditAction::Warn, actor, details)).await;
            ctx.say(invocation, &format!("{} has been warned (DM sent).", target.tag))
                .await?;
        }
        Err(e) => {
            error!("Warning DM to {} failed: {:#}", target.tag, e);
            ctx.audit(AuditRecord::now(AuditAction::WarnDmFailed, actor, details))
                .await;
            ctx.reply(
                invocation,
                "Could not DM the user (they may have DMs disabled). Warning logged anyway.",
            )
            .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_count_bounds() {
        assert_eq!(prune_count(Some("1")), Some(1));
        assert_eq!(prune_count(Some("50")), Some(50));
        assert_eq!(prune_count(Some("7msgs")), Some(7));
        assert_eq!(prune_count(Some("0")), None);
        assert_eq!(prune_count(Some("51")), None);
        assert_eq!(prune_count(Some("-3")), None);
        assert_eq!(prune_count(Some("many")), None);
        assert_eq!(prune_count(None), None);
    }

    #[test]
    fn test_warn_reason() {
        let args = |s: &[&str]| s.iter().map(|a| a.to_string()).collect::<Vec<_>>();
        assert_eq!(warn_reason(&args(&["<@1>", "being", "Rude"])), "being Rude");
        assert_eq!(warn_reason(&args(&["<@1>"])), DEFAULT_WARN_REASON);
        assert_eq!(warn_reason(&[]), DEFAULT_WARN_REASON);
    }
}
