//! Utility commands: ping, help, and the unknown-command fallback

use super::{CommandContext, Invocation};
use anyhow::Result;

/// Replies with the round trip between the command and the bot's answer
pub async fn ping(ctx: &CommandContext, invocation: &Invocation) -> Result<()> {
    let sent = ctx.say(invocation, "Pinging...").await?;
    let latency = sent.created_at_millis() - invocation.message.created_at_millis();

    ctx.platform
        .edit_message(sent.channel_id, sent.id, &format!("Pong! Latency: {}ms", latency))
        .await
}

pub async fn help(ctx: &CommandContext, invocation: &Invocation) -> Result<()> {
    ctx.say(invocation, &help_text(&ctx.config.prefix)).await?;
    Ok(())
}

pub async fn unknown(ctx: &CommandContext, invocation: &Invocation) -> Result<()> {
    ctx.reply(
        invocation,
        &format!(
            "Unknown command. Use `{}help` to see available commands.",
            ctx.config.prefix
        ),
    )
    .await?;
    Ok(())
}

/// Help text listing every command
pub fn help_text(prefix: &str) -> String {
    format!(
        "**Available commands (safe demo):**\n\
         `{p}ping` - latency check\n\
         `{p}help` - show this message\n\
         `{p}prune <1-50>` - bulk delete recent messages (requires Manage Messages)\n\
         `{p}archive [count]` - archive the last N messages (1-100, default 50) to a local file\n\
         `{p}warn @user <reason>` - DM a user a warning and log it (requires Kick Members)\n\
         `{p}nuke` - owner-only **safe** archive snapshot (does NOT delete or ban)",
        p = prefix
    )
}
