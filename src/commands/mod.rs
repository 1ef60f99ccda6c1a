//! Prefix command parsing and dispatch.
//!
//! Every inbound message goes through [`dispatch`]: it is parsed into an
//! [`Invocation`] and handed to exactly one handler.

pub mod archive;
pub mod moderation;
pub mod utility;

use crate::archive::ArchiveWriter;
use crate::audit::{AuditLog, AuditRecord};
use crate::config::Config;
use crate::platform::{ChatPlatform, IncomingMessage, PostedMessage};
use anyhow::Result;
use log::{debug, error};
use std::sync::Arc;

/// Every command the bot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Help,
    Prune,
    Archive,
    Warn,
    Nuke,
    Unknown,
}

impl Command {
    /// Maps a lowercased command token to its command
    pub fn from_token(token: &str) -> Self {
        match token {
            "ping" => Command::Ping,
            "help" => Command::Help,
            "prune" => Command::Prune,
            "archive" => Command::Archive,
            "warn" => Command::Warn,
            "nuke" => Command::Nuke,
            _ => Command::Unknown,
        }
    }
}

/// One parsed command event
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: Command,
    pub args: Vec<String>,
    pub message: IncomingMessage,
}

impl Invocation {
    /// Parses a message into an invocation.
    ///
    /// Returns `None` for bot authors and for messages without the prefix.
    pub fn parse(prefix: &str, message: IncomingMessage) -> Option<Self> {
        if message.author.bot {
            return None;
        }
        let rest = message.content.strip_prefix(prefix)?;

        let mut tokens = rest.split_whitespace();
        let command = tokens
            .next()
            .map(|token| Command::from_token(&token.to_lowercase()))
            .unwrap_or(Command::Unknown);
        let args = tokens.map(str::to_string).collect();

        Some(Self {
            command,
            args,
            message,
        })
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

/// Everything a handler may touch
#[derive(Clone)]
pub struct CommandContext {
    pub platform: Arc<dyn ChatPlatform>,
    pub config: Arc<Config>,
    pub audit: Arc<AuditLog>,
    pub archives: Arc<ArchiveWriter>,
}

impl CommandContext {
    pub async fn reply(&self, invocation: &Invocation, content: &str) -> Result<PostedMessage> {
        self.platform.reply(&invocation.message, content).await
    }

    pub async fn say(&self, invocation: &Invocation, content: &str) -> Result<PostedMessage> {
        self.platform
            .send_message(invocation.message.channel_id, content)
            .await
    }

    pub async fn audit(&self, record: AuditRecord) {
        self.audit.record(record).await;
    }

    /// Channel name for audit lines, falling back to the raw id
    pub async fn channel_label(&self, invocation: &Invocation) -> String {
        let channel_id = invocation.message.channel_id;
        match self.platform.channel_name(channel_id).await {
            Ok(name) => name,
            Err(e) => {
                error!("Failed to resolve name of channel {}: {:#}", channel_id, e);
                channel_id.to_string()
            }
        }
    }
}

/// Routes one inbound message. Messages that are not commands are ignored.
pub async fn dispatch(ctx: &CommandContext, message: IncomingMessage) -> Result<()> {
    let Some(invocation) = Invocation::parse(&ctx.config.prefix, message) else {
        return Ok(());
    };

    debug!(
        "{:?} from {} in {} ({} args)",
        invocation.command,
        invocation.message.author.tag,
        invocation.message.channel_id,
        invocation.args.len()
    );

    match invocation.command {
        Command::Ping => utility::ping(ctx, &invocation).await,
        Command::Help => utility::help(ctx, &invocation).await,
        Command::Prune => moderation::prune(ctx, &invocation).await,
        Command::Archive => archive::archive(ctx, &invocation).await,
        Command::Warn => moderation::warn(ctx, &invocation).await,
        Command::Nuke => archive::nuke(ctx, &invocation).await,
        Command::Unknown => utility::unknown(ctx, &invocation).await,
    }
}

/// Parses the leading integer of a token: optional sign followed by digits.
///
/// `"12abc"` is 12, `"abc"` and `"-"` are `None`.
pub fn parse_leading_int(token: &str) -> Option<i64> {
    let token = token.trim_start();
    let (negative, digits) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Saturate absurdly long inputs instead of rejecting them
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}
