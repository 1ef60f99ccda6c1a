//! Discord gateway entry point
//!
//! Configuration comes from environment variables, optionally loaded from a
//! `.env` file in the working directory.

use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use std::env;
use std::sync::Arc;

use modkeeper::archive::ArchiveWriter;
use modkeeper::audit::AuditLog;
use modkeeper::discord::DiscordPlatform;
use modkeeper::platform::IncomingMessage;
use modkeeper::config;
use modkeeper::{dispatch, CommandContext, Config};

/// Gateway event handler; builds a command context per event
struct Handler {
    config: Arc<Config>,
    audit: Arc<AuditLog>,
    archives: Arc<ArchiveWriter>,
}

impl Handler {
    fn context(&self, ctx: &Context) -> CommandContext {
        CommandContext {
            platform: Arc::new(DiscordPlatform::new(ctx.http.clone())),
            config: self.config.clone(),
            audit: self.audit.clone(),
            archives: self.archives.clone(),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        let command_ctx = self.context(&ctx);
        if let Err(e) = dispatch(&command_ctx, IncomingMessage::from(&msg)).await {
            error!(
                "Error handling command from {} in {}: {:#}",
                msg.author.tag(),
                msg.channel_id,
                e
            );
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.tag());
        info!("Connected to {} guilds", ready.guilds.len());

        if let Err(e) = self.archives.ensure_dir().await {
            error!("Archive directory unavailable: {:#}", e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Logger first, so config warnings about skipped entries are not lost
    let log_level = config::log_level(&|key: &str| env::var(key).ok());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = Config::from_env()?;

    info!("Starting moderation bot with prefix '{}'", config.prefix);
    if config.owner_ids.is_empty() {
        warn!("No OWNER_IDS configured, the nuke command is unavailable");
    } else {
        info!("Configured owners: {}", config.owner_ids.len());
    }
    if let Some(channel_id) = config.mod_log_channel_id {
        info!(
            "Moderation log channel {} configured; audit lines go to {}",
            channel_id,
            config.audit_log_path.display()
        );
    }

    let handler = Handler {
        audit: Arc::new(AuditLog::new(config.audit_log_path.clone())),
        archives: Arc::new(ArchiveWriter::new(config.archive_dir.clone())),
        config: Arc::new(config.clone()),
    };

    // Configure gateway intents
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS;

    let mut client = Client::builder(&config.bot_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| anyhow::anyhow!("Client creation failed: {}", e))?;

    // Set up Ctrl+C handler for graceful shutdown
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down...");
                shard_manager.lock().await.shutdown_all().await;
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    });

    info!("Connecting to Discord gateway...");

    client.start().await.map_err(|e| {
        error!("Gateway connection failed: {e}");
        anyhow::anyhow!("Gateway connection failed: {}", e)
    })?;

    info!("Bot shut down");
    Ok(())
}
