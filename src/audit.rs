//! # Feature: Moderation Audit Log
//!
//! Append-only, human-readable log of moderation actions. One line per
//! record, never rotated and never read back by the bot.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use log::error;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Kinds of action that leave an audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Prune,
    Archive,
    Warn,
    WarnDmFailed,
    SafeNuke,
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::Prune => "prune",
            AuditAction::Archive => "archive",
            AuditAction::Warn => "warn",
            AuditAction::WarnDmFailed => "warn (DM failed)",
            AuditAction::SafeNuke => "safe-nuke snapshot",
        }
    }
}

/// A single audit log line
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: AuditAction,
    pub details: String,
}

impl AuditRecord {
    /// Creates a record stamped with the current time
    pub fn now(action: AuditAction, actor: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: actor.into(),
            action,
            details: details.into(),
        }
    }
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} by {} {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.action.as_str(),
            self.actor,
            self.details
        )
    }
}

/// Append-only audit log backed by a local text file
pub struct AuditLog {
    path: PathBuf,
    // Serializes appends so lines land in invocation order
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record as a single line
    pub async fn append(&self, record: &AuditRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open audit log: {}", self.path.display()))?;

        let line = format!("{}\n", record);
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("Failed to append to audit log: {}", self.path.display()))?;
        file.flush().await?;

        Ok(())
    }

    /// Appends a record, logging instead of failing when the file is unwritable
    pub async fn record(&self, record: AuditRecord) {
        if let Err(e) = self.append(&record).await {
            error!("Audit log write failed ({}): {:#}", record.action.as_str(), e);
        }
    }
}
