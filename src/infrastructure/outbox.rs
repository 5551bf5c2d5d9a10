use crate::domain::message::ReminderMessage;
use crate::domain::ports::NotificationGateway;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Serialize)]
struct OutboxEntry<'a> {
    queued_at: DateTime<Utc>,
    #[serde(flatten)]
    message: &'a ReminderMessage,
}

/// Appends every message as one JSON line to a local outbox file that the
/// mail relay drains.
pub struct OutboxGateway {
    path: PathBuf,
    file: Mutex<File>,
}

impl OutboxGateway {
    /// Opens (or creates) the outbox at `path` in append mode.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl NotificationGateway for OutboxGateway {
    async fn send(&self, message: &ReminderMessage) -> Result<()> {
        let entry = OutboxEntry {
            queued_at: Utc::now(),
            message,
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Logs messages instead of delivering them. Default when no outbox is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogGateway;

#[async_trait]
impl NotificationGateway for LogGateway {
    async fn send(&self, message: &ReminderMessage) -> Result<()> {
        info!(to = %message.to, subject = %message.subject, "reminder email (not delivered)");
        Ok(())
    }
}
