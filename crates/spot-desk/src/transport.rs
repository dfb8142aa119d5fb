//! The chat transport seam and best-effort progress helpers.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{DeskError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MessageId(pub u64);

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Create and send a message.
    async fn send(&self, author: &str, content: &str) -> Result<MessageId>;

    /// Replace the content of an in-flight message.
    async fn update(&self, id: MessageId, content: &str) -> Result<()>;

    /// Remove or hide an in-flight message.
    async fn remove(&self, id: MessageId) -> Result<()>;
}

/// Send a progress message; failures are logged and swallowed.
pub async fn progress_start(
    transport: &dyn ChatTransport,
    author: &str,
    text: &str,
) -> Option<MessageId> {
    match transport.send(author, text).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(error = %e, "progress message not sent");
            None
        }
    }
}

pub async fn progress_update(transport: &dyn ChatTransport, id: Option<MessageId>, text: &str) {
    if let Some(id) = id {
        if let Err(e) = transport.update(id, text).await {
            warn!(error = %e, ?id, "progress update failed");
        }
    }
}

pub async fn progress_hide(transport: &dyn ChatTransport, id: Option<MessageId>) {
    if let Some(id) = id {
        if let Err(e) = transport.remove(id).await {
            warn!(error = %e, ?id, "progress message not removed");
        }
    }
}

/// A message held by [`BufferedTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Posted {
    pub id: MessageId,
    pub author: String,
    pub content: String,
    pub removed: bool,
}

/// Keeps every message in memory; the CLI prints what is still visible once
/// a message has been handled.
#[derive(Debug, Default)]
pub struct BufferedTransport {
    posted: Mutex<Vec<Posted>>,
    next_id: AtomicU64,
}

impl BufferedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return the messages that were not removed.
    pub fn take_visible(&self) -> Vec<Posted> {
        let mut posted = self.posted.lock();
        std::mem::take(&mut *posted)
            .into_iter()
            .filter(|p| !p.removed)
            .collect()
    }

    /// Everything posted so far, removed messages included.
    pub fn history(&self) -> Vec<Posted> {
        self.posted.lock().clone()
    }
}

#[async_trait]
impl ChatTransport for BufferedTransport {
    async fn send(&self, author: &str, content: &str) -> Result<MessageId> {
        let id = MessageId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.posted.lock().push(Posted {
            id,
            author: author.to_string(),
            content: content.to_string(),
            removed: false,
        });
        debug!(?id, chars = content.len(), "message sent");
        Ok(id)
    }

    async fn update(&self, id: MessageId, content: &str) -> Result<()> {
        let mut posted = self.posted.lock();
        let msg = posted
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DeskError::Transport(format!("unknown message {}", id.0)))?;
        msg.content = content.to_string();
        Ok(())
    }

    async fn remove(&self, id: MessageId) -> Result<()> {
        let mut posted = self.posted.lock();
        let msg = posted
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DeskError::Transport(format!("unknown message {}", id.0)))?;
        msg.removed = true;
        Ok(())
    }
}
