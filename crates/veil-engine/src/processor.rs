// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic drain of the durable message queue.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use veil_config::QueueConfig;
use veil_core::types::{
    MediaRef, OutboundContent, OutboundPayload, QueueStatus, QueuedMessage,
};
use veil_core::{RelayStore, Transport, VeilError};

use crate::notices;

/// Reason stored on entries cancelled because the pair dissolved.
const CANCEL_CHAT_ENDED: &str = "chat_ended";

/// Outcome counts of one drain pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainStats {
    pub delivered: u64,
    pub cancelled: u64,
    pub failed: u64,
    pub failed_permanently: u64,
    pub purged: u64,
}

impl DrainStats {
    /// Whether the pass changed anything at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Replays queued messages whose immediate delivery failed.
pub struct QueueProcessor {
    store: Arc<dyn RelayStore>,
    transport: Arc<dyn Transport>,
    config: QueueConfig,
}

impl QueueProcessor {
    pub fn new(
        store: Arc<dyn RelayStore>,
        transport: Arc<dyn Transport>,
        config: QueueConfig,
    ) -> Self {
        Self {
            store,
            transport,
            config,
        }
    }

    /// Run one drain pass over all retryable entries.
    ///
    /// Entries whose pair has since dissolved on either side are
    /// cancelled, never delivered: an anonymous chat ends when either
    /// side leaves, and a late message from a finished chat would leak
    /// into whatever the recipient does next. Each surviving entry gets
    /// one delivery attempt; a failure counts against the retry budget
    /// and flips the entry to `failed_permanent` when the budget is
    /// spent.
    pub async fn drain(&self) -> Result<DrainStats, VeilError> {
        let mut stats = DrainStats::default();
        let entries = self.store.retryable(self.config.max_retries).await?;
        if !entries.is_empty() {
            debug!(count = entries.len(), "draining queued messages");
        }

        for entry in entries {
            if !self.pair_still_active(&entry).await? {
                self.store.mark_cancelled(entry.id, CANCEL_CHAT_ENDED).await?;
                debug!(queue_id = entry.id, "cancelled: chat ended");
                stats.cancelled += 1;
                continue;
            }
            match self.attempt(&entry).await? {
                QueueStatus::Delivered => stats.delivered += 1,
                QueueStatus::FailedPermanent => stats.failed_permanently += 1,
                _ => stats.failed += 1,
            }
        }

        let cutoff = Utc::now() - Duration::seconds(self.config.purge_after_secs as i64);
        stats.purged = self.store.purge_terminal(cutoff).await?;

        if !stats.is_empty() {
            info!(
                delivered = stats.delivered,
                cancelled = stats.cancelled,
                failed = stats.failed,
                failed_permanently = stats.failed_permanently,
                purged = stats.purged,
                "drain pass complete"
            );
        }
        Ok(stats)
    }

    /// Both records must still point at each other. A one-sided link
    /// (a claim race can leave one) does not count as an active pair.
    async fn pair_still_active(&self, entry: &QueuedMessage) -> Result<bool, VeilError> {
        let sender = self.store.participant(&entry.sender).await?;
        if !sender.is_some_and(|p| p.is_paired_with(&entry.recipient)) {
            return Ok(false);
        }
        let recipient = self.store.participant(&entry.recipient).await?;
        Ok(recipient.is_some_and(|p| p.is_paired_with(&entry.sender)))
    }

    /// One delivery attempt for one entry.
    async fn attempt(&self, entry: &QueuedMessage) -> Result<QueueStatus, VeilError> {
        let content = match self.materialize(entry).await {
            Ok(content) => content,
            Err(e) => return self.register_failure(entry, &e.to_string()).await,
        };

        let annotated = content.annotate(notices::LATE_ANNOTATION);
        match self.transport.send(&entry.recipient, annotated).await {
            Ok(()) => {
                self.store.mark_delivered(entry.id, Utc::now()).await?;
                debug!(queue_id = entry.id, "queued message delivered");
                self.notify_sender(&entry.sender, notices::DELIVERED_LATE).await;
                Ok(QueueStatus::Delivered)
            }
            Err(e) => self.register_failure(entry, &e.to_string()).await,
        }
    }

    /// Rebuild the outbound content, re-fetching media captured by handle.
    async fn materialize(&self, entry: &QueuedMessage) -> Result<OutboundContent, VeilError> {
        if entry.body.is_none() && entry.media.is_none() {
            let media_id = entry.media_id.clone().ok_or_else(|| {
                VeilError::Internal(format!("queue entry {} has no payload", entry.id))
            })?;
            let media = MediaRef {
                media_id,
                mime_type: entry.mime_type.clone(),
                filename: entry.filename.clone(),
            };
            let bytes = self.transport.fetch_media(&media).await?;
            return Ok(OutboundContent {
                kind: entry.kind,
                payload: OutboundPayload::Media {
                    bytes,
                    mime_type: entry.mime_type.clone(),
                    filename: entry.filename.clone(),
                    voice: entry.voice,
                },
                caption: entry.caption.clone(),
            });
        }
        Ok(entry.content())
    }

    async fn register_failure(
        &self,
        entry: &QueuedMessage,
        error: &str,
    ) -> Result<QueueStatus, VeilError> {
        let status = self
            .store
            .record_failure(entry.id, self.config.max_retries, error, Utc::now())
            .await?;
        if status == QueueStatus::FailedPermanent {
            // record_failure flips to failed_permanent exactly once, so the
            // sender hears about the final failure exactly once.
            warn!(queue_id = entry.id, error, "retry budget exhausted");
            self.notify_sender(&entry.sender, notices::DELIVERY_FAILED_PERMANENT)
                .await;
        } else {
            debug!(queue_id = entry.id, error, "delivery attempt failed");
        }
        Ok(status)
    }

    async fn notify_sender(&self, sender_id: &str, text: &str) {
        if let Err(e) = self
            .transport
            .send(sender_id, OutboundContent::text(text))
            .await
        {
            warn!(id = sender_id, error = %e, "failed to notify sender");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_stats_empty() {
        assert!(DrainStats::default().is_empty());
        let stats = DrainStats {
            purged: 1,
            ..Default::default()
        };
        assert!(!stats.is_empty());
    }
}
