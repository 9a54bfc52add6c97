// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the RelayStore trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use veil_config::StorageConfig;
use veil_core::types::{Participant, QueueStatus, QueuedMessage};
use veil_core::{RelayStore, VeilError};

use crate::database::Database;
use crate::queries;

/// SQLite-backed relay store.
///
/// Wraps a [`Database`] handle and delegates all operations to the typed
/// query modules. The database is lazily initialized on the first call to
/// [`initialize`](SqliteRelayStore::initialize).
pub struct SqliteRelayStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteRelayStore {
    /// Create a new store with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database, applying migrations.
    pub async fn initialize(&self) -> Result<(), VeilError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| VeilError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite relay store initialized");
        Ok(())
    }

    /// Checkpoint and release the database ahead of shutdown.
    pub async fn close(&self) -> Result<(), VeilError> {
        self.db()?.close().await
    }

    /// Returns the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, VeilError> {
        self.db.get().ok_or_else(|| VeilError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl RelayStore for SqliteRelayStore {
    async fn participant(&self, id: &str) -> Result<Option<Participant>, VeilError> {
        queries::participants::get_participant(self.db()?, id).await
    }

    async fn upsert_waiting(&self, id: &str, now: DateTime<Utc>) -> Result<(), VeilError> {
        queries::participants::upsert_waiting(self.db()?, id, now).await
    }

    async fn set_idle(&self, id: &str) -> Result<(), VeilError> {
        queries::participants::set_idle(self.db()?, id).await
    }

    async fn claim_waiting(&self, id: &str, partner_id: &str) -> Result<bool, VeilError> {
        queries::participants::claim_waiting(self.db()?, id, partner_id).await
    }

    async fn set_chatting(&self, id: &str, partner_id: &str) -> Result<(), VeilError> {
        queries::participants::set_chatting(self.db()?, id, partner_id).await
    }

    async fn waiting_candidates(&self, exclude_id: &str) -> Result<Vec<String>, VeilError> {
        queries::participants::waiting_candidates(self.db()?, exclude_id).await
    }

    async fn recent_partner_ids(
        &self,
        id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>, VeilError> {
        queries::participants::recent_partner_ids(self.db()?, id, since).await
    }

    async fn record_recent_partner(
        &self,
        id: &str,
        partner_id: &str,
        matched_at: DateTime<Utc>,
    ) -> Result<(), VeilError> {
        queries::participants::record_recent_partner(self.db()?, id, partner_id, matched_at).await
    }

    async fn purge_recent_partners(&self, cutoff: DateTime<Utc>) -> Result<u64, VeilError> {
        queries::participants::purge_recent_partners(self.db()?, cutoff).await
    }

    async fn touch_activity(&self, id: &str, now: DateTime<Utc>) -> Result<(), VeilError> {
        queries::participants::touch_activity(self.db()?, id, now).await
    }

    async fn enqueue(&self, msg: &QueuedMessage) -> Result<i64, VeilError> {
        queries::queue::insert(self.db()?, msg).await
    }

    async fn retryable(&self, max_retries: u32) -> Result<Vec<QueuedMessage>, VeilError> {
        queries::queue::retryable(self.db()?, max_retries).await
    }

    async fn mark_delivered(&self, id: i64, delivered_at: DateTime<Utc>) -> Result<(), VeilError> {
        queries::queue::mark_delivered(self.db()?, id, delivered_at).await
    }

    async fn mark_cancelled(&self, id: i64, reason: &str) -> Result<(), VeilError> {
        queries::queue::mark_cancelled(self.db()?, id, reason).await
    }

    async fn record_failure(
        &self,
        id: i64,
        max_retries: u32,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<QueueStatus, VeilError> {
        queries::queue::record_failure(self.db()?, id, max_retries, error, now).await
    }

    async fn purge_terminal(&self, cutoff: DateTime<Utc>) -> Result<u64, VeilError> {
        queries::queue::purge_terminal(self.db()?, cutoff).await
    }
}
