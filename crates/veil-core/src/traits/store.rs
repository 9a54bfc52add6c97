// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store trait for the participant and message-queue records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::VeilError;
use crate::types::{Participant, QueueStatus, QueuedMessage};

/// Persistence seam for the relay core.
///
/// Every method is a narrow, atomic per-record operation; the engine holds
/// no authoritative in-memory state, so each core operation is resumable
/// across process restarts. The one multi-record sequence (pairing two
/// waiting participants) is made single-winner by [`claim_waiting`]
/// re-verifying the candidate's status inside the update itself.
///
/// [`claim_waiting`]: RelayStore::claim_waiting
#[async_trait]
pub trait RelayStore: Send + Sync + 'static {
    // --- Participant operations ---

    /// Look up a participant by id.
    async fn participant(&self, id: &str) -> Result<Option<Participant>, VeilError>;

    /// Create or reset a participant to `waiting` with no partner,
    /// refreshing `last_search_time`.
    async fn upsert_waiting(&self, id: &str, now: DateTime<Utc>) -> Result<(), VeilError>;

    /// Reset a participant to `idle` with no partner. A no-op for unknown ids.
    async fn set_idle(&self, id: &str) -> Result<(), VeilError>;

    /// Atomically claim a candidate for pairing: set `chatting` with the
    /// given partner if and only if the candidate is still `waiting`.
    ///
    /// Returns `false` when the candidate was claimed by a concurrent
    /// search (or left the waiting state) in the meantime.
    async fn claim_waiting(&self, id: &str, partner_id: &str) -> Result<bool, VeilError>;

    /// Set a participant to `chatting` with the given partner.
    async fn set_chatting(&self, id: &str, partner_id: &str) -> Result<(), VeilError>;

    /// Ids of all other participants currently `waiting`, oldest
    /// `last_search_time` first.
    async fn waiting_candidates(&self, exclude_id: &str) -> Result<Vec<String>, VeilError>;

    /// Partner ids matched with `id` at or after `since`.
    async fn recent_partner_ids(
        &self,
        id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>, VeilError>;

    /// Record that `id` was matched with `partner_id` at `matched_at`.
    async fn record_recent_partner(
        &self,
        id: &str,
        partner_id: &str,
        matched_at: DateTime<Utc>,
    ) -> Result<(), VeilError>;

    /// Delete recent-partner entries older than `cutoff`, for all
    /// participants. Returns the number of rows removed.
    async fn purge_recent_partners(&self, cutoff: DateTime<Utc>) -> Result<u64, VeilError>;

    /// Refresh a participant's `last_activity` timestamp.
    async fn touch_activity(&self, id: &str, now: DateTime<Utc>) -> Result<(), VeilError>;

    // --- Queue operations ---

    /// Insert a pending queue entry. Returns the auto-generated id.
    async fn enqueue(&self, msg: &QueuedMessage) -> Result<i64, VeilError>;

    /// All entries eligible for a delivery attempt: `pending`, or `failed`
    /// with fewer than `max_retries` attempts.
    async fn retryable(&self, max_retries: u32) -> Result<Vec<QueuedMessage>, VeilError>;

    /// Mark an entry delivered, stamping `delivered_at`.
    async fn mark_delivered(&self, id: i64, delivered_at: DateTime<Utc>) -> Result<(), VeilError>;

    /// Mark an entry cancelled with a reason (e.g. `chat_ended`).
    async fn mark_cancelled(&self, id: i64, reason: &str) -> Result<(), VeilError>;

    /// Record a failed delivery attempt: increment `retries`, stamp
    /// `last_attempt`, store the error, and flip to `failed_permanent`
    /// once the retry budget is exhausted.
    ///
    /// Returns the status the entry ended up in (`Failed` or
    /// `FailedPermanent`), decided inside the same atomic update.
    async fn record_failure(
        &self,
        id: i64,
        max_retries: u32,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<QueueStatus, VeilError>;

    /// Delete `delivered` and `cancelled` entries older than `cutoff`.
    /// `failed_permanent` entries are kept for audit. Returns the number
    /// of rows removed.
    async fn purge_terminal(&self, cutoff: DateTime<Utc>) -> Result<u64, VeilError>;
}
