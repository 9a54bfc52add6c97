// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Participant lifecycle state machine: search, next, stop.
//!
//! All state lives in the store; every transition is a narrow atomic
//! per-record update, so operations are idempotent and resumable across
//! restarts. Pairing two waiting participants is made single-winner by
//! claiming the candidate with a conditional update that re-verifies the
//! `waiting` status; a lost claim simply moves on to the next candidate.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};

use veil_config::MatchmakingConfig;
use veil_core::types::{OutboundContent, ParticipantStatus};
use veil_core::{RelayStore, Transport, VeilError};

use crate::notices;

/// Implements the `search`/`next`/`stop` transitions and partner selection.
pub struct Matchmaker {
    store: Arc<dyn RelayStore>,
    transport: Arc<dyn Transport>,
    config: MatchmakingConfig,
}

impl Matchmaker {
    pub fn new(
        store: Arc<dyn RelayStore>,
        transport: Arc<dyn Transport>,
        config: MatchmakingConfig,
    ) -> Self {
        Self {
            store,
            transport,
            config,
        }
    }

    fn exclusion_window(&self) -> Duration {
        Duration::seconds(self.config.exclusion_window_secs as i64)
    }

    /// Start searching for a partner.
    ///
    /// Fails softly (notice, no state change) when the participant is
    /// already chatting or already waiting. Otherwise the participant is
    /// upserted as `waiting` and the longest-waiting compatible candidate
    /// is claimed, skipping anyone matched within the exclusion window.
    pub async fn search(&self, participant_id: &str) -> Result<(), VeilError> {
        let now = Utc::now();

        if let Some(existing) = self.store.participant(participant_id).await? {
            match existing.status {
                ParticipantStatus::Chatting => {
                    debug!(id = participant_id, "search ignored: already chatting");
                    return self.notify(participant_id, notices::ALREADY_CHATTING).await;
                }
                ParticipantStatus::Waiting => {
                    debug!(id = participant_id, "search ignored: already waiting");
                    return self.notify(participant_id, notices::ALREADY_WAITING).await;
                }
                ParticipantStatus::Idle => {}
            }
        }

        self.store.upsert_waiting(participant_id, now).await?;

        // Opportunistic maintenance: expired exclusion entries are dead
        // weight for every future scan.
        let cutoff = now - self.exclusion_window();
        self.store.purge_recent_partners(cutoff).await?;

        let excluded = self.store.recent_partner_ids(participant_id, cutoff).await?;
        let candidates = self.store.waiting_candidates(participant_id).await?;

        for candidate in candidates
            .iter()
            .filter(|c| !excluded.contains(c))
        {
            // Conditional claim: only one of two racing searches can flip
            // the candidate out of `waiting`. Losing just means trying the
            // next candidate.
            if !self.store.claim_waiting(candidate, participant_id).await? {
                debug!(
                    id = participant_id,
                    candidate, "candidate claimed concurrently, skipping"
                );
                continue;
            }

            self.store.set_chatting(participant_id, candidate).await?;
            self.store
                .record_recent_partner(participant_id, candidate, now)
                .await?;
            self.store
                .record_recent_partner(candidate, participant_id, now)
                .await?;

            info!(id = participant_id, partner = %candidate, "participants paired");
            self.notify(participant_id, notices::PARTNER_FOUND).await?;
            self.notify(candidate, notices::PARTNER_FOUND).await?;
            return Ok(());
        }

        debug!(id = participant_id, "no compatible partner waiting");
        self.notify(participant_id, notices::SEARCHING).await
    }

    /// Leave the current chat and immediately search again.
    ///
    /// Fails softly when the participant is not chatting. The old partner
    /// is reset to `idle` and notified before the new search starts.
    pub async fn next(&self, participant_id: &str) -> Result<(), VeilError> {
        let participant = self.store.participant(participant_id).await?;
        let partner = participant.as_ref().and_then(|p| {
            (p.status == ParticipantStatus::Chatting).then(|| p.partner.clone()).flatten()
        });

        let Some(partner) = partner else {
            debug!(id = participant_id, "next ignored: not chatting");
            return self.notify(participant_id, notices::NOT_CHATTING).await;
        };

        self.release_partner(&partner).await?;
        // Back to idle so the re-search doesn't soft-fail on `chatting`.
        self.store.set_idle(participant_id).await?;
        info!(id = participant_id, "left chat, searching again");
        self.search(participant_id).await
    }

    /// End the current wait or chat.
    ///
    /// Valid from any state; a participant with no record gets an
    /// informational notice. A current partner, if any, is reset to
    /// `idle` and notified.
    pub async fn stop(&self, participant_id: &str) -> Result<(), VeilError> {
        let Some(participant) = self.store.participant(participant_id).await? else {
            debug!(id = participant_id, "stop ignored: unknown participant");
            return self.notify(participant_id, notices::NOTHING_TO_STOP).await;
        };

        if let Some(partner) = participant.partner.as_deref() {
            self.release_partner(partner).await?;
        }
        self.store.set_idle(participant_id).await?;
        info!(id = participant_id, "stopped");
        self.notify(participant_id, notices::STOPPED).await
    }

    /// Reset an abandoned partner to idle and tell them the chat ended.
    async fn release_partner(&self, partner_id: &str) -> Result<(), VeilError> {
        self.store.set_idle(partner_id).await?;
        self.notify(partner_id, notices::PARTNER_LEFT).await
    }

    async fn notify(&self, participant_id: &str, text: &str) -> Result<(), VeilError> {
        self.transport
            .send(participant_id, OutboundContent::text(text))
            .await
    }
}
