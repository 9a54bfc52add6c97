// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` implements `Transport` with captured outbound traffic
//! and per-recipient scripted failures, so relay and queue behavior can be
//! asserted without a messaging platform.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use veil_core::types::{MediaRef, OutboundContent};
use veil_core::{Transport, VeilError};

/// A scripted messaging transport for tests.
///
/// - Every successful `send` is captured and retrievable via [`sent`] or
///   [`sent_to`].
/// - [`fail_next_send_to`] makes exactly one delivery to a recipient fail;
///   [`fail_sends_to`] makes all of them fail until [`restore`].
/// - Media and profile-image fetches resolve from scripted byte maps and
///   fail for anything unscripted.
///
/// [`sent`]: MockTransport::sent
/// [`sent_to`]: MockTransport::sent_to
/// [`fail_next_send_to`]: MockTransport::fail_next_send_to
/// [`fail_sends_to`]: MockTransport::fail_sends_to
/// [`restore`]: MockTransport::restore
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<(String, OutboundContent)>>,
    fail_once: Mutex<HashSet<String>>,
    fail_always: Mutex<HashSet<String>>,
    media: Mutex<HashMap<String, Vec<u8>>>,
    profile_images: Mutex<HashMap<String, Vec<u8>>>,
}

impl MockTransport {
    /// Create a new mock transport with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured `(recipient, content)` pairs, in send order.
    pub async fn sent(&self) -> Vec<(String, OutboundContent)> {
        self.sent.lock().await.clone()
    }

    /// Captured content sent to one recipient, in send order.
    pub async fn sent_to(&self, recipient_id: &str) -> Vec<OutboundContent> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(r, _)| r == recipient_id)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Count of captured sends.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear captured sends.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    /// Make the next delivery to `recipient_id` fail, then recover.
    pub async fn fail_next_send_to(&self, recipient_id: &str) {
        self.fail_once.lock().await.insert(recipient_id.to_string());
    }

    /// Make every delivery to `recipient_id` fail until [`restore`](Self::restore).
    pub async fn fail_sends_to(&self, recipient_id: &str) {
        self.fail_always.lock().await.insert(recipient_id.to_string());
    }

    /// Remove any scripted failure for `recipient_id`.
    pub async fn restore(&self, recipient_id: &str) {
        self.fail_once.lock().await.remove(recipient_id);
        self.fail_always.lock().await.remove(recipient_id);
    }

    /// Script bytes behind a media id.
    pub async fn set_media(&self, media_id: &str, bytes: Vec<u8>) {
        self.media.lock().await.insert(media_id.to_string(), bytes);
    }

    /// Script a participant's profile image.
    pub async fn set_profile_image(&self, participant_id: &str, bytes: Vec<u8>) {
        self.profile_images
            .lock()
            .await
            .insert(participant_id.to_string(), bytes);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, recipient_id: &str, content: OutboundContent) -> Result<(), VeilError> {
        if self.fail_once.lock().await.remove(recipient_id) {
            return Err(VeilError::transport(format!(
                "scripted one-shot failure for {recipient_id}"
            )));
        }
        if self.fail_always.lock().await.contains(recipient_id) {
            return Err(VeilError::transport(format!(
                "scripted failure for {recipient_id}"
            )));
        }
        self.sent
            .lock()
            .await
            .push((recipient_id.to_string(), content));
        Ok(())
    }

    async fn fetch_media(&self, media: &MediaRef) -> Result<Vec<u8>, VeilError> {
        self.media
            .lock()
            .await
            .get(&media.media_id)
            .cloned()
            .ok_or_else(|| VeilError::media(format!("no scripted media for {}", media.media_id)))
    }

    async fn fetch_profile_image(&self, participant_id: &str) -> Result<Vec<u8>, VeilError> {
        self.profile_images
            .lock()
            .await
            .get(participant_id)
            .cloned()
            .ok_or_else(|| {
                VeilError::media(format!("no scripted profile image for {participant_id}"))
            })
    }
}
