// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport trait for messaging platform integrations.

use async_trait::async_trait;

use crate::error::VeilError;
use crate::types::{MediaRef, OutboundContent};

/// Outbound seam to the messaging platform.
///
/// The platform adapter owns connection, session, and reconnect handling;
/// the relay core only sends normalized content and fetches inbound media
/// payloads through this trait.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Deliver normalized content to a participant.
    ///
    /// The recipient must never learn the original sender's identity from
    /// anything passed here; implementations send `content` as their own.
    async fn send(&self, recipient_id: &str, content: OutboundContent) -> Result<(), VeilError>;

    /// Fetch and decode the binary payload behind an inbound media reference.
    async fn fetch_media(&self, media: &MediaRef) -> Result<Vec<u8>, VeilError>;

    /// Fetch a participant's profile image, for the `sendpp` command.
    async fn fetch_profile_image(&self, participant_id: &str) -> Result<Vec<u8>, VeilError>;
}
