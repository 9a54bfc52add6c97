// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message classification and forwarding with queue fallback.
//!
//! Each inbound message is normalized exactly once into an
//! [`OutboundContent`]; the immediate-send and queue-insert paths consume
//! the same value, so no content detail can diverge between them.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use veil_core::types::{
    EnvelopeBody, InboundEnvelope, MediaRef, MessageKind, OutboundContent, OutboundPayload,
    ParticipantStatus, QueuedMessage,
};
use veil_core::{RelayStore, Transport, VeilError};

use crate::notices;

/// Classification of an envelope body, before any media I/O.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Classified {
    /// Content that is ready to forward as-is.
    Ready(OutboundContent),
    /// Media that must be fetched from the platform before forwarding.
    Fetch {
        kind: MessageKind,
        media: MediaRef,
        caption: Option<String>,
        filename: Option<String>,
        voice: bool,
    },
    /// No forwarding strategy for this body.
    Unsupported,
}

/// Classify an envelope body into a normalized shape.
///
/// Pure function: media payloads are described, not fetched.
pub(crate) fn classify(body: &EnvelopeBody) -> Classified {
    match body {
        EnvelopeBody::Text(text) => Classified::Ready(OutboundContent::text(text.clone())),
        EnvelopeBody::Image { media, caption } => Classified::Fetch {
            kind: MessageKind::Image,
            media: media.clone(),
            caption: caption.clone(),
            filename: None,
            voice: false,
        },
        EnvelopeBody::Video { media, caption } => Classified::Fetch {
            kind: MessageKind::Video,
            media: media.clone(),
            caption: caption.clone(),
            filename: None,
            voice: false,
        },
        EnvelopeBody::Audio { media, voice } => Classified::Fetch {
            kind: MessageKind::Audio,
            media: media.clone(),
            caption: None,
            filename: None,
            voice: *voice,
        },
        EnvelopeBody::Sticker { media } => Classified::Fetch {
            kind: MessageKind::Sticker,
            media: media.clone(),
            caption: None,
            filename: None,
            voice: false,
        },
        EnvelopeBody::Document {
            media,
            filename,
            caption,
        } => Classified::Fetch {
            kind: MessageKind::Document,
            media: media.clone(),
            caption: caption.clone(),
            filename: filename.clone().or_else(|| media.filename.clone()),
            voice: false,
        },
        EnvelopeBody::Contacts(cards) => Classified::Ready(OutboundContent {
            kind: MessageKind::Contact,
            payload: OutboundPayload::Contacts(cards.clone()),
            caption: None,
        }),
        EnvelopeBody::Location(location) => Classified::Ready(OutboundContent {
            kind: MessageKind::Location,
            payload: OutboundPayload::Location(location.clone()),
            caption: None,
        }),
        EnvelopeBody::Unsupported { .. } => Classified::Unsupported,
    }
}

/// Forwards inbound content to the sender's current partner, capturing
/// failed deliveries in the durable queue.
pub struct RelayEngine {
    store: Arc<dyn RelayStore>,
    transport: Arc<dyn Transport>,
}

impl RelayEngine {
    pub fn new(store: Arc<dyn RelayStore>, transport: Arc<dyn Transport>) -> Self {
        Self { store, transport }
    }

    /// Relay a message to the sender's partner.
    ///
    /// Returns `true` when the message was delivered or durably queued;
    /// `false` when the sender has no active partner (the caller may then
    /// interpret the input as a command) or the content has no forwarding
    /// strategy. Relayed content never silently disappears: every accepted
    /// message is either sent immediately or captured for replay.
    pub async fn relay(
        &self,
        sender_id: &str,
        envelope: &InboundEnvelope,
    ) -> Result<bool, VeilError> {
        let Some(sender) = self.store.participant(sender_id).await? else {
            return Ok(false);
        };
        if sender.status != ParticipantStatus::Chatting {
            return Ok(false);
        }
        let Some(partner) = sender.partner.clone() else {
            // partner is non-null iff chatting; a bare chatting row is a
            // store-level inconsistency, treated as "no active partner".
            warn!(id = sender_id, "chatting participant without partner");
            return Ok(false);
        };

        self.store.touch_activity(sender_id, Utc::now()).await?;

        let (content, media_id) = match classify(&envelope.body) {
            Classified::Ready(content) => (content, None),
            Classified::Fetch {
                kind,
                media,
                caption,
                filename,
                voice,
            } => match self.transport.fetch_media(&media).await {
                Ok(bytes) => (
                    OutboundContent {
                        kind,
                        payload: OutboundPayload::Media {
                            bytes,
                            mime_type: media.mime_type.clone(),
                            filename,
                            voice,
                        },
                        caption,
                    },
                    Some(media.media_id.clone()),
                ),
                Err(e) => {
                    // The payload stays on the platform; queue the handle
                    // and let the drain pass re-fetch it.
                    debug!(id = sender_id, error = %e, "media fetch failed, deferring");
                    let msg = QueuedMessage::capture_unfetched(
                        sender_id,
                        &partner,
                        kind,
                        &media,
                        caption,
                        voice,
                        Utc::now(),
                    )
                    .ok_or_else(|| {
                        VeilError::Internal(format!("unqueueable media kind {kind}"))
                    })?;
                    self.store.enqueue(&msg).await?;
                    self.notify_deferred(sender_id).await;
                    return Ok(true);
                }
            },
            Classified::Unsupported => {
                debug!(id = sender_id, "unsupported content kind");
                self.transport
                    .send(sender_id, OutboundContent::text(notices::UNSUPPORTED_CONTENT))
                    .await?;
                return Ok(false);
            }
        };

        self.deliver_or_queue(sender_id, &partner, content, media_id)
            .await
    }

    /// Try an immediate send; fall back to the durable queue for
    /// queueable kinds.
    ///
    /// Shared by the relay path and the profile-picture command.
    pub(crate) async fn deliver_or_queue(
        &self,
        sender_id: &str,
        recipient_id: &str,
        content: OutboundContent,
        media_id: Option<String>,
    ) -> Result<bool, VeilError> {
        match self.transport.send(recipient_id, content.clone()).await {
            Ok(()) => {
                debug!(kind = %content.kind, "relayed immediately");
                Ok(true)
            }
            Err(e) if content.kind.queueable() => {
                debug!(kind = %content.kind, error = %e, "delivery failed, queueing");
                let mut msg = QueuedMessage::capture(
                    sender_id,
                    recipient_id,
                    &content,
                    Utc::now(),
                )
                .ok_or_else(|| {
                    VeilError::Internal(format!("unqueueable kind {}", content.kind))
                })?;
                if let Some(media_id) = media_id {
                    msg = msg.with_media_ref(media_id);
                }
                self.store.enqueue(&msg).await?;
                self.notify_deferred(sender_id).await;
                Ok(true)
            }
            Err(e) => {
                // Contact and location payloads have no queue
                // representation; the sender is told instead of the
                // content vanishing.
                warn!(kind = %content.kind, error = %e, "undeliverable content dropped");
                if let Err(notice_err) = self
                    .transport
                    .send(
                        sender_id,
                        OutboundContent::text(notices::UNDELIVERABLE_CONTENT),
                    )
                    .await
                {
                    warn!(error = %notice_err, "failed to notify sender");
                }
                Ok(false)
            }
        }
    }

    /// Best-effort deferred-delivery notice; the queue entry already
    /// guarantees the content survives.
    async fn notify_deferred(&self, sender_id: &str) {
        if let Err(e) = self
            .transport
            .send(sender_id, OutboundContent::text(notices::DELIVERY_DEFERRED))
            .await
        {
            warn!(id = sender_id, error = %e, "failed to send deferred notice");
        }
    }
}
