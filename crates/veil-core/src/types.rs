// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Veil workspace.
//!
//! Participant identifiers are opaque platform addresses carried as plain
//! strings; the core never interprets them beyond equality.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Pairing state of a participant.
///
/// Invariant: `Participant::partner` is `Some` if and only if the status
/// is [`Chatting`](ParticipantStatus::Chatting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum ParticipantStatus {
    Idle,
    Waiting,
    Chatting,
}

/// One record per user identifier ever engaged with the system.
///
/// Records are created on first `search` and never deleted; `stop` only
/// resets `status` and `partner`.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: String,
    pub status: ParticipantStatus,
    pub partner: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub last_search_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Participant {
    /// Whether this participant is currently paired with `other`.
    pub fn is_paired_with(&self, other: &str) -> bool {
        self.status == ParticipantStatus::Chatting && self.partner.as_deref() == Some(other)
    }
}

/// Normalized content kind of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Sticker,
    Document,
    Contact,
    Location,
    Unsupported,
}

impl MessageKind {
    /// Whether a failed delivery of this kind can be captured as a
    /// [`QueuedMessage`] for retry.
    ///
    /// Contact and location payloads have no queue representation; they are
    /// delivered immediately or not at all.
    pub fn queueable(self) -> bool {
        matches!(
            self,
            MessageKind::Text
                | MessageKind::Image
                | MessageKind::Video
                | MessageKind::Audio
                | MessageKind::Sticker
                | MessageKind::Document
        )
    }
}

/// Reference to platform-hosted media that must be fetched before forwarding.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRef {
    /// Platform-specific handle for the media object.
    pub media_id: String,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
}

/// A shared contact card.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactCard {
    pub display_name: String,
    pub vcard: String,
}

/// A shared geographic location.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
}

/// Body of an inbound platform event, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeBody {
    Text(String),
    Image {
        media: MediaRef,
        caption: Option<String>,
    },
    Video {
        media: MediaRef,
        caption: Option<String>,
    },
    Audio {
        media: MediaRef,
        /// Voice notes are re-sent as voice, not as plain audio files.
        voice: bool,
    },
    Sticker {
        media: MediaRef,
    },
    Document {
        media: MediaRef,
        filename: Option<String>,
        caption: Option<String>,
    },
    Contacts(Vec<ContactCard>),
    Location(Location),
    /// Anything the platform adapter could not map (polls, reactions, ...).
    Unsupported { description: String },
}

/// An inbound message as handed over by the platform adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEnvelope {
    pub id: String,
    pub sender_id: String,
    pub body: EnvelopeBody,
    pub timestamp: DateTime<Utc>,
}

/// Payload of normalized outbound content.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundPayload {
    Text(String),
    Media {
        bytes: Vec<u8>,
        mime_type: Option<String>,
        filename: Option<String>,
        voice: bool,
    },
    Contacts(Vec<ContactCard>),
    Location(Location),
}

/// Uniform `{kind, payload, caption}` value produced once per inbound
/// message and consumed identically by the immediate-send and
/// queue-insert paths.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundContent {
    pub kind: MessageKind,
    pub payload: OutboundPayload,
    pub caption: Option<String>,
}

impl OutboundContent {
    /// Plain text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            payload: OutboundPayload::Text(text.into()),
            caption: None,
        }
    }

    /// Append a human-readable annotation to the visible text of this
    /// content: the body for text messages, the caption for everything else.
    pub fn annotate(mut self, annotation: &str) -> Self {
        match &mut self.payload {
            OutboundPayload::Text(body) => {
                body.push_str("\n\n");
                body.push_str(annotation);
            }
            _ => {
                self.caption = Some(match self.caption.take() {
                    Some(caption) => format!("{caption}\n\n{annotation}"),
                    None => annotation.to_string(),
                });
            }
        }
        self
    }
}

/// Delivery state of a queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Delivered,
    Cancelled,
    Failed,
    FailedPermanent,
}

impl QueueStatus {
    /// Terminal states are never retried.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QueueStatus::Delivered | QueueStatus::Cancelled | QueueStatus::FailedPermanent
        )
    }
}

/// A deferred relay job, created when an immediate delivery attempt failed.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage {
    /// Auto-assigned row id; 0 until inserted.
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub kind: MessageKind,
    /// Text payload for text messages.
    pub body: Option<String>,
    /// Fetched media bytes for media messages. `None` when the payload
    /// could not be fetched before queueing; the drain pass re-fetches
    /// via `media_id`.
    pub media: Option<Vec<u8>>,
    /// Platform media handle, kept so an unfetched payload can be
    /// retrieved at retry time.
    pub media_id: Option<String>,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub caption: Option<String>,
    pub voice: bool,
    pub status: QueueStatus,
    pub retries: u32,
    pub created_at: DateTime<Utc>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl QueuedMessage {
    /// Capture normalized content as a fresh pending queue entry.
    ///
    /// Returns `None` for kinds with no queue representation.
    pub fn capture(
        sender: &str,
        recipient: &str,
        content: &OutboundContent,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if !content.kind.queueable() {
            return None;
        }
        let (body, media, mime_type, filename, voice) = match &content.payload {
            OutboundPayload::Text(text) => (Some(text.clone()), None, None, None, false),
            OutboundPayload::Media {
                bytes,
                mime_type,
                filename,
                voice,
            } => (
                None,
                Some(bytes.clone()),
                mime_type.clone(),
                filename.clone(),
                *voice,
            ),
            // Unreachable given the queueable() guard, but stay total.
            OutboundPayload::Contacts(_) | OutboundPayload::Location(_) => return None,
        };
        Some(Self {
            id: 0,
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            kind: content.kind,
            body,
            media,
            media_id: None,
            mime_type,
            filename,
            caption: content.caption.clone(),
            voice,
            status: QueueStatus::Pending,
            retries: 0,
            created_at: now,
            last_attempt: None,
            delivered_at: None,
            error: None,
        })
    }

    /// Capture a media message whose payload could not be fetched,
    /// keeping the platform media handle for retry-time retrieval.
    ///
    /// Returns `None` for kinds with no queue representation.
    #[allow(clippy::too_many_arguments)]
    pub fn capture_unfetched(
        sender: &str,
        recipient: &str,
        kind: MessageKind,
        media: &MediaRef,
        caption: Option<String>,
        voice: bool,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if !kind.queueable() {
            return None;
        }
        Some(Self {
            id: 0,
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            kind,
            body: None,
            media: None,
            media_id: Some(media.media_id.clone()),
            mime_type: media.mime_type.clone(),
            filename: media.filename.clone(),
            caption,
            voice,
            status: QueueStatus::Pending,
            retries: 0,
            created_at: now,
            last_attempt: None,
            delivered_at: None,
            error: None,
        })
    }

    /// Attach the platform media handle this entry was captured from.
    pub fn with_media_ref(mut self, media_id: impl Into<String>) -> Self {
        self.media_id = Some(media_id.into());
        self
    }

    /// Rebuild the outbound content this entry was captured from.
    pub fn content(&self) -> OutboundContent {
        let payload = match (&self.body, &self.media) {
            (Some(text), _) => OutboundPayload::Text(text.clone()),
            (None, Some(bytes)) => OutboundPayload::Media {
                bytes: bytes.clone(),
                mime_type: self.mime_type.clone(),
                filename: self.filename.clone(),
                voice: self.voice,
            },
            // A queued row always carries one of the two payloads; an empty
            // row degrades to an empty text body rather than panicking.
            (None, None) => OutboundPayload::Text(String::new()),
        };
        OutboundContent {
            kind: self.kind,
            payload,
            caption: self.caption.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn participant_status_codes_round_trip() {
        for status in [
            ParticipantStatus::Idle,
            ParticipantStatus::Waiting,
            ParticipantStatus::Chatting,
        ] {
            let code = status.to_string();
            assert_eq!(ParticipantStatus::from_str(&code).unwrap(), status);
        }
        assert_eq!(ParticipantStatus::Chatting.to_string(), "chatting");
    }

    #[test]
    fn queue_status_codes_use_snake_case() {
        assert_eq!(QueueStatus::FailedPermanent.to_string(), "failed_permanent");
        assert_eq!(
            QueueStatus::from_str("failed_permanent").unwrap(),
            QueueStatus::FailedPermanent
        );
    }

    #[test]
    fn terminal_states() {
        assert!(QueueStatus::Delivered.is_terminal());
        assert!(QueueStatus::Cancelled.is_terminal());
        assert!(QueueStatus::FailedPermanent.is_terminal());
        assert!(!QueueStatus::Pending.is_terminal());
        assert!(!QueueStatus::Failed.is_terminal());
    }

    #[test]
    fn queueable_kinds() {
        assert!(MessageKind::Text.queueable());
        assert!(MessageKind::Sticker.queueable());
        assert!(!MessageKind::Contact.queueable());
        assert!(!MessageKind::Location.queueable());
        assert!(!MessageKind::Unsupported.queueable());
    }

    #[test]
    fn annotate_appends_to_text_body() {
        let content = OutboundContent::text("hello").annotate("(delivered late)");
        match content.payload {
            OutboundPayload::Text(body) => assert_eq!(body, "hello\n\n(delivered late)"),
            other => panic!("expected text payload, got {other:?}"),
        }
        assert!(content.caption.is_none());
    }

    #[test]
    fn annotate_appends_to_media_caption() {
        let content = OutboundContent {
            kind: MessageKind::Image,
            payload: OutboundPayload::Media {
                bytes: vec![1, 2, 3],
                mime_type: Some("image/jpeg".into()),
                filename: None,
                voice: false,
            },
            caption: Some("sunset".into()),
        };
        let annotated = content.annotate("(delivered late)");
        assert_eq!(annotated.caption.as_deref(), Some("sunset\n\n(delivered late)"));
    }

    #[test]
    fn annotate_sets_caption_when_missing() {
        let content = OutboundContent {
            kind: MessageKind::Sticker,
            payload: OutboundPayload::Media {
                bytes: vec![9],
                mime_type: Some("image/webp".into()),
                filename: None,
                voice: false,
            },
            caption: None,
        };
        let annotated = content.annotate("(delivered late)");
        assert_eq!(annotated.caption.as_deref(), Some("(delivered late)"));
    }

    #[test]
    fn capture_text_content() {
        let now = Utc::now();
        let msg =
            QueuedMessage::capture("alice", "bob", &OutboundContent::text("hi"), now).unwrap();
        assert_eq!(msg.status, QueueStatus::Pending);
        assert_eq!(msg.retries, 0);
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.body.as_deref(), Some("hi"));
        assert!(msg.media.is_none());
        assert_eq!(msg.created_at, now);
    }

    #[test]
    fn capture_refuses_unqueueable_kinds() {
        let content = OutboundContent {
            kind: MessageKind::Location,
            payload: OutboundPayload::Location(Location {
                latitude: 0.0,
                longitude: 0.0,
                name: None,
            }),
            caption: None,
        };
        assert!(QueuedMessage::capture("a", "b", &content, Utc::now()).is_none());
    }

    #[test]
    fn capture_and_content_round_trip_media() {
        let content = OutboundContent {
            kind: MessageKind::Audio,
            payload: OutboundPayload::Media {
                bytes: vec![1, 2, 3],
                mime_type: Some("audio/ogg".into()),
                filename: None,
                voice: true,
            },
            caption: None,
        };
        let msg = QueuedMessage::capture("a", "b", &content, Utc::now()).unwrap();
        assert_eq!(msg.content(), content);
    }

    #[test]
    fn capture_unfetched_keeps_media_handle() {
        let media = MediaRef {
            media_id: "wa-media-42".into(),
            mime_type: Some("video/mp4".into()),
            filename: None,
        };
        let msg = QueuedMessage::capture_unfetched(
            "a",
            "b",
            MessageKind::Video,
            &media,
            Some("clip".into()),
            false,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(msg.media_id.as_deref(), Some("wa-media-42"));
        assert!(msg.media.is_none());
        assert_eq!(msg.mime_type.as_deref(), Some("video/mp4"));
        assert_eq!(msg.status, QueueStatus::Pending);

        assert!(
            QueuedMessage::capture_unfetched(
                "a",
                "b",
                MessageKind::Location,
                &media,
                None,
                false,
                Utc::now()
            )
            .is_none()
        );
    }

    #[test]
    fn is_paired_with_requires_chatting() {
        let now = Utc::now();
        let mut p = Participant {
            id: "alice".into(),
            status: ParticipantStatus::Chatting,
            partner: Some("bob".into()),
            joined_at: now,
            last_search_time: now,
            last_activity: now,
        };
        assert!(p.is_paired_with("bob"));
        assert!(!p.is_paired_with("carol"));
        p.status = ParticipantStatus::Idle;
        assert!(!p.is_paired_with("bob"));
    }
}
