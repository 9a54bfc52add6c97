// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text command parsing and handling.

use std::str::FromStr;
use std::sync::Arc;

use strum::EnumString;
use tracing::{debug, info};

use veil_core::types::{MessageKind, OutboundContent, OutboundPayload, ParticipantStatus};
use veil_core::{RelayStore, Transport, VeilError};

use crate::matchmaker::Matchmaker;
use crate::notices;
use crate::relay::RelayEngine;

/// A recognized text command.
///
/// Matching is case-insensitive on the trimmed message body; anything
/// else is ordinary chat content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Command {
    Search,
    Next,
    Stop,
    #[strum(serialize = "sendpp")]
    SendProfilePicture,
}

impl Command {
    /// Parse a message body as a command, if it is one.
    pub fn parse(text: &str) -> Option<Self> {
        Self::from_str(text.trim()).ok()
    }
}

/// Executes commands against the matchmaker and relay engine.
pub struct CommandHandler {
    store: Arc<dyn RelayStore>,
    transport: Arc<dyn Transport>,
    matchmaker: Arc<Matchmaker>,
    relay: Arc<RelayEngine>,
}

impl CommandHandler {
    pub fn new(
        store: Arc<dyn RelayStore>,
        transport: Arc<dyn Transport>,
        matchmaker: Arc<Matchmaker>,
        relay: Arc<RelayEngine>,
    ) -> Self {
        Self {
            store,
            transport,
            matchmaker,
            relay,
        }
    }

    pub async fn handle(&self, participant_id: &str, command: Command) -> Result<(), VeilError> {
        debug!(id = participant_id, ?command, "handling command");
        match command {
            Command::Search => self.matchmaker.search(participant_id).await,
            Command::Next => self.matchmaker.next(participant_id).await,
            Command::Stop => self.matchmaker.stop(participant_id).await,
            Command::SendProfilePicture => self.send_profile_picture(participant_id).await,
        }
    }

    /// Forward the sender's own profile picture to their current partner.
    ///
    /// The image is shared deliberately by command, so forwarding it does
    /// not break the anonymity of the relay itself.
    async fn send_profile_picture(&self, participant_id: &str) -> Result<(), VeilError> {
        let participant = self.store.participant(participant_id).await?;
        let partner = participant
            .filter(|p| p.status == ParticipantStatus::Chatting)
            .and_then(|p| p.partner);
        let Some(partner) = partner else {
            return self.notify(participant_id, notices::NOT_CHATTING).await;
        };

        let bytes = match self.transport.fetch_profile_image(participant_id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(id = participant_id, error = %e, "profile image unavailable");
                return self
                    .notify(participant_id, notices::PROFILE_IMAGE_UNAVAILABLE)
                    .await;
            }
        };

        let content = OutboundContent {
            kind: MessageKind::Image,
            payload: OutboundPayload::Media {
                bytes,
                mime_type: Some("image/jpeg".into()),
                filename: None,
                voice: false,
            },
            caption: Some(notices::PROFILE_IMAGE_CAPTION.into()),
        };
        info!(id = participant_id, "forwarding profile picture");
        self.relay
            .deliver_or_queue(participant_id, &partner, content, None)
            .await?;
        Ok(())
    }

    async fn notify(&self, participant_id: &str, text: &str) -> Result<(), VeilError> {
        self.transport
            .send(participant_id, OutboundContent::text(text))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(Command::parse("search"), Some(Command::Search));
        assert_eq!(Command::parse("next"), Some(Command::Next));
        assert_eq!(Command::parse("stop"), Some(Command::Stop));
        assert_eq!(Command::parse("sendpp"), Some(Command::SendProfilePicture));
    }

    #[test]
    fn parsing_trims_and_ignores_case() {
        assert_eq!(Command::parse("  Search \n"), Some(Command::Search));
        assert_eq!(Command::parse("STOP"), Some(Command::Stop));
        assert_eq!(Command::parse("SendPP"), Some(Command::SendProfilePicture));
    }

    #[test]
    fn ordinary_text_is_not_a_command() {
        assert_eq!(Command::parse("hello there"), None);
        assert_eq!(Command::parse("search party"), None);
        assert_eq!(Command::parse(""), None);
    }
}
