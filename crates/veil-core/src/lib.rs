// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Veil anonymous pairing and relay system.
//!
//! This crate provides the foundational trait definitions, error type, and
//! domain types used throughout the Veil workspace. The matchmaking and
//! relay engine reaches the outside world only through the [`Transport`]
//! and [`RelayStore`] traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::VeilError;
pub use traits::{RelayStore, Transport};
pub use types::{
    EnvelopeBody, InboundEnvelope, MessageKind, OutboundContent, OutboundPayload, Participant,
    ParticipantStatus, QueueStatus, QueuedMessage,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn veil_error_has_all_variants() {
        let _config = VeilError::Config("test".into());
        let _storage = VeilError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _transport = VeilError::Transport {
            message: "test".into(),
            source: None,
        };
        let _media = VeilError::Media {
            message: "test".into(),
            source: None,
        };
        let _internal = VeilError::Internal("test".into());
    }

    #[test]
    fn error_display_includes_message() {
        let err = VeilError::transport("recipient unreachable");
        assert_eq!(err.to_string(), "transport error: recipient unreachable");
    }

    #[test]
    fn trait_objects_are_constructible() {
        // Both seams must stay object-safe; the engine holds them as
        // `Arc<dyn Trait>`. If either trait loses object safety, this
        // test won't compile.
        fn _assert_store(_: &dyn RelayStore) {}
        fn _assert_transport(_: &dyn Transport) {}
    }
}
