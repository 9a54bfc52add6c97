// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Veil relay core.

use thiserror::Error;

/// The primary error type used across all Veil crates.
///
/// Routine soft outcomes (no partner, already waiting, unsupported content)
/// are not errors; they are modeled as enum or boolean returns by the
/// operations that produce them.
#[derive(Debug, Error)]
pub enum VeilError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport errors (delivery failure, recipient unreachable, rate limiting).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Media errors (download failure, decode failure, payload too large).
    #[error("media error: {message}")]
    Media {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VeilError {
    /// Shorthand for a transport error with no underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        VeilError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a media error with no underlying source.
    pub fn media(message: impl Into<String>) -> Self {
        VeilError::Media {
            message: message.into(),
            source: None,
        }
    }
}
