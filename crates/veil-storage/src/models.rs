// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `veil-core::types` for use across
//! the trait boundaries. This module re-exports them for convenience
//! within the storage crate.

pub use veil_core::types::{Participant, ParticipantStatus, QueueStatus, QueuedMessage};
