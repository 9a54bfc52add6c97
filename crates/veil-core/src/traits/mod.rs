// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the two external seams of the relay core.

pub mod store;
pub mod transport;

pub use store::RelayStore;
pub use transport::Transport;
