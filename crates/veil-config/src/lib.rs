// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered TOML configuration for the Veil relay.
//!
//! Defaults < system config < user XDG config < local `veil.toml` <
//! `VEIL_*` environment variables, merged via Figment.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{MatchmakingConfig, QueueConfig, StorageConfig, VeilConfig};
