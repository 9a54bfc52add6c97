// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Veil relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Veil configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VeilConfig {
    /// Matchmaking behavior settings.
    #[serde(default)]
    pub matchmaking: MatchmakingConfig,

    /// Deferred-delivery queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Matchmaking behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MatchmakingConfig {
    /// Sliding window, in seconds, during which two participants are not
    /// rematched with each other.
    #[serde(default = "default_exclusion_window_secs")]
    pub exclusion_window_secs: u64,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            exclusion_window_secs: default_exclusion_window_secs(),
        }
    }
}

fn default_exclusion_window_secs() -> u64 {
    3600
}

/// Deferred-delivery queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Maximum delivery attempts before a queued message is marked
    /// permanently failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Interval in seconds between queue drain passes.
    #[serde(default = "default_drain_interval_secs")]
    pub drain_interval_secs: u64,

    /// Age in seconds after which delivered and cancelled queue entries
    /// are purged. Permanently failed entries are kept for audit.
    #[serde(default = "default_purge_after_secs")]
    pub purge_after_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            drain_interval_secs: default_drain_interval_secs(),
            purge_after_secs: default_purge_after_secs(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_drain_interval_secs() -> u64 {
    60
}

fn default_purge_after_secs() -> u64 {
    86_400
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("veil").join("veil.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("veil.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}
