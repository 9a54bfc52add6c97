// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./veil.toml` > `~/.config/veil/veil.toml` >
//! `/etc/veil/veil.toml` with environment variable overrides via `VEIL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::VeilConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/veil/veil.toml` (system-wide)
/// 3. `~/.config/veil/veil.toml` (user XDG config)
/// 4. `./veil.toml` (local directory)
/// 5. `VEIL_*` environment variables
pub fn load_config() -> Result<VeilConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VeilConfig::default()))
        .merge(Toml::file("/etc/veil/veil.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("veil/veil.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("veil.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<VeilConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VeilConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<VeilConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VeilConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `VEIL_QUEUE_MAX_RETRIES` must map to
/// `queue.max_retries`, not `queue.max.retries`.
fn env_provider() -> Env {
    Env::prefixed("VEIL_").map(|key| {
        // Keys arrive in the variable's original (upper) case with the
        // prefix stripped; lowercase before inserting the section dot.
        // Example: VEIL_QUEUE_MAX_RETRIES -> "queue.max_retries"
        let mapped = key
            .as_str()
            .to_lowercase()
            .replacen("matchmaking_", "matchmaking.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_when_empty() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.matchmaking.exclusion_window_secs, 3600);
        assert_eq!(config.queue.max_retries, 3);
        assert_eq!(config.queue.drain_interval_secs, 60);
        assert_eq!(config.queue.purge_after_secs, 86_400);
        assert!(config.storage.wal_mode);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [matchmaking]
            exclusion_window_secs = 600

            [queue]
            max_retries = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.matchmaking.exclusion_window_secs, 600);
        assert_eq!(config.queue.max_retries, 5);
        // Untouched keys keep their defaults.
        assert_eq!(config.queue.drain_interval_secs, 60);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = load_config_from_str(
            r#"
            [queue]
            max_retriez = 5
            "#,
        );
        assert!(result.is_err(), "typoed key should be rejected");
    }

    #[test]
    #[serial]
    fn env_var_overrides_toml() {
        let dir = std::env::temp_dir().join("veil-config-env-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("veil.toml");
        std::fs::write(&path, "[queue]\nmax_retries = 2\n").unwrap();

        // SAFETY: guarded by #[serial]; no other test mutates the
        // process environment concurrently.
        unsafe { std::env::set_var("VEIL_QUEUE_MAX_RETRIES", "7") };
        let config = load_config_from_path(&path).unwrap();
        unsafe { std::env::remove_var("VEIL_QUEUE_MAX_RETRIES") };

        assert_eq!(config.queue.max_retries, 7);
    }

    #[test]
    #[serial]
    fn env_mapping_handles_underscored_keys() {
        unsafe { std::env::set_var("VEIL_MATCHMAKING_EXCLUSION_WINDOW_SECS", "120") };
        let config = Figment::new()
            .merge(Serialized::defaults(VeilConfig::default()))
            .merge(env_provider())
            .extract::<VeilConfig>()
            .unwrap();
        unsafe { std::env::remove_var("VEIL_MATCHMAKING_EXCLUSION_WINDOW_SECS") };

        assert_eq!(config.matchmaking.exclusion_window_secs, 120);
    }
}
