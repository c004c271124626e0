//! Engine Settings
//!
//! Persistent engine configuration with schema defaults, a tolerant
//! `normalize()` clamp pass, and atomic file persistence. Corrupt or stale
//! files fall back to defaults instead of failing the host.
//!
//! Storage location is the host's choice; the engine only takes a path.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::EngineResult;
use super::retry::RetryPolicy;
use super::stream::FallbackRule;
use super::types::POSTER_MAX_EDGE;

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "engine-settings.json";

// =============================================================================
// Schema
// =============================================================================

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Thumbnail capture settings
    #[serde(default)]
    pub capture: CaptureSettings,

    /// Playback behavior settings
    #[serde(default)]
    pub playback: PlaybackSettings,

    /// Adaptive streaming settings
    #[serde(default)]
    pub streaming: StreamingSettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    /// Frame-capture deadline in milliseconds
    pub timeout_ms: u64,
    /// Bounded-retry policy for thumbnail generation
    pub retry: RetryPolicy,
    /// Longest poster edge in pixels
    pub poster_max_edge: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            retry: RetryPolicy::default(),
            poster_max_edge: POSTER_MAX_EDGE,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackSettings {
    /// Rewind to the start whenever a hover preview pauses
    pub reset_on_pause: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingSettings {
    /// Manifest-path to progressive-path rewrite rules for fallback
    pub fallback_rules: Vec<FallbackRule>,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            fallback_rules: FallbackRule::default_rules(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            capture: CaptureSettings::default(),
            playback: PlaybackSettings::default(),
            streaming: StreamingSettings::default(),
        }
    }
}

impl EngineSettings {
    /// Normalizes and clamps settings so persisted state is always valid.
    /// Bad values are corrected rather than rejected, so old or hand-edited
    /// configs still load.
    pub fn normalize(&mut self) {
        self.version = SETTINGS_VERSION;

        self.capture.timeout_ms = self.capture.timeout_ms.clamp(500, 60_000);
        self.capture.retry.max_attempts = self.capture.retry.max_attempts.clamp(1, 10);
        self.capture.retry.backoff_ms = self.capture.retry.backoff_ms.min(10_000);
        self.capture.poster_max_edge = self.capture.poster_max_edge.clamp(64, 4_096);

        let before = self.streaming.fallback_rules.len();
        self.streaming
            .fallback_rules
            .retain(|rule| !rule.manifest_marker.trim().is_empty());
        if self.streaming.fallback_rules.len() != before {
            warn!("dropped fallback rules with empty manifest markers");
        }
    }
}

// =============================================================================
// Persistence
// =============================================================================

/// Loads and saves engine settings at a fixed path.
pub struct SettingsStore {
    settings_path: PathBuf,
}

impl SettingsStore {
    /// Creates a store rooted at `dir`, using the standard file name.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: dir.into().join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.settings_path
    }

    /// Loads settings, falling back to defaults on any failure.
    pub fn load(&self) -> EngineSettings {
        if !self.settings_path.exists() {
            info!("Settings file not found, using defaults");
            return EngineSettings::default();
        }

        let result = std::fs::read_to_string(&self.settings_path)
            .map_err(|e| format!("Failed to read settings file: {e}"))
            .and_then(|content| {
                serde_json::from_str::<EngineSettings>(&content)
                    .map_err(|e| format!("Failed to parse settings file: {e}"))
            });

        match result {
            Ok(mut settings) => {
                if settings.version < SETTINGS_VERSION {
                    info!(
                        "Migrating settings from version {} to {}",
                        settings.version, SETTINGS_VERSION
                    );
                }
                settings.normalize();
                settings
            }
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                EngineSettings::default()
            }
        }
    }

    /// Saves settings atomically, returning the normalized copy persisted.
    pub fn save(&self, settings: &EngineSettings) -> EngineResult<EngineSettings> {
        let mut normalized = settings.clone();
        normalized.normalize();
        crate::fs::atomic_write_json_pretty(&self.settings_path, &normalized)?;
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_normal() {
        let mut settings = EngineSettings::default();
        let before = settings.clone();
        settings.normalize();
        assert_eq!(settings, before);
    }

    #[test]
    fn test_normalize_clamps_out_of_range_values() {
        let mut settings = EngineSettings::default();
        settings.capture.timeout_ms = 1;
        settings.capture.retry.max_attempts = 99;
        settings.capture.poster_max_edge = 10;
        settings
            .streaming
            .fallback_rules
            .push(FallbackRule::new("", "/x"));

        settings.normalize();

        assert_eq!(settings.capture.timeout_ms, 500);
        assert_eq!(settings.capture.retry.max_attempts, 10);
        assert_eq!(settings.capture.poster_max_edge, 64);
        assert_eq!(settings.streaming.fallback_rules.len(), 1);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());
        assert_eq!(store.load(), EngineSettings::default());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());

        let mut settings = EngineSettings::default();
        settings.playback.reset_on_pause = true;
        settings.capture.timeout_ms = 2_000;
        store.save(&settings).unwrap();

        let loaded = store.load();
        assert!(loaded.playback.reset_on_pause);
        assert_eq!(loaded.capture.timeout_ms, 2_000);
    }

    #[test]
    fn test_load_corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());
        std::fs::write(store.path(), "{not valid json").unwrap();

        assert_eq!(store.load(), EngineSettings::default());
    }

    #[test]
    fn test_missing_sections_fill_with_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());
        std::fs::write(store.path(), r#"{"version":1,"playback":{"resetOnPause":true}}"#).unwrap();

        let loaded = store.load();
        assert!(loaded.playback.reset_on_pause);
        assert_eq!(loaded.capture, CaptureSettings::default());
    }
}
