//! Engine Event Broadcasting
//!
//! Broadcasts engine-side changes to the host UI. Hosts subscribe and mirror
//! the payloads into whatever rendering state they keep; the engine never
//! waits on a subscriber.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::engine::playback::PlaybackPhase;
use crate::engine::{ErrorInfo, SourceKey};

// =============================================================================
// Event Names
// =============================================================================

/// Event names used for host communication
pub mod event_names {
    /// Playback phase changed for a preview
    pub const PLAYBACK_CHANGED: &str = "preview:playbackChanged";
    /// A poster became available (generated or short-circuited)
    pub const POSTER_READY: &str = "preview:posterReady";
    /// A generated poster finished uploading to object storage
    pub const POSTER_STORED: &str = "preview:posterStored";
    /// Preview entered its error state
    pub const PREVIEW_ERROR: &str = "preview:error";
    /// Adaptive stream is buffering (loading hint, not an error)
    pub const STREAM_BUFFERING: &str = "stream:buffering";
    /// Adaptive stream resumed after a stall
    pub const STREAM_RESUMED: &str = "stream:resumed";
    /// The progressive-download fallback rewrite was applied
    pub const STREAM_FALLBACK: &str = "stream:fallbackApplied";
}

// =============================================================================
// Event Payloads
// =============================================================================

/// Engine event, tagged for host-side dispatch.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    #[serde(rename_all = "camelCase")]
    PlaybackChanged {
        source_key: SourceKey,
        phase: PlaybackPhase,
        at: String,
    },
    #[serde(rename_all = "camelCase")]
    PosterReady {
        source_key: SourceKey,
        url: String,
        /// Whether the poster was generated from a frame (vs supplied).
        generated: bool,
        at: String,
    },
    #[serde(rename_all = "camelCase")]
    PosterStored {
        source_key: SourceKey,
        url: String,
        at: String,
    },
    #[serde(rename_all = "camelCase")]
    PreviewError {
        source_key: SourceKey,
        error: ErrorInfo,
        at: String,
    },
    #[serde(rename_all = "camelCase")]
    StreamBuffering { source_key: SourceKey, at: String },
    #[serde(rename_all = "camelCase")]
    StreamResumed { source_key: SourceKey, at: String },
    #[serde(rename_all = "camelCase")]
    StreamFallback {
        source_key: SourceKey,
        url: String,
        at: String,
    },
}

impl EngineEvent {
    /// The wire name the host dispatches on.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlaybackChanged { .. } => event_names::PLAYBACK_CHANGED,
            Self::PosterReady { .. } => event_names::POSTER_READY,
            Self::PosterStored { .. } => event_names::POSTER_STORED,
            Self::PreviewError { .. } => event_names::PREVIEW_ERROR,
            Self::StreamBuffering { .. } => event_names::STREAM_BUFFERING,
            Self::StreamResumed { .. } => event_names::STREAM_RESUMED,
            Self::StreamFallback { .. } => event_names::STREAM_FALLBACK,
        }
    }

    /// RFC 3339 timestamp for event payloads.
    pub fn now() -> String {
        Utc::now().to_rfc3339()
    }
}

// =============================================================================
// Event Bus
// =============================================================================

/// Broadcast channel fan-out for engine events. Cheap to clone; emitting with
/// no subscribers is a no-op.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: EngineEvent) {
        if let Err(e) = self.tx.send(event) {
            // No receivers; expected during teardown and in headless tests.
            debug!(event = %e.0.name(), "event dropped with no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
