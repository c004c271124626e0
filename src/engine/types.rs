//! Engine Type Definitions
//!
//! Defines the fundamental value types shared across the preview engine.

use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// ID Types
// =============================================================================

/// Stable identity of a media source across components.
///
/// Two references with the same key are the same playable thing; retry
/// counters and fallback flags reset only when the key changes.
pub type SourceKey = String;

/// Identifier of a mount container, for logging and event payloads.
pub type ContainerId = String;

/// Preview instance unique identifier (ULID)
pub type InstanceId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

// =============================================================================
// Media References
// =============================================================================

/// Opaque handle to a host-side local file (e.g. a picked upload).
///
/// The engine never inspects the contents; the string is the host's identity
/// token for the file and doubles as the hash key for the object-URL registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHandle(pub String);

impl FileHandle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

/// A source descriptor. Immutable once constructed; the local / remote /
/// embeddable classification is the variant itself and is never stored
/// redundantly elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MediaReference {
    /// A file picked on the host, playable only through a transient object URL.
    LocalFile { handle: FileHandle },
    /// A direct or manifest-style URL in managed storage.
    RemoteUrl { url: String },
    /// A link to a third-party provider's watch page, playable via iframe embed.
    EmbeddableLink { url: String },
}

impl MediaReference {
    pub fn local(handle: FileHandle) -> Self {
        Self::LocalFile { handle }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self::RemoteUrl { url: url.into() }
    }

    pub fn embeddable(url: impl Into<String>) -> Self {
        Self::EmbeddableLink { url: url.into() }
    }

    /// Stable identity used for checkout bookkeeping and attempt counters.
    pub fn source_key(&self) -> SourceKey {
        match self {
            Self::LocalFile { handle } => format!("file:{}", handle.token()),
            Self::RemoteUrl { url } => url.clone(),
            Self::EmbeddableLink { url } => url.clone(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::LocalFile { .. })
    }

    pub fn is_embeddable(&self) -> bool {
        matches!(self, Self::EmbeddableLink { .. })
    }
}

// =============================================================================
// Input Mode
// =============================================================================

/// How the user engages a preview card.
///
/// Hover-driven on desktop, touch-toggled on mobile. One machine handles both
/// modes; events from the other mode are ignored rather than mistranslated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputMode {
    Hover,
    Touch,
}

// =============================================================================
// Display Options
// =============================================================================

/// How the media element fits its container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SizingMode {
    /// Fill the container, cropping as needed (grid-card default).
    #[default]
    Cover,
    /// Letterbox to show the whole frame (viewer default).
    Contain,
}

/// Element presentation applied when the broker hands the element to a
/// container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOptions {
    pub muted: bool,
    pub controls: bool,
    pub fit: SizingMode,
}

impl DisplayOptions {
    /// Grid-card presentation: silent, chromeless, cropped to fill.
    pub fn preview_defaults() -> Self {
        Self {
            muted: true,
            controls: false,
            fit: SizingMode::Cover,
        }
    }

    /// Full-screen viewer presentation: audible, with transport controls.
    pub fn viewer_defaults() -> Self {
        Self {
            muted: false,
            controls: true,
            fit: SizingMode::Contain,
        }
    }
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self::preview_defaults()
    }
}

// =============================================================================
// Poster Fit
// =============================================================================

/// Longest-edge limit for generated posters.
pub const POSTER_MAX_EDGE: u32 = 640;

/// Downscales `(width, height)` so the longest edge is at most `max_edge`,
/// preserving aspect ratio. Dimensions already within the limit pass through.
pub fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        warn!("fit_within called with a zero dimension ({width}x{height})");
        return (width, height);
    }
    let longest = width.max(height);
    if longest <= max_edge || max_edge == 0 {
        return (width, height);
    }
    let scale = max_edge as f64 / longest as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}
