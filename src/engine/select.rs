//! Render Selector
//!
//! Pure classification and dispatch: given a media reference and context
//! flags, choose between a third-party iframe embed, a transient local-file
//! preview, or the managed-storage playback pipeline. Also owns the
//! reference-counted object-URL registry that guarantees exactly-once revoke.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ports::ObjectUrlFactory;
use super::stream::looks_like_manifest;
use super::types::{FileHandle, MediaReference};

// =============================================================================
// Embed Providers
// =============================================================================

/// A recognized third-party embed target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmbedTarget {
    YouTube { video_id: String },
    Vimeo { video_id: String },
}

fn youtube_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:youtube\.com/watch\?(?:[^#]*&)?v=|youtu\.be/|youtube\.com/shorts/|youtube\.com/embed/)([A-Za-z0-9_-]{6,})",
        )
        .expect("valid YouTube pattern")
    })
}

fn vimeo_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"vimeo\.com/(?:video/)?(\d+)").expect("valid Vimeo pattern")
    })
}

impl EmbedTarget {
    /// Recognizes a watch-page or shortened link. Unrecognized hosts return
    /// `None` and classify as plain remote URLs.
    pub fn recognize(url: &str) -> Option<Self> {
        if let Some(caps) = youtube_pattern().captures(url) {
            return Some(Self::YouTube {
                video_id: caps[1].to_string(),
            });
        }
        if let Some(caps) = vimeo_pattern().captures(url) {
            return Some(Self::Vimeo {
                video_id: caps[1].to_string(),
            });
        }
        None
    }

    /// The provider's embed URL, without query parameters.
    pub fn embed_url(&self) -> String {
        match self {
            Self::YouTube { video_id } => {
                format!("https://www.youtube.com/embed/{video_id}")
            }
            Self::Vimeo { video_id } => {
                format!("https://player.vimeo.com/video/{video_id}")
            }
        }
    }
}

/// Classifies a raw URL into a media reference. Empty input yields `None`
/// (render a placeholder). Embeddable links win over plain remote URLs.
pub fn classify_url(raw: &str) -> Option<MediaReference> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if EmbedTarget::recognize(trimmed).is_some() {
        return Some(MediaReference::embeddable(trimmed));
    }
    Some(MediaReference::remote(trimmed))
}

// =============================================================================
// Render Plans
// =============================================================================

/// Context flags supplied by the host alongside the reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderContext {
    pub is_mobile: bool,
    pub lazy_load: bool,
    pub show_controls_on_hover: bool,
}

/// Iframe embed plan. Play/pause is simulated by toggling the autoplay query
/// parameter, since no programmatic control channel exists for third-party
/// embeds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedPlan {
    pub embed_url: String,
    pub autoplay: bool,
    pub muted: bool,
    pub controls: bool,
}

impl EmbedPlan {
    /// Full iframe `src` with playback hints as query parameters.
    pub fn src(&self) -> String {
        format!(
            "{}?autoplay={}&mute={}&controls={}&playsinline=1",
            self.embed_url,
            u8::from(self.autoplay),
            u8::from(self.muted),
            u8::from(self.controls),
        )
    }

    /// The same plan with autoplay toggled: the only "play/pause" control an
    /// embed offers.
    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }
}

/// What the host should render for a reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderPlan {
    /// Third-party iframe embed.
    Embed(EmbedPlan),
    /// Local file played through a transient object URL; the host acquires
    /// and releases the URL via [`ObjectUrlRegistry`].
    LocalPreview { file: FileHandle },
    /// Managed-storage playback through the element pipeline. `manifest`
    /// marks sources that may need the adaptive-stream controller.
    ManagedPlayback { url: String, manifest: bool },
    /// No source: no playback affordances at all.
    Placeholder,
}

/// Decision handed back to the host: the plan plus mount-time hints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderDecision {
    pub plan: RenderPlan,
    pub lazy_load: bool,
}

/// Chooses a render plan for a reference and context. Pure; no side effects.
pub fn select_render(reference: Option<&MediaReference>, ctx: RenderContext) -> RenderDecision {
    let plan = match reference {
        None => RenderPlan::Placeholder,
        Some(MediaReference::EmbeddableLink { url }) => match EmbedTarget::recognize(url) {
            Some(target) => RenderPlan::Embed(EmbedPlan {
                embed_url: target.embed_url(),
                // Hover previews start paused everywhere; autoplay is toggled
                // on engagement. Mobile never autoplays.
                autoplay: false,
                muted: true,
                controls: ctx.show_controls_on_hover,
            }),
            None => {
                // Classified as embeddable but no provider matched; treat as
                // a plain remote source rather than render a broken iframe.
                debug!(%url, "embeddable link lost provider match; degrading to remote");
                RenderPlan::ManagedPlayback {
                    url: url.clone(),
                    manifest: looks_like_manifest(url),
                }
            }
        },
        Some(MediaReference::LocalFile { handle }) => RenderPlan::LocalPreview {
            file: handle.clone(),
        },
        Some(MediaReference::RemoteUrl { url }) => RenderPlan::ManagedPlayback {
            url: url.clone(),
            manifest: looks_like_manifest(url),
        },
    };
    RenderDecision {
        plan,
        lazy_load: ctx.lazy_load,
    }
}

// =============================================================================
// Object URL Registry
// =============================================================================

struct UrlEntry {
    url: String,
    displays: u32,
}

/// Reference-counted registry of transient object URLs for local files.
///
/// A URL is created once per file handle and revoked exactly once, only after
/// the last displaying container releases it.
pub struct ObjectUrlRegistry {
    factory: Arc<dyn ObjectUrlFactory>,
    entries: Mutex<HashMap<FileHandle, UrlEntry>>,
}

impl ObjectUrlRegistry {
    pub fn new(factory: Arc<dyn ObjectUrlFactory>) -> Self {
        Self {
            factory,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the object URL for `file`, creating it on first acquisition.
    /// Every acquire must be paired with exactly one [`release`].
    ///
    /// [`release`]: Self::release
    pub fn acquire(&self, file: &FileHandle) -> String {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(file.clone()).or_insert_with(|| UrlEntry {
            url: self.factory.create_for(file),
            displays: 0,
        });
        entry.displays += 1;
        entry.url.clone()
    }

    /// Drops one display reference. The URL is revoked when the last
    /// reference goes away.
    pub fn release(&self, file: &FileHandle) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = entries.get_mut(file) else {
            warn!(file = file.token(), "release for unknown object URL");
            return;
        };
        entry.displays = entry.displays.saturating_sub(1);
        if entry.displays == 0 {
            if let Some(entry) = entries.remove(file) {
                self.factory.revoke(&entry.url);
            }
        }
    }

    /// Number of live (unrevoked) URLs, for leak checks at teardown.
    pub fn live_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
