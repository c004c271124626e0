//! Adaptive Stream Controller
//!
//! Bridges a manifest-style streaming source to a single media element when
//! the platform lacks native support. Owns the decoder lifecycle: attach,
//! load after attachment confirms, swallow self-recovering errors, rewrite
//! to a progressive-download URL exactly once on a fatal error, and tear the
//! decoder down before the element is reused.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{EngineError, EngineResult};
use super::ports::{DecoderEvent, MediaElement, StreamDecoder, StreamErrorDomain};
use crate::events::{EngineEvent, EventBus};

/// Container MIME type of segmented-manifest streams.
pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";

/// Whether a URL points at a segmented-manifest playlist rather than a single
/// progressive file. The query string does not participate.
pub fn looks_like_manifest(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.ends_with(".m3u8") || path.contains("/manifest/")
}

/// Whether the adaptive pipeline is needed at all: manifest-style source and
/// no native playback capability on the element.
pub fn adaptive_required(url: &str, element: &dyn MediaElement) -> bool {
    looks_like_manifest(url) && !element.can_play_type(HLS_MIME)
}

// =============================================================================
// Fallback Rewrite
// =============================================================================

/// One manifest-path to progressive-path rewrite, a configuration constant for
/// a known provider rather than anything discovered dynamically.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackRule {
    /// Substring identifying the provider's manifest path.
    pub manifest_marker: String,
    /// Replacement yielding the progressive-download equivalent.
    pub progressive_marker: String,
}

impl FallbackRule {
    pub fn new(manifest_marker: impl Into<String>, progressive_marker: impl Into<String>) -> Self {
        Self {
            manifest_marker: manifest_marker.into(),
            progressive_marker: progressive_marker.into(),
        }
    }

    /// Rewrites `url` when it matches this rule.
    pub fn rewrite(&self, url: &str) -> Option<String> {
        if self.manifest_marker.is_empty() || !url.contains(&self.manifest_marker) {
            return None;
        }
        Some(url.replacen(&self.manifest_marker, &self.progressive_marker, 1))
    }

    /// Default provider mapping: stream-delivery manifest path to its direct
    /// MP4 download path.
    pub fn default_rules() -> Vec<Self> {
        vec![Self::new("/manifest/video.m3u8", "/downloads/default.mp4")]
    }
}

/// Applies the first matching rule.
pub fn rewrite_to_progressive(url: &str, rules: &[FallbackRule]) -> Option<String> {
    rules.iter().find_map(|rule| rule.rewrite(url))
}

// =============================================================================
// Stream Session
// =============================================================================

/// Where the session is in its lifecycle. Ordering matters: the manifest may
/// only load after the decoder confirms attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionPhase {
    /// Decoder attached, waiting for binding confirmation.
    Binding,
    /// Manifest load issued.
    Loading,
    /// Manifest parsed; stream is playable.
    Ready,
    /// Decoder torn down, element playing the rewritten progressive URL.
    FallenBack,
    /// Torn down.
    Closed,
}

/// Loading-indicator hints surfaced to the host. Never user-facing errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamNotice {
    /// Transient stall; show a spinner.
    Buffering,
    /// Stall recovered; hide the spinner.
    Resumed,
    /// The fallback rewrite was applied; `url` is now playing natively.
    FallbackApplied { url: String },
}

/// One adaptive-stream decoder bound to one element and one source URL.
pub struct StreamSession {
    decoder: Arc<dyn StreamDecoder>,
    /// Back-reference only; the element is owned by its container.
    element: Weak<dyn MediaElement>,
    source_url: String,
    rules: Vec<FallbackRule>,
    phase: SessionPhase,
    fallback_applied: bool,
    events: Option<EventBus>,
}

impl StreamSession {
    /// Opens a session: detaches any raw `src` from the element and attaches
    /// the decoder. The manifest load is deferred until the decoder reports
    /// [`DecoderEvent::Attached`].
    pub fn open(
        decoder: Arc<dyn StreamDecoder>,
        element: &Arc<dyn MediaElement>,
        source_url: impl Into<String>,
        rules: Vec<FallbackRule>,
    ) -> Self {
        element.clear_source();
        decoder.attach(element);
        Self {
            decoder,
            element: Arc::downgrade(element),
            source_url: source_url.into(),
            rules,
            phase: SessionPhase::Binding,
            fallback_applied: false,
            events: None,
        }
    }

    /// Mirrors notices onto the event bus alongside the returned values.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn fallback_applied(&self) -> bool {
        self.fallback_applied
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.phase, SessionPhase::Closed | SessionPhase::FallenBack)
    }

    /// Feeds one decoder event through the session's error policy.
    ///
    /// Returns a loading hint when one should surface. Non-fatal errors are
    /// swallowed here and never reach the caller. A fatal manifest/fragment
    /// error triggers at most one fallback rewrite; any other fatal error,
    /// or a fatal error after fallback, surfaces as `FatalStream`.
    pub fn on_decoder_event(&mut self, event: DecoderEvent) -> EngineResult<Option<StreamNotice>> {
        if self.phase == SessionPhase::Closed {
            return Err(EngineError::SessionClosed);
        }

        match event {
            DecoderEvent::Attached => {
                if self.phase != SessionPhase::Binding {
                    debug!(phase = ?self.phase, "duplicate attach confirmation ignored");
                    return Ok(None);
                }
                self.decoder.load_manifest(&self.source_url);
                self.phase = SessionPhase::Loading;
                Ok(None)
            }
            DecoderEvent::ManifestLoaded => {
                self.phase = SessionPhase::Ready;
                Ok(None)
            }
            DecoderEvent::BufferStalled => Ok(Some(self.notify(StreamNotice::Buffering))),
            DecoderEvent::BufferRecovered => Ok(Some(self.notify(StreamNotice::Resumed))),
            DecoderEvent::Error {
                fatal: false,
                domain,
                message,
            } => {
                // Self-recovering; the decoder retries on its own.
                debug!(?domain, %message, "non-fatal stream error swallowed");
                Ok(None)
            }
            DecoderEvent::Error {
                fatal: true,
                domain: domain @ (StreamErrorDomain::Manifest | StreamErrorDomain::Fragment),
                message,
            } => self.attempt_fallback(domain, message),
            DecoderEvent::Error {
                fatal: true,
                domain,
                message,
            } => {
                self.teardown();
                Err(EngineError::FatalStream(format!("{domain:?}: {message}")))
            }
        }
    }

    /// Tears the decoder down. Must be called before the element is reused
    /// for another source and before unmount. Idempotent.
    pub fn close(&mut self) {
        if self.phase == SessionPhase::Closed {
            return;
        }
        self.teardown();
    }

    fn attempt_fallback(
        &mut self,
        domain: StreamErrorDomain,
        message: String,
    ) -> EngineResult<Option<StreamNotice>> {
        if self.fallback_applied {
            self.teardown();
            return Err(EngineError::FatalStream(format!(
                "{domain:?} error after fallback: {message}"
            )));
        }
        let Some(rewritten) = rewrite_to_progressive(&self.source_url, &self.rules) else {
            self.teardown();
            return Err(EngineError::FatalStream(format!("{domain:?}: {message}")));
        };

        // Decoder must be gone before the element takes a native source.
        self.decoder.destroy();
        self.fallback_applied = true;
        self.phase = SessionPhase::FallenBack;

        match self.element.upgrade() {
            Some(element) => {
                warn!(
                    from = %self.source_url,
                    to = %rewritten,
                    "fatal stream error; falling back to progressive download"
                );
                element.set_source(&rewritten);
                Ok(Some(
                    self.notify(StreamNotice::FallbackApplied { url: rewritten }),
                ))
            }
            None => {
                // Container torn down mid-flight; nothing left to play into.
                debug!("element dropped before fallback could apply");
                Ok(None)
            }
        }
    }

    fn notify(&self, notice: StreamNotice) -> StreamNotice {
        if let Some(bus) = &self.events {
            let source_key = self.source_url.clone();
            let at = EngineEvent::now();
            bus.emit(match &notice {
                StreamNotice::Buffering => EngineEvent::StreamBuffering { source_key, at },
                StreamNotice::Resumed => EngineEvent::StreamResumed { source_key, at },
                StreamNotice::FallbackApplied { url } => EngineEvent::StreamFallback {
                    source_key,
                    url: url.clone(),
                    at,
                },
            });
        }
        notice
    }

    fn teardown(&mut self) {
        if self.phase != SessionPhase::FallenBack {
            self.decoder.destroy();
        }
        self.phase = SessionPhase::Closed;
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if !matches!(self.phase, SessionPhase::Closed | SessionPhase::FallenBack) {
            debug!(url = %self.source_url, "stream session dropped without close; destroying decoder");
            self.decoder.destroy();
        }
    }
}
