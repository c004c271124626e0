//! Thumbnail Resolver
//!
//! Produces a poster image for a video source: either the poster the caller
//! already knows, or a frame sampled off-screen, downscaled so its longest
//! edge stays within the configured limit, and optionally persisted to
//! object storage. The storage write is fire-and-forget; its public URL
//! arrives later as a [`PosterStored`](crate::events::EngineEvent) event.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::{EngineError, EngineResult};
use super::ports::{FrameCapture, ObjectStore};
use super::retry::{RetryBudget, RetryPolicy};
use super::types::{fit_within, SourceKey, POSTER_MAX_EDGE};
use crate::events::{EngineEvent, EventBus};

/// Default frame-capture deadline.
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Options and Outcomes
// =============================================================================

/// Per-call resolution options.
#[derive(Clone, Debug)]
pub struct ResolveOptions {
    /// Capture a fresh frame even when a poster is already known.
    pub force_capture: bool,
    /// Deadline for the off-screen load + seek + decode.
    pub timeout: Duration,
    /// Storage key to persist the encoded poster under, when set.
    pub save_key: Option<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            force_capture: false,
            timeout: DEFAULT_CAPTURE_TIMEOUT,
            save_key: None,
        }
    }
}

/// A resolved poster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPoster {
    /// Immediately-displayable URL.
    pub url: String,
    /// Whether a frame was captured (false for a short-circuited known poster).
    pub generated: bool,
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves posters through the host's capture and storage ports.
pub struct ThumbnailResolver {
    capture: Arc<dyn FrameCapture>,
    store: Option<Arc<dyn ObjectStore>>,
    events: Option<EventBus>,
    max_edge: u32,
}

impl ThumbnailResolver {
    pub fn new(capture: Arc<dyn FrameCapture>) -> Self {
        Self {
            capture,
            store: None,
            events: None,
            max_edge: POSTER_MAX_EDGE,
        }
    }

    /// Enables persisting generated posters.
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Enables `PosterStored` notifications.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Overrides the longest-edge limit.
    pub fn with_max_edge(mut self, max_edge: u32) -> Self {
        self.max_edge = max_edge;
        self
    }

    /// Resolves a poster for `source_url`.
    ///
    /// A known poster short-circuits unless `force_capture` is set. Failure
    /// is always `CaptureFailed`; whether to retry is the caller's decision
    /// (see [`resolve_with_retry`](Self::resolve_with_retry)).
    pub async fn resolve(
        &self,
        source_key: &SourceKey,
        source_url: &str,
        known_poster: Option<&str>,
        options: &ResolveOptions,
    ) -> EngineResult<ResolvedPoster> {
        if let Some(poster) = known_poster {
            if !options.force_capture && !poster.trim().is_empty() {
                let resolved = ResolvedPoster {
                    url: poster.to_string(),
                    generated: false,
                };
                self.notify_ready(source_key, &resolved);
                return Ok(resolved);
            }
        }

        let frame = match tokio::time::timeout(options.timeout, self.capture.grab_frame(source_url, 0.0))
            .await
        {
            Err(_) => {
                return Err(EngineError::CaptureFailed(format!(
                    "no decoded frame within {:?}",
                    options.timeout
                )));
            }
            Ok(Err(e @ EngineError::CaptureFailed(_))) => return Err(e),
            Ok(Err(e)) => return Err(EngineError::CaptureFailed(e.to_string())),
            Ok(Ok(frame)) => frame,
        };

        let target = fit_within(frame.width, frame.height, self.max_edge);
        let encoded = self
            .capture
            .encode_poster(&frame, target)
            .map_err(|e| EngineError::CaptureFailed(e.to_string()))?;

        if let Some(key) = &options.save_key {
            self.spawn_store_write(source_key.clone(), key.clone(), encoded.bytes.clone());
        }

        let resolved = ResolvedPoster {
            url: encoded.url,
            generated: true,
        };
        self.notify_ready(source_key, &resolved);
        Ok(resolved)
    }

    /// Resolves with bounded retries. Attempts never exceed
    /// `policy.max_attempts`; backoff between attempts is the policy's.
    /// Returns the last `CaptureFailed` when the budget runs out, at which
    /// point the caller falls back to a raw-video preview or a placeholder.
    pub async fn resolve_with_retry(
        &self,
        source_key: &SourceKey,
        source_url: &str,
        known_poster: Option<&str>,
        options: &ResolveOptions,
        policy: RetryPolicy,
    ) -> EngineResult<ResolvedPoster> {
        let mut budget = RetryBudget::new(policy);
        let mut last_error = EngineError::CaptureFailed("no attempts permitted".into());

        while budget.try_begin() {
            match self
                .resolve(source_key, source_url, known_poster, options)
                .await
            {
                Ok(poster) => return Ok(poster),
                Err(e) => {
                    debug!(
                        attempt = budget.attempts(),
                        error = %e,
                        "thumbnail capture attempt failed"
                    );
                    last_error = e;
                    if !budget.exhausted() {
                        tokio::time::sleep(budget.next_delay()).await;
                    }
                }
            }
        }
        Err(last_error)
    }

    fn notify_ready(&self, source_key: &SourceKey, poster: &ResolvedPoster) {
        if let Some(bus) = &self.events {
            bus.emit(EngineEvent::PosterReady {
                source_key: source_key.clone(),
                url: poster.url.clone(),
                generated: poster.generated,
                at: EngineEvent::now(),
            });
        }
    }

    /// Fire-and-forget storage write. The resulting public URL, once
    /// available, is broadcast so the host can replace its placeholder.
    fn spawn_store_write(&self, source_key: SourceKey, key: String, bytes: Vec<u8>) {
        let Some(store) = self.store.clone() else {
            debug!(%key, "save requested but no object store configured");
            return;
        };
        let events = self.events.clone();
        tokio::spawn(async move {
            match store.put(&key, bytes).await {
                Ok(url) => {
                    if let Some(bus) = events {
                        bus.emit(EngineEvent::PosterStored {
                            source_key,
                            url,
                            at: EngineEvent::now(),
                        });
                    }
                }
                Err(e) => {
                    // The preview keeps its transient poster; nothing user
                    // facing depends on this write.
                    warn!(%key, error = %e, "poster upload failed");
                }
            }
        });
    }
}
