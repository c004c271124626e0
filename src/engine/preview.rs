//! Preview Instance
//!
//! One on-screen video card: its playback machine, poster, thumbnail attempt
//! budget, and liveness flag. All state here is owned by exactly one instance
//! and dies with it; nothing is shared across cards except the broker-managed
//! element.
//!
//! Thumbnail generation and playback are mutually exclusive per instance:
//! generation never starts once playback has, and playback inputs are ignored
//! while a capture is in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{EngineError, ErrorInfo};
use super::playback::{PlaybackEffect, PlaybackInput, PlaybackMachine, PlaybackPhase, PlayTicket};
use super::ports::PlayRejection;
use super::retry::{RetryBudget, RetryPolicy};
use super::types::{InputMode, InstanceId, MediaReference, SourceKey};
use crate::events::{EngineEvent, EventBus};

/// Snapshot of a preview's user-visible state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewState {
    pub poster_url: Option<String>,
    pub playback_phase: PlaybackPhase,
    pub hover_active: bool,
    pub thumbnail_attempts: u32,
    pub last_error: Option<ErrorInfo>,
}

/// One preview card's mutable state and its coordination rules.
pub struct PreviewInstance {
    id: InstanceId,
    source: MediaReference,
    machine: PlaybackMachine,
    poster_url: Option<String>,
    thumbnail_budget: RetryBudget,
    thumbnailing: bool,
    events: Option<EventBus>,
    /// Cleared on unmount; spawned completions must check it before touching
    /// state that no longer exists.
    alive: Arc<AtomicBool>,
}

impl PreviewInstance {
    pub fn new(source: MediaReference, mode: InputMode) -> Self {
        Self::with_thumbnail_policy(source, mode, RetryPolicy::default())
    }

    pub fn with_thumbnail_policy(
        source: MediaReference,
        mode: InputMode,
        thumbnail_policy: RetryPolicy,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            source,
            machine: PlaybackMachine::new(mode),
            poster_url: None,
            thumbnail_budget: RetryBudget::new(thumbnail_policy),
            thumbnailing: false,
            events: None,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Broadcasts phase changes and error entries for this card.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &MediaReference {
        &self.source
    }

    pub fn source_key(&self) -> SourceKey {
        self.source.source_key()
    }

    /// Liveness guard for spawned completions. Check before applying a late
    /// result.
    pub fn liveness(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.alive)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PreviewState {
        PreviewState {
            poster_url: self.poster_url.clone(),
            playback_phase: self.machine.phase(),
            hover_active: self.machine.hover_active(),
            thumbnail_attempts: self.thumbnail_budget.attempts(),
            last_error: self.machine.last_error().cloned(),
        }
    }

    // =========================================================================
    // Playback
    // =========================================================================

    /// Routes user input to the playback machine. Ignored while a thumbnail
    /// capture is in flight (the two never run concurrently).
    pub fn handle_input(&mut self, input: PlaybackInput) -> Vec<PlaybackEffect> {
        if self.thumbnailing {
            debug!(id = %self.id, "playback input ignored during thumbnail capture");
            return Vec::new();
        }
        let before = self.machine.phase();
        let effects = self.machine.handle(input);
        self.announce_phase(before);
        effects
    }

    pub fn on_play_settled(
        &mut self,
        ticket: PlayTicket,
        result: Result<(), PlayRejection>,
    ) -> Vec<PlaybackEffect> {
        if !self.is_alive() {
            debug!(id = %self.id, "settlement after unmount dropped");
            return Vec::new();
        }
        let before = self.machine.phase();
        let effects = self.machine.on_play_settled(ticket, result);
        self.announce_phase(before);
        effects
    }

    /// Retry affordance bound to the error panel.
    pub fn retry(&mut self) -> Vec<PlaybackEffect> {
        let before = self.machine.phase();
        let effects = self.machine.retry();
        self.announce_phase(before);
        effects
    }

    /// Broadcasts the phase transition, plus the error payload when the
    /// machine just entered `Errored`.
    fn announce_phase(&self, before: PlaybackPhase) {
        let Some(bus) = &self.events else {
            return;
        };
        let phase = self.machine.phase();
        if phase == before {
            return;
        }
        let at = EngineEvent::now();
        bus.emit(EngineEvent::PlaybackChanged {
            source_key: self.source_key(),
            phase,
            at: at.clone(),
        });
        if phase == PlaybackPhase::Errored {
            if let Some(error) = self.machine.last_error() {
                bus.emit(EngineEvent::PreviewError {
                    source_key: self.source_key(),
                    error: error.clone(),
                    at,
                });
            }
        }
    }

    // =========================================================================
    // Thumbnails
    // =========================================================================

    /// Claims a thumbnail attempt. Refused once playback has started, while
    /// another capture is in flight, or when the attempt budget is spent.
    /// Returns the attempt number (1-based) when permitted.
    pub fn begin_thumbnail(&mut self) -> Option<u32> {
        if self.thumbnailing {
            return None;
        }
        if self.machine.phase() != PlaybackPhase::Idle {
            debug!(id = %self.id, "thumbnail skipped; playback already started");
            return None;
        }
        if !self.thumbnail_budget.try_begin() {
            return None;
        }
        self.thumbnailing = true;
        Some(self.thumbnail_budget.attempts())
    }

    /// Applies a capture outcome. Late completions for unmounted instances
    /// are the caller's concern via [`liveness`](Self::liveness).
    pub fn finish_thumbnail(&mut self, outcome: Result<String, EngineError>) {
        self.thumbnailing = false;
        match outcome {
            Ok(url) => self.poster_url = Some(url),
            Err(e) => {
                debug!(id = %self.id, error = %e, "thumbnail attempt failed");
            }
        }
    }

    /// Whether the generator has given up; the caller falls back to playing
    /// the raw video as its own preview, or to a placeholder.
    pub fn thumbnail_exhausted(&self) -> bool {
        self.poster_url.is_none() && self.thumbnail_budget.exhausted()
    }

    /// Replaces the poster, e.g. when the fire-and-forget storage write
    /// reports the durable public URL.
    pub fn set_poster(&mut self, url: impl Into<String>) {
        self.poster_url = Some(url.into());
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Swaps the source. Attempt counters and playback state reset only when
    /// the source identity actually changes.
    pub fn set_source(&mut self, source: MediaReference) {
        if source.source_key() == self.source.source_key() {
            return;
        }
        debug!(id = %self.id, key = %source.source_key(), "source changed; resetting preview");
        self.source = source;
        self.machine.reset_for_new_source();
        self.thumbnail_budget.reset();
        self.thumbnailing = false;
        self.poster_url = None;
    }

    /// Marks the instance dead. Pending completions observing the liveness
    /// flag become no-ops.
    pub fn unmount(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl Drop for PreviewInstance {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}
