//! Playback State Machine
//!
//! Per-preview state covering idle / hover / playing / error, the desktop
//! (hover) vs mobile (touch) divergence, and settlement of asynchronous play
//! requests. The machine is sans-IO: inputs go in, effects come out, and the
//! caller applies effects to whichever element currently owns the source.
//!
//! Coalescing rule: only the most recent intention governs the next action.
//! A hover-leave that lands while a play request is still in flight must
//! leave the element paused once that request settles, never playing.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ErrorInfo;
use super::ports::PlayRejection;
use super::types::InputMode;

// =============================================================================
// Phases and Inputs
// =============================================================================

/// Playback lifecycle phase of one preview.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Errored,
}

/// User input delivered to the machine, already normalized by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackInput {
    HoverStart,
    HoverEnd,
    Touch,
}

/// Ticket identifying one in-flight play request. Settlements carrying a
/// ticket other than the most recent one are stale and ignored.
pub type PlayTicket = u64;

/// Side effects for the caller to apply to the live element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackEffect {
    /// Seek to time 0 for a consistent preview window.
    SeekToStart,
    /// Issue the asynchronous play request and report settlement back via
    /// [`PlaybackMachine::on_play_settled`] with this ticket.
    RequestPlay { ticket: PlayTicket },
    /// Pause the element immediately.
    Pause,
    /// Rewind after pausing (optional reset-to-start behavior).
    ResetToStart,
}

/// Most recent user intention; later events invalidate earlier in-flight ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Intent {
    Engage,
    Release,
}

// =============================================================================
// Machine
// =============================================================================

/// Per-preview playback state machine, parameterized by input mode.
#[derive(Debug)]
pub struct PlaybackMachine {
    mode: InputMode,
    phase: PlaybackPhase,
    intent: Intent,
    hover_active: bool,
    /// Rewind to 0 whenever a preview pauses.
    reset_on_pause: bool,
    next_ticket: PlayTicket,
    in_flight: Option<PlayTicket>,
    last_error: Option<ErrorInfo>,
}

impl PlaybackMachine {
    pub fn new(mode: InputMode) -> Self {
        Self {
            mode,
            phase: PlaybackPhase::Idle,
            intent: Intent::Release,
            hover_active: false,
            reset_on_pause: false,
            next_ticket: 0,
            in_flight: None,
            last_error: None,
        }
    }

    pub fn with_reset_on_pause(mut self, reset: bool) -> Self {
        self.reset_on_pause = reset;
        self
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn hover_active(&self) -> bool {
        self.hover_active
    }

    pub fn last_error(&self) -> Option<&ErrorInfo> {
        self.last_error.as_ref()
    }

    /// Whether a play request is awaiting settlement.
    pub fn play_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    // =========================================================================
    // Input Handling
    // =========================================================================

    /// Applies one user input, returning the effects to perform in order.
    pub fn handle(&mut self, input: PlaybackInput) -> Vec<PlaybackEffect> {
        match (self.mode, input) {
            (InputMode::Touch, PlaybackInput::HoverStart | PlaybackInput::HoverEnd) => {
                // Hover is not a signal on touch devices.
                debug!("ignoring hover input in touch mode");
                Vec::new()
            }
            (InputMode::Hover, PlaybackInput::Touch) => {
                debug!("ignoring touch input in hover mode");
                Vec::new()
            }
            (InputMode::Hover, PlaybackInput::HoverStart) => {
                self.hover_active = true;
                self.engage(true)
            }
            (InputMode::Hover, PlaybackInput::HoverEnd) => {
                self.hover_active = false;
                self.release()
            }
            (InputMode::Touch, PlaybackInput::Touch) => self.toggle(),
        }
    }

    /// Re-enters `Loading` from `Errored` and re-applies the last requested
    /// phase. No-op in any other phase.
    pub fn retry(&mut self) -> Vec<PlaybackEffect> {
        if self.phase != PlaybackPhase::Errored {
            debug!(phase = ?self.phase, "retry ignored outside Errored");
            return Vec::new();
        }
        match self.intent {
            Intent::Engage => {
                self.phase = PlaybackPhase::Loading;
                let ticket = self.issue_ticket();
                vec![PlaybackEffect::RequestPlay { ticket }]
            }
            Intent::Release => {
                // The user backed out while errored; a retry should settle
                // quietly into the paused preview.
                self.last_error = None;
                self.phase = PlaybackPhase::Paused;
                Vec::new()
            }
        }
    }

    /// Resets all state for a new source identity.
    pub fn reset_for_new_source(&mut self) {
        self.phase = PlaybackPhase::Idle;
        self.intent = Intent::Release;
        self.hover_active = false;
        self.in_flight = None;
        self.last_error = None;
    }

    // =========================================================================
    // Settlement
    // =========================================================================

    /// Reports settlement of the play request identified by `ticket`.
    ///
    /// Autoplay-policy rejection settles to `Paused`; an actual media error
    /// settles to `Errored`. A success that arrives under a release intention
    /// emits an immediate pause so the element is never left playing.
    pub fn on_play_settled(
        &mut self,
        ticket: PlayTicket,
        result: Result<(), PlayRejection>,
    ) -> Vec<PlaybackEffect> {
        if self.in_flight != Some(ticket) {
            debug!(ticket, "dropping stale play settlement");
            return Vec::new();
        }
        self.in_flight = None;

        match result {
            Ok(()) => {
                if self.intent == Intent::Release {
                    self.phase = PlaybackPhase::Paused;
                    let mut effects = vec![PlaybackEffect::Pause];
                    if self.reset_on_pause {
                        effects.push(PlaybackEffect::ResetToStart);
                    }
                    return effects;
                }
                self.phase = PlaybackPhase::Playing;
                self.last_error = None;
                Vec::new()
            }
            Err(PlayRejection::Policy(reason)) => {
                // The browser wants a user gesture; not an error condition.
                debug!(%reason, "play rejected by autoplay policy");
                self.phase = PlaybackPhase::Paused;
                Vec::new()
            }
            Err(PlayRejection::Media(info)) => {
                self.phase = PlaybackPhase::Errored;
                self.last_error = Some(info);
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn issue_ticket(&mut self) -> PlayTicket {
        self.next_ticket += 1;
        self.in_flight = Some(self.next_ticket);
        self.next_ticket
    }

    fn engage(&mut self, seek_first: bool) -> Vec<PlaybackEffect> {
        self.intent = Intent::Engage;
        match self.phase {
            PlaybackPhase::Idle | PlaybackPhase::Paused => {
                self.phase = PlaybackPhase::Loading;
                let ticket = self.issue_ticket();
                let mut effects = Vec::with_capacity(2);
                if seek_first {
                    effects.push(PlaybackEffect::SeekToStart);
                }
                effects.push(PlaybackEffect::RequestPlay { ticket });
                effects
            }
            // Already loading or playing: the refreshed intent is enough.
            // Errored stays errored until an explicit retry.
            PlaybackPhase::Loading | PlaybackPhase::Playing | PlaybackPhase::Errored => Vec::new(),
        }
    }

    fn release(&mut self) -> Vec<PlaybackEffect> {
        self.intent = Intent::Release;
        match self.phase {
            PlaybackPhase::Playing => {
                self.phase = PlaybackPhase::Paused;
                let mut effects = vec![PlaybackEffect::Pause];
                if self.reset_on_pause {
                    effects.push(PlaybackEffect::ResetToStart);
                }
                effects
            }
            // A play request is still in flight; on_play_settled will pause.
            PlaybackPhase::Loading => Vec::new(),
            PlaybackPhase::Idle | PlaybackPhase::Paused | PlaybackPhase::Errored => Vec::new(),
        }
    }

    fn toggle(&mut self) -> Vec<PlaybackEffect> {
        match self.phase {
            PlaybackPhase::Playing => self.release_via_touch(),
            PlaybackPhase::Loading => {
                if self.intent == Intent::Engage {
                    self.release_via_touch()
                } else {
                    self.intent = Intent::Engage;
                    Vec::new()
                }
            }
            PlaybackPhase::Idle | PlaybackPhase::Paused => {
                self.intent = Intent::Engage;
                self.phase = PlaybackPhase::Loading;
                let ticket = self.issue_ticket();
                vec![PlaybackEffect::RequestPlay { ticket }]
            }
            PlaybackPhase::Errored => Vec::new(),
        }
    }

    fn release_via_touch(&mut self) -> Vec<PlaybackEffect> {
        self.intent = Intent::Release;
        if self.phase == PlaybackPhase::Playing {
            self.phase = PlaybackPhase::Paused;
            vec![PlaybackEffect::Pause]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ErrorKind;

    fn ticket_of(effects: &[PlaybackEffect]) -> PlayTicket {
        effects
            .iter()
            .find_map(|e| match e {
                PlaybackEffect::RequestPlay { ticket } => Some(*ticket),
                _ => None,
            })
            .expect("expected a RequestPlay effect")
    }

    #[test]
    fn test_hover_start_seeks_then_requests_play() {
        let mut machine = PlaybackMachine::new(InputMode::Hover);

        let effects = machine.handle(PlaybackInput::HoverStart);

        assert_eq!(effects[0], PlaybackEffect::SeekToStart);
        assert!(matches!(effects[1], PlaybackEffect::RequestPlay { .. }));
        assert_eq!(machine.phase(), PlaybackPhase::Loading);
        assert!(machine.hover_active());
    }

    #[test]
    fn test_play_settles_to_playing_under_engage() {
        let mut machine = PlaybackMachine::new(InputMode::Hover);
        let ticket = ticket_of(&machine.handle(PlaybackInput::HoverStart));

        let effects = machine.on_play_settled(ticket, Ok(()));

        assert!(effects.is_empty());
        assert_eq!(machine.phase(), PlaybackPhase::Playing);
    }

    #[test]
    fn test_hover_end_while_playing_pauses() {
        let mut machine = PlaybackMachine::new(InputMode::Hover);
        let ticket = ticket_of(&machine.handle(PlaybackInput::HoverStart));
        machine.on_play_settled(ticket, Ok(()));

        let effects = machine.handle(PlaybackInput::HoverEnd);

        assert_eq!(effects, vec![PlaybackEffect::Pause]);
        assert_eq!(machine.phase(), PlaybackPhase::Paused);
        assert!(!machine.hover_active());
    }

    #[test]
    fn test_reset_on_pause_appends_rewind() {
        let mut machine = PlaybackMachine::new(InputMode::Hover).with_reset_on_pause(true);
        let ticket = ticket_of(&machine.handle(PlaybackInput::HoverStart));
        machine.on_play_settled(ticket, Ok(()));

        let effects = machine.handle(PlaybackInput::HoverEnd);

        assert_eq!(
            effects,
            vec![PlaybackEffect::Pause, PlaybackEffect::ResetToStart]
        );
    }

    #[test]
    fn test_enter_then_leave_before_settle_never_leaves_playing() {
        let mut machine = PlaybackMachine::new(InputMode::Hover);
        let ticket = ticket_of(&machine.handle(PlaybackInput::HoverStart));

        // Leave arrives while the play request is still in flight.
        assert!(machine.handle(PlaybackInput::HoverEnd).is_empty());
        assert_eq!(machine.phase(), PlaybackPhase::Loading);

        // The pending request then resolves successfully and must pause.
        let effects = machine.on_play_settled(ticket, Ok(()));
        assert_eq!(effects, vec![PlaybackEffect::Pause]);
        assert_eq!(machine.phase(), PlaybackPhase::Paused);
    }

    #[test]
    fn test_reenter_before_settle_keeps_playing() {
        let mut machine = PlaybackMachine::new(InputMode::Hover);
        let ticket = ticket_of(&machine.handle(PlaybackInput::HoverStart));
        machine.handle(PlaybackInput::HoverEnd);
        machine.handle(PlaybackInput::HoverStart);

        // Only the most recent intention (engage) governs the settlement.
        // The first ticket is still the in-flight one because re-entering
        // during Loading does not issue a second request.
        let effects = machine.on_play_settled(ticket, Ok(()));
        assert!(effects.is_empty());
        assert_eq!(machine.phase(), PlaybackPhase::Playing);
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let mut machine = PlaybackMachine::new(InputMode::Hover);
        let first = ticket_of(&machine.handle(PlaybackInput::HoverStart));
        machine.handle(PlaybackInput::HoverEnd);
        machine.on_play_settled(first, Ok(()));
        assert_eq!(machine.phase(), PlaybackPhase::Paused);

        // Hover again: a new ticket is outstanding; the old one must be inert.
        let second = ticket_of(&machine.handle(PlaybackInput::HoverStart));
        assert!(machine.on_play_settled(first, Ok(())).is_empty());
        assert_eq!(machine.phase(), PlaybackPhase::Loading);

        machine.on_play_settled(second, Ok(()));
        assert_eq!(machine.phase(), PlaybackPhase::Playing);
    }

    #[test]
    fn test_policy_rejection_settles_to_paused_not_errored() {
        let mut machine = PlaybackMachine::new(InputMode::Hover);
        let ticket = ticket_of(&machine.handle(PlaybackInput::HoverStart));

        machine.on_play_settled(
            ticket,
            Err(PlayRejection::Policy("gesture required".into())),
        );

        assert_eq!(machine.phase(), PlaybackPhase::Paused);
        assert!(machine.last_error().is_none());
    }

    #[test]
    fn test_media_rejection_settles_to_errored_with_classification() {
        let mut machine = PlaybackMachine::new(InputMode::Hover);
        let ticket = ticket_of(&machine.handle(PlaybackInput::HoverStart));

        machine.on_play_settled(
            ticket,
            Err(PlayRejection::Media(ErrorInfo::new(
                ErrorKind::Decode,
                "pipeline error",
            ))),
        );

        assert_eq!(machine.phase(), PlaybackPhase::Errored);
        assert_eq!(machine.last_error().unwrap().kind, ErrorKind::Decode);
    }

    #[test]
    fn test_retry_reenters_loading_and_requests_play() {
        let mut machine = PlaybackMachine::new(InputMode::Hover);
        let ticket = ticket_of(&machine.handle(PlaybackInput::HoverStart));
        machine.on_play_settled(
            ticket,
            Err(PlayRejection::Media(ErrorInfo::new(
                ErrorKind::Network,
                "segment fetch",
            ))),
        );

        let effects = machine.retry();

        assert_eq!(machine.phase(), PlaybackPhase::Loading);
        let retry_ticket = ticket_of(&effects);
        machine.on_play_settled(retry_ticket, Ok(()));
        assert_eq!(machine.phase(), PlaybackPhase::Playing);
        assert!(machine.last_error().is_none());
    }

    #[test]
    fn test_retry_after_leave_settles_paused() {
        let mut machine = PlaybackMachine::new(InputMode::Hover);
        let ticket = ticket_of(&machine.handle(PlaybackInput::HoverStart));
        machine.on_play_settled(
            ticket,
            Err(PlayRejection::Media(ErrorInfo::new(
                ErrorKind::Network,
                "segment fetch",
            ))),
        );
        machine.handle(PlaybackInput::HoverEnd);

        let effects = machine.retry();

        assert!(effects.is_empty());
        assert_eq!(machine.phase(), PlaybackPhase::Paused);
    }

    #[test]
    fn test_touch_mode_ignores_hover() {
        let mut machine = PlaybackMachine::new(InputMode::Touch);

        assert!(machine.handle(PlaybackInput::HoverStart).is_empty());
        assert!(machine.handle(PlaybackInput::HoverEnd).is_empty());
        assert_eq!(machine.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn test_touch_toggles_play_pause() {
        let mut machine = PlaybackMachine::new(InputMode::Touch);

        let effects = machine.handle(PlaybackInput::Touch);
        // No seek on touch engage; the preview resumes where it was.
        let ticket = ticket_of(&effects);
        assert!(!effects.contains(&PlaybackEffect::SeekToStart));
        machine.on_play_settled(ticket, Ok(()));
        assert_eq!(machine.phase(), PlaybackPhase::Playing);

        let effects = machine.handle(PlaybackInput::Touch);
        assert_eq!(effects, vec![PlaybackEffect::Pause]);
        assert_eq!(machine.phase(), PlaybackPhase::Paused);
    }

    #[test]
    fn test_touch_during_inflight_play_coalesces_to_pause() {
        let mut machine = PlaybackMachine::new(InputMode::Touch);
        let ticket = ticket_of(&machine.handle(PlaybackInput::Touch));

        // Second tap before the play request settles flips the intention.
        assert!(machine.handle(PlaybackInput::Touch).is_empty());

        let effects = machine.on_play_settled(ticket, Ok(()));
        assert_eq!(effects, vec![PlaybackEffect::Pause]);
        assert_eq!(machine.phase(), PlaybackPhase::Paused);
    }

    #[test]
    fn test_reset_for_new_source_clears_everything() {
        let mut machine = PlaybackMachine::new(InputMode::Hover);
        let ticket = ticket_of(&machine.handle(PlaybackInput::HoverStart));
        machine.on_play_settled(
            ticket,
            Err(PlayRejection::Media(ErrorInfo::new(
                ErrorKind::Decode,
                "bad",
            ))),
        );

        machine.reset_for_new_source();

        assert_eq!(machine.phase(), PlaybackPhase::Idle);
        assert!(machine.last_error().is_none());
        assert!(!machine.play_pending());
    }
}
