//! Shared Element Broker
//!
//! Exactly one live media element backs the "primary" video at any time.
//! Moving it between a grid-card slot and the full-screen viewer is a
//! re-parent, not a clone, so decode state survives the trip. The broker is
//! an injected instance, never an ambient global, so tests can run isolated
//! brokers side by side.
//!
//! Move failures are logged and absorbed: the element simply stays in its
//! prior container and the user can retry the triggering action.

use std::sync::Arc;

use tracing::{debug, warn};

use super::ports::{MediaElement, MountPoint};
use super::types::{ContainerId, DisplayOptions, SourceKey};

/// Current checkout of the single shared element.
struct Checkout {
    element: Arc<dyn MediaElement>,
    source_key: SourceKey,
    origin: Arc<dyn MountPoint>,
    current: Arc<dyn MountPoint>,
}

/// Tracks which container currently holds the shared media element.
#[derive(Default)]
pub struct SharedElementBroker {
    slot: Option<Checkout>,
}

impl SharedElementBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `element` as owned by `origin` for `source_key` and mounts
    /// it there. Idempotent: calling again with the same element and key is
    /// a no-op (no re-mount, no state reset). When the origin refuses the
    /// mount, nothing is recorded and the broker stays empty.
    pub fn checkout(
        &mut self,
        element: Arc<dyn MediaElement>,
        source_key: impl Into<SourceKey>,
        origin: Arc<dyn MountPoint>,
    ) {
        let source_key = source_key.into();

        if let Some(slot) = &self.slot {
            if slot.source_key == source_key && Arc::ptr_eq(&slot.element, &element) {
                debug!(%source_key, "checkout already held; no-op");
                return;
            }
        }

        if !origin.mount(&element) {
            warn!(
                container = origin.id(),
                %source_key,
                "could not mount element at checkout; nothing recorded"
            );
            return;
        }
        self.slot = Some(Checkout {
            element,
            source_key,
            current: origin.clone(),
            origin,
        });
    }

    /// Re-parents the element into `target` and applies `options`. Fails
    /// silently when there is nothing checked out or the host cannot perform
    /// the move; the element then stays in its prior container untouched.
    pub fn move_to(&mut self, target: Arc<dyn MountPoint>, options: &DisplayOptions) {
        let Some(slot) = &mut self.slot else {
            warn!(container = target.id(), "move requested with no checkout");
            return;
        };
        if Arc::ptr_eq(&slot.current, &target) {
            debug!(container = target.id(), "element already in target container");
            apply_display(&slot.element, options);
            return;
        }
        if !target.mount(&slot.element) {
            warn!(
                from = slot.current.id(),
                to = target.id(),
                "element move failed; staying in prior container"
            );
            return;
        }
        apply_display(&slot.element, options);
        slot.current = target;
    }

    /// Re-parents back to the origin container and restores preview defaults
    /// (muted, no controls, cover fit).
    pub fn return_to_origin(&mut self) {
        let origin = match &self.slot {
            Some(slot) => slot.origin.clone(),
            None => {
                debug!("return requested with no checkout");
                return;
            }
        };
        self.move_to(origin, &DisplayOptions::preview_defaults());
    }

    /// Releases the checkout, handing the element back to the caller for
    /// teardown. The broker forgets the containers.
    pub fn release(&mut self) -> Option<Arc<dyn MediaElement>> {
        self.slot.take().map(|slot| slot.element)
    }

    pub fn has_checkout(&self) -> bool {
        self.slot.is_some()
    }

    pub fn source_key(&self) -> Option<&SourceKey> {
        self.slot.as_ref().map(|s| &s.source_key)
    }

    /// Container currently displaying the element.
    pub fn holder(&self) -> Option<ContainerId> {
        self.slot.as_ref().map(|s| s.current.id().to_string())
    }

    /// Whether the element has been moved away from its origin container.
    pub fn away_from_origin(&self) -> bool {
        self.slot
            .as_ref()
            .is_some_and(|s| !Arc::ptr_eq(&s.origin, &s.current))
    }
}

fn apply_display(element: &Arc<dyn MediaElement>, options: &DisplayOptions) {
    element.set_muted(options.muted);
    element.set_controls(options.controls);
    element.set_fit(options.fit);
}
