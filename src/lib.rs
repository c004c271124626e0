//! ReelGrid Core Library
//!
//! Preview orchestration engine for media grids: resolves poster thumbnails,
//! drives hover/touch preview playback, manages adaptive-stream sessions with
//! progressive fallback, brokers the single shared media element between a
//! grid card and the full-screen viewer, and selects the render path for a
//! media reference.
//!
//! The engine is sans-IO: all platform facilities (the media element, the
//! stream decoder, frame capture, object storage) enter through the traits in
//! [`engine::ports`], implemented by the embedding host.

pub mod engine;
pub mod events;
pub mod fs;
pub mod logging;

pub use engine::broker::SharedElementBroker;
pub use engine::playback::{PlaybackEffect, PlaybackMachine, PlaybackPhase};
pub use engine::preview::PreviewInstance;
pub use engine::select::{select_render, RenderContext, RenderDecision, RenderPlan};
pub use engine::settings::{EngineSettings, SettingsStore};
pub use engine::stream::StreamSession;
pub use engine::thumbnail::ThumbnailResolver;
pub use engine::{EngineError, EngineResult, MediaReference};
pub use events::{EngineEvent, EventBus};
