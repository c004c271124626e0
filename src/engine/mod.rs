//! ReelGrid Preview Engine
//!
//! Core preview orchestration module.
//! Handles thumbnail resolution, hover/touch playback, adaptive streaming,
//! the shared media element, and render-path selection.

pub mod broker;
pub mod playback;
pub mod ports;
pub mod preview;
pub mod retry;
pub mod select;
pub mod settings;
pub mod stream;
pub mod thumbnail;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

#[cfg(test)]
pub(crate) mod testutil;
