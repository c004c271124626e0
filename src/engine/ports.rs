//! Host Platform Ports
//!
//! Traits the embedding host implements around its real media facilities:
//! the live media element, the adaptive-stream decoder, off-screen frame
//! capture, object storage, object-URL management, and mount containers.
//! The engine's state machines only ever talk to these seams, so every
//! component is testable with in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::{EngineResult, ErrorInfo};
use super::types::{SizingMode, TimeSec};

// =============================================================================
// Media Element
// =============================================================================

/// Why a play request did not start playback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayRejection {
    /// Autoplay-policy refusal. Recoverable by an explicit user gesture;
    /// settles the machine to `Paused`, never `Errored`.
    Policy(String),
    /// An actual decode/network failure surfaced through the play request.
    Media(ErrorInfo),
}

/// The single real media element, as the host exposes it.
///
/// `request_play` mirrors the platform contract: playing is a request, not a
/// guarantee, and settlement is asynchronous.
#[async_trait]
pub trait MediaElement: Send + Sync {
    fn set_source(&self, url: &str);
    fn clear_source(&self);

    async fn request_play(&self) -> Result<(), PlayRejection>;
    fn pause(&self);
    fn seek_to(&self, time: TimeSec);
    fn current_time(&self) -> TimeSec;

    fn set_muted(&self, muted: bool);
    fn set_controls(&self, visible: bool);
    fn set_fit(&self, fit: SizingMode);

    /// Whether the element can natively play the given container MIME type.
    fn can_play_type(&self, mime: &str) -> bool;
}

// =============================================================================
// Mount Containers
// =============================================================================

/// A container that can host the shared media element (grid card slot or
/// full-screen viewer slot).
pub trait MountPoint: Send + Sync {
    /// Identifier for logging and event payloads.
    fn id(&self) -> &str;

    /// Re-parents the element into this container. A move, not a clone.
    /// Returns `false` when the host cannot perform the move; the element
    /// must then remain where it was.
    fn mount(&self, element: &Arc<dyn MediaElement>) -> bool;
}

// =============================================================================
// Adaptive Stream Decoder
// =============================================================================

/// One adaptive-bitrate decoder instance, bindable to exactly one element.
pub trait StreamDecoder: Send + Sync {
    /// Binds the decoder to the element. Attachment confirmation arrives
    /// asynchronously as [`DecoderEvent::Attached`].
    fn attach(&self, element: &Arc<dyn MediaElement>);

    /// Starts loading the manifest. Only valid after attachment confirmed.
    fn load_manifest(&self, url: &str);

    /// Tears the decoder down, releasing its worker. Must happen before the
    /// element is reused for a different source.
    fn destroy(&self);
}

/// Which part of the stream pipeline raised an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamErrorDomain {
    Manifest,
    Fragment,
    Media,
    Other,
}

/// Events the host forwards from its decoder into the stream session.
#[derive(Clone, Debug, PartialEq)]
pub enum DecoderEvent {
    /// The decoder confirmed binding to the element.
    Attached,
    /// The manifest parsed and levels are available.
    ManifestLoaded,
    /// Playback stalled waiting for data. A loading hint, not an error.
    BufferStalled,
    /// The decoder resumed after a stall.
    BufferRecovered,
    /// A pipeline error. Non-fatal errors are self-recovering and swallowed.
    Error {
        fatal: bool,
        domain: StreamErrorDomain,
        message: String,
    },
}

// =============================================================================
// Frame Capture
// =============================================================================

/// A decoded video frame handed back by the host.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    /// Raw pixel data in the host's native layout. The engine never inspects
    /// it; it only forwards it back for encoding.
    pub data: Vec<u8>,
}

/// An encoded poster image plus the immediately-displayable URL for it.
#[derive(Clone, Debug)]
pub struct EncodedPoster {
    /// URL usable right away (data URL or transient blob URL).
    pub url: String,
    /// Encoded image bytes for optional upload to the object store.
    pub bytes: Vec<u8>,
}

/// Off-screen frame capture: load the source without showing it, seek, and
/// surface the decoded frame.
#[async_trait]
pub trait FrameCapture: Send + Sync {
    /// Resolves once the frame at `at` has actually decoded. Fails when the
    /// source cannot load or the frame cannot be read (e.g. cross-origin).
    async fn grab_frame(&self, url: &str, at: TimeSec) -> EngineResult<CapturedFrame>;

    /// Downscales the frame to `target` and encodes it as an image.
    fn encode_poster(&self, frame: &CapturedFrame, target: (u32, u32))
        -> EngineResult<EncodedPoster>;
}

// =============================================================================
// Object Storage
// =============================================================================

/// External object storage. The engine only ever calls `put`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores the bytes under `key` and returns the public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> EngineResult<String>;
}

// =============================================================================
// Object URLs
// =============================================================================

/// Creates and revokes transient object URLs for local files.
pub trait ObjectUrlFactory: Send + Sync {
    fn create_for(&self, file: &super::types::FileHandle) -> String;
    fn revoke(&self, url: &str);
}
