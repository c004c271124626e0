//! In-memory fakes for the host platform ports, shared across engine tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::error::{EngineError, EngineResult};
use super::ports::{
    CapturedFrame, EncodedPoster, FrameCapture, MediaElement, MountPoint, ObjectStore,
    ObjectUrlFactory, PlayRejection, StreamDecoder,
};
use super::types::{FileHandle, SizingMode, TimeSec};

// =============================================================================
// Fake Media Element
// =============================================================================

#[derive(Default)]
struct ElementState {
    source: Option<String>,
    source_set_count: u32,
    current_time: TimeSec,
    muted: bool,
    controls: bool,
    fit: SizingMode,
}

/// Media element fake recording every mutation.
pub struct FakeElement {
    native_hls: bool,
    state: Mutex<ElementState>,
}

impl FakeElement {
    pub fn with_native_hls(native_hls: bool) -> Arc<Self> {
        Arc::new(Self {
            native_hls,
            state: Mutex::new(ElementState::default()),
        })
    }

    pub fn source(&self) -> Option<String> {
        self.state.lock().unwrap().source.clone()
    }

    pub fn source_set_count(&self) -> u32 {
        self.state.lock().unwrap().source_set_count
    }

    pub fn muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    pub fn controls(&self) -> bool {
        self.state.lock().unwrap().controls
    }

    pub fn fit(&self) -> SizingMode {
        self.state.lock().unwrap().fit
    }
}

#[async_trait]
impl MediaElement for FakeElement {
    fn set_source(&self, url: &str) {
        let mut state = self.state.lock().unwrap();
        state.source = Some(url.to_string());
        state.source_set_count += 1;
        state.current_time = 0.0;
    }

    fn clear_source(&self) {
        self.state.lock().unwrap().source = None;
    }

    async fn request_play(&self) -> Result<(), PlayRejection> {
        Ok(())
    }

    fn pause(&self) {}

    fn seek_to(&self, time: TimeSec) {
        self.state.lock().unwrap().current_time = time;
    }

    fn current_time(&self) -> TimeSec {
        self.state.lock().unwrap().current_time
    }

    fn set_muted(&self, muted: bool) {
        self.state.lock().unwrap().muted = muted;
    }

    fn set_controls(&self, visible: bool) {
        self.state.lock().unwrap().controls = visible;
    }

    fn set_fit(&self, fit: SizingMode) {
        self.state.lock().unwrap().fit = fit;
    }

    fn can_play_type(&self, _mime: &str) -> bool {
        self.native_hls
    }
}

// =============================================================================
// Fake Mount Point
// =============================================================================

/// Mount container fake; optionally rejects every move.
pub struct FakeMount {
    name: String,
    accepts: bool,
    mounts: AtomicU32,
}

impl FakeMount {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            accepts: true,
            mounts: AtomicU32::new(0),
        }
    }

    pub fn rejecting(name: &str) -> Self {
        Self {
            accepts: false,
            ..Self::new(name)
        }
    }

    pub fn mount_count(&self) -> u32 {
        self.mounts.load(Ordering::SeqCst)
    }
}

impl MountPoint for FakeMount {
    fn id(&self) -> &str {
        &self.name
    }

    fn mount(&self, _element: &Arc<dyn MediaElement>) -> bool {
        if self.accepts {
            self.mounts.fetch_add(1, Ordering::SeqCst);
        }
        self.accepts
    }
}

// =============================================================================
// Fake Stream Decoder
// =============================================================================

/// Decoder fake recording the call order, for attach-before-load assertions.
#[derive(Default)]
pub struct FakeDecoder {
    calls: Mutex<Vec<String>>,
    destroys: AtomicU32,
}

impl FakeDecoder {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn destroyed(&self) -> bool {
        self.destroy_count() > 0
    }

    pub fn destroy_count(&self) -> u32 {
        self.destroys.load(Ordering::SeqCst)
    }
}

impl StreamDecoder for FakeDecoder {
    fn attach(&self, _element: &Arc<dyn MediaElement>) {
        self.calls.lock().unwrap().push("attach".to_string());
    }

    fn load_manifest(&self, url: &str) {
        self.calls.lock().unwrap().push(format!("load:{url}"));
    }

    fn destroy(&self) {
        self.calls.lock().unwrap().push("destroy".to_string());
        self.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Fake Frame Capture
// =============================================================================

/// Frame-capture fake: succeeds, fails, fails N times then succeeds, or
/// hangs past any timeout.
pub struct FakeCapture {
    dims: Option<(u32, u32)>,
    fail_first: u32,
    hang: bool,
    grabs: AtomicU32,
    last_target: Mutex<Option<(u32, u32)>>,
}

impl FakeCapture {
    pub fn succeeding(width: u32, height: u32) -> Self {
        Self {
            dims: Some((width, height)),
            fail_first: 0,
            hang: false,
            grabs: AtomicU32::new(0),
            last_target: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            dims: None,
            ..Self::succeeding(0, 0)
        }
    }

    pub fn failing_times(failures: u32, width: u32, height: u32) -> Self {
        Self {
            fail_first: failures,
            ..Self::succeeding(width, height)
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::succeeding(0, 0)
        }
    }

    pub fn grab_calls(&self) -> u32 {
        self.grabs.load(Ordering::SeqCst)
    }

    pub fn last_encode_target(&self) -> Option<(u32, u32)> {
        *self.last_target.lock().unwrap()
    }
}

#[async_trait]
impl FrameCapture for FakeCapture {
    async fn grab_frame(&self, _url: &str, _at: TimeSec) -> EngineResult<CapturedFrame> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        let attempt = self.grabs.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_first {
            return Err(EngineError::CaptureFailed("simulated failure".into()));
        }
        match self.dims {
            Some((width, height)) => Ok(CapturedFrame {
                width,
                height,
                data: vec![0; 4],
            }),
            None => Err(EngineError::CaptureFailed("frame not drawable".into())),
        }
    }

    fn encode_poster(
        &self,
        _frame: &CapturedFrame,
        target: (u32, u32),
    ) -> EngineResult<EncodedPoster> {
        *self.last_target.lock().unwrap() = Some(target);
        Ok(EncodedPoster {
            url: format!("blob:poster-{}x{}", target.0, target.1),
            bytes: vec![0; 16],
        })
    }
}

// =============================================================================
// Fake Object Store
// =============================================================================

/// Object-store fake returning deterministic public URLs.
#[derive(Default)]
pub struct FakeStore {
    fail: bool,
    puts: AtomicU32,
}

impl FakeStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            puts: AtomicU32::new(0),
        }
    }

    pub fn put_calls(&self) -> u32 {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put(&self, key: &str, _bytes: Vec<u8>) -> EngineResult<String> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EngineError::StoreFailed("simulated outage".into()));
        }
        Ok(format!("https://store.example.com/{key}"))
    }
}

// =============================================================================
// Fake Object URL Factory
// =============================================================================

/// Object-URL factory fake counting creates and revokes.
#[derive(Default)]
pub struct FakeUrlFactory {
    creates: AtomicU32,
    revokes: AtomicU32,
}

impl FakeUrlFactory {
    pub fn created(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn revoked(&self) -> u32 {
        self.revokes.load(Ordering::SeqCst)
    }
}

impl ObjectUrlFactory for FakeUrlFactory {
    fn create_for(&self, file: &FileHandle) -> String {
        let n = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        format!("blob:{}-{}", file.token(), n)
    }

    fn revoke(&self, _url: &str) {
        self.revokes.fetch_add(1, Ordering::SeqCst);
    }
}
