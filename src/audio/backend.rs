//! Audio backend abstraction and the rodio implementation.
//!
//! The backend loads a track into a paused sink; the playback controller
//! owns the sink afterwards and drives play/pause/stop on it. A mock
//! backend is provided for tests so the state machine can be exercised
//! without audio hardware.

use std::fs::File;
use std::io::BufReader;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tracing::debug;

use super::error::AudioError;
use super::track::TrackSource;

/// A loaded audio session handle.
///
/// Created paused by [`AudioBackend::load`]; dropped (or stopped) to
/// release the underlying device resources.
pub trait AudioSink: Send + Sync {
    /// Starts or resumes playback.
    fn play(&self);
    /// Pauses playback, keeping the position.
    fn pause(&self);
    /// Halts and rewinds; the sink cannot be restarted afterwards.
    fn stop(&self);
    /// Applies a volume in 0.0..=1.0 immediately.
    fn set_volume(&self, volume: f32);
    /// True once the track has played to its natural end.
    fn is_finished(&self) -> bool;
}

/// Loads tracks into playable sinks.
pub trait AudioBackend: Send + Sync {
    /// Loads the given track fully, returning a paused sink at the given
    /// volume (0-100).
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, cannot be decoded, or the
    /// device refuses a new stream.
    fn load(&self, track: &TrackSource, volume: u8) -> Result<Box<dyn AudioSink>, AudioError>;
}

/// Converts a 0-100 volume to the sink's 0.0-1.0 scale.
pub(crate) fn volume_to_gain(volume: u8) -> f32 {
    f32::from(volume.min(100)) / 100.0
}

// ============================================================================
// RodioBackend
// ============================================================================

/// Rodio-based backend for real audio output.
///
/// Only the `OutputStreamHandle` is stored: cpal's `Stream` (wrapped by
/// `rodio::OutputStream`) is `!Send + !Sync`, so the stream is leaked in
/// [`RodioBackend::new`] to keep it alive for the process lifetime.
pub struct RodioBackend {
    /// Handle to the output stream for creating sinks.
    stream_handle: OutputStreamHandle,
}

impl RodioBackend {
    /// Creates a new backend on the default audio device.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::DeviceNotAvailable`] if no output device
    /// is available.
    pub fn new() -> Result<Self, AudioError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| AudioError::DeviceNotAvailable(e.to_string()))?;

        debug!("Audio output stream initialized");

        // The stream must outlive every sink but is !Send, so it cannot be
        // stored behind the Send + Sync backend; leak it for the process
        // lifetime instead.
        std::mem::forget(stream);

        Ok(Self { stream_handle })
    }
}

impl AudioBackend for RodioBackend {
    fn load(&self, track: &TrackSource, volume: u8) -> Result<Box<dyn AudioSink>, AudioError> {
        let file = File::open(&track.path)
            .map_err(|e| AudioError::TrackNotFound(format!("{}: {}", track.path.display(), e)))?;

        let reader = BufReader::new(file);
        let decoder =
            Decoder::new(reader).map_err(|e| AudioError::DecodeError(e.to_string()))?;

        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        sink.set_volume(volume_to_gain(volume));
        sink.append(decoder);
        sink.pause();

        debug!("Loaded {} track: {}", track.kind.as_str(), track.name);
        Ok(Box::new(RodioSink { sink }))
    }
}

impl std::fmt::Debug for RodioBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioBackend").finish_non_exhaustive()
    }
}

struct RodioSink {
    sink: Sink,
}

impl AudioSink for RodioSink {
    fn play(&self) {
        self.sink.play();
    }

    fn pause(&self) {
        self.sink.pause();
    }

    fn stop(&self) {
        self.sink.stop();
    }

    fn set_volume(&self, volume: f32) {
        self.sink.set_volume(volume);
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }
}

// ============================================================================
// Mock backend for tests
// ============================================================================

/// Observable state of a single mock sink.
#[derive(Debug, Default)]
pub struct MockSinkState {
    playing: AtomicBool,
    stopped: AtomicBool,
    finished: AtomicBool,
    play_calls: AtomicU32,
    volume_milli: AtomicU32,
}

impl MockSinkState {
    /// True if the sink is currently playing.
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// True if `stop` was called on the sink.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Number of `play` calls observed.
    pub fn play_calls(&self) -> u32 {
        self.play_calls.load(Ordering::SeqCst)
    }

    /// The last applied volume, in 0.0..=1.0.
    pub fn volume(&self) -> f32 {
        self.volume_milli.load(Ordering::SeqCst) as f32 / 1000.0
    }

    /// Marks the track as naturally finished.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }
}

struct MockSink {
    state: Arc<MockSinkState>,
}

impl AudioSink for MockSink {
    fn play(&self) {
        self.state.play_calls.fetch_add(1, Ordering::SeqCst);
        self.state.playing.store(true, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.state.playing.store(false, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.state.stopped.store(true, Ordering::SeqCst);
        self.state.playing.store(false, Ordering::SeqCst);
    }

    fn set_volume(&self, volume: f32) {
        self.state
            .volume_milli
            .store((volume * 1000.0) as u32, Ordering::SeqCst);
    }

    fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::SeqCst)
    }
}

/// Mock backend recording every loaded track for assertions.
#[derive(Debug, Default)]
pub struct MockBackend {
    loads: Mutex<Vec<(TrackSource, u8, Arc<MockSinkState>)>>,
    should_fail: AtomicBool,
}

impl MockBackend {
    /// Creates a new mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `load` calls fail with a device error.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Number of tracks loaded so far.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.lock().unwrap().len()
    }

    /// The track and volume of the `n`-th load, with its sink state.
    #[must_use]
    pub fn load_at(&self, n: usize) -> Option<(TrackSource, u8, Arc<MockSinkState>)> {
        self.loads.lock().unwrap().get(n).cloned()
    }

    /// Sink state of the most recent load.
    #[must_use]
    pub fn last_sink(&self) -> Option<Arc<MockSinkState>> {
        self.loads
            .lock()
            .unwrap()
            .last()
            .map(|(_, _, state)| Arc::clone(state))
    }
}

impl AudioBackend for MockBackend {
    fn load(&self, track: &TrackSource, volume: u8) -> Result<Box<dyn AudioSink>, AudioError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(AudioError::DeviceNotAvailable("mock failure".to_string()));
        }

        let state = Arc::new(MockSinkState::default());
        state
            .volume_milli
            .store((volume_to_gain(volume) * 1000.0) as u32, Ordering::SeqCst);
        self.loads
            .lock()
            .unwrap()
            .push((track.clone(), volume, Arc::clone(&state)));
        Ok(Box::new(MockSink { state }))
    }
}

// ============================================================================
// Tests
// ============================================================================
