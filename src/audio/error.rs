//! Audio subsystem error types.
//!
//! Playback failures are never fatal to the scheduler: a stuck audio lock
//! would silently disable every future adhan, so each error class maps to
//! a recovery path that returns the controller to Idle.

use thiserror::Error;

/// Errors that can occur in the audio playback subsystem.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Audio output device is not available.
    #[error("audio device not available: {0}")]
    DeviceNotAvailable(String),

    /// The adhan or invocation track file was not found.
    #[error("audio track not found: {0}")]
    TrackNotFound(String),

    /// Failed to decode the audio file.
    #[error("failed to decode audio track: {0}")]
    DecodeError(String),

    /// Failed to create the audio output stream or sink.
    #[error("failed to open audio stream: {0}")]
    StreamError(String),

    /// No track is configured for the requested playback.
    #[error("no audio track configured: {0}")]
    NoTrack(String),

    /// Generic playback error.
    #[error("playback error: {0}")]
    PlaybackError(String),
}

impl AudioError {
    /// Returns true if this error is related to device availability.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::DeviceNotAvailable(_) | Self::StreamError(_))
    }

    /// Returns true if this error is related to the track file itself.
    #[must_use]
    pub fn is_track_error(&self) -> bool {
        matches!(self, Self::TrackNotFound(_) | Self::DecodeError(_))
    }
}
