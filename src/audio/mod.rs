//! Audio playback for the adhan and the chained invocation.
//!
//! The playback controller is the only component allowed to start audio:
//! it serializes every session through a single lock so duplicate or
//! overlapping triggers can never produce concurrent sound.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │ AudioPlaybackController  │ ← state machine + audio lock
//! └───────────┬──────────────┘
//!             │
//!             ▼
//! ┌──────────────────────────┐     ┌──────────────────┐
//! │  AudioBackend (trait)    │────▶│   RodioBackend   │
//! │  load → paused AudioSink │     ├──────────────────┤
//! └──────────────────────────┘     │   MockBackend    │
//!                                  │   (tests)        │
//!                                  └──────────────────┘
//! ```

mod backend;
mod controller;
mod error;
mod track;

pub use backend::{AudioBackend, AudioSink, MockBackend, MockSinkState, RodioBackend};
pub use controller::{AudioNotice, AudioPlaybackController, PlaybackSettings, PlaybackState};
pub use error::AudioError;
pub use track::{default_track_dir, Reciter, TrackKind, TrackSource};
