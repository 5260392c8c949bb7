//! Adhan playback state machine.
//!
//! The controller guards a single "now playing" slot: at most one adhan
//! session exists at any instant, duplicate triggers are silently dropped,
//! and the post-adhan invocation is chained under the same lock so the two
//! tracks can never start independently. `stop()` is the designated
//! recovery path and must work from any state, including after an internal
//! failure.
//!
//! States: Idle → Loading → Playing ⇄ Paused → Idle, with a chained
//! Loading → Playing(Invocation) → Idle sub-sequence when the invocation
//! is enabled.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ScheduleConfig;

use super::backend::{volume_to_gain, AudioBackend, AudioSink};
use super::error::AudioError;
use super::track::{Reciter, TrackKind, TrackSource};

/// How often a running session is polled for its natural end.
const END_POLL_INTERVAL: Duration = Duration::from_millis(200);

// ============================================================================
// PlaybackState / settings / notices
// ============================================================================

/// The controller's externally observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing loaded or playing.
    Idle,
    /// A track is being loaded into a sink.
    Loading,
    /// A track is audible.
    Playing,
    /// Playback suspended, position kept.
    Paused,
}

/// Audio settings the controller needs, derived from [`ScheduleConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSettings {
    /// Selected adhan voice; `None` disables adhan audio entirely.
    pub reciter: Option<Reciter>,
    /// Playback volume, 0-100.
    pub volume: u8,
    /// Whether the invocation track chains after the adhan.
    pub invocation_enabled: bool,
    /// Directory holding the bundled tracks.
    pub track_dir: PathBuf,
    /// Audio file for the custom reciter.
    pub custom_audio_path: Option<PathBuf>,
}

impl PlaybackSettings {
    /// Derives playback settings from the schedule configuration.
    pub fn from_config(config: &ScheduleConfig, track_dir: PathBuf) -> Self {
        Self {
            reciter: config.reciter,
            volume: config.volume,
            invocation_enabled: config.invocation_enabled,
            track_dir,
            custom_audio_path: config.custom_audio_path.clone(),
        }
    }

    fn adhan_track(&self) -> Result<TrackSource, AudioError> {
        let reciter = self.reciter.ok_or_else(|| {
            AudioError::NoTrack("no reciter selected".to_string())
        })?;
        TrackSource::adhan(reciter, &self.track_dir, self.custom_audio_path.as_deref())
    }
}

/// Non-fatal notices surfaced to the host (shown as a notification).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioNotice {
    /// Playback could not start or failed mid-track.
    PlaybackFailed {
        /// Human-readable description.
        message: String,
    },
}

// ============================================================================
// AudioPlaybackController
// ============================================================================

struct Inner {
    settings: PlaybackSettings,
    state: PlaybackState,
    /// Which track the active session is playing.
    track: Option<TrackKind>,
    /// The active playback session, if any.
    session: Option<Box<dyn AudioSink>>,
    /// Adhan sink loaded ahead of time by `preload`.
    preloaded: Option<Box<dyn AudioSink>>,
    /// The audio lock: held for the duration of any preload, play-start
    /// or chain operation. Everything under it runs synchronously inside
    /// the mutex, so release-on-every-exit is structural.
    busy: bool,
    /// Bumped on every session start and on stop; a watcher holding a
    /// stale sequence number discards its end event.
    session_seq: u64,
}

impl Inner {
    fn reset_to_idle(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
        self.track = None;
        self.state = PlaybackState::Idle;
        self.session_seq = self.session_seq.wrapping_add(1);
    }
}

enum SessionPoll {
    /// Session still running; keep polling.
    Continue,
    /// Session ended and chained into a new one with this sequence.
    Chained(u64),
    /// Session gone or superseded; watcher exits.
    Done,
}

/// Serializes all adhan and invocation playback through one lock.
pub struct AudioPlaybackController<B: AudioBackend> {
    backend: B,
    inner: Mutex<Inner>,
    notice_tx: mpsc::UnboundedSender<AudioNotice>,
}

impl<B: AudioBackend + 'static> AudioPlaybackController<B> {
    /// Creates a controller in the Idle state.
    ///
    /// Notices about failed playback are delivered on `notice_tx` so the
    /// host can surface them without the controller knowing about the
    /// notification layer.
    pub fn new(
        backend: B,
        settings: PlaybackSettings,
        notice_tx: mpsc::UnboundedSender<AudioNotice>,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            inner: Mutex::new(Inner {
                settings,
                state: PlaybackState::Idle,
                track: None,
                session: None,
                preloaded: None,
                busy: false,
                session_seq: 0,
            }),
            notice_tx,
        })
    }

    /// The current playback state.
    pub fn state(&self) -> PlaybackState {
        self.lock_inner().state
    }

    /// Which track is currently loaded in the active session.
    pub fn current_track(&self) -> Option<TrackKind> {
        self.lock_inner().track
    }

    /// Loads the adhan track ahead of time so `play` starts instantly.
    ///
    /// Tears down any previously buffered sink first, so repeated calls
    /// (for example after the user changes reciter) never leak the old
    /// audio resource. Skipped with a debug log if another audio
    /// operation holds the lock.
    pub fn preload(&self) {
        let mut inner = self.lock_inner();
        if inner.busy {
            debug!("Audio operation in progress, skipping preload");
            return;
        }
        inner.busy = true;

        // Always drop the previous buffer, even when nothing replaces it.
        if let Some(old) = inner.preloaded.take() {
            old.stop();
        }

        let result = match inner.settings.adhan_track() {
            Ok(track) => self.backend.load(&track, inner.settings.volume),
            Err(AudioError::NoTrack(_)) => {
                // No reciter selected: nothing to buffer.
                inner.busy = false;
                return;
            }
            Err(e) => Err(e),
        };

        inner.busy = false;
        match result {
            Ok(sink) => {
                inner.preloaded = Some(sink);
                debug!("Adhan track preloaded");
            }
            Err(e) => warn!("Failed to preload adhan track: {}", e),
        }
    }

    /// Starts adhan playback.
    ///
    /// A second trigger while a session is active or while the audio lock
    /// is held is expected concurrent-trigger noise: it is silently
    /// ignored and logged at debug level, never queued.
    pub fn play(self: &Arc<Self>) {
        let watch = {
            let mut inner = self.lock_inner();
            if inner.busy {
                debug!("Audio operation in progress, ignoring play request");
                return;
            }
            if inner.state != PlaybackState::Idle {
                debug!(
                    "Adhan already {:?}, ignoring duplicate play request",
                    inner.state
                );
                return;
            }

            inner.busy = true;
            let result = self.start_adhan_locked(&mut inner);
            inner.busy = false;

            match result {
                Ok(seq) => Some(seq),
                Err(AudioError::NoTrack(reason)) => {
                    debug!("Adhan audio disabled: {}", reason);
                    inner.reset_to_idle();
                    None
                }
                Err(e) => {
                    warn!("Failed to start adhan playback: {}", e);
                    inner.reset_to_idle();
                    let _ = self.notice_tx.send(AudioNotice::PlaybackFailed {
                        message: e.to_string(),
                    });
                    None
                }
            }
        };

        if let Some(seq) = watch {
            self.spawn_end_watcher(seq);
        }
    }

    /// Pauses the active session. No-op unless currently Playing.
    pub fn pause(&self) {
        let mut inner = self.lock_inner();
        if inner.state != PlaybackState::Playing {
            debug!("Pause ignored in state {:?}", inner.state);
            return;
        }
        if let Some(session) = inner.session.as_ref() {
            session.pause();
        }
        inner.state = PlaybackState::Paused;
        info!("Adhan paused");
    }

    /// Resumes a paused session. No-op unless currently Paused.
    pub fn resume(&self) {
        let mut inner = self.lock_inner();
        if inner.state != PlaybackState::Paused {
            debug!("Resume ignored in state {:?}", inner.state);
            return;
        }
        if let Some(session) = inner.session.as_ref() {
            session.play();
        }
        inner.state = PlaybackState::Playing;
        info!("Adhan resumed");
    }

    /// Halts playback and returns to Idle.
    ///
    /// This is the recovery path: it runs regardless of the audio lock,
    /// cancels any pending chained-invocation trigger, and unconditionally
    /// releases the lock so a stuck state can never disable future adhans.
    pub fn stop(&self) {
        let mut inner = self.lock_inner();
        inner.reset_to_idle();
        inner.busy = false;
        info!("Adhan stopped");
    }

    /// Applies a new volume (clamped to 0-100) to the active and
    /// preloaded sinks immediately.
    pub fn set_volume(&self, volume: u8) {
        let mut inner = self.lock_inner();
        let volume = volume.min(100);
        inner.settings.volume = volume;
        let gain = volume_to_gain(volume);
        if let Some(session) = inner.session.as_ref() {
            session.set_volume(gain);
        }
        if let Some(preloaded) = inner.preloaded.as_ref() {
            preloaded.set_volume(gain);
        }
        debug!("Adhan volume set to {}", volume);
    }

    /// Replaces the playback settings (reciter, volume, invocation flag).
    ///
    /// The caller should follow up with [`Self::preload`] so the buffered
    /// track matches the new selection.
    pub fn update_settings(&self, settings: PlaybackSettings) {
        let mut inner = self.lock_inner();
        inner.settings = settings;
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock poisons it; recover the guard so
        // stop() keeps working as the recovery path.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Transitions Idle → Loading → Playing for the adhan track.
    ///
    /// Called with the audio lock held; returns the new session sequence.
    fn start_adhan_locked(&self, inner: &mut Inner) -> Result<u64, AudioError> {
        inner.state = PlaybackState::Loading;

        let sink = match inner.preloaded.take() {
            Some(sink) => sink,
            None => {
                let track = inner.settings.adhan_track()?;
                self.backend.load(&track, inner.settings.volume)?
            }
        };

        sink.set_volume(volume_to_gain(inner.settings.volume));
        sink.play();

        inner.session = Some(sink);
        inner.track = Some(TrackKind::Adhan);
        inner.state = PlaybackState::Playing;
        inner.session_seq = inner.session_seq.wrapping_add(1);
        info!("Adhan playback started");
        Ok(inner.session_seq)
    }

    /// Handles a session reaching its natural end.
    ///
    /// Called by the end watcher with the sequence it was started for; a
    /// stale sequence (the session was stopped or replaced meanwhile) is
    /// discarded. The adhan chains into the invocation under the same
    /// lock hold, so there is no window where both could start.
    fn poll_session(&self, seq: u64) -> SessionPoll {
        let mut inner = self.lock_inner();

        if inner.session_seq != seq {
            return SessionPoll::Done;
        }
        let finished = match inner.session.as_ref() {
            Some(session) => session.is_finished(),
            None => return SessionPoll::Done,
        };
        if !finished {
            return SessionPoll::Continue;
        }

        let ended = inner.track;
        inner.session = None;

        match ended {
            Some(TrackKind::Adhan) if inner.settings.invocation_enabled => {
                inner.busy = true;
                let result = self.start_invocation_locked(&mut inner);
                inner.busy = false;
                match result {
                    Ok(new_seq) => SessionPoll::Chained(new_seq),
                    Err(e) => {
                        warn!("Failed to chain invocation track: {}", e);
                        inner.reset_to_idle();
                        SessionPoll::Done
                    }
                }
            }
            _ => {
                debug!(
                    "{} track finished, returning to idle",
                    ended.map_or("unknown", |t| t.as_str())
                );
                inner.reset_to_idle();
                SessionPoll::Done
            }
        }
    }

    fn start_invocation_locked(&self, inner: &mut Inner) -> Result<u64, AudioError> {
        inner.state = PlaybackState::Loading;

        let track = TrackSource::invocation(&inner.settings.track_dir);
        let sink = self.backend.load(&track, inner.settings.volume)?;
        sink.play();

        inner.session = Some(sink);
        inner.track = Some(TrackKind::Invocation);
        inner.state = PlaybackState::Playing;
        inner.session_seq = inner.session_seq.wrapping_add(1);
        info!("Invocation playback started");
        Ok(inner.session_seq)
    }

    /// Watches a session for its natural end, following chained sessions.
    fn spawn_end_watcher(self: &Arc<Self>, mut seq: u64) {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(END_POLL_INTERVAL).await;
                let Some(controller) = weak.upgrade() else {
                    return;
                };
                match controller.poll_session(seq) {
                    SessionPoll::Continue => {}
                    SessionPoll::Chained(new_seq) => seq = new_seq,
                    SessionPoll::Done => return,
                }
            }
        });
    }
}

impl<B: AudioBackend> std::fmt::Debug for AudioPlaybackController<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("AudioPlaybackController")
            .field("state", &inner.state)
            .field("track", &inner.track)
            .field("busy", &inner.busy)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
