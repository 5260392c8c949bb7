//! Adhan and invocation track selection.
//!
//! Maps the selected reciter to a concrete audio file under the track
//! directory, mirroring the voice roster the companion app ships with.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::AudioError;

/// File name of the post-adhan invocation track.
const INVOCATION_FILE: &str = "Dua.mp3";

// ============================================================================
// Reciter
// ============================================================================

/// The selected adhan voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reciter {
    /// Ali Ibn Ahmed Mala (Makkah)
    Makkah,
    /// Ibrahim Jabar (Madinah)
    Madinah,
    /// Mishary Rashid Alafasy
    Mishary,
    /// Nasser Al Qatami
    Nasser,
    /// Adame Abou Sakhra
    Adame,
    /// Haj Soulaimane Moukhtar
    Haj,
    /// User-provided audio file.
    Custom,
}

impl Reciter {
    /// The bundled file name for this voice, or `None` for [`Reciter::Custom`].
    pub fn file_name(&self) -> Option<&'static str> {
        match self {
            Reciter::Makkah => Some("Ali Ibn Ahmed Mala.mp3"),
            Reciter::Madinah => Some("Ibrahim Jabar.mp3"),
            Reciter::Mishary => Some("Mishary Rashid Alafasy.mp3"),
            Reciter::Nasser => Some("Nasser Al Qatami.mp3"),
            Reciter::Adame => Some("Adame Abou Sakhra.mp3"),
            Reciter::Haj => Some("Haj Soulaimane Moukhtar.mp3"),
            Reciter::Custom => None,
        }
    }

    /// Human-readable voice name for display and logging.
    pub fn display_name(&self) -> &'static str {
        match self {
            Reciter::Makkah => "Makkah (Ali Ibn Ahmed Mala)",
            Reciter::Madinah => "Madinah (Ibrahim Jabar)",
            Reciter::Mishary => "Mishary Rashid Alafasy",
            Reciter::Nasser => "Nasser Al Qatami",
            Reciter::Adame => "Adame Abou Sakhra",
            Reciter::Haj => "Haj Soulaimane Moukhtar",
            Reciter::Custom => "Custom audio file",
        }
    }
}

// ============================================================================
// TrackKind / TrackSource
// ============================================================================

/// Which of the two playable tracks a session is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// The call to prayer.
    Adhan,
    /// The short invocation chained after the adhan.
    Invocation,
}

impl TrackKind {
    /// Returns the string representation of the track kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Adhan => "adhan",
            TrackKind::Invocation => "invocation",
        }
    }
}

/// A resolved audio track ready for loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSource {
    /// Adhan or invocation.
    pub kind: TrackKind,
    /// Display name of the track.
    pub name: String,
    /// Path to the audio file.
    pub path: PathBuf,
}

impl TrackSource {
    /// Resolves the adhan track for the given reciter.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::NoTrack`] when the custom reciter is selected
    /// without a configured file.
    pub fn adhan(
        reciter: Reciter,
        track_dir: &Path,
        custom_path: Option<&Path>,
    ) -> Result<Self, AudioError> {
        let path = match reciter.file_name() {
            Some(file) => track_dir.join(file),
            None => custom_path
                .map(Path::to_path_buf)
                .ok_or_else(|| {
                    AudioError::NoTrack("custom reciter selected without an audio file".to_string())
                })?,
        };

        Ok(Self {
            kind: TrackKind::Adhan,
            name: reciter.display_name().to_string(),
            path,
        })
    }

    /// Resolves the invocation track.
    pub fn invocation(track_dir: &Path) -> Self {
        Self {
            kind: TrackKind::Invocation,
            name: "Dua".to_string(),
            path: track_dir.join(INVOCATION_FILE),
        }
    }
}

/// The default track directory (`<data dir>/muezzin/audio`).
pub fn default_track_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("muezzin")
        .join("audio")
}

// ============================================================================
// Tests
// ============================================================================
