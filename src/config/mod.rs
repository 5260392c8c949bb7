//! Scheduling configuration and persistence.
//!
//! The configuration record controls which prayers fire, the reminder lead
//! time, and the audio settings. It is stored as a JSON file in the platform
//! config directory; a missing or corrupt record falls back to documented
//! defaults so the daemon always starts with a usable configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audio::Reciter;
use crate::types::PrayerName;

/// File name of the persisted configuration record.
const CONFIG_FILE_NAME: &str = "config.json";

fn default_reminder_lead_minutes() -> u32 {
    15
}

fn default_adhan_enabled() -> bool {
    true
}

fn default_reciter() -> Option<Reciter> {
    Some(Reciter::Makkah)
}

fn default_volume() -> u8 {
    70
}

fn default_per_prayer() -> PerPrayer {
    PerPrayer::default()
}

// ============================================================================
// PerPrayer
// ============================================================================

/// Per-prayer enable switches. All prayers are enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerPrayer {
    /// Fajr enabled
    pub fajr: bool,
    /// Dhuhr enabled
    pub dhuhr: bool,
    /// Asr enabled
    pub asr: bool,
    /// Maghrib enabled
    pub maghrib: bool,
    /// Isha enabled
    pub isha: bool,
}

impl Default for PerPrayer {
    fn default() -> Self {
        Self {
            fajr: true,
            dhuhr: true,
            asr: true,
            maghrib: true,
            isha: true,
        }
    }
}

impl PerPrayer {
    /// Returns whether the given prayer is enabled.
    pub fn is_enabled(&self, prayer: PrayerName) -> bool {
        match prayer {
            PrayerName::Fajr => self.fajr,
            PrayerName::Dhuhr => self.dhuhr,
            PrayerName::Asr => self.asr,
            PrayerName::Maghrib => self.maghrib,
            PrayerName::Isha => self.isha,
        }
    }

    /// Sets the enable state for the given prayer.
    pub fn set_enabled(&mut self, prayer: PrayerName, enabled: bool) {
        match prayer {
            PrayerName::Fajr => self.fajr = enabled,
            PrayerName::Dhuhr => self.dhuhr = enabled,
            PrayerName::Asr => self.asr = enabled,
            PrayerName::Maghrib => self.maghrib = enabled,
            PrayerName::Isha => self.isha = enabled,
        }
    }
}

// ============================================================================
// ScheduleConfig
// ============================================================================

/// Configuration for prayer-event scheduling and playback.
///
/// Missing fields in the persisted record deserialize to the documented
/// defaults: reminders off, 15 minute lead, all prayers enabled, adhan on,
/// volume 70, invocation off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Whether pre-prayer reminder notifications are sent.
    #[serde(default)]
    pub reminders_enabled: bool,

    /// Minutes before each prayer that the reminder fires (1-60).
    #[serde(default = "default_reminder_lead_minutes")]
    pub reminder_lead_minutes: u32,

    /// Per-prayer enable switches.
    #[serde(default = "default_per_prayer")]
    pub per_prayer: PerPrayer,

    /// Whether adhan firings are scheduled at all.
    #[serde(default = "default_adhan_enabled")]
    pub adhan_enabled: bool,

    /// Selected adhan voice; `None` means no adhan audio (notifications
    /// may still fire, the two toggles are independent).
    #[serde(default = "default_reciter")]
    pub reciter: Option<Reciter>,

    /// Playback volume, 0-100.
    #[serde(default = "default_volume")]
    pub volume: u8,

    /// Whether the invocation track plays after the adhan finishes.
    #[serde(default)]
    pub invocation_enabled: bool,

    /// Audio file for [`Reciter::Custom`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_audio_path: Option<PathBuf>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            reminders_enabled: false,
            reminder_lead_minutes: default_reminder_lead_minutes(),
            per_prayer: PerPrayer::default(),
            adhan_enabled: default_adhan_enabled(),
            reciter: default_reciter(),
            volume: default_volume(),
            invocation_enabled: false,
            custom_audio_path: None,
        }
    }
}

impl ScheduleConfig {
    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.reminder_lead_minutes < 1 || self.reminder_lead_minutes > 60 {
            return Err("reminder lead must be between 1 and 60 minutes".to_string());
        }
        if self.volume > 100 {
            return Err("volume must be between 0 and 100".to_string());
        }
        if self.reciter == Some(Reciter::Custom) && self.custom_audio_path.is_none() {
            return Err("custom reciter selected but no audio file configured".to_string());
        }
        Ok(())
    }

    /// Sets the volume, clamped to 0-100.
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
    }

    /// Sets the reminder lead time, clamped to 1-60 minutes.
    pub fn set_reminder_lead_minutes(&mut self, minutes: u32) {
        self.reminder_lead_minutes = minutes.clamp(1, 60);
    }
}

// ============================================================================
// ConfigStore
// ============================================================================

/// Durable JSON-file store for the configuration record.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the default platform location
    /// (`<config dir>/muezzin/config.json`).
    pub fn default_location() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("muezzin").join(CONFIG_FILE_NAME))
    }

    /// The file path backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration, falling back to defaults.
    ///
    /// A missing file is normal on first run; a corrupt or invalid record
    /// is logged and replaced by defaults rather than failing startup.
    pub fn load(&self) -> ScheduleConfig {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config record at {}, using defaults", self.path.display());
                return ScheduleConfig::default();
            }
            Err(e) => {
                warn!(
                    "Failed to read config record {}: {}, using defaults",
                    self.path.display(),
                    e
                );
                return ScheduleConfig::default();
            }
        };

        match serde_json::from_str::<ScheduleConfig>(&raw) {
            Ok(config) => {
                if let Err(e) = config.validate() {
                    warn!("Persisted config is invalid ({}), using defaults", e);
                    ScheduleConfig::default()
                } else {
                    config
                }
            }
            Err(e) => {
                warn!("Corrupt config record ({}), using defaults", e);
                ScheduleConfig::default()
            }
        }
    }

    /// Writes the configuration record, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or file cannot be written.
    pub fn save(&self, config: &ScheduleConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, json)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod per_prayer_tests {
        use super::*;

        #[test]
        fn test_all_enabled_by_default() {
            let per_prayer = PerPrayer::default();
            for prayer in PrayerName::ALL {
                assert!(per_prayer.is_enabled(prayer));
            }
        }

        #[test]
        fn test_set_enabled() {
            let mut per_prayer = PerPrayer::default();
            per_prayer.set_enabled(PrayerName::Dhuhr, false);

            assert!(!per_prayer.is_enabled(PrayerName::Dhuhr));
            assert!(per_prayer.is_enabled(PrayerName::Fajr));
            assert!(per_prayer.is_enabled(PrayerName::Isha));
        }
    }

    mod schedule_config_tests {
        use super::*;

        #[test]
        fn test_default_values() {
            let config = ScheduleConfig::default();
            assert!(!config.reminders_enabled);
            assert_eq!(config.reminder_lead_minutes, 15);
            assert!(config.adhan_enabled);
            assert_eq!(config.reciter, Some(Reciter::Makkah));
            assert_eq!(config.volume, 70);
            assert!(!config.invocation_enabled);
            assert!(config.custom_audio_path.is_none());
        }

        #[test]
        fn test_validate_success() {
            assert!(ScheduleConfig::default().validate().is_ok());
        }

        #[test]
        fn test_validate_lead_minutes_bounds() {
            let mut config = ScheduleConfig::default();

            config.reminder_lead_minutes = 0;
            assert!(config.validate().is_err());

            config.reminder_lead_minutes = 1;
            assert!(config.validate().is_ok());

            config.reminder_lead_minutes = 60;
            assert!(config.validate().is_ok());

            config.reminder_lead_minutes = 61;
            assert!(config.validate().is_err());
        }

        #[test]
        fn test_validate_volume() {
            let mut config = ScheduleConfig::default();
            config.volume = 100;
            assert!(config.validate().is_ok());

            config.volume = 101;
            assert!(config.validate().is_err());
        }

        #[test]
        fn test_validate_custom_reciter_needs_path() {
            let mut config = ScheduleConfig::default();
            config.reciter = Some(Reciter::Custom);
            assert!(config.validate().is_err());

            config.custom_audio_path = Some(PathBuf::from("/tmp/custom.mp3"));
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_set_volume_clamps() {
            let mut config = ScheduleConfig::default();
            config.set_volume(150);
            assert_eq!(config.volume, 100);

            config.set_volume(0);
            assert_eq!(config.volume, 0);
        }

        #[test]
        fn test_set_reminder_lead_clamps() {
            let mut config = ScheduleConfig::default();
            config.set_reminder_lead_minutes(0);
            assert_eq!(config.reminder_lead_minutes, 1);

            config.set_reminder_lead_minutes(90);
            assert_eq!(config.reminder_lead_minutes, 60);
        }

        #[test]
        fn test_deserialize_empty_record_uses_defaults() {
            let config: ScheduleConfig = serde_json::from_str("{}").unwrap();
            assert_eq!(config, ScheduleConfig::default());
        }

        #[test]
        fn test_deserialize_partial_record() {
            let json = r#"{"reminders_enabled": true, "volume": 40}"#;
            let config: ScheduleConfig = serde_json::from_str(json).unwrap();

            assert!(config.reminders_enabled);
            assert_eq!(config.volume, 40);
            // Untouched fields keep defaults.
            assert_eq!(config.reminder_lead_minutes, 15);
            assert!(config.adhan_enabled);
        }

        #[test]
        fn test_reciter_none_round_trip() {
            let mut config = ScheduleConfig::default();
            config.reciter = None;

            let json = serde_json::to_string(&config).unwrap();
            let parsed: ScheduleConfig = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed.reciter, None);
        }

        #[test]
        fn test_serialize_round_trip() {
            let mut config = ScheduleConfig::default();
            config.reminders_enabled = true;
            config.per_prayer.set_enabled(PrayerName::Asr, false);
            config.invocation_enabled = true;

            let json = serde_json::to_string(&config).unwrap();
            let parsed: ScheduleConfig = serde_json::from_str(&json).unwrap();
            assert_eq!(config, parsed);
        }
    }

    mod config_store_tests {
        use super::*;

        #[test]
        fn test_load_missing_file_returns_defaults() {
            let dir = tempfile::tempdir().unwrap();
            let store = ConfigStore::new(dir.path().join("config.json"));
            assert_eq!(store.load(), ScheduleConfig::default());
        }

        #[test]
        fn test_load_corrupt_record_returns_defaults() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("config.json");
            std::fs::write(&path, "{not json").unwrap();

            let store = ConfigStore::new(path);
            assert_eq!(store.load(), ScheduleConfig::default());
        }

        #[test]
        fn test_load_invalid_record_returns_defaults() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("config.json");
            std::fs::write(&path, r#"{"reminder_lead_minutes": 999}"#).unwrap();

            let store = ConfigStore::new(path);
            assert_eq!(store.load(), ScheduleConfig::default());
        }

        #[test]
        fn test_save_and_load_round_trip() {
            let dir = tempfile::tempdir().unwrap();
            let store = ConfigStore::new(dir.path().join("nested").join("config.json"));

            let mut config = ScheduleConfig::default();
            config.reminders_enabled = true;
            config.volume = 55;

            store.save(&config).unwrap();
            assert_eq!(store.load(), config);
        }
    }
}
