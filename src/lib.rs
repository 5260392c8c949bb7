//! Prayer Companion Library
//!
//! This library provides the core functionality for the prayer times CLI.
//! It includes:
//! - Prayer schedule types with next/current prayer resolution
//! - Event planner firing reminders and adhan events at the right instants
//! - Audio playback controller with adhan and invocation chaining
//! - Desktop notification gateway
//! - Settings persistence with forgiving JSON loading
//! - Prayer times providers reading JSON day records

pub mod audio;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod notify;
pub mod planner;
pub mod provider;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{NextPrayer, PrayerName, PrayerSchedule, TimesError};

// Re-export configuration types
pub use config::{ConfigStore, PerPrayer, ScheduleConfig};

// Re-export planner types
pub use planner::{ActionKind, EventPlanner, PlannerEvent, ScheduledAction};

// Re-export audio types
pub use audio::{
    default_track_dir, AudioBackend, AudioError, AudioNotice, AudioPlaybackController,
    AudioSink, MockBackend, PlaybackSettings, PlaybackState, Reciter, RodioBackend,
    TrackKind, TrackSource,
};

// Re-export notification types
pub use notify::{DesktopGateway, MockGateway, NotificationGateway, NotifyError};

// Re-export provider types
pub use provider::{
    DayRecord, FileTimesProvider, FixedTimesProvider, ProviderError, TimesProvider,
};

// Re-export daemon types
pub use daemon::{ControlEvent, PrayerService, ServiceHandle};
