//! Prayer-times input boundary.
//!
//! Fetching and computing raw prayer times is external to this crate; the
//! daemon only needs something that can hand it a validated
//! [`PrayerSchedule`] for a given day. The file provider reads the JSON
//! day records the companion's fetch layer writes.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{PrayerSchedule, TimesError};

/// Errors from a times provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The times file could not be read.
    #[error("failed to read times file {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The times file is not valid JSON.
    #[error("malformed times file {path}: {detail}")]
    Malformed {
        /// File path.
        path: PathBuf,
        /// Parse error detail.
        detail: String,
    },

    /// No record exists for the requested day.
    #[error("no prayer times available for {0}")]
    NoTimesForDate(NaiveDate),

    /// The record exists but its times are invalid.
    #[error(transparent)]
    InvalidTimes(#[from] TimesError),
}

/// Hands out the daily schedule that drives replanning.
pub trait TimesProvider: Send + Sync {
    /// Returns the validated schedule for the given day.
    ///
    /// # Errors
    ///
    /// Returns an error if no times are available for the day or the
    /// stored times are malformed.
    fn times_for(&self, date: NaiveDate) -> Result<PrayerSchedule, ProviderError>;
}

// ============================================================================
// Day records
// ============================================================================

/// One day of prayer times as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    /// Calendar day.
    pub date: NaiveDate,
    /// Fajr clock time, "HH:MM".
    pub fajr: String,
    /// Dhuhr clock time, "HH:MM".
    pub dhuhr: String,
    /// Asr clock time, "HH:MM".
    pub asr: String,
    /// Maghrib clock time, "HH:MM".
    pub maghrib: String,
    /// Isha clock time, "HH:MM".
    pub isha: String,
}

impl DayRecord {
    /// Validates and converts this record into a schedule.
    ///
    /// # Errors
    ///
    /// Returns an error if a time is malformed or the ordering is wrong.
    pub fn to_schedule(&self) -> Result<PrayerSchedule, TimesError> {
        PrayerSchedule::parse(
            self.date,
            [
                self.fajr.as_str(),
                self.dhuhr.as_str(),
                self.asr.as_str(),
                self.maghrib.as_str(),
                self.isha.as_str(),
            ],
        )
    }
}

/// A times file holds either one day or a list of days.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimesFile {
    One(DayRecord),
    Many(Vec<DayRecord>),
}

// ============================================================================
// FileTimesProvider
// ============================================================================

/// Reads day records from a JSON file on every lookup.
///
/// Re-reading keeps the daemon in sync with a fetch layer that rewrites
/// the file once a day, without any change-notification plumbing.
#[derive(Debug, Clone)]
pub struct FileTimesProvider {
    path: PathBuf,
}

impl FileTimesProvider {
    /// Creates a provider backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TimesProvider for FileTimesProvider {
    fn times_for(&self, date: NaiveDate) -> Result<PrayerSchedule, ProviderError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| ProviderError::Io {
            path: self.path.clone(),
            source,
        })?;

        let file: TimesFile =
            serde_json::from_str(&raw).map_err(|e| ProviderError::Malformed {
                path: self.path.clone(),
                detail: e.to_string(),
            })?;

        let record = match file {
            TimesFile::One(record) if record.date == date => record,
            TimesFile::One(_) => return Err(ProviderError::NoTimesForDate(date)),
            TimesFile::Many(records) => records
                .into_iter()
                .find(|r| r.date == date)
                .ok_or(ProviderError::NoTimesForDate(date))?,
        };

        Ok(record.to_schedule()?)
    }
}

// ============================================================================
// FixedTimesProvider
// ============================================================================

/// Provider serving one fixed schedule regardless of date, with the
/// requested date substituted in. Used for demos and tests.
#[derive(Debug, Clone)]
pub struct FixedTimesProvider {
    times: [String; 5],
}

impl FixedTimesProvider {
    /// Creates a provider serving the given "HH:MM" times every day.
    pub fn new(times: [&str; 5]) -> Self {
        Self {
            times: times.map(String::from),
        }
    }
}

impl TimesProvider for FixedTimesProvider {
    fn times_for(&self, date: NaiveDate) -> Result<PrayerSchedule, ProviderError> {
        let times: [&str; 5] = [
            &self.times[0],
            &self.times[1],
            &self.times[2],
            &self.times[3],
            &self.times[4],
        ];
        Ok(PrayerSchedule::parse(date, times)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
