//! Core data types for the prayer-times companion.
//!
//! This module defines the data structures used for:
//! - Prayer identity and fixed daily ordering
//! - The daily prayer schedule with next/current lookups
//! - Wall-clock instants for scheduled firings

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// PrayerName
// ============================================================================

/// The five daily prayers, in fixed chronological order within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrayerName {
    /// Dawn prayer
    Fajr,
    /// Midday prayer
    Dhuhr,
    /// Afternoon prayer
    Asr,
    /// Sunset prayer
    Maghrib,
    /// Night prayer
    Isha,
}

impl PrayerName {
    /// All five prayers in chronological order.
    pub const ALL: [PrayerName; 5] = [
        PrayerName::Fajr,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    /// Returns the string representation of the prayer name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        }
    }

    /// Position in the fixed daily order (Fajr = 0 .. Isha = 4).
    pub fn index(&self) -> usize {
        match self {
            PrayerName::Fajr => 0,
            PrayerName::Dhuhr => 1,
            PrayerName::Asr => 2,
            PrayerName::Maghrib => 3,
            PrayerName::Isha => 4,
        }
    }

    /// The prayer preceding this one in circular daily order.
    ///
    /// Fajr wraps to the previous day's Isha.
    pub fn previous(&self) -> PrayerName {
        match self {
            PrayerName::Fajr => PrayerName::Isha,
            PrayerName::Dhuhr => PrayerName::Fajr,
            PrayerName::Asr => PrayerName::Dhuhr,
            PrayerName::Maghrib => PrayerName::Asr,
            PrayerName::Isha => PrayerName::Maghrib,
        }
    }
}

impl std::fmt::Display for PrayerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TimesError
// ============================================================================

/// Errors produced while constructing or parsing a daily schedule.
#[derive(Debug, Error)]
pub enum TimesError {
    /// Prayer times are not monotonically non-decreasing in daily order.
    #[error("prayer times out of order: {earlier} at {earlier_time} is after {later} at {later_time}")]
    NonMonotonic {
        /// The earlier prayer in the fixed order.
        earlier: PrayerName,
        /// Its clock time.
        earlier_time: NaiveTime,
        /// The later prayer in the fixed order.
        later: PrayerName,
        /// Its clock time.
        later_time: NaiveTime,
    },
    /// A clock time string could not be parsed as "HH:MM".
    #[error("invalid clock time for {prayer}: {value:?}")]
    InvalidClockTime {
        /// The prayer the value belonged to.
        prayer: PrayerName,
        /// The offending string.
        value: String,
    },
}

// ============================================================================
// PrayerSchedule
// ============================================================================

/// The next upcoming prayer and the instant it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextPrayer {
    /// Which prayer fires next.
    pub prayer: PrayerName,
    /// The wall-clock instant it starts, strictly in the future.
    pub fires_at: NaiveDateTime,
}

/// The five prayer times for a single calendar day.
///
/// Times are immutable once constructed and guaranteed monotonically
/// non-decreasing in the fixed Fajr..Isha order. Lookups are O(5) and
/// allocation-free; the UI countdown polls [`PrayerSchedule::next_prayer`]
/// every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerSchedule {
    /// The calendar day these times belong to.
    date: NaiveDate,
    /// Clock times indexed by [`PrayerName::index`].
    times: [NaiveTime; 5],
}

impl PrayerSchedule {
    /// Creates a schedule for one day, validating the fixed ordering.
    ///
    /// # Errors
    ///
    /// Returns [`TimesError::NonMonotonic`] if any prayer's clock time is
    /// earlier than the preceding prayer's. Upstream data should already
    /// guarantee the ordering; the caller is expected to log and fall back
    /// to a prior-day schedule on rejection.
    pub fn new(date: NaiveDate, times: [NaiveTime; 5]) -> Result<Self, TimesError> {
        for i in 0..4 {
            if times[i] > times[i + 1] {
                return Err(TimesError::NonMonotonic {
                    earlier: PrayerName::ALL[i],
                    earlier_time: times[i],
                    later: PrayerName::ALL[i + 1],
                    later_time: times[i + 1],
                });
            }
        }
        Ok(Self { date, times })
    }

    /// Creates a schedule from "HH:MM" strings in Fajr..Isha order.
    ///
    /// # Errors
    ///
    /// Returns an error if any string is malformed or the ordering is
    /// violated.
    pub fn parse(date: NaiveDate, times: [&str; 5]) -> Result<Self, TimesError> {
        let mut parsed = [NaiveTime::MIN; 5];
        for (i, raw) in times.iter().enumerate() {
            parsed[i] = NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| {
                TimesError::InvalidClockTime {
                    prayer: PrayerName::ALL[i],
                    value: (*raw).to_string(),
                }
            })?;
        }
        Self::new(date, parsed)
    }

    /// The calendar day this schedule covers.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The clock time of the given prayer.
    pub fn time_of(&self, prayer: PrayerName) -> NaiveTime {
        self.times[prayer.index()]
    }

    /// The full wall-clock instant of the given prayer on this day.
    pub fn instant_of(&self, prayer: PrayerName) -> NaiveDateTime {
        self.date.and_time(self.time_of(prayer))
    }

    /// Returns the first prayer strictly after `now`.
    ///
    /// A prayer whose instant equals `now` exactly has already started and
    /// is not returned; this keeps the boundary stable when the countdown
    /// hits zero. After Isha the next prayer is tomorrow's Fajr, reusing
    /// today's Fajr clock time until tomorrow's schedule is loaded.
    pub fn next_prayer(&self, now: NaiveDateTime) -> NextPrayer {
        for prayer in PrayerName::ALL {
            let fires_at = self.instant_of(prayer);
            if fires_at > now {
                return NextPrayer { prayer, fires_at };
            }
        }

        // Day rollover: everything today has passed.
        let tomorrow = self
            .date
            .checked_add_days(Days::new(1))
            .unwrap_or(self.date);
        NextPrayer {
            prayer: PrayerName::Fajr,
            fires_at: tomorrow.and_time(self.time_of(PrayerName::Fajr)),
        }
    }

    /// Returns the prayer currently in effect at `now`.
    ///
    /// This is the circular predecessor of [`Self::next_prayer`]: before
    /// Fajr it reports Isha (conceptually the previous day's).
    pub fn current_prayer(&self, now: NaiveDateTime) -> PrayerName {
        self.next_prayer(now).prayer.previous()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    fn schedule() -> PrayerSchedule {
        PrayerSchedule::parse(date(), ["05:30", "13:00", "16:30", "19:45", "21:15"]).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        date().and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    // ------------------------------------------------------------------------
    // PrayerName Tests
    // ------------------------------------------------------------------------

    mod prayer_name_tests {
        use super::*;

        #[test]
        fn test_all_in_order() {
            for (i, prayer) in PrayerName::ALL.iter().enumerate() {
                assert_eq!(prayer.index(), i);
            }
        }

        #[test]
        fn test_as_str() {
            assert_eq!(PrayerName::Fajr.as_str(), "Fajr");
            assert_eq!(PrayerName::Dhuhr.as_str(), "Dhuhr");
            assert_eq!(PrayerName::Asr.as_str(), "Asr");
            assert_eq!(PrayerName::Maghrib.as_str(), "Maghrib");
            assert_eq!(PrayerName::Isha.as_str(), "Isha");
        }

        #[test]
        fn test_previous_wraps() {
            assert_eq!(PrayerName::Fajr.previous(), PrayerName::Isha);
            assert_eq!(PrayerName::Dhuhr.previous(), PrayerName::Fajr);
            assert_eq!(PrayerName::Isha.previous(), PrayerName::Maghrib);
        }

        #[test]
        fn test_serialize_snake_case() {
            let json = serde_json::to_string(&PrayerName::Maghrib).unwrap();
            assert_eq!(json, "\"maghrib\"");

            let parsed: PrayerName = serde_json::from_str("\"fajr\"").unwrap();
            assert_eq!(parsed, PrayerName::Fajr);
        }

        #[test]
        fn test_display() {
            assert_eq!(format!("{}", PrayerName::Asr), "Asr");
        }
    }

    // ------------------------------------------------------------------------
    // PrayerSchedule Construction Tests
    // ------------------------------------------------------------------------

    mod construction_tests {
        use super::*;

        #[test]
        fn test_parse_valid() {
            let s = schedule();
            assert_eq!(s.date(), date());
            assert_eq!(
                s.time_of(PrayerName::Fajr),
                NaiveTime::from_hms_opt(5, 30, 0).unwrap()
            );
            assert_eq!(
                s.time_of(PrayerName::Isha),
                NaiveTime::from_hms_opt(21, 15, 0).unwrap()
            );
        }

        #[test]
        fn test_rejects_non_monotonic() {
            let result =
                PrayerSchedule::parse(date(), ["05:30", "13:00", "12:59", "19:45", "21:15"]);
            match result {
                Err(TimesError::NonMonotonic { earlier, later, .. }) => {
                    assert_eq!(earlier, PrayerName::Dhuhr);
                    assert_eq!(later, PrayerName::Asr);
                }
                other => panic!("expected NonMonotonic, got {:?}", other),
            }
        }

        #[test]
        fn test_accepts_equal_adjacent_times() {
            // Non-decreasing, not strictly increasing.
            let result =
                PrayerSchedule::parse(date(), ["05:30", "13:00", "13:00", "19:45", "21:15"]);
            assert!(result.is_ok());
        }

        #[test]
        fn test_rejects_malformed_clock_time() {
            let result =
                PrayerSchedule::parse(date(), ["05:30", "25:99", "16:30", "19:45", "21:15"]);
            match result {
                Err(TimesError::InvalidClockTime { prayer, value }) => {
                    assert_eq!(prayer, PrayerName::Dhuhr);
                    assert_eq!(value, "25:99");
                }
                other => panic!("expected InvalidClockTime, got {:?}", other),
            }
        }

        #[test]
        fn test_serialize_round_trip() {
            let s = schedule();
            let json = serde_json::to_string(&s).unwrap();
            let parsed: PrayerSchedule = serde_json::from_str(&json).unwrap();
            assert_eq!(s, parsed);
        }
    }

    // ------------------------------------------------------------------------
    // Next / Current Prayer Tests
    // ------------------------------------------------------------------------

    mod lookup_tests {
        use super::*;

        #[test]
        fn test_next_is_strictly_future() {
            // For any now, next_prayer(now).fires_at is strictly in the future.
            let s = schedule();
            for (h, m) in [(0, 0), (5, 30), (12, 59), (16, 30), (21, 14), (23, 59)] {
                let now = at(h, m);
                assert!(
                    s.next_prayer(now).fires_at > now,
                    "next prayer at {now} not in the future"
                );
            }
        }

        #[test]
        fn test_afternoon_lookup() {
            // At 14:00, next is Asr 16:30 and current is Dhuhr.
            let s = schedule();
            let next = s.next_prayer(at(14, 0));
            assert_eq!(next.prayer, PrayerName::Asr);
            assert_eq!(next.fires_at, at(16, 30));
            assert_eq!(s.current_prayer(at(14, 0)), PrayerName::Dhuhr);
        }

        #[test]
        fn test_rollover_after_isha() {
            // At 22:00 everything has passed; next is tomorrow's Fajr 05:30.
            let s = schedule();
            let next = s.next_prayer(at(22, 0));
            assert_eq!(next.prayer, PrayerName::Fajr);
            assert_eq!(
                next.fires_at,
                date()
                    .succ_opt()
                    .unwrap()
                    .and_time(NaiveTime::from_hms_opt(5, 30, 0).unwrap())
            );
            assert_eq!(s.current_prayer(at(22, 0)), PrayerName::Isha);
        }

        #[test]
        fn test_boundary_equality_counts_as_started() {
            // Exactly at Fajr's instant, Fajr has started; next is Dhuhr.
            let s = schedule();
            let now = at(5, 30);
            let next = s.next_prayer(now);
            assert_eq!(next.prayer, PrayerName::Dhuhr);
            assert_eq!(s.current_prayer(now), PrayerName::Fajr);
        }

        #[test]
        fn test_before_fajr_current_is_isha() {
            let s = schedule();
            let next = s.next_prayer(at(3, 0));
            assert_eq!(next.prayer, PrayerName::Fajr);
            assert_eq!(s.current_prayer(at(3, 0)), PrayerName::Isha);
        }

        #[test]
        fn test_one_second_before_prayer() {
            let s = schedule();
            let now = date().and_time(NaiveTime::from_hms_opt(16, 29, 59).unwrap());
            assert_eq!(s.next_prayer(now).prayer, PrayerName::Asr);
        }

        #[test]
        fn test_instant_of() {
            let s = schedule();
            assert_eq!(s.instant_of(PrayerName::Maghrib), at(19, 45));
        }
    }
}
