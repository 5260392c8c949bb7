//! Display utilities for the prayer companion CLI.
//!
//! This module provides formatted output for:
//! - Schedule queries (next and current prayer)
//! - Audio test feedback
//! - Error messages

use chrono::NaiveDateTime;

use crate::types::{NextPrayer, PrayerName};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the next upcoming prayer and the time left until it.
    pub fn show_next(next: &NextPrayer, now: NaiveDateTime) {
        println!("Next prayer: {}", next.prayer);
        println!("  At: {}", next.fires_at.format("%H:%M"));
        if next.fires_at.date() != now.date() {
            println!("  On: {}", next.fires_at.format("%Y-%m-%d"));
        }
        let (hours, minutes) = Self::format_countdown(next.fires_at, now);
        println!("  In: {}h {:02}m", hours, minutes);
    }

    /// Shows the prayer period the clock currently falls in.
    pub fn show_current(prayer: PrayerName) {
        println!("Current prayer period: {}", prayer);
    }

    /// Announces the audio check before playback starts.
    pub fn show_test_playing(reciter: &str, volume: u8) {
        println!("Playing adhan sample ({}, volume {})", reciter, volume);
        println!("  Press Ctrl+C to stop");
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    /// Formats the gap between two instants as (hours, minutes), rounded up
    /// so a prayer 61 seconds away reads as one minute, not zero.
    fn format_countdown(until: NaiveDateTime, now: NaiveDateTime) -> (i64, i64) {
        let total_minutes = ((until - now).num_seconds() + 59) / 60;
        (total_minutes / 60, total_minutes % 60)
    }
}

// ============================================================================
// Tests
// ============================================================================
