//! Daemon module for the prayer companion.
//!
//! This module contains the long-running service:
//! - `service`: event loop dispatching planner events to notifications
//!   and audio, with sleep/wake and midnight-rollover recovery

pub mod service;

pub use service::{ControlEvent, PrayerService, ServiceHandle};
