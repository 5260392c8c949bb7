//! Prayer service event loop.
//!
//! Owns the planner, the audio controller, and the notification gateway,
//! and dispatches between them. Every handler swallows its own errors:
//! a failed notification or a missing audio device is logged and reported,
//! never allowed to take the loop down.

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::audio::{
    AudioBackend, AudioNotice, AudioPlaybackController, PlaybackSettings,
};
use crate::config::ScheduleConfig;
use crate::notify::{adhan_message, playback_failure_message, reminder_message, NotificationGateway};
use crate::planner::{EventPlanner, PlannerEvent};
use crate::provider::{ProviderError, TimesProvider};
use crate::types::PrayerName;

use std::path::PathBuf;
use std::sync::Arc;

/// How often the service checks the wall clock for jumps and rollovers.
const WATCHDOG_INTERVAL: Duration = Duration::from_secs(30);

/// Wall-clock drift beyond this means the machine slept or the clock was
/// adjusted, so every pending timer is stale.
const DRIFT_THRESHOLD_SECS: i64 = 60;

// ============================================================================
// ControlEvent
// ============================================================================

/// External control messages for a running service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Stop any adhan or invocation currently playing.
    StopAdhan,
    /// The system woke from sleep; recompute everything.
    SystemWoke,
    /// Shut the service down.
    Shutdown,
}

/// Cloneable handle for sending control messages to a running service.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    control_tx: mpsc::UnboundedSender<ControlEvent>,
}

impl ServiceHandle {
    /// Stops any in-progress playback.
    pub fn stop_adhan(&self) {
        let _ = self.control_tx.send(ControlEvent::StopAdhan);
    }

    /// Signals that the system woke from sleep.
    pub fn system_woke(&self) {
        let _ = self.control_tx.send(ControlEvent::SystemWoke);
    }

    /// Asks the service to exit its loop.
    pub fn shutdown(&self) {
        let _ = self.control_tx.send(ControlEvent::Shutdown);
    }
}

// ============================================================================
// PrayerService
// ============================================================================

/// The daemon core: plans the day, reacts to due events, and replans when
/// the schedule or the clock changes under it.
pub struct PrayerService<B: AudioBackend, G: NotificationGateway, P: TimesProvider> {
    config: ScheduleConfig,
    provider: P,
    gateway: G,
    controller: Arc<AudioPlaybackController<B>>,
    planner: EventPlanner,
    event_rx: mpsc::UnboundedReceiver<PlannerEvent>,
    notice_rx: mpsc::UnboundedReceiver<AudioNotice>,
    control_rx: mpsc::UnboundedReceiver<ControlEvent>,
    control_tx: mpsc::UnboundedSender<ControlEvent>,
    /// Day the current plan was computed for; `None` until the first plan.
    planned_date: Option<chrono::NaiveDate>,
}

impl<B, G, P> PrayerService<B, G, P>
where
    B: AudioBackend + 'static,
    G: NotificationGateway,
    P: TimesProvider,
{
    /// Wires up a service from its collaborators.
    pub fn new(backend: B, gateway: G, provider: P, config: ScheduleConfig, track_dir: PathBuf) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let settings = PlaybackSettings::from_config(&config, track_dir);
        let controller = AudioPlaybackController::new(backend, settings, notice_tx);
        let planner = EventPlanner::new(event_tx);

        Self {
            config,
            provider,
            gateway,
            controller,
            planner,
            event_rx,
            notice_rx,
            control_rx,
            control_tx,
            planned_date: None,
        }
    }

    /// Returns a handle for controlling this service from other tasks.
    pub fn handle(&self) -> ServiceHandle {
        ServiceHandle {
            control_tx: self.control_tx.clone(),
        }
    }

    /// Runs the service until a [`ControlEvent::Shutdown`] arrives.
    ///
    /// # Errors
    ///
    /// Only setup-level failures escape; once the loop is running, handler
    /// errors are logged and absorbed.
    pub async fn run(&mut self) -> Result<()> {
        self.reschedule(Local::now().naive_local());

        let mut watchdog = interval(WATCHDOG_INTERVAL);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; consume it so drift
        // measurement starts one full interval out.
        watchdog.tick().await;
        let mut last_seen = Local::now().naive_local();

        info!("Prayer service running");

        loop {
            // Biased: due events drain before control messages, so a
            // shutdown never discards an event that already fired.
            tokio::select! {
                biased;
                Some(event) = self.event_rx.recv() => {
                    self.handle_planner_event(event);
                }
                Some(notice) = self.notice_rx.recv() => {
                    self.handle_audio_notice(notice);
                }
                Some(control) = self.control_rx.recv() => {
                    if self.handle_control(control) {
                        break;
                    }
                }
                _ = watchdog.tick() => {
                    let now = Local::now().naive_local();
                    self.watchdog_check(last_seen, now);
                    last_seen = now;
                }
            }
        }

        self.planner.cancel_all();
        self.controller.stop();
        info!("Prayer service stopped");
        Ok(())
    }

    /// Dispatches one due event from the planner.
    fn handle_planner_event(&self, event: PlannerEvent) {
        match event {
            PlannerEvent::ReminderDue {
                prayer,
                lead_minutes,
            } => self.on_reminder_due(prayer, lead_minutes),
            PlannerEvent::AdhanDue { prayer } => self.on_adhan_due(prayer),
        }
    }

    fn on_reminder_due(&self, prayer: PrayerName, lead_minutes: u32) {
        info!("Reminder due: {} in {} minutes", prayer, lead_minutes);
        let (title, body) = reminder_message(prayer, lead_minutes);
        if let Err(e) = self.gateway.send(&title, &body) {
            warn!("Reminder notification failed: {}", e);
        }
    }

    /// The prayer instant itself. Notification and audio are independent:
    /// either can be off while the other fires.
    fn on_adhan_due(&self, prayer: PrayerName) {
        info!("Adhan due: {}", prayer);

        if self.config.reminders_enabled {
            let (title, body) = adhan_message(prayer);
            if let Err(e) = self.gateway.send(&title, &body) {
                warn!("Adhan notification failed: {}", e);
            }
        }

        if self.config.reciter.is_some() {
            self.controller.play();
        }

        // The day's last firing has passed; the watchdog picks up the new
        // day, but rolling over eagerly keeps the gap small.
        if prayer == PrayerName::Isha {
            debug!("Isha fired, day complete");
        }
    }

    fn handle_audio_notice(&self, notice: AudioNotice) {
        match notice {
            AudioNotice::PlaybackFailed { message } => {
                warn!("Playback failed: {}", message);
                let (title, body) = playback_failure_message(&message);
                if let Err(e) = self.gateway.send(&title, &body) {
                    warn!("Failure notification failed: {}", e);
                }
            }
        }
    }

    /// Returns `true` when the loop should exit.
    fn handle_control(&mut self, control: ControlEvent) -> bool {
        match control {
            ControlEvent::StopAdhan => {
                info!("Stop requested");
                self.controller.stop();
                false
            }
            ControlEvent::SystemWoke => {
                info!("System woke from sleep, replanning");
                self.controller.stop();
                self.reschedule(Local::now().naive_local());
                false
            }
            ControlEvent::Shutdown => {
                info!("Shutdown requested");
                true
            }
        }
    }

    /// Detects sleep, clock adjustment and midnight rollover between ticks.
    fn watchdog_check(&mut self, last_seen: NaiveDateTime, now: NaiveDateTime) {
        let expected = chrono::Duration::from_std(WATCHDOG_INTERVAL).unwrap_or_default();
        let drift = (now - last_seen) - expected;

        if drift.num_seconds().abs() > DRIFT_THRESHOLD_SECS {
            warn!(
                "Clock jumped {}s between ticks, replanning",
                drift.num_seconds()
            );
            self.controller.stop();
            self.reschedule(now);
            return;
        }

        if self.planned_date != Some(now.date()) {
            info!("Day rolled over to {}", now.date());
            self.reschedule(now);
        }
    }

    /// Fetches the day's times and replaces the entire plan.
    ///
    /// A provider failure leaves the service idle for the day rather than
    /// firing from stale times; the watchdog retries on the next rollover
    /// or wake.
    fn reschedule(&mut self, now: NaiveDateTime) {
        let date = now.date();
        self.planned_date = Some(date);

        match self.provider.times_for(date) {
            Ok(schedule) => {
                self.planner.replan(&schedule, &self.config, now);
                if self.config.reciter.is_some() {
                    self.controller.preload();
                }
            }
            Err(ProviderError::NoTimesForDate(d)) => {
                warn!("No prayer times for {}, nothing scheduled", d);
                self.planner.cancel_all();
            }
            Err(e) => {
                error!("Could not load prayer times: {}", e);
                self.planner.cancel_all();
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MockBackend;
    use crate::notify::MockGateway;
    use crate::provider::FixedTimesProvider;
    use chrono::{NaiveDate, NaiveTime};

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        test_date().and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    fn test_provider() -> FixedTimesProvider {
        FixedTimesProvider::new(["05:30", "13:00", "16:30", "19:45", "21:15"])
    }

    fn service(
        config: ScheduleConfig,
    ) -> PrayerService<MockBackend, MockGateway, FixedTimesProvider> {
        PrayerService::new(
            MockBackend::new(),
            MockGateway::new(),
            test_provider(),
            config,
            std::env::temp_dir(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_registers_remaining_prayers() {
        let mut config = ScheduleConfig::default();
        config.reminders_enabled = true;
        let mut svc = service(config);

        // 14:00, Fajr and Dhuhr have passed. Asr, Maghrib and Isha each
        // get a reminder and an adhan firing.
        svc.reschedule(at(14, 0));
        assert_eq!(svc.planner.action_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_due_sends_notification() {
        let mut config = ScheduleConfig::default();
        config.reminders_enabled = true;
        let svc = service(config);

        svc.on_reminder_due(PrayerName::Asr, 15);

        let sent = svc.gateway.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("Asr"));
        assert!(sent[0].1.contains("15"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_adhan_due_plays_and_notifies() {
        let mut config = ScheduleConfig::default();
        config.reminders_enabled = true;
        let svc = service(config);

        svc.on_adhan_due(PrayerName::Maghrib);

        assert_eq!(svc.gateway.sent_count(), 1);
        assert_eq!(svc.controller.state(), crate::audio::PlaybackState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_adhan_due_without_reminders_still_plays() {
        // Notifications off, audio on. The two are independent.
        let config = ScheduleConfig::default();
        assert!(!config.reminders_enabled);
        let svc = service(config);

        svc.on_adhan_due(PrayerName::Maghrib);

        assert_eq!(svc.gateway.sent_count(), 0);
        assert_eq!(svc.controller.state(), crate::audio::PlaybackState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_adhan_due_without_reciter_only_notifies() {
        let mut config = ScheduleConfig::default();
        config.reminders_enabled = true;
        config.reciter = None;
        let svc = service(config);

        svc.on_adhan_due(PrayerName::Maghrib);

        assert_eq!(svc.gateway.sent_count(), 1);
        assert_eq!(svc.controller.state(), crate::audio::PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notification_failure_does_not_propagate() {
        let mut config = ScheduleConfig::default();
        config.reminders_enabled = true;
        let svc = service(config);
        svc.gateway.set_should_fail(true);

        // Must not panic or abort anything.
        svc.on_reminder_due(PrayerName::Fajr, 15);
        svc.on_adhan_due(PrayerName::Fajr);
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_failure_notice_reaches_gateway() {
        let mut config = ScheduleConfig::default();
        config.reminders_enabled = true;
        let svc = service(config);

        svc.handle_audio_notice(AudioNotice::PlaybackFailed {
            message: "no output device".to_string(),
        });

        let sent = svc.gateway.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("no output device"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_control_resets_playback() {
        let mut svc = service(ScheduleConfig::default());

        svc.on_adhan_due(PrayerName::Dhuhr);
        assert_eq!(svc.controller.state(), crate::audio::PlaybackState::Playing);

        let exit = svc.handle_control(ControlEvent::StopAdhan);
        assert!(!exit);
        assert_eq!(svc.controller.state(), crate::audio::PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_control_exits() {
        let mut svc = service(ScheduleConfig::default());
        assert!(svc.handle_control(ControlEvent::Shutdown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_replans() {
        let mut config = ScheduleConfig::default();
        config.reminders_enabled = true;
        let mut svc = service(config);

        svc.reschedule(at(6, 0));
        let before = svc.planner.action_count();
        assert!(before > 0);

        // Waking triggers a full cancel-and-replan; the count reflects
        // whatever remains of the real current day.
        let exit = svc.handle_control(ControlEvent::SystemWoke);
        assert!(!exit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_detects_clock_jump() {
        let mut config = ScheduleConfig::default();
        config.reminders_enabled = true;
        let mut svc = service(config);

        svc.reschedule(at(6, 0));

        // Two hours vanish between 30-second ticks.
        svc.watchdog_check(at(6, 0), at(8, 0));
        assert_eq!(svc.planned_date, Some(test_date()));
        // Replanned from 08:00: Fajr has passed.
        assert_eq!(svc.planner.action_count(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_ignores_normal_tick() {
        let mut config = ScheduleConfig::default();
        config.reminders_enabled = true;
        let mut svc = service(config);

        svc.reschedule(at(6, 0));
        let before = svc.planner.action_count();

        let next = at(6, 0) + chrono::Duration::seconds(30);
        svc.watchdog_check(at(6, 0), next);
        assert_eq!(svc.planner.action_count(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_rolls_over_at_midnight() {
        let mut config = ScheduleConfig::default();
        config.reminders_enabled = true;
        let mut svc = service(config);

        svc.reschedule(at(23, 59));
        assert_eq!(svc.planned_date, Some(test_date()));

        let after_midnight = test_date()
            .succ_opt()
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(0, 0, 14).unwrap());
        svc.watchdog_check(at(23, 59) + chrono::Duration::seconds(45), after_midnight);

        assert_eq!(svc.planned_date, Some(test_date().succ_opt().unwrap()));
        // Fresh day, all five prayers ahead.
        assert_eq!(svc.planner.action_count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_due_events_flow_through_run_loop() {
        let mut config = ScheduleConfig::default();
        config.reminders_enabled = true;
        let mut svc = service(config);

        // Inject a due event directly and shut down; run() must dispatch
        // it before exiting.
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(PlannerEvent::ReminderDue {
            prayer: PrayerName::Isha,
            lead_minutes: 15,
        })
        .unwrap();
        svc.event_rx = rx;
        let handle = svc.handle();
        handle.shutdown();

        svc.run().await.unwrap();
        assert!(svc.gateway.sent_count() >= 1);
    }
}
