//! Prayer-event planning and timer ownership.
//!
//! The planner translates a daily schedule plus the user configuration
//! into concrete timer registrations, and guarantees idempotent
//! replanning: every `replan` cancels all outstanding timers before any
//! new one is registered, so a stale timer can never fire after a new
//! schedule has been installed for the same prayer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ScheduleConfig;
use crate::types::{PrayerName, PrayerSchedule};

/// Longest single sleep a timer task performs.
///
/// Deadlines further out are decomposed into chained slices so a delay
/// beyond any one sleep's horizon is never silently dropped, and a
/// wall-clock deadline many hours away does not ride on one oversized
/// timer registration.
const MAX_TIMER_SLICE: Duration = Duration::from_secs(30 * 60);

// ============================================================================
// ScheduledAction / PlannerEvent
// ============================================================================

/// What a scheduled action does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Pre-prayer reminder notification.
    Reminder,
    /// Adhan firing at the prayer's exact time.
    AdhanFire,
}

/// A single pending timer registration.
///
/// Owned exclusively by the planner; consumed on firing or cancelled at
/// the next replan. Never outlives one schedule generation.
#[derive(Debug)]
pub struct ScheduledAction {
    /// Unique identity for logging.
    pub id: Uuid,
    /// The prayer this action belongs to.
    pub prayer: PrayerName,
    /// Reminder or adhan firing.
    pub kind: ActionKind,
    /// The wall-clock instant the action fires.
    pub fires_at: NaiveDateTime,
    /// The timer task backing this action.
    handle: JoinHandle<()>,
}

/// Events emitted when a scheduled action fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerEvent {
    /// A reminder is due, `lead_minutes` before the prayer.
    ReminderDue {
        /// The upcoming prayer.
        prayer: PrayerName,
        /// Minutes until the prayer starts.
        lead_minutes: u32,
    },
    /// The prayer's exact time has arrived.
    AdhanDue {
        /// The prayer that just started.
        prayer: PrayerName,
    },
}

// ============================================================================
// EventPlanner
// ============================================================================

/// Owns all pending prayer timers and emits [`PlannerEvent`]s as they fire.
pub struct EventPlanner {
    /// All live actions of the current schedule generation.
    actions: Vec<ScheduledAction>,
    /// Bumped on every replan; a fired callback from an older generation
    /// checks this and discards itself instead of emitting a stale event.
    generation: Arc<AtomicU64>,
    /// Event sender channel.
    event_tx: mpsc::UnboundedSender<PlannerEvent>,
}

impl EventPlanner {
    /// Creates a planner with no pending actions.
    pub fn new(event_tx: mpsc::UnboundedSender<PlannerEvent>) -> Self {
        Self {
            actions: Vec::new(),
            generation: Arc::new(AtomicU64::new(0)),
            event_tx,
        }
    }

    /// Cancels every outstanding action and recomputes the full set.
    ///
    /// Cancellation completes synchronously before any new registration.
    /// For each enabled prayer still in the future: a reminder is
    /// registered `reminder_lead_minutes` ahead when reminders are on
    /// (and that instant is itself still in the future), and an adhan
    /// firing is registered at the prayer's exact instant when the adhan
    /// is globally enabled. Prayers whose instant has already passed are
    /// skipped, never fired retroactively.
    pub fn replan(
        &mut self,
        schedule: &PrayerSchedule,
        config: &ScheduleConfig,
        now: NaiveDateTime,
    ) {
        self.cancel_all();

        for prayer in PrayerName::ALL {
            if !config.per_prayer.is_enabled(prayer) {
                debug!("{} disabled in settings, not scheduling", prayer);
                continue;
            }

            let fire_at = schedule.instant_of(prayer);
            if fire_at <= now {
                debug!("{} already passed today ({}), skipping", prayer, fire_at);
                continue;
            }

            if config.reminders_enabled {
                let remind_at =
                    fire_at - chrono::Duration::minutes(i64::from(config.reminder_lead_minutes));
                if remind_at > now {
                    self.register(
                        prayer,
                        ActionKind::Reminder,
                        remind_at,
                        now,
                        PlannerEvent::ReminderDue {
                            prayer,
                            lead_minutes: config.reminder_lead_minutes,
                        },
                    );
                }
            }

            if config.adhan_enabled {
                self.register(
                    prayer,
                    ActionKind::AdhanFire,
                    fire_at,
                    now,
                    PlannerEvent::AdhanDue { prayer },
                );
            }
        }

        info!(
            "Replanned {} actions for {}",
            self.actions.len(),
            schedule.date()
        );
    }

    /// Cancels every outstanding action.
    ///
    /// Safe to call with already-fired or already-cancelled actions in the
    /// set: aborting a finished task is a no-op, and an in-flight callback
    /// is discarded by the generation check rather than interrupted.
    pub fn cancel_all(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let count = self.actions.len();
        for action in self.actions.drain(..) {
            action.handle.abort();
        }
        if count > 0 {
            debug!("Cancelled {} scheduled actions", count);
        }
    }

    /// The live actions of the current generation.
    pub fn actions(&self) -> &[ScheduledAction] {
        &self.actions
    }

    /// Number of live actions.
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    fn register(
        &mut self,
        prayer: PrayerName,
        kind: ActionKind,
        fires_at: NaiveDateTime,
        now: NaiveDateTime,
        event: PlannerEvent,
    ) {
        let delay = (fires_at - now).to_std().unwrap_or(Duration::ZERO);
        let id = Uuid::new_v4();
        let generation = Arc::clone(&self.generation);
        let valid_for = generation.load(Ordering::SeqCst);
        let event_tx = self.event_tx.clone();

        debug!(
            "Scheduling {:?} for {} at {} (in {:?})",
            kind, prayer, fires_at, delay
        );

        let handle = tokio::spawn(async move {
            sleep_decomposed(delay).await;

            // A replan may have raced this firing; a stale generation
            // means the action was superseded and must stay silent.
            if generation.load(Ordering::SeqCst) != valid_for {
                debug!("Action {} superseded by replan, discarding", id);
                return;
            }
            let _ = event_tx.send(event);
        });

        self.actions.push(ScheduledAction {
            id,
            prayer,
            kind,
            fires_at,
            handle,
        });
    }
}

impl Drop for EventPlanner {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Sleeps `total`, decomposed into bounded slices.
async fn sleep_decomposed(total: Duration) {
    let mut remaining = total;
    while remaining > MAX_TIMER_SLICE {
        tokio::time::sleep(MAX_TIMER_SLICE).await;
        remaining -= MAX_TIMER_SLICE;
    }
    tokio::time::sleep(remaining).await;
}

// ============================================================================
// Tests
// ============================================================================
