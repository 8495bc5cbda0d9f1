//! Focus session engine.
//!
//! The engine is a tick-driven state machine. It does not use internal
//! threads - the caller delivers one `tick()` per second and forwards host
//! lifecycle signals (`suspend` / `resume_foreground`).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |
//!            v
//!         Elapsed -> (acknowledge) Idle
//!                 -> (acknowledge_and_restart) Running
//!
//! any started state -> (finish) Finished
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(clock, alert, finalizer);
//! engine.start(25 * 60);
//! // Once per second:
//! engine.tick(); // Some(Event::Elapsed { .. }) when the countdown hits zero
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::alert::DeviceAlert;
use crate::clock::Clock;
use crate::events::Event;
use crate::session::{Finalize, FocusSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    /// Countdown reached zero; waiting for the user to acknowledge.
    Elapsed,
    /// The session was ended and handed to finalization.
    Finished,
}

/// Duration of one countdown cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    duration_seconds: u64,
}

impl SessionConfig {
    /// `None` for a zero duration.
    pub fn new(duration_seconds: u64) -> Option<Self> {
        (duration_seconds > 0).then_some(Self { duration_seconds })
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }
}

/// Mutable state of one focus session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub remaining_seconds: u64,
    pub is_paused: bool,
    pub is_elapsed: bool,
    /// Completed countdowns since the engine was opened.
    pub cycles: u32,
    /// Sum of the durations of completed countdowns.
    pub total_focused_seconds: u64,
    pub start_date: Option<DateTime<Utc>>,
    pub inactive_since: Option<DateTime<Utc>>,
}

/// Read-only view published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: TimerState,
    pub duration_seconds: u64,
    pub session: SessionState,
}

/// Core session engine.
pub struct SessionEngine {
    session: SessionState,
    config: Option<SessionConfig>,
    /// The periodic tick is live (Running or Paused).
    ticking: bool,
    finished: bool,
    /// Start of the current Running stretch while the host is suspended.
    running_since: Option<DateTime<Utc>>,
    /// Missed seconds from earlier Running stretches of this suspension.
    banked_drift: u64,
    /// Ticks that still arrived during the current Running stretch; excluded
    /// from drift so those seconds are not deducted twice.
    ticks_while_inactive: u64,
    clock: Arc<dyn Clock>,
    alert: Arc<dyn DeviceAlert>,
    finalizer: Arc<dyn Finalize>,
}

impl SessionEngine {
    pub fn new(
        clock: Arc<dyn Clock>,
        alert: Arc<dyn DeviceAlert>,
        finalizer: Arc<dyn Finalize>,
    ) -> Self {
        Self {
            session: SessionState::default(),
            config: None,
            ticking: false,
            finished: false,
            running_since: None,
            banked_drift: 0,
            ticks_while_inactive: 0,
            clock,
            alert,
            finalizer,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        if self.finished {
            TimerState::Finished
        } else if self.session.is_elapsed {
            TimerState::Elapsed
        } else if !self.ticking {
            TimerState::Idle
        } else if self.session.is_paused {
            TimerState::Paused
        } else {
            TimerState::Running
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn config(&self) -> Option<SessionConfig> {
        self.config
    }

    /// Whether the caller should keep delivering ticks.
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.session.remaining_seconds
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            duration_seconds: self.config.map(|c| c.duration_seconds()).unwrap_or(0),
            session: self.session.clone(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a countdown. Only valid from `Idle`.
    pub fn start(&mut self, duration_seconds: u64) -> Option<Event> {
        if self.state() != TimerState::Idle {
            debug!(state = ?self.state(), "start ignored");
            return None;
        }
        let Some(config) = SessionConfig::new(duration_seconds) else {
            warn!("refusing to start a zero-length countdown");
            return None;
        };
        Some(self.begin_cycle(config))
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.ticking || self.session.is_paused {
            return None;
        }
        if self.session.inactive_since.is_some() {
            self.ticks_while_inactive += 1;
        }
        self.session.remaining_seconds = self.session.remaining_seconds.saturating_sub(1);
        if self.session.remaining_seconds == 0 {
            return Some(self.complete_cycle());
        }
        debug!(remaining = self.session.remaining_seconds, "tick");
        Some(Event::Tick {
            remaining_seconds: self.session.remaining_seconds,
            at: self.clock.now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.state() != TimerState::Running {
            return None;
        }
        self.close_running_stretch();
        self.session.is_paused = true;
        info!(remaining = self.session.remaining_seconds, "focus paused");
        Some(Event::Paused {
            remaining_seconds: self.session.remaining_seconds,
            at: self.clock.now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.state() != TimerState::Paused {
            return None;
        }
        self.session.is_paused = false;
        self.open_running_stretch();
        info!(remaining = self.session.remaining_seconds, "focus resumed");
        Some(Event::Resumed {
            remaining_seconds: self.session.remaining_seconds,
            at: self.clock.now(),
        })
    }

    pub fn toggle_pause(&mut self) -> Option<Event> {
        match self.state() {
            TimerState::Running => self.pause(),
            TimerState::Paused => self.resume(),
            _ => None,
        }
    }

    /// Dismiss the elapsed alert and immediately start another cycle.
    pub fn acknowledge_and_restart(&mut self, duration_seconds: u64) -> Option<Event> {
        if self.state() != TimerState::Elapsed {
            return None;
        }
        let config = SessionConfig::new(duration_seconds)?;
        self.session.is_elapsed = false;
        Some(self.begin_cycle(config))
    }

    /// Dismiss the elapsed alert and return to `Idle`.
    pub fn acknowledge(&mut self) -> Option<Event> {
        if self.state() != TimerState::Elapsed {
            return None;
        }
        self.session.is_elapsed = false;
        Some(Event::Acknowledged {
            at: self.clock.now(),
        })
    }

    /// The host is leaving the foreground.
    pub fn suspend(&mut self) -> Option<Event> {
        if self.finished || self.session.inactive_since.is_some() {
            return None;
        }
        let now = self.clock.now();
        self.session.inactive_since = Some(now);
        self.banked_drift = 0;
        self.ticks_while_inactive = 0;
        self.running_since = (self.state() == TimerState::Running).then_some(now);
        info!(remaining = self.session.remaining_seconds, "host suspended");
        Some(Event::Suspended {
            remaining_seconds: self.session.remaining_seconds,
            at: now,
        })
    }

    /// The host is back in the foreground: deduct the wall-clock time the
    /// current countdown spent Running without ticks. Returns the resume
    /// event, followed by `Elapsed` if the deduction finished the countdown.
    pub fn resume_foreground(&mut self) -> Vec<Event> {
        let Some(since) = self.session.inactive_since.take() else {
            return Vec::new();
        };
        let now = self.clock.now();
        let away = seconds_between(since, now);
        self.close_running_stretch();
        let drift = std::mem::take(&mut self.banked_drift);

        let mut events = Vec::new();
        // Paused here still owes the seconds it ran before the pause.
        let applied = if matches!(self.state(), TimerState::Running | TimerState::Paused) {
            let before = self.session.remaining_seconds;
            self.session.remaining_seconds = before.saturating_sub(drift);
            before - self.session.remaining_seconds
        } else {
            0
        };
        info!(away, drift = applied, remaining = self.session.remaining_seconds, "host resumed");
        events.push(Event::ForegroundResumed {
            drift_secs: applied,
            remaining_seconds: self.session.remaining_seconds,
            at: now,
        });

        if applied > 0 && self.session.remaining_seconds == 0 {
            self.session.is_paused = false;
            events.push(self.complete_cycle());
        }
        events
    }

    /// End the focus session with what has been accumulated so far and hand
    /// it to finalization. Only ever finalizes once.
    pub fn finish(&mut self) -> Option<Event> {
        if self.finished {
            return None;
        }
        let start_date = self.session.start_date?;
        self.finished = true;
        self.ticking = false;
        self.session.is_paused = false;
        self.reset_drift();

        let summary = FocusSummary {
            start_date,
            cycles: self.session.cycles,
            total_focused_seconds: self.session.total_focused_seconds,
        };
        info!(
            cycles = summary.cycles,
            focused = summary.total_focused_seconds,
            "focus session finished"
        );
        self.finalizer.finalize(summary.clone());
        Some(Event::Finished {
            summary,
            at: self.clock.now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_cycle(&mut self, config: SessionConfig) -> Event {
        let now = self.clock.now();
        self.config = Some(config);
        self.session.remaining_seconds = config.duration_seconds();
        self.session.is_paused = false;
        self.session.start_date.get_or_insert(now);
        self.ticking = true;
        self.reset_drift();
        self.open_running_stretch();
        let cycle = self.session.cycles + 1;
        info!(cycle, duration = config.duration_seconds(), "focus cycle started");
        Event::CycleStarted {
            cycle,
            duration_secs: config.duration_seconds(),
            at: now,
        }
    }

    /// Shared by the natural tick and drift correction; callers guarantee
    /// the engine is `Running`, so each cycle completes once.
    fn complete_cycle(&mut self) -> Event {
        let duration = self.config.map(|c| c.duration_seconds()).unwrap_or(0);
        self.ticking = false;
        self.reset_drift();
        self.session.is_elapsed = true;
        self.session.remaining_seconds = 0;
        self.session.cycles += 1;
        self.session.total_focused_seconds += duration;
        self.alert.timer_elapsed();
        info!(
            cycles = self.session.cycles,
            focused = self.session.total_focused_seconds,
            "focus cycle elapsed"
        );
        Event::Elapsed {
            cycles: self.session.cycles,
            total_focused_seconds: self.session.total_focused_seconds,
            at: self.clock.now(),
        }
    }

    /// While suspended, start counting a Running stretch from now.
    fn open_running_stretch(&mut self) {
        if self.session.inactive_since.is_some() {
            self.running_since = Some(self.clock.now());
            self.ticks_while_inactive = 0;
        }
    }

    /// Bank the seconds the current Running stretch missed.
    fn close_running_stretch(&mut self) {
        if let Some(since) = self.running_since.take() {
            let ran = seconds_between(since, self.clock.now());
            let missed = ran.saturating_sub(std::mem::take(&mut self.ticks_while_inactive));
            self.banked_drift += missed;
        }
    }

    /// Drift belongs to one countdown; a new or finished cycle owes nothing.
    fn reset_drift(&mut self) {
        self.running_since = None;
        self.banked_drift = 0;
        self.ticks_while_inactive = 0;
    }
}

/// Whole seconds from `from` to `to`; a clock that went backwards gives 0.
fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_seconds()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingAlert(AtomicUsize);

    impl DeviceAlert for CountingAlert {
        fn timer_elapsed(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingFinalizer(Mutex<Vec<FocusSummary>>);

    impl Finalize for RecordingFinalizer {
        fn finalize(&self, summary: FocusSummary) {
            self.0.lock().unwrap().push(summary);
        }
    }

    struct Harness {
        engine: SessionEngine,
        clock: Arc<ManualClock>,
        alert: Arc<CountingAlert>,
        finalizer: Arc<RecordingFinalizer>,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let alert = Arc::new(CountingAlert::default());
        let finalizer = Arc::new(RecordingFinalizer::default());
        let engine = SessionEngine::new(clock.clone(), alert.clone(), finalizer.clone());
        Harness {
            engine,
            clock,
            alert,
            finalizer,
        }
    }

    fn run_ticks(h: &mut Harness, n: u64) -> Vec<Event> {
        (0..n)
            .filter_map(|_| {
                h.clock.advance_secs(1);
                h.engine.tick()
            })
            .collect()
    }

    #[test]
    fn start_pause_resume() {
        let mut h = harness();
        assert_eq!(h.engine.state(), TimerState::Idle);

        assert!(h.engine.start(60).is_some());
        assert_eq!(h.engine.state(), TimerState::Running);

        assert!(h.engine.pause().is_some());
        assert_eq!(h.engine.state(), TimerState::Paused);
        assert!(h.engine.session().is_paused);

        assert!(h.engine.resume().is_some());
        assert_eq!(h.engine.state(), TimerState::Running);
    }

    #[test]
    fn start_only_from_idle() {
        let mut h = harness();
        assert!(h.engine.start(0).is_none());
        assert!(h.engine.start(10).is_some());
        assert!(h.engine.start(10).is_none());
        assert_eq!(h.engine.remaining_seconds(), 10);
    }

    #[test]
    fn ticks_reach_zero_and_elapse_once() {
        let mut h = harness();
        h.engine.start(3);
        let events = run_ticks(&mut h, 5);

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Event::Tick { remaining_seconds: 2, .. }));
        assert!(matches!(events[2], Event::Elapsed { cycles: 1, total_focused_seconds: 3, .. }));
        assert_eq!(h.engine.state(), TimerState::Elapsed);
        assert!(!h.engine.is_ticking());
        assert_eq!(h.alert.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn paused_ticks_do_not_decrement() {
        let mut h = harness();
        h.engine.start(10);
        run_ticks(&mut h, 2);
        h.engine.pause();
        assert!(run_ticks(&mut h, 5).is_empty());
        assert_eq!(h.engine.remaining_seconds(), 8);
        h.engine.resume();
        run_ticks(&mut h, 3);
        assert_eq!(h.engine.remaining_seconds(), 5);
    }

    #[test]
    fn pause_outside_running_is_ignored() {
        let mut h = harness();
        assert!(h.engine.pause().is_none());
        assert!(h.engine.resume().is_none());
        h.engine.start(1);
        run_ticks(&mut h, 1);
        assert!(h.engine.pause().is_none());
        assert!(h.engine.toggle_pause().is_none());
    }

    #[test]
    fn drift_past_zero_completes_cycle_once() {
        let mut h = harness();
        h.engine.start(60);
        run_ticks(&mut h, 40);
        assert_eq!(h.engine.remaining_seconds(), 20);

        h.engine.suspend();
        h.clock.advance_secs(37);
        let events = h.engine.resume_foreground();

        assert_eq!(h.engine.remaining_seconds(), 0);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::ForegroundResumed { drift_secs: 20, .. }));
        assert!(matches!(events[1], Event::Elapsed { cycles: 1, .. }));
        assert_eq!(h.engine.state(), TimerState::Elapsed);

        // A late tick must not complete the cycle again.
        assert!(h.engine.tick().is_none());
        assert!(h.engine.resume_foreground().is_empty());
        assert_eq!(h.engine.session().cycles, 1);
        assert_eq!(h.alert.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drift_does_not_double_count_delivered_ticks() {
        let mut h = harness();
        h.engine.start(100);
        h.engine.suspend();
        // 10 s away, but 4 ticks still got through.
        run_ticks(&mut h, 4);
        h.clock.advance_secs(6);
        let events = h.engine.resume_foreground();

        assert!(matches!(events[0], Event::ForegroundResumed { drift_secs: 6, .. }));
        assert_eq!(h.engine.remaining_seconds(), 90);
    }

    #[test]
    fn tick_to_zero_while_suspended_is_not_finalized_again_on_resume() {
        let mut h = harness();
        h.engine.start(3);
        h.engine.suspend();
        let events = run_ticks(&mut h, 3);
        assert!(matches!(events.last(), Some(Event::Elapsed { .. })));

        h.clock.advance_secs(30);
        let events = h.engine.resume_foreground();
        assert_eq!(events.len(), 1);
        assert_eq!(h.engine.session().cycles, 1);
    }

    #[test]
    fn drift_is_not_applied_while_paused() {
        let mut h = harness();
        h.engine.start(30);
        h.engine.pause();
        h.engine.suspend();
        h.clock.advance_secs(120);
        let events = h.engine.resume_foreground();
        assert!(matches!(events[0], Event::ForegroundResumed { drift_secs: 0, .. }));
        assert_eq!(h.engine.remaining_seconds(), 30);
    }

    #[test]
    fn time_paused_during_suspension_is_not_deducted() {
        let mut h = harness();
        h.engine.start(100);
        h.engine.suspend();
        h.engine.pause();
        h.clock.advance_secs(30);
        h.engine.resume();
        let events = h.engine.resume_foreground();

        assert!(matches!(events[0], Event::ForegroundResumed { drift_secs: 0, .. }));
        assert_eq!(h.engine.remaining_seconds(), 100);
        assert_eq!(h.engine.state(), TimerState::Running);
    }

    #[test]
    fn running_stretches_around_a_pause_are_both_deducted() {
        let mut h = harness();
        h.engine.start(100);
        h.engine.suspend();
        h.clock.advance_secs(10);
        h.engine.pause();
        h.clock.advance_secs(300);
        h.engine.resume();
        h.clock.advance_secs(5);
        let events = h.engine.resume_foreground();

        assert!(matches!(events[0], Event::ForegroundResumed { drift_secs: 15, .. }));
        assert_eq!(h.engine.remaining_seconds(), 85);
    }

    #[test]
    fn missed_seconds_before_a_pause_are_deducted_on_return() {
        let mut h = harness();
        h.engine.start(100);
        h.engine.suspend();
        h.clock.advance_secs(20);
        h.engine.pause();
        h.clock.advance_secs(60);
        h.engine.resume_foreground();

        assert_eq!(h.engine.remaining_seconds(), 80);
        assert_eq!(h.engine.state(), TimerState::Paused);
    }

    #[test]
    fn restarted_cycle_only_owes_its_own_background_time() {
        let mut h = harness();
        h.engine.start(3);
        h.engine.suspend();
        run_ticks(&mut h, 3);
        assert_eq!(h.engine.state(), TimerState::Elapsed);

        h.clock.advance_secs(20);
        h.engine.acknowledge_and_restart(10);
        h.clock.advance_secs(2);
        let events = h.engine.resume_foreground();

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::ForegroundResumed { drift_secs: 2, .. }));
        assert_eq!(h.engine.remaining_seconds(), 8);
        assert_eq!(h.engine.state(), TimerState::Running);
        assert_eq!(h.engine.session().cycles, 1);
    }

    #[test]
    fn clock_going_backwards_is_clamped() {
        let mut h = harness();
        h.engine.start(30);
        h.engine.suspend();
        h.clock.advance_secs(-50);
        h.engine.resume_foreground();
        assert_eq!(h.engine.remaining_seconds(), 30);
    }

    #[test]
    fn second_suspend_keeps_first_timestamp() {
        let mut h = harness();
        h.engine.start(100);
        let first = h.clock.now();
        assert!(h.engine.suspend().is_some());
        h.clock.advance_secs(5);
        assert!(h.engine.suspend().is_none());
        assert_eq!(h.engine.session().inactive_since, Some(first));
    }

    #[test]
    fn back_to_back_cycles_share_start_date() {
        let mut h = harness();
        h.engine.start(5);
        let start = h.engine.session().start_date;
        run_ticks(&mut h, 5);
        assert!(h.engine.acknowledge_and_restart(5).is_some());
        run_ticks(&mut h, 5);

        assert_eq!(h.engine.session().cycles, 2);
        assert_eq!(h.engine.session().total_focused_seconds, 10);
        assert_eq!(h.engine.session().start_date, start);
    }

    #[test]
    fn acknowledge_then_start_continues_session() {
        let mut h = harness();
        h.engine.start(2);
        let start = h.engine.session().start_date;
        run_ticks(&mut h, 2);
        assert!(h.engine.acknowledge().is_some());
        assert_eq!(h.engine.state(), TimerState::Idle);

        h.clock.advance_secs(600);
        h.engine.start(4);
        run_ticks(&mut h, 4);
        assert_eq!(h.engine.session().start_date, start);
        assert_eq!(h.engine.session().total_focused_seconds, 6);
    }

    #[test]
    fn restart_requires_elapsed() {
        let mut h = harness();
        h.engine.start(5);
        assert!(h.engine.acknowledge_and_restart(5).is_none());
        assert!(h.engine.acknowledge().is_none());
    }

    #[test]
    fn finish_finalizes_accumulated_totals_once() {
        let mut h = harness();
        h.engine.start(5);
        run_ticks(&mut h, 5);
        h.engine.acknowledge_and_restart(5);
        run_ticks(&mut h, 2);

        let event = h.engine.finish();
        assert!(matches!(event, Some(Event::Finished { .. })));
        assert_eq!(h.engine.state(), TimerState::Finished);
        assert!(h.engine.finish().is_none());
        assert!(h.engine.tick().is_none());
        assert!(h.engine.start(5).is_none());

        let finalized = h.finalizer.0.lock().unwrap();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].cycles, 1);
        assert_eq!(finalized[0].total_focused_seconds, 5);
    }

    #[test]
    fn finish_before_start_is_ignored() {
        let mut h = harness();
        assert!(h.engine.finish().is_none());
        assert!(h.finalizer.0.lock().unwrap().is_empty());
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut h = harness();
        h.engine.start(90);
        let snap = h.engine.snapshot();
        assert_eq!(snap.state, TimerState::Running);
        assert_eq!(snap.duration_seconds, 90);
        assert_eq!(snap.session.remaining_seconds, 90);
    }
}
