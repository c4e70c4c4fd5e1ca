//! Step admission and continuous-run timing
//!
//! The scheduler does not execute anything itself. It answers three
//! questions for the [`Session`](super::Session) that owns it:
//!
//! - may a step start now? (a step already in flight drops the request)
//! - is a continuous-run tick due? (one step per elapsed interval, late ticks
//!   are not caught up)
//! - should continuous running stop after the step that just finished?

use crate::backend::value::Value;
use crate::backend::{Backend, BREAK_VAR, HALT_VAR};
use std::time::{Duration, Instant};

/// Default delay between continuous-run steps
pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_millis(100);

/// Externally visible run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    /// A step is in flight
    Stepping,
    ContinuousRunning,
    /// Derived from the program's `HALT` signal
    Halted,
}

/// Halt and break signals read after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals {
    /// `HALT` is absent, or anything but `false`
    pub halted: bool,
    /// `BREAK` is present and anything but `false`
    pub broke: bool,
}

impl Signals {
    pub fn read<B: Backend>(backend: &B, scope: &B::Scope) -> Self {
        let halted = !matches!(backend.read_variable(scope, HALT_VAR), Some(Value::Bool(false)));
        let broke = backend
            .read_variable(scope, BREAK_VAR)
            .is_some_and(|v| v != Value::Bool(false));
        Signals { halted, broke }
    }

    /// Continuous running ends on halt or break
    pub fn should_stop(&self) -> bool {
        self.halted || self.broke
    }
}

#[derive(Debug)]
pub struct StepScheduler {
    interval: Duration,
    continuous: bool,
    in_flight: bool,
    last_tick: Instant,
}

impl StepScheduler {
    pub fn new(interval: Duration) -> Self {
        StepScheduler {
            interval,
            continuous: false,
            in_flight: false,
            last_tick: Instant::now(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.continuous
    }

    /// Enter continuous running; the first tick is due one interval from `now`
    pub fn start(&mut self, now: Instant) {
        self.continuous = true;
        self.last_tick = now;
    }

    /// Leave continuous running
    pub fn stop(&mut self) {
        self.continuous = false;
    }

    /// Claim the in-flight slot; `false` if a step is already running
    pub fn begin_step(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    pub fn end_step(&mut self) {
        self.in_flight = false;
    }

    /// Consume a continuous-run tick if one is due at `now`
    pub fn take_tick(&mut self, now: Instant) -> bool {
        if !self.continuous || self.in_flight {
            return false;
        }
        if now.saturating_duration_since(self.last_tick) < self.interval {
            return false;
        }
        self.last_tick = now;
        true
    }

    /// How long the event loop may wait before the next tick is due
    pub fn time_until_tick(&self, now: Instant) -> Option<Duration> {
        self.continuous
            .then(|| self.interval.saturating_sub(now.saturating_duration_since(self.last_tick)))
    }

    /// Stop continuous running if the finished step signalled halt or break
    pub fn after_step(&mut self, signals: Signals) -> bool {
        let stop = self.continuous && signals.should_stop();
        if stop {
            self.continuous = false;
        }
        stop
    }

    pub fn state(&self, halted: bool) -> RunState {
        if self.in_flight {
            RunState::Stepping
        } else if self.continuous {
            RunState::ContinuousRunning
        } else if halted {
            RunState::Halted
        } else {
            RunState::Idle
        }
    }
}

impl Default for StepScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_step_is_dropped() {
        let mut scheduler = StepScheduler::default();
        assert!(scheduler.begin_step());
        assert!(!scheduler.begin_step());
        assert_eq!(scheduler.state(false), RunState::Stepping);
        scheduler.end_step();
        assert!(scheduler.begin_step());
    }

    #[test]
    fn test_guard_does_not_stop_continuous_running() {
        let mut scheduler = StepScheduler::default();
        scheduler.start(Instant::now());
        assert!(scheduler.begin_step());
        scheduler.end_step();
        assert!(scheduler.is_running());
    }

    #[test]
    fn test_ticks_follow_the_interval() {
        let start = Instant::now();
        let mut scheduler = StepScheduler::new(Duration::from_millis(100));
        assert!(!scheduler.take_tick(start + Duration::from_millis(500)));

        scheduler.start(start);
        assert!(!scheduler.take_tick(start + Duration::from_millis(50)));
        assert!(scheduler.take_tick(start + Duration::from_millis(100)));
        assert!(!scheduler.take_tick(start + Duration::from_millis(150)));
        // a late tick is not caught up
        assert!(scheduler.take_tick(start + Duration::from_millis(450)));
        assert!(!scheduler.take_tick(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_no_tick_while_stepping() {
        let start = Instant::now();
        let mut scheduler = StepScheduler::new(Duration::from_millis(100));
        scheduler.start(start);
        scheduler.begin_step();
        assert!(!scheduler.take_tick(start + Duration::from_millis(200)));
    }

    #[test]
    fn test_after_step_stops_on_halt_or_break() {
        let mut scheduler = StepScheduler::default();
        scheduler.start(Instant::now());
        assert!(!scheduler.after_step(Signals::default()));
        assert!(scheduler.after_step(Signals {
            halted: false,
            broke: true
        }));
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.state(true), RunState::Halted);
    }
}
