//! Adaptive execution scheduler.
//!
//! Each tick catches up on elapsed timer periods, runs the core for the
//! current instruction budget, tunes that budget from the measured wall
//! time, and decides when the next tick should happen. The scheduler never
//! sleeps itself; the run loop acts on the returned [`Step`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::host::{CoreHost, CoreState, EmulatorCore};

/// Period of the PC system timer (18.2 Hz), in milliseconds.
pub const TIMER_PERIOD_MS: f64 = 1000.0 / 18.2;

/// Source of wall-clock time in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Milliseconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Tuning constants of the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
    /// Instructions per tick at start.
    pub initial_budget: u32,
    /// The budget never shrinks below this.
    pub min_budget: u32,
    /// The budget never grows above this.
    pub max_budget: u32,
    /// Slices shorter than this grow the budget.
    pub fast_slice_ms: f64,
    /// Slices longer than this shrink the budget.
    pub slow_slice_ms: f64,
    pub grow_ratio: f64,
    pub shrink_ratio: f64,
    pub timer_period_ms: f64,
    /// Waits at or below this continue immediately.
    pub immediate_threshold_ms: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_budget: 1000,
            min_budget: 100,
            max_budget: 4_000_000,
            fast_slice_ms: 5.0,
            slow_slice_ms: 10.0,
            grow_ratio: 20.0 / 19.0,
            shrink_ratio: 19.0 / 20.0,
            timer_period_ms: TIMER_PERIOD_MS,
            immediate_threshold_ms: 1.0,
        }
    }
}

/// When the next tick should run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Yield to pending host events, then tick again.
    Immediate,
    /// Tick again after this many milliseconds.
    Delay(f64),
    /// Tick again once the next frame has been presented.
    NextFrame,
    /// The core stopped; no more ticks.
    Halted,
}

/// Result of one [`Scheduler::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub state: CoreState,
    pub step: Step,
    /// A frame render was newly requested by this tick.
    pub render_requested: bool,
    /// Timer periods delivered before execution.
    pub timer_ticks: u32,
}

#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    budget: f64,
    last_timer_ms: f64,
    frame_queued: bool,
    halted: bool,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let budget = f64::from(config.initial_budget.max(config.min_budget).max(1));
        Self {
            config,
            budget,
            last_timer_ms: 0.0,
            frame_queued: false,
            halted: false,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Current instruction budget.
    pub fn budget(&self) -> u32 {
        self.budget as u32
    }

    pub fn last_timer_ms(&self) -> f64 {
        self.last_timer_ms
    }

    pub fn frame_queued(&self) -> bool {
        self.frame_queued
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Restart timer accounting from `now`.
    pub fn reset_timer(&mut self, now: f64) {
        self.last_timer_ms = now;
    }

    /// The requested frame has been presented.
    pub fn frame_rendered(&mut self) {
        self.frame_queued = false;
    }

    /// Deliver every timer period that elapsed up to `now`.
    pub fn catch_up(&mut self, now: f64, core: &mut dyn EmulatorCore) -> u32 {
        let period = self.config.timer_period_ms;
        let mut ticks = 0;
        while now - self.last_timer_ms >= period {
            self.last_timer_ms += period;
            core.mark_timer_tick();
            ticks += 1;
        }
        if ticks > 1 {
            trace!("timer catch-up: {} periods", ticks);
        }
        ticks
    }

    /// Tune the budget from how long a running slice took.
    pub fn adapt(&mut self, state: CoreState, duration_ms: f64) {
        if state != CoreState::Running {
            return;
        }
        let c = &self.config;
        if duration_ms < c.fast_slice_ms {
            self.budget = (self.budget * c.grow_ratio).min(f64::from(c.max_budget));
        } else if duration_ms > c.slow_slice_ms && self.budget > f64::from(c.min_budget) {
            self.budget = (self.budget * c.shrink_ratio).max(f64::from(c.min_budget));
        }
    }

    /// Run one tick. `now` is the wall time sampled at the start of the tick.
    pub fn tick(
        &mut self,
        now: f64,
        clock: &dyn Clock,
        core: &mut dyn EmulatorCore,
        host: &mut dyn CoreHost,
    ) -> TickOutcome {
        if self.halted {
            return TickOutcome {
                state: CoreState::Halted,
                step: Step::Halted,
                render_requested: false,
                timer_ticks: 0,
            };
        }

        let timer_ticks = self.catch_up(now, core);
        let state = core.execute(host, self.budget());
        let duration = clock.now_ms() - now;

        if state == CoreState::Halted {
            debug!("core halted");
            self.halted = true;
            return TickOutcome {
                state,
                step: Step::Halted,
                render_requested: false,
                timer_ticks,
            };
        }

        self.adapt(state, duration);

        let render_requested = !self.frame_queued;
        self.frame_queued = true;

        let time_to_timer =
            self.config.timer_period_ms - ((now + duration) - self.last_timer_ms);
        let step = self.next_step(state, time_to_timer);

        TickOutcome {
            state,
            step,
            render_requested,
            timer_ticks,
        }
    }

    fn next_step(&self, state: CoreState, time_to_timer: f64) -> Step {
        let wait = match state {
            CoreState::Halted => return Step::Halted,
            CoreState::Running => return Step::Immediate,
            CoreState::AwaitingFrame => return Step::NextFrame,
            CoreState::AwaitingTimer => time_to_timer,
            CoreState::AwaitingPitDelay { ms } => ms.min(time_to_timer),
        };
        if wait <= self.config.immediate_threshold_ms {
            Step::Immediate
        } else {
            Step::Delay(wait)
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
