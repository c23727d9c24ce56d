//! Drives a [`Session`] on the tokio runtime.
//!
//! Ticks, frames and timed waits are all events on one task, so at most one
//! tick is ever in flight and the core never runs concurrently with a frame.

use std::time::Duration;

use log::debug;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};

use crate::display::{Display, Speaker};
use crate::host::EmulatorCore;
use crate::scheduler::{Clock, Step, SystemClock};
use crate::session::Session;

/// Frame rate of the host display.
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Wall clock that follows tokio's (pausable) time, anchored to the Unix
/// epoch at creation.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
    epoch_ms: f64,
}

impl TokioClock {
    pub fn new() -> Self {
        Self::with_epoch(SystemClock.now_ms())
    }

    /// Clock reading `epoch_ms` now.
    pub fn with_epoch(epoch_ms: f64) -> Self {
        Self {
            origin: Instant::now(),
            epoch_ms,
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> f64 {
        self.epoch_ms + self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Counters from a finished run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub frames: u64,
}

/// Run `session` until its core halts.
///
/// Renders happen on a fixed `frame_interval` and only when a tick has
/// requested one.
pub async fn run<C, D, S, K>(session: &mut Session<C, D, S, K>, frame_interval: Duration) -> RunStats
where
    C: EmulatorCore,
    D: Display,
    S: Speaker,
    K: Clock,
{
    let mut frames = interval(frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stats = RunStats::default();
    // None while waiting for the next frame.
    let mut resume = Some(Instant::now());

    loop {
        tokio::select! {
            biased;

            _ = frames.tick(), if session.frame_queued() => {
                session.frame();
                stats.frames += 1;
                if resume.is_none() {
                    resume = Some(Instant::now());
                }
            }

            _ = sleep_until(resume.unwrap_or_else(Instant::now)), if resume.is_some() => {
                let outcome = session.tick();
                stats.ticks += 1;
                match outcome.step {
                    Step::Immediate => {
                        resume = Some(Instant::now());
                        tokio::task::yield_now().await;
                    }
                    Step::Delay(ms) => {
                        resume = Some(Instant::now() + Duration::from_secs_f64(ms / 1000.0));
                    }
                    Step::NextFrame => resume = None,
                    Step::Halted => break,
                }
            }

            else => break,
        }
    }

    debug!("run finished: {} ticks, {} frames", stats.ticks, stats.frames);
    stats
}
