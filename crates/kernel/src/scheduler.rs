//! Fixed-timestep driver.
//!
//! Host frames arrive at whatever rate the display runs; simulation steps are
//! taken in constant `fixed_delta` increments drained from an accumulator.
//!
//! # Invariants
//! - Every due step runs before the frame's single render.
//! - `render` runs exactly once per [`FixedStepScheduler::frame`] call, even
//!   when no step was due.
//! - Frame time is clamped to `[0, max_frame_time]`, so one frame can never
//!   run more than `max_frame_time / fixed_delta` steps.
//! - No interpolation: render sees the last completed step.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error("fixed delta must be a positive finite number of seconds, got {0}")]
    InvalidFixedDelta(f64),
    #[error(
        "max frame time must be finite and at least the fixed delta ({fixed_delta}), \
         got {max_frame_time}"
    )]
    InvalidMaxFrameTime { max_frame_time: f64, fixed_delta: f64 },
}

/// Step size and stall clamp, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub fixed_delta: f64,
    pub max_frame_time: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fixed_delta: 1.0 / 64.0,
            max_frame_time: 0.25,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if !self.fixed_delta.is_finite() || self.fixed_delta <= 0.0 {
            return Err(SchedulerError::InvalidFixedDelta(self.fixed_delta));
        }
        if !self.max_frame_time.is_finite() || self.max_frame_time < self.fixed_delta {
            return Err(SchedulerError::InvalidMaxFrameTime {
                max_frame_time: self.max_frame_time,
                fixed_delta: self.fixed_delta,
            });
        }
        Ok(())
    }

    /// Most steps a single host frame can produce.
    pub fn max_steps_per_frame(&self) -> u32 {
        (self.max_frame_time / self.fixed_delta).floor() as u32
    }
}

/// The simulation a scheduler drives.
pub trait FixedStep {
    /// Advance one step. `time` is the simulation time at the start of the
    /// step; `delta` is always the configured fixed delta.
    fn update(&mut self, time: f64, delta: f64);

    /// Draw the current state. Called once per host frame.
    fn render(&mut self);
}

/// Source of host timestamps in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// What one host frame did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub steps: u32,
    /// Clamped frame time that was added to the accumulator.
    pub frame_time: f64,
}

#[derive(Debug, Clone)]
pub struct FixedStepScheduler {
    config: SchedulerConfig,
    last_now: Option<f64>,
    accumulator: f64,
    sim_time: f64,
    total_steps: u64,
    total_frames: u64,
}

impl FixedStepScheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self {
            config,
            last_now: None,
            accumulator: 0.0,
            sim_time: 0.0,
            total_steps: 0,
            total_frames: 0,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Anchor the clock. Without this the first frame counts as zero time.
    pub fn start(&mut self, now: f64) {
        self.last_now = Some(now);
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Run one host frame at timestamp `now` (seconds).
    pub fn frame<G: FixedStep + ?Sized>(&mut self, now: f64, game: &mut G) -> FrameReport {
        let elapsed = match self.last_now {
            Some(last) => now - last,
            None => 0.0,
        };
        self.last_now = Some(now);

        let frame_time = elapsed.clamp(0.0, self.config.max_frame_time);
        if elapsed > self.config.max_frame_time {
            tracing::debug!(elapsed, clamped = frame_time, "frame time clamped");
        }
        self.accumulator += frame_time;

        let delta = self.config.fixed_delta;
        let mut steps = 0;
        while self.accumulator >= delta {
            game.update(self.sim_time, delta);
            self.sim_time += delta;
            self.accumulator -= delta;
            steps += 1;
        }
        self.total_steps += u64::from(steps);

        game.render();
        self.total_frames += 1;

        FrameReport { steps, frame_time }
    }

    /// Convenience for hosts holding a [`Clock`].
    pub fn frame_with<C: Clock + ?Sized, G: FixedStep + ?Sized>(
        &mut self,
        clock: &C,
        game: &mut G,
    ) -> FrameReport {
        self.frame(clock.now(), game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        updates: u32,
        renders: u32,
        times: Vec<f64>,
        log: Vec<&'static str>,
    }

    impl FixedStep for Counter {
        fn update(&mut self, time: f64, delta: f64) {
            assert_eq!(delta, 1.0 / 64.0);
            self.updates += 1;
            self.times.push(time);
            self.log.push("update");
        }

        fn render(&mut self) {
            self.renders += 1;
            self.log.push("render");
        }
    }

    fn scheduler() -> FixedStepScheduler {
        FixedStepScheduler::new(SchedulerConfig::default()).unwrap()
    }

    #[test]
    fn rejects_bad_config() {
        let bad = SchedulerConfig {
            fixed_delta: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            FixedStepScheduler::new(bad),
            Err(SchedulerError::InvalidFixedDelta(_))
        ));
        let bad = SchedulerConfig {
            fixed_delta: 0.5,
            max_frame_time: 0.25,
        };
        assert!(matches!(
            FixedStepScheduler::new(bad),
            Err(SchedulerError::InvalidMaxFrameTime { .. })
        ));
        let bad = SchedulerConfig {
            fixed_delta: f64::NAN,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn first_frame_renders_without_stepping() {
        let mut s = scheduler();
        let mut c = Counter::default();
        let report = s.frame(100.0, &mut c);
        assert_eq!(report.steps, 0);
        assert_eq!((c.updates, c.renders), (0, 1));
    }

    #[test]
    fn render_once_per_frame_even_with_zero_steps() {
        let mut s = scheduler();
        let mut c = Counter::default();
        s.start(0.0);
        for i in 1..=10 {
            s.frame(i as f64 * 0.001, &mut c);
        }
        assert_eq!(c.renders, 10);
        assert_eq!(c.updates, 0);
    }

    #[test]
    fn steps_run_before_render() {
        let mut s = scheduler();
        let mut c = Counter::default();
        s.start(0.0);
        s.frame(3.0 / 64.0, &mut c);
        assert_eq!(c.log, vec!["update", "update", "update", "render"]);
        assert_eq!(c.times, vec![0.0, 1.0 / 64.0, 2.0 / 64.0]);
    }

    #[test]
    fn stall_is_clamped() {
        let mut s = scheduler();
        let mut c = Counter::default();
        s.start(0.0);
        let report = s.frame(10.0, &mut c);
        assert_eq!(report.frame_time, 0.25);
        assert_eq!(report.steps, 16);
        assert!(c.updates <= s.config().max_steps_per_frame());
        assert_eq!(c.renders, 1);
    }

    #[test]
    fn clock_going_backwards_adds_nothing() {
        let mut s = scheduler();
        let mut c = Counter::default();
        s.start(5.0);
        let report = s.frame(4.0, &mut c);
        assert_eq!(report.frame_time, 0.0);
        assert_eq!(report.steps, 0);
        assert_eq!(s.accumulator(), 0.0);
    }

    #[test]
    fn step_count_tracks_elapsed_time() {
        let mut s = scheduler();
        let mut c = Counter::default();
        s.start(0.0);
        // Irregular cadence, all below the clamp.
        let deltas = [0.016, 0.033, 0.007, 0.1, 0.0166, 0.05, 0.002, 0.2];
        let mut now = 0.0;
        for _ in 0..20 {
            for d in deltas {
                now += d;
                s.frame(now, &mut c);
            }
        }
        let expected = (now / (1.0 / 64.0)).floor() as i64;
        assert!((c.updates as i64 - expected).abs() <= 1);
        assert_eq!(c.renders, 160);
        assert_eq!(s.total_steps(), u64::from(c.updates));
        assert_eq!(s.total_frames(), 160);
    }

    #[test]
    fn sim_time_is_steps_times_delta() {
        let mut s = scheduler();
        let mut c = Counter::default();
        s.start(0.0);
        s.frame(0.2, &mut c);
        assert_eq!(s.sim_time(), c.updates as f64 / 64.0);
        assert!(s.accumulator() < 1.0 / 64.0);
    }

    struct FixedClock(f64);

    impl Clock for FixedClock {
        fn now(&self) -> f64 {
            self.0
        }
    }

    #[test]
    fn frame_with_reads_clock() {
        let mut s = scheduler();
        let mut c = Counter::default();
        s.frame_with(&FixedClock(1.0), &mut c);
        let report = s.frame_with(&FixedClock(1.0 + 2.0 / 64.0), &mut c);
        assert_eq!(report.steps, 2);
    }

    #[test]
    fn monotonic_clock_does_not_go_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
