//! Time utilities for the gameplay simulation

use std::time::{Duration, Instant};

/// Default tick rate
pub const SIMULATION_TPS: u32 = 60; // 60 ticks per second, matches the physics step

/// Calculate delta time for a given tick rate (in seconds)
pub fn tick_delta(tps: u32) -> f32 {
    1.0 / tps.max(1) as f32
}

/// Simulation clock advanced by the host loop.
///
/// Every gameplay timestamp (ground contact, grab time, end-of-match delay)
/// is measured on this clock rather than on wall time, so a paused or
/// throttled host never fires a deadline early.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimClock {
    elapsed: Duration,
    ticks: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one tick of `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        self.elapsed += Duration::from_secs_f32(dt.max(0.0));
        self.ticks += 1;
    }

    pub fn now(&self) -> Duration {
        self.elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn reset(&mut self) {
        self.start = Instant::now();
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
