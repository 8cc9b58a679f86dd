//! Frame-time stabilisation gate
//!
//! Player updates only start once the host's frame times have settled, so
//! the first physics steps after loading never integrate a huge `dt`.

use std::collections::VecDeque;

/// Rolling window of frame deltas with a stability verdict
#[derive(Debug, Clone)]
pub struct FrameStabilizer {
    samples: VecDeque<f32>,
    /// Window size
    max_samples: usize,
    /// Frames slower than this (seconds) count as unstable
    stable_threshold: f32,
    /// Number of most recent frames inspected for the verdict
    required_stable_frames: usize,
    /// Unstable frames tolerated within the inspected window
    allowed_unstable_frames: usize,
}

impl FrameStabilizer {
    pub fn new(
        max_samples: usize,
        stable_threshold: f32,
        required_stable_frames: usize,
        allowed_unstable_frames: usize,
    ) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
            stable_threshold,
            required_stable_frames,
            allowed_unstable_frames,
        }
    }

    pub fn add_sample(&mut self, dt: f32) {
        self.samples.push_back(dt);
        if self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    pub fn average(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }

    pub fn is_stable(&self) -> bool {
        if self.samples.len() < self.required_stable_frames {
            return false;
        }
        let unstable = self
            .samples
            .iter()
            .rev()
            .take(self.required_stable_frames)
            .filter(|dt| **dt > self.stable_threshold)
            .count();
        unstable <= self.allowed_unstable_frames
    }
}

impl Default for FrameStabilizer {
    /// 21 samples, 20 FPS floor, 21 inspected frames, 7 tolerated hitches
    fn default() -> Self {
        Self::new(21, 0.05, 21, 7)
    }
}
