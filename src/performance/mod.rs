//! # Frame Timing
//!
//! Measures the time between frames, which drives the orbit animation and
//! camera movement, and keeps a rolling window of frame times for the FPS
//! overlay.
//!
//! ## Usage
//!
//! ```rust
//! use orbit_bloom::performance::FrameTimer;
//!
//! let mut timer = FrameTimer::new();
//! // In your main loop
//! let dt = timer.tick();
//! assert!(dt >= 0.0);
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Longest step handed to the animation and camera in one frame
const MAX_DELTA: Duration = Duration::from_millis(250);

/// Delta time and rolling FPS
pub struct FrameTimer {
    /// Ring buffer of recent frame times for averaging
    frame_times: VecDeque<Duration>,
    max_samples: usize,
    last_frame: Instant,
    fps: f32,
    frame_time_ms: f32,
    last_update: Instant,
    /// Update interval for the displayed numbers
    update_interval: Duration,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::with_samples(120) // ~2 seconds at 60fps
    }

    pub fn with_samples(max_samples: usize) -> Self {
        let now = Instant::now();
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            last_frame: now,
            fps: 0.0,
            frame_time_ms: 0.0,
            last_update: now,
            update_interval: Duration::from_millis(250),
        }
    }

    /// Marks the start of a new frame and returns the seconds since the last one
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now - self.last_frame;
        self.last_frame = now;
        self.record(elapsed);

        if now - self.last_update >= self.update_interval {
            self.update_metrics();
            self.last_update = now;
        }

        elapsed.min(MAX_DELTA).as_secs_f32()
    }

    fn record(&mut self, frame_time: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time);
    }

    fn update_metrics(&mut self) {
        if self.frame_times.is_empty() {
            return;
        }

        let total_time: Duration = self.frame_times.iter().sum();
        let avg_frame_time_ms =
            total_time.as_secs_f32() * 1000.0 / self.frame_times.len() as f32;

        self.frame_time_ms = avg_frame_time_ms;
        self.fps = if avg_frame_time_ms > 0.0 {
            1000.0 / avg_frame_time_ms
        } else {
            0.0
        };
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Average frame time in milliseconds over the sample window
    pub fn frame_time_ms(&self) -> f32 {
        self.frame_time_ms
    }

    /// Compact FPS overlay in the top-left corner
    pub fn render_fps_overlay(&self, ui: &imgui::Ui) {
        ui.window("FPS")
            .position([10.0, 10.0], imgui::Condition::Always)
            .no_decoration()
            .no_inputs()
            .always_auto_resize(true)
            .bg_alpha(0.3)
            .build(|| {
                ui.text(format!("FPS: {:.0}", self.fps));
                ui.text(format!("{:.2}ms", self.frame_time_ms));
            });
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_from_average_frame_time() {
        let mut timer = FrameTimer::with_samples(4);
        for _ in 0..4 {
            timer.record(Duration::from_millis(20));
        }
        timer.update_metrics();
        assert!((timer.frame_time_ms() - 20.0).abs() < 1e-3);
        assert!((timer.fps() - 50.0).abs() < 1e-2);
    }

    #[test]
    fn test_window_drops_oldest_sample() {
        let mut timer = FrameTimer::with_samples(2);
        timer.record(Duration::from_millis(100));
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(10));
        timer.update_metrics();
        assert_eq!(timer.frame_times.len(), 2);
        assert!((timer.fps() - 100.0).abs() < 1e-2);
    }

    #[test]
    fn test_tick_is_clamped() {
        let mut timer = FrameTimer::new();
        if let Some(earlier) = Instant::now().checked_sub(Duration::from_secs(5)) {
            timer.last_frame = earlier;
        }
        let dt = timer.tick();
        assert!(dt <= MAX_DELTA.as_secs_f32());
    }
}
