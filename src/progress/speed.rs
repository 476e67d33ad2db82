//! # Throughput and time-to-go estimation.
//!
//! A [`SpeedEstimator`] keeps the last `speed_calc_cycles` samples of one
//! counter as `(seconds, value)` pairs and derives the rate over that window:
//!
//! ```text
//! speed = (latest.value - oldest.value) / (latest.t - oldest.t)
//! ttg   = (max - current) / speed
//! ```
//!
//! Pure computation; the renderer feeds it one sample per tick.

use std::collections::VecDeque;

/// Default number of samples in the speed window.
pub const DEFAULT_SPEED_CALC_CYCLES: usize = 10;

/// Sliding-window rate estimator for one counter.
///
/// # Example
/// ```
/// use loopvisor::SpeedEstimator;
///
/// let mut est = SpeedEstimator::new(3);
/// est.push(0.0, 0);
/// assert_eq!(est.speed(), None);
/// est.push(2.0, 10);
/// assert_eq!(est.speed(), Some(5.0));
/// assert_eq!(est.time_to_go(10, 100), Some(18.0));
/// ```
#[derive(Clone, Debug)]
pub struct SpeedEstimator {
    window: VecDeque<(f64, u64)>,
    capacity: usize,
}

impl SpeedEstimator {
    /// Creates an estimator over `cycles` samples (at least 2).
    pub fn new(cycles: usize) -> Self {
        let capacity = cycles.max(2);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records `value` observed at time `t` (seconds, any fixed origin).
    ///
    /// A value lower than the previous sample means the counter was reset;
    /// the window restarts from this sample.
    pub fn push(&mut self, t: f64, value: u64) {
        if self.window.back().is_some_and(|&(_, last)| value < last) {
            self.window.clear();
        }
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back((t, value));
    }

    /// Drops all samples.
    pub fn clear(&mut self) {
        self.window.clear();
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Returns `true` when no sample is held.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Counts per second over the window.
    ///
    /// `None` with fewer than two samples or no elapsed time between them.
    #[allow(clippy::cast_precision_loss)]
    pub fn speed(&self) -> Option<f64> {
        let (&(t0, v0), &(t1, v1)) = (self.window.front()?, self.window.back()?);
        let dt = t1 - t0;
        if self.window.len() < 2 || dt <= 0.0 {
            return None;
        }
        Some(v1.saturating_sub(v0) as f64 / dt)
    }

    /// Seconds until `current` reaches `max` at the current speed.
    ///
    /// `None` when the speed is unknown or zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn time_to_go(&self, current: u64, max: u64) -> Option<f64> {
        let speed = self.speed().filter(|s| *s > 0.0)?;
        Some(max.saturating_sub(current) as f64 / speed)
    }
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_CALC_CYCLES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_two_samples_and_elapsed_time() {
        let mut est = SpeedEstimator::new(3);
        assert_eq!(est.speed(), None);
        est.push(1.0, 5);
        assert_eq!(est.speed(), None);
        est.push(1.0, 9);
        assert_eq!(est.speed(), None, "zero elapsed time");
        est.push(3.0, 9);
        assert_eq!(est.speed(), Some(2.0));
    }

    /// Old samples fall out of the window.
    #[test]
    #[allow(clippy::float_cmp)]
    fn window_slides() {
        let mut est = SpeedEstimator::new(3);
        est.push(0.0, 0);
        est.push(1.0, 100);
        est.push(2.0, 101);
        assert_eq!(est.speed(), Some(50.5));
        est.push(3.0, 102);
        assert_eq!(est.len(), 3);
        assert_eq!(est.speed(), Some(1.0));
    }

    #[test]
    fn decreasing_value_restarts_window() {
        let mut est = SpeedEstimator::new(5);
        est.push(0.0, 10);
        est.push(1.0, 20);
        est.push(2.0, 3);
        assert_eq!(est.len(), 1);
        assert_eq!(est.speed(), None);
    }

    #[test]
    fn time_to_go_needs_positive_speed() {
        let mut est = SpeedEstimator::new(3);
        est.push(0.0, 4);
        est.push(1.0, 4);
        assert_eq!(est.time_to_go(4, 10), None);

        est.push(2.0, 6);
        assert_eq!(est.time_to_go(6, 10), Some(4.0));
        assert_eq!(est.time_to_go(12, 10), Some(0.0));
    }

    #[test]
    fn capacity_has_a_floor() {
        let mut est = SpeedEstimator::new(0);
        est.push(0.0, 0);
        est.push(1.0, 1);
        assert_eq!(est.speed(), Some(1.0));
        est.clear();
        assert!(est.is_empty());
    }
}
