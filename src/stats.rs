//! Rolling statistics
//!
//! Fixed-capacity numeric window maintaining a running sum and sum of
//! squares so that mean, standard deviation, and z-score queries are O(1)
//! per frame. This is the primitive underneath every channel supervisor
//! and noise estimate in the crate.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Standard deviations below this are treated as a flat signal
///
/// Sits well above the rounding noise the running sums can accumulate on
/// a constant stream, and well below any real measurement spread.
pub const FLAT_EPSILON: f64 = 1e-6;

/// Fixed-capacity rolling window with O(1) running statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingWindow {
    values: VecDeque<f64>,
    capacity: usize,
    sum: f64,
    sum_sq: f64,
}

impl RollingWindow {
    /// Create a window holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Append a sample, evicting the oldest when the window is full
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            if let Some(evicted) = self.values.pop_front() {
                self.sum -= evicted;
                self.sum_sq -= evicted * evicted;
            }
        }
        self.values.push_back(value);
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no samples are held
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True once the window has reached capacity
    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Mean of the held samples (0 when empty)
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.sum / self.values.len() as f64
    }

    /// Population standard deviation of the held samples
    ///
    /// Variance is clamped at zero to absorb floating-point drift in the
    /// running sums.
    pub fn std_dev(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let n = self.values.len() as f64;
        let mean = self.sum / n;
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        variance.sqrt()
    }

    /// Z-score of `value` against the window
    ///
    /// Returns 0 when the window is flat (std dev below epsilon) so a
    /// dead signal never produces a divide-by-zero blowup.
    pub fn z_score(&self, value: f64) -> f64 {
        let sd = self.std_dev();
        if sd < FLAT_EPSILON {
            return 0.0;
        }
        (value - self.mean()) / sd
    }

    /// Clear all samples and running sums
    pub fn reset(&mut self) {
        self.values.clear();
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }
}
