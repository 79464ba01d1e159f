//! Adaptive baseline tracking
//!
//! A drifting per-axis "center" against which deviations are measured.
//! The center follows slow postural drift so thresholds stay meaningful
//! over a long session, but the adaptation rate is supplied by the caller
//! each frame so it can be throttled while a gesture is in progress and
//! the baseline must not absorb the very movement being detected.

use serde::{Deserialize, Serialize};

/// Slowly drifting scalar baseline with lazy initialization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdaptiveCenterTracker {
    center: f64,
    initialized: bool,
}

impl AdaptiveCenterTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the baseline toward `raw` at rate `alpha`
    ///
    /// The first nonzero raw value initializes the center directly, with
    /// no smoothing. A zero raw value before initialization is treated as
    /// "no measurement yet" and ignored.
    pub fn update(&mut self, raw: f64, alpha: f64) -> f64 {
        if !self.initialized {
            if raw != 0.0 {
                self.center = raw;
                self.initialized = true;
            }
            return self.center;
        }
        self.center += (raw - self.center) * alpha;
        self.center
    }

    /// Deviation of `raw` from the current baseline (0 before initialization)
    pub fn offset(&self, raw: f64) -> f64 {
        if !self.initialized {
            return 0.0;
        }
        raw - self.center
    }

    /// Current baseline value
    pub fn center(&self) -> f64 {
        self.center
    }

    /// Whether the baseline has been seeded by a nonzero measurement
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Clamp the baseline so it never falls below `floor`
    pub fn clamp_min(&mut self, floor: f64) {
        if self.initialized && self.center < floor {
            self.center = floor;
        }
    }

    /// Clamp the baseline so it never rises above `ceiling`
    pub fn clamp_max(&mut self, ceiling: f64) {
        if self.initialized && self.center > ceiling {
            self.center = ceiling;
        }
    }

    /// Return to the uninitialized state
    pub fn reset(&mut self) {
        self.center = 0.0;
        self.initialized = false;
    }
}
