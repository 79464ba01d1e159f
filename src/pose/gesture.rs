//! Latch-based gesture detection
//!
//! Discrete repeated gestures (nod, shake) are detected as *transitions
//! through thresholds*, never as instantaneous crossings, which rejects
//! small involuntary twitches. Two modes share one machine:
//!
//! - `ExcursionReturn` (nod): a positive excursion past the latch
//!   threshold that comes back to the release band completes one gesture.
//!   Negative excursions latch but complete silently, so a down-then-up
//!   sweep counts once.
//! - `OppositeSweep` (shake): two consecutive opposite-threshold transits
//!   (a full out-and-back sweep) complete one gesture; a half-finished
//!   sweep is abandoned after an idle timeout.

use crate::config::GestureAxisConfig;
use serde::{Deserialize, Serialize};

/// Detection mode for one gesture axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureMode {
    ExcursionReturn,
    OppositeSweep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LatchPhase {
    Centered,
    DeflectedPos,
    DeflectedNeg,
}

/// A completed gesture with its peak deviation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureOutcome {
    pub magnitude: f64,
}

/// Two-threshold latch machine for one pose axis
#[derive(Debug, Clone)]
pub struct GestureStateMachine {
    cfg: GestureAxisConfig,
    mode: GestureMode,
    phase: LatchPhase,
    transits: u8,
    peak: f64,
    last_activity_ms: f64,
    count: u32,
}

impl GestureStateMachine {
    pub fn new(mode: GestureMode, cfg: GestureAxisConfig) -> Self {
        Self {
            cfg,
            mode,
            phase: LatchPhase::Centered,
            transits: 0,
            peak: 0.0,
            last_activity_ms: 0.0,
            count: 0,
        }
    }

    /// Advance the latch with the current deviation from center
    pub fn update(&mut self, deviation: f64, t_ms: f64) -> Option<GestureOutcome> {
        match self.mode {
            GestureMode::ExcursionReturn => self.update_excursion(deviation),
            GestureMode::OppositeSweep => self.update_sweep(deviation, t_ms),
        }
    }

    fn update_excursion(&mut self, deviation: f64) -> Option<GestureOutcome> {
        match self.phase {
            LatchPhase::Centered => {
                if deviation > self.cfg.positive_threshold {
                    self.phase = LatchPhase::DeflectedPos;
                    self.peak = deviation;
                } else if deviation < self.cfg.negative_threshold {
                    self.phase = LatchPhase::DeflectedNeg;
                    self.peak = deviation;
                }
                None
            }
            LatchPhase::DeflectedPos => {
                self.peak = self.peak.max(deviation);
                if deviation < self.cfg.positive_threshold * self.cfg.release_fraction {
                    self.phase = LatchPhase::Centered;
                    self.count += 1;
                    return Some(GestureOutcome {
                        magnitude: self.peak,
                    });
                }
                None
            }
            LatchPhase::DeflectedNeg => {
                self.peak = self.peak.min(deviation);
                // Silent re-arm: the return excursion of a completed
                // gesture must not count a second time
                if deviation > self.cfg.negative_threshold * self.cfg.release_fraction {
                    self.phase = LatchPhase::Centered;
                }
                None
            }
        }
    }

    fn update_sweep(&mut self, deviation: f64, t_ms: f64) -> Option<GestureOutcome> {
        match self.phase {
            LatchPhase::Centered => {
                if deviation > self.cfg.positive_threshold {
                    self.begin_sweep(LatchPhase::DeflectedPos, deviation, t_ms);
                } else if deviation < self.cfg.negative_threshold {
                    self.begin_sweep(LatchPhase::DeflectedNeg, deviation, t_ms);
                }
                None
            }
            LatchPhase::DeflectedPos => {
                self.peak = self.peak.max(deviation.abs());
                if deviation < self.cfg.negative_threshold {
                    self.phase = LatchPhase::DeflectedNeg;
                    return self.record_transit(t_ms);
                }
                self.check_timeout(deviation, t_ms);
                None
            }
            LatchPhase::DeflectedNeg => {
                self.peak = self.peak.max(deviation.abs());
                if deviation > self.cfg.positive_threshold {
                    self.phase = LatchPhase::DeflectedPos;
                    return self.record_transit(t_ms);
                }
                self.check_timeout(deviation, t_ms);
                None
            }
        }
    }

    fn begin_sweep(&mut self, phase: LatchPhase, deviation: f64, t_ms: f64) {
        self.phase = phase;
        self.transits = 0;
        self.peak = deviation.abs();
        self.last_activity_ms = t_ms;
    }

    fn record_transit(&mut self, t_ms: f64) -> Option<GestureOutcome> {
        self.last_activity_ms = t_ms;
        self.transits += 1;
        if self.transits >= 2 {
            self.transits = 0;
            self.count += 1;
            return Some(GestureOutcome {
                magnitude: self.peak,
            });
        }
        None
    }

    fn check_timeout(&mut self, deviation: f64, t_ms: f64) {
        // Abandon a half-finished sweep once the axis has settled
        if t_ms - self.last_activity_ms > self.cfg.sweep_timeout_ms
            && deviation.abs() < self.cfg.positive_threshold * self.cfg.release_fraction
        {
            self.phase = LatchPhase::Centered;
            self.transits = 0;
        }
    }

    /// True while an excursion or sweep is mid-flight
    ///
    /// Baseline adaptation is throttled while this holds so the gesture
    /// cannot erase itself before completing.
    pub fn in_progress(&self) -> bool {
        self.phase != LatchPhase::Centered
    }

    /// Completed gestures since construction or reset
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn reset(&mut self) {
        self.phase = LatchPhase::Centered;
        self.transits = 0;
        self.peak = 0.0;
        self.last_activity_ms = 0.0;
        self.count = 0;
    }
}
