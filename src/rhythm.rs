//! Quasi-periodic rate measurement
//!
//! Converts a fused, normalized signal into a cycles-per-minute estimate
//! using a two-threshold Schmitt trigger: crossing upward through the
//! upper threshold marks a cycle boundary, crossing downward through the
//! lower threshold re-arms it, and nothing in between can retrigger. Each
//! measured period must fall inside a physiological range before it is
//! averaged into the rate; outliers are dropped silently so a single bad
//! beat never destabilizes the estimate.

use crate::config::RhythmConfig;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Edge produced by one trigger transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleEdge {
    /// Upward crossing: one cycle boundary (inhale onset)
    Rise,
    /// Downward crossing: re-arm (exhale onset)
    Fall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerState {
    High,
    Low,
}

/// Schmitt-trigger period detector with a rolling rate average
#[derive(Debug, Clone)]
pub struct PeriodicityDetector {
    cfg: RhythmConfig,
    state: TriggerState,
    last_rise_ms: Option<f64>,
    periods: VecDeque<f64>,
}

impl PeriodicityDetector {
    pub fn new(cfg: RhythmConfig) -> Self {
        Self {
            cfg,
            state: TriggerState::Low,
            last_rise_ms: None,
            periods: VecDeque::new(),
        }
    }

    /// Advance the trigger with one signal sample
    ///
    /// Returns the edge taken this frame, if any. The rise-to-rise
    /// interval is recorded as a period only when it lies inside
    /// [min_period_ms, max_period_ms]; the rise timestamp itself always
    /// advances so a rejected beat does not stretch the next measurement.
    pub fn update(&mut self, signal: f64, t_ms: f64) -> Option<CycleEdge> {
        match self.state {
            TriggerState::Low if signal > self.cfg.upper_threshold => {
                self.state = TriggerState::High;
                if let Some(prev) = self.last_rise_ms {
                    let period = t_ms - prev;
                    if period >= self.cfg.min_period_ms && period <= self.cfg.max_period_ms {
                        self.periods.push_back(period);
                        while self.periods.len() > self.cfg.period_slots {
                            self.periods.pop_front();
                        }
                    }
                }
                self.last_rise_ms = Some(t_ms);
                Some(CycleEdge::Rise)
            }
            TriggerState::High if signal < self.cfg.lower_threshold => {
                self.state = TriggerState::Low;
                Some(CycleEdge::Fall)
            }
            _ => None,
        }
    }

    /// Rolling average period converted to a per-minute rate
    pub fn rate_per_minute(&self) -> Option<f64> {
        if self.periods.is_empty() {
            return None;
        }
        let mean = self.periods.iter().sum::<f64>() / self.periods.len() as f64;
        Some(60_000.0 / mean)
    }

    /// Number of accepted periods currently in the average
    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    pub fn reset(&mut self) {
        self.state = TriggerState::Low;
        self.last_rise_ms = None;
        self.periods.clear();
    }
}
