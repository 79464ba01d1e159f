//! Generic adaptive open/closed detection
//!
//! Shared engine behind the eye, mouth, and tongue detectors. A raw ratio
//! is compared against an adaptive baseline with asymmetric engage and
//! release thresholds; the release threshold sits closer to zero so the
//! return to neutral is detected more eagerly than the departure. Engages
//! must survive a minimum-hold window (filters single-frame tracking
//! glitches) and can be rate-limited by a debounce timer.
//!
//! Baseline adaptation runs only at rest and only inside a small resting
//! jitter band, optionally restricted to the direction that moves the
//! baseline away from the active state, so a genuinely closed eye cannot
//! drag the open-baseline down and cause false opens. A safety floor
//! keeps the baseline a fixed margin away from the tracked active level
//! so a minimum detectable deviation survives long-session drift.

use crate::center::AdaptiveCenterTracker;
use crate::config::BinaryConfig;

/// Which side of the baseline counts as "active"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deflection {
    /// Active when the raw value rises above baseline (mouth, tongue)
    Above,
    /// Active when the raw value falls below baseline (eyes closing)
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Inactive,
    /// Deviation past the engage threshold, waiting out the hold window
    Pending,
    Active,
}

/// One-shot transition produced by an update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryTransition {
    /// Confirmed entry into the active state
    Engaged,
    /// Return to the inactive state; `active_ms` spans from the first
    /// over-threshold frame to the release
    Released { active_ms: f64 },
}

/// Adaptive two-threshold open/closed detector
#[derive(Debug, Clone)]
pub struct BinaryStateDetector {
    cfg: BinaryConfig,
    deflection: Deflection,
    baseline: AdaptiveCenterTracker,
    active_level: Option<f64>,
    phase: Phase,
    engage_start_ms: f64,
    last_event_ms: f64,
    suppress_events: bool,
}

impl BinaryStateDetector {
    pub fn new(deflection: Deflection, cfg: BinaryConfig) -> Self {
        Self {
            cfg,
            deflection,
            baseline: AdaptiveCenterTracker::new(),
            active_level: None,
            phase: Phase::Inactive,
            engage_start_ms: 0.0,
            last_event_ms: f64::NEG_INFINITY,
            suppress_events: false,
        }
    }

    /// Advance with one raw measurement
    pub fn update(&mut self, raw: f64, t_ms: f64) -> Option<BinaryTransition> {
        if !self.baseline.is_initialized() {
            self.baseline.update(raw, self.cfg.baseline_alpha);
            return None;
        }

        let deviation = self.signed_deviation(raw);

        match self.phase {
            Phase::Inactive => {
                self.adapt_baseline(raw, deviation);
                if deviation > self.cfg.engage_threshold {
                    self.engage_start_ms = t_ms;
                    if self.cfg.min_hold_ms <= 0.0 {
                        return self.confirm_engage(t_ms);
                    }
                    self.phase = Phase::Pending;
                }
                None
            }
            Phase::Pending => {
                if deviation < self.cfg.release_threshold {
                    // Glitch shorter than the hold window: no events
                    self.phase = Phase::Inactive;
                    return None;
                }
                if t_ms - self.engage_start_ms >= self.cfg.min_hold_ms {
                    return self.confirm_engage(t_ms);
                }
                None
            }
            Phase::Active => {
                self.track_active_level(raw);
                if deviation < self.cfg.release_threshold {
                    self.phase = Phase::Inactive;
                    let active_ms = t_ms - self.engage_start_ms;
                    if self.suppress_events {
                        return None;
                    }
                    return Some(BinaryTransition::Released { active_ms });
                }
                None
            }
        }
    }

    fn confirm_engage(&mut self, t_ms: f64) -> Option<BinaryTransition> {
        self.phase = Phase::Active;
        // A debounced engage still changes state, it just stays silent
        // through release so the consumer never sees half an event pair
        self.suppress_events =
            self.cfg.debounce_ms > 0.0 && t_ms - self.last_event_ms < self.cfg.debounce_ms;
        if self.suppress_events {
            return None;
        }
        self.last_event_ms = t_ms;
        Some(BinaryTransition::Engaged)
    }

    fn signed_deviation(&self, raw: f64) -> f64 {
        let offset = raw - self.baseline.center();
        match self.deflection {
            Deflection::Above => offset,
            Deflection::Below => -offset,
        }
    }

    fn adapt_baseline(&mut self, raw: f64, deviation: f64) {
        if deviation.abs() >= self.cfg.resting_band {
            return;
        }
        // Optionally only adapt when the raw value sits on the rest side
        // of the baseline (deviation at or below zero)
        if self.cfg.adapt_toward_rest_only && deviation > 0.0 {
            return;
        }
        self.baseline.update(raw, self.cfg.baseline_alpha);
        self.apply_floor();
    }

    fn apply_floor(&mut self) {
        let (Some(margin), Some(level)) = (self.cfg.floor_margin, self.active_level) else {
            return;
        };
        match self.deflection {
            Deflection::Below => self.baseline.clamp_min(level + margin),
            Deflection::Above => self.baseline.clamp_max(level - margin),
        }
    }

    fn track_active_level(&mut self, raw: f64) {
        let level = match self.active_level {
            Some(level) => level + (raw - level) * self.cfg.active_level_alpha,
            None => raw,
        };
        self.active_level = Some(level);
    }

    /// True while the detector is in the confirmed active state
    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Current adaptive baseline, once seeded
    pub fn baseline(&self) -> Option<f64> {
        self.baseline.is_initialized().then(|| self.baseline.center())
    }

    pub fn reset(&mut self) {
        self.baseline.reset();
        self.active_level = None;
        self.phase = Phase::Inactive;
        self.engage_start_ms = 0.0;
        self.last_event_ms = f64::NEG_INFINITY;
        self.suppress_events = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eye_like() -> BinaryStateDetector {
        BinaryStateDetector::new(
            Deflection::Below,
            BinaryConfig {
                engage_threshold: 0.12,
                release_threshold: 0.08,
                min_hold_ms: 100.0,
                debounce_ms: 0.0,
                baseline_alpha: 0.02,
                resting_band: 0.05,
                adapt_toward_rest_only: false,
                floor_margin: Some(0.05),
                active_level_alpha: 0.1,
            },
        )
    }

    fn tongue_like() -> BinaryStateDetector {
        BinaryStateDetector::new(
            Deflection::Above,
            BinaryConfig {
                engage_threshold: 0.08,
                release_threshold: 0.05,
                min_hold_ms: 0.0,
                debounce_ms: 300.0,
                baseline_alpha: 0.02,
                resting_band: 0.03,
                adapt_toward_rest_only: false,
                floor_margin: None,
                active_level_alpha: 0.1,
            },
        )
    }

    /// Seed the baseline and settle at rest
    fn warm_up(d: &mut BinaryStateDetector, rest: f64) {
        for i in 0..10 {
            assert!(d.update(rest, i as f64 * 16.0).is_none());
        }
    }

    #[test]
    fn sustained_closure_engages_after_hold_window() {
        let mut d = eye_like();
        warm_up(&mut d, 0.30);

        let mut engaged_at = None;
        for i in 0..20 {
            let t = 200.0 + i as f64 * 16.0;
            if d.update(0.05, t) == Some(BinaryTransition::Engaged) {
                engaged_at = Some(t);
            }
        }
        let t = engaged_at.expect("closure confirmed");
        assert!(t - 200.0 >= 100.0);
        assert!(d.is_active());
    }

    #[test]
    fn glitch_shorter_than_hold_produces_no_events() {
        let mut d = eye_like();
        warm_up(&mut d, 0.30);

        // Two frames of dropout, then back open
        assert!(d.update(0.05, 200.0).is_none());
        assert!(d.update(0.05, 216.0).is_none());
        assert!(d.update(0.30, 232.0).is_none());
        assert!(!d.is_active());
    }

    #[test]
    fn release_reports_active_duration() {
        let mut d = eye_like();
        warm_up(&mut d, 0.30);

        for i in 0..15 {
            d.update(0.05, 200.0 + i as f64 * 16.0);
        }
        let released = d.update(0.30, 500.0);
        match released {
            Some(BinaryTransition::Released { active_ms }) => {
                assert!((active_ms - 300.0).abs() < 1.0);
            }
            other => panic!("expected release, got {other:?}"),
        }
    }

    #[test]
    fn debounce_suppresses_the_whole_second_pair() {
        let mut d = tongue_like();
        warm_up(&mut d, 0.02);

        assert_eq!(d.update(0.15, 200.0), Some(BinaryTransition::Engaged));
        assert!(matches!(
            d.update(0.02, 250.0),
            Some(BinaryTransition::Released { .. })
        ));

        // Second poke lands inside the 300 ms debounce: fully silent
        assert!(d.update(0.15, 300.0).is_none());
        assert!(d.update(0.02, 350.0).is_none());

        // Third poke is past the debounce
        assert_eq!(d.update(0.15, 600.0), Some(BinaryTransition::Engaged));
    }

    #[test]
    fn closed_state_does_not_drag_the_baseline_down() {
        let mut d = eye_like();
        warm_up(&mut d, 0.30);
        let before = d.baseline().unwrap();

        for i in 0..200 {
            d.update(0.05, 200.0 + i as f64 * 16.0);
        }
        let after = d.baseline().unwrap();
        assert!((after - before).abs() < 1e-9);
    }

    #[test]
    fn baseline_floor_holds_above_the_closed_level() {
        let mut d = eye_like();
        warm_up(&mut d, 0.30);

        // Learn the closed level
        for i in 0..30 {
            d.update(0.05, 200.0 + i as f64 * 16.0);
        }
        d.update(0.30, 800.0);

        // Long slow droop at rest: the raw level creeps down inside the
        // resting band, so the baseline would follow it all the way
        let mut t = 1000.0;
        let mut raw = 0.30;
        for _ in 0..5000 {
            d.update(raw, t);
            raw = (raw - 0.0002).max(0.08);
            t += 16.0;
        }
        let baseline = d.baseline().unwrap();
        assert!(
            baseline >= 0.05 + 0.05 - 1e-6,
            "baseline {baseline} fell through the floor"
        );
    }

    #[test]
    fn reset_restores_uninitialized_baseline() {
        let mut d = eye_like();
        warm_up(&mut d, 0.30);
        d.reset();
        assert!(d.baseline().is_none());
        assert!(!d.is_active());
    }
}

