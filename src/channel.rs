//! Per-channel signal supervision
//!
//! Wraps one long and one short rolling window around a single measurement
//! channel and scores, every frame, whether the channel is currently
//! carrying a clean slow signal. The score is a 0-1 reliability moved in
//! fixed steps: it decays when the channel is flat (no signal) or when
//! short-term jitter dominates the long-term spread (non-physiological
//! motion such as speech), and rises otherwise. Cheap enough to run every
//! frame on several channels with no frequency-domain analysis.

use crate::config::ChannelConfig;
use crate::stats::RollingWindow;
use serde::{Deserialize, Serialize};

const RATIO_EPSILON: f64 = 1e-9;

/// Published state of one supervised channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    /// Confidence 0-1 that the channel carries trustworthy signal
    pub reliability: f64,
    /// Polarity-corrected z-value of the latest sample
    pub z_value: f64,
}

/// Reliability supervisor for one measurement channel
#[derive(Debug, Clone)]
pub struct ChannelSupervisor {
    cfg: ChannelConfig,
    long_window: RollingWindow,
    short_window: RollingWindow,
    state: ChannelState,
}

impl ChannelSupervisor {
    pub fn new(cfg: ChannelConfig) -> Self {
        let long_window = RollingWindow::new(cfg.long_window);
        let short_window = RollingWindow::new(cfg.short_window);
        Self {
            cfg,
            long_window,
            short_window,
            state: ChannelState::default(),
        }
    }

    /// Ingest one raw sample and rescore the channel
    pub fn update(&mut self, raw: f64) -> ChannelState {
        self.long_window.push(raw);
        self.short_window.push(raw);

        self.state.z_value = self.long_window.z_score(raw) * self.cfg.polarity;

        let long_sd = self.long_window.std_dev();
        if long_sd < self.cfg.dead_zone {
            // Flat signal: nothing to trust
            self.decay();
            return self.state;
        }

        let noise_ratio = self.short_window.std_dev() / (long_sd + RATIO_EPSILON);
        if noise_ratio > self.cfg.noise_ratio_max {
            self.decay();
        } else {
            self.grow();
        }
        self.state
    }

    fn decay(&mut self) {
        self.state.reliability = (self.state.reliability - self.cfg.reliability_step).max(0.0);
    }

    fn grow(&mut self) {
        self.state.reliability = (self.state.reliability + self.cfg.reliability_step).min(1.0);
    }

    /// Latest published state without ingesting a sample
    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn reliability(&self) -> f64 {
        self.state.reliability
    }

    /// Clear windows and reliability back to the newly constructed state
    pub fn reset(&mut self) {
        self.long_window.reset();
        self.short_window.reset();
        self.state = ChannelState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ChannelConfig {
        ChannelConfig {
            long_window: 300,
            short_window: 30,
            dead_zone: 1e-4,
            noise_ratio_max: 0.6,
            reliability_step: 0.05,
            polarity: 1.0,
        }
    }

    /// Deterministic pseudo-noise, uniform-ish in -1..1
    fn noise(i: usize) -> f64 {
        let x = (i as f64 * 12.9898).sin() * 43758.5453;
        (x - x.floor()) * 2.0 - 1.0
    }

    #[test]
    fn flat_signal_keeps_reliability_at_zero() {
        let mut sup = ChannelSupervisor::new(test_config());
        for _ in 0..100 {
            sup.update(0.25);
        }
        assert_eq!(sup.reliability(), 0.0);
        // Flat window also means a neutral z-value
        assert_eq!(sup.state().z_value, 0.0);
    }

    #[test]
    fn slow_sine_drives_reliability_to_one() {
        let mut sup = ChannelSupervisor::new(test_config());
        // 15 BPM sine at 60 fps: period 4000 ms = 240 frames
        for i in 0..600 {
            let t = i as f64 / 60.0;
            sup.update((2.0 * std::f64::consts::PI * t / 4.0).sin());
        }
        assert!(
            sup.reliability() > 0.95,
            "reliability should approach 1, got {}",
            sup.reliability()
        );
    }

    #[test]
    fn pure_noise_never_earns_reliability() {
        let mut sup = ChannelSupervisor::new(test_config());
        // Short-term spread matches long-term spread on every frame, so
        // the score decays as fast as it could ever rise
        for i in 0..600 {
            sup.update(noise(i));
        }
        assert!(
            sup.reliability() < 0.1,
            "noise should hold reliability near 0, got {}",
            sup.reliability()
        );
    }

    #[test]
    fn onset_of_jitter_drains_an_earned_score() {
        let mut sup = ChannelSupervisor::new(test_config());
        for i in 0..600 {
            let t = i as f64 / 60.0;
            sup.update((2.0 * std::f64::consts::PI * t / 4.0).sin());
        }
        assert!(sup.reliability() > 0.9);

        // Switch to pure jitter; once the short window has turned over,
        // every frame decays by the fixed step
        for i in 0..60 {
            sup.update(noise(i));
        }
        assert!(
            sup.reliability() < 0.3,
            "jitter should drain the score, got {}",
            sup.reliability()
        );
    }

    #[test]
    fn polarity_flips_z_value_sign() {
        let mut pos = ChannelSupervisor::new(test_config());
        let mut neg = ChannelSupervisor::new(ChannelConfig {
            polarity: -1.0,
            ..test_config()
        });
        for i in 0..120 {
            let v = (i as f64 * 0.05).sin();
            pos.update(v);
            neg.update(v);
        }
        let rising = 1.0;
        let zp = pos.update(rising).z_value;
        let zn = neg.update(rising).z_value;
        assert!(zp > 0.0);
        assert!(zn < 0.0);
    }

    #[test]
    fn reset_matches_fresh_construction() {
        let mut sup = ChannelSupervisor::new(test_config());
        for i in 0..200 {
            sup.update((i as f64 * 0.03).sin());
        }
        sup.reset();
        assert_eq!(sup.reliability(), 0.0);
        assert_eq!(sup.state(), ChannelState::default());
    }
}
