//! Consensus fusion of supervised channels
//!
//! Combines several independently unreliable channels into one normalized
//! signal. Channels qualify by reliability, contribute their z-values with
//! reliability-squared weight, and the blend is slew-rate limited and
//! low-pass filtered so a single-frame spike cannot fabricate a cycle.
//! A hard veto (speech, for the breath signal) overrides everything and
//! bleeds the fused value back toward zero.

use crate::channel::{ChannelState, ChannelSupervisor};
use crate::config::FusionConfig;
use crate::types::FusionPhase;

/// Per-frame result of the fusion step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionFrame {
    pub phase: FusionPhase,
    /// Uncompressed fused signal
    pub fused: f64,
    /// Compressed display signal
    pub display: f64,
    /// Confidence 0-1 (max reliability among qualifying channels)
    pub confidence: f64,
    /// Index of the highest-reliability qualifying channel
    pub active: Option<usize>,
}

/// Reliability-weighted consensus over a fixed set of channels
#[derive(Debug, Clone)]
pub struct ConsensusFusion {
    cfg: FusionConfig,
    channels: Vec<ChannelSupervisor>,
    fused: f64,
    phase: FusionPhase,
    confidence: f64,
    active: Option<usize>,
}

impl ConsensusFusion {
    pub fn new(cfg: FusionConfig, channels: Vec<ChannelSupervisor>) -> Self {
        Self {
            cfg,
            channels,
            fused: 0.0,
            phase: FusionPhase::Calibrating,
            confidence: 0.0,
            active: None,
        }
    }

    /// Ingest one frame of raw channel values
    ///
    /// `raw[i]` is the measurement for channel `i`, or `None` when the
    /// landmark was missing this frame: the channel keeps its state but
    /// sits out of this frame's consensus. `veto` forces the Disturbed
    /// phase regardless of channel quality; channels still update so
    /// their windows stay warm, but none of them is trusted.
    pub fn update(&mut self, raw: &[Option<f64>], veto: bool) -> FusionFrame {
        let mut states: Vec<Option<ChannelState>> = vec![None; self.channels.len()];
        for (i, sup) in self.channels.iter_mut().enumerate() {
            if let Some(value) = raw.get(i).copied().flatten() {
                states[i] = Some(sup.update(value));
            }
        }

        if veto {
            self.phase = FusionPhase::Disturbed;
            self.confidence = 0.0;
            self.active = None;
            self.fused += (0.0 - self.fused) * self.cfg.veto_smoothing;
            return self.frame();
        }

        let mut weight_sum = 0.0;
        let mut weighted = 0.0;
        let mut best: Option<(usize, f64)> = None;
        for (i, state) in states.iter().enumerate() {
            let Some(state) = state else { continue };
            if state.reliability <= self.cfg.reliability_gate {
                continue;
            }
            let weight = state.reliability * state.reliability;
            weighted += state.z_value * weight;
            weight_sum += weight;
            if best.map_or(true, |(_, r)| state.reliability > r) {
                best = Some((i, state.reliability));
            }
        }

        match best {
            None => {
                self.phase = FusionPhase::Calibrating;
                self.confidence = 0.0;
                self.active = None;
                self.fused += (0.0 - self.fused) * self.cfg.calibrating_smoothing;
            }
            Some((index, reliability)) => {
                self.phase = FusionPhase::Locked;
                self.confidence = reliability;
                self.active = Some(index);

                let target = weighted / weight_sum;
                let delta = (target - self.fused)
                    .clamp(-self.cfg.slew_limit, self.cfg.slew_limit);
                self.fused += delta * self.cfg.locked_smoothing;
            }
        }
        self.frame()
    }

    fn frame(&self) -> FusionFrame {
        FusionFrame {
            phase: self.phase,
            fused: self.fused,
            display: self.display_signal(),
            confidence: self.confidence,
            active: self.active,
        }
    }

    /// Compressed display signal
    pub fn display_signal(&self) -> f64 {
        (self.fused / self.cfg.display_compression)
            .clamp(-self.cfg.display_clamp, self.cfg.display_clamp)
    }

    pub fn phase(&self) -> FusionPhase {
        self.phase
    }

    pub fn fused(&self) -> f64 {
        self.fused
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn reset(&mut self) {
        for sup in &mut self.channels {
            sup.reset();
        }
        self.fused = 0.0;
        self.phase = FusionPhase::Calibrating;
        self.confidence = 0.0;
        self.active = None;
    }
}
