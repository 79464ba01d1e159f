//! Postural stillness scoring
//!
//! Converts frame-to-frame pose velocity into a smoothed 0-1 stillness
//! score. Position deltas are weighted above rotation deltas because a
//! subject shifting in the chair matters more than a small head rotation.
//! Stable/unstable transitions use separated thresholds so the state
//! cannot chatter around a single crossing point. Drift (distance from
//! the adaptive baseline) is a separate signal: "how far from rest am I"
//! as opposed to "how fast am I moving right now".

use crate::config::StabilityConfig;
use crate::types::{HeadPose, PoseAxes};

/// Stable/unstable edge fired on a hysteresis transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityEdge {
    BecameStable,
    BecameUnstable,
}

/// Hysteresis-scored stillness tracker
#[derive(Debug, Clone)]
pub struct StabilityScorer {
    cfg: StabilityConfig,
    score: f64,
    stable: bool,
    prev: Option<HeadPose>,
}

impl StabilityScorer {
    pub fn new(cfg: StabilityConfig) -> Self {
        Self {
            cfg,
            score: 1.0,
            stable: true,
            prev: None,
        }
    }

    /// Advance with the current pose; returns a hysteresis edge if taken
    pub fn update(&mut self, pose: &HeadPose) -> Option<StabilityEdge> {
        let velocity = match &self.prev {
            Some(prev) => weighted_velocity(prev, pose, &self.cfg),
            None => 0.0,
        };
        self.prev = Some(*pose);

        let raw = (1.0 - velocity * self.cfg.velocity_scale).max(0.0);
        self.score += (raw - self.score) * self.cfg.smoothing;

        if self.stable && self.score < self.cfg.unstable_below {
            self.stable = false;
            return Some(StabilityEdge::BecameUnstable);
        }
        if !self.stable && self.score > self.cfg.stable_above {
            self.stable = true;
            return Some(StabilityEdge::BecameStable);
        }
        None
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn is_stable(&self) -> bool {
        self.stable
    }

    pub fn reset(&mut self) {
        self.score = 1.0;
        self.stable = true;
        self.prev = None;
    }
}

/// Weighted Euclidean velocity norm between consecutive poses
fn weighted_velocity(prev: &HeadPose, current: &HeadPose, cfg: &StabilityConfig) -> f64 {
    let dx = current.x - prev.x;
    let dy = current.y - prev.y;
    let dyaw = current.yaw - prev.yaw;
    let dpitch = current.pitch - prev.pitch;
    let droll = current.roll - prev.roll;

    (cfg.position_weight * (dx * dx + dy * dy)
        + cfg.rotation_weight * (dyaw * dyaw + dpitch * dpitch + droll * droll))
        .sqrt()
}

/// Weighted per-axis drift of a pose from its adaptive centers
pub fn weighted_drift(axes: &PoseAxes, cfg: &StabilityConfig) -> f64 {
    (cfg.position_weight * (axes.x * axes.x + axes.y * axes.y)
        + cfg.rotation_weight
            * (axes.yaw * axes.yaw + axes.pitch * axes.pitch + axes.roll * axes.roll))
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(x: f64, y: f64, yaw: f64) -> HeadPose {
        HeadPose {
            yaw,
            pitch: 0.0,
            roll: 0.0,
            x,
            y,
            scale: 100.0,
        }
    }

    fn scorer() -> StabilityScorer {
        StabilityScorer::new(StabilityConfig::default())
    }

    #[test]
    fn still_pose_stays_stable_at_full_score() {
        let mut s = scorer();
        for _ in 0..100 {
            assert!(s.update(&pose(0.5, 0.5, 0.0)).is_none());
        }
        assert!(s.is_stable());
        assert!((s.score() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sustained_motion_fires_one_unstable_edge() {
        let mut s = scorer();
        let mut edges = Vec::new();
        for i in 0..100 {
            let x = 0.5 + i as f64 * 0.02;
            if let Some(edge) = s.update(&pose(x, 0.5, 0.0)) {
                edges.push(edge);
            }
        }
        assert_eq!(edges, vec![StabilityEdge::BecameUnstable]);
        assert!(!s.is_stable());
        assert!(s.score() < 0.4);
    }

    #[test]
    fn recovery_requires_the_higher_threshold() {
        let mut s = scorer();
        for i in 0..100 {
            s.update(&pose(0.5 + i as f64 * 0.02, 0.5, 0.0));
        }
        assert!(!s.is_stable());

        let mut edges = Vec::new();
        for _ in 0..200 {
            if let Some(edge) = s.update(&pose(2.5, 0.5, 0.0)) {
                edges.push(edge);
            }
        }
        assert_eq!(edges, vec![StabilityEdge::BecameStable]);
        // The stable edge fired above 0.5, not at the 0.4 exit threshold
        assert!(s.score() > 0.5);
    }

    #[test]
    fn position_deltas_outweigh_rotation_deltas() {
        let cfg = StabilityConfig::default();
        let a = pose(0.0, 0.0, 0.0);
        let moved = pose(0.01, 0.0, 0.0);
        let rotated = pose(0.0, 0.0, 0.01);
        assert!(
            weighted_velocity(&a, &moved, &cfg) > weighted_velocity(&a, &rotated, &cfg)
        );
    }

    #[test]
    fn drift_norm_is_zero_at_baseline() {
        let cfg = StabilityConfig::default();
        assert_eq!(weighted_drift(&PoseAxes::default(), &cfg), 0.0);
        let off = PoseAxes {
            x: 0.1,
            ..PoseAxes::default()
        };
        assert!(weighted_drift(&off, &cfg) > 0.0);
    }

    #[test]
    fn reset_restores_stable_full_score() {
        let mut s = scorer();
        for i in 0..100 {
            s.update(&pose(0.5 + i as f64 * 0.02, 0.5, 0.0));
        }
        s.reset();
        assert!(s.is_stable());
        assert_eq!(s.score(), 1.0);
    }
}
