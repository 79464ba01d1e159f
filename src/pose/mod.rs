//! Head pose monitoring
//!
//! Maintains an adaptive center per pose axis and derives all discrete
//! and continuous pose signals from the deviations: latch-based nod and
//! shake counting, momentary turn/tilt impulses, the stillness score,
//! and drift relative to baseline.
//!
//! The adaptation rate is the load-bearing decision here: the centers
//! follow slow postural drift so thresholds stay meaningful across a
//! long session, but adaptation is throttled while the subject is moving
//! and nearly frozen while a gesture latch is mid-flight, so a deliberate
//! gesture cannot erase itself before it completes.

pub mod gesture;
pub mod impulse;
pub mod stability;

use crate::center::AdaptiveCenterTracker;
use crate::config::PoseConfig;
use crate::types::{EventKind, HeadPose, LateralDirection, PoseAxes, PoseSnapshot, SessionEvent};
use self::gesture::{GestureMode, GestureStateMachine};
use self::impulse::ImpulseDetector;
use self::stability::{weighted_drift, StabilityEdge, StabilityScorer};

/// Adaptive centers for the five tracked pose axes
#[derive(Debug, Clone, Default)]
struct PoseCenters {
    yaw: AdaptiveCenterTracker,
    pitch: AdaptiveCenterTracker,
    roll: AdaptiveCenterTracker,
    x: AdaptiveCenterTracker,
    y: AdaptiveCenterTracker,
}

impl PoseCenters {
    fn update(&mut self, pose: &HeadPose, alpha: f64) {
        self.yaw.update(pose.yaw, alpha);
        self.pitch.update(pose.pitch, alpha);
        self.roll.update(pose.roll, alpha);
        self.x.update(pose.x, alpha);
        self.y.update(pose.y, alpha);
    }

    fn deviation(&self, pose: &HeadPose) -> PoseAxes {
        PoseAxes {
            yaw: self.yaw.offset(pose.yaw),
            pitch: self.pitch.offset(pose.pitch),
            roll: self.roll.offset(pose.roll),
            x: self.x.offset(pose.x),
            y: self.y.offset(pose.y),
        }
    }

    fn reset(&mut self) {
        self.yaw.reset();
        self.pitch.reset();
        self.roll.reset();
        self.x.reset();
        self.y.reset();
    }
}

/// All pose-derived detection for one subject
#[derive(Debug, Clone)]
pub struct PoseMonitor {
    cfg: PoseConfig,
    centers: PoseCenters,
    nod: GestureStateMachine,
    shake: GestureStateMachine,
    turn: ImpulseDetector,
    tilt: ImpulseDetector,
    stability: StabilityScorer,
    deviation: PoseAxes,
}

impl PoseMonitor {
    pub fn new(cfg: PoseConfig) -> Self {
        let nod = GestureStateMachine::new(GestureMode::ExcursionReturn, cfg.nod.clone());
        let shake = GestureStateMachine::new(GestureMode::OppositeSweep, cfg.shake.clone());
        let turn = ImpulseDetector::new(cfg.turn.clone());
        let tilt = ImpulseDetector::new(cfg.tilt.clone());
        let stability = StabilityScorer::new(cfg.stability.clone());
        Self {
            cfg,
            centers: PoseCenters::default(),
            nod,
            shake,
            turn,
            tilt,
            stability,
            deviation: PoseAxes::default(),
        }
    }

    /// Ingest one valid head pose
    pub fn update(&mut self, pose: &HeadPose, t_ms: f64) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        match self.stability.update(pose) {
            Some(StabilityEdge::BecameStable) => events.push(SessionEvent::new(
                t_ms,
                EventKind::StillnessStable {
                    score: self.stability.score(),
                },
            )),
            Some(StabilityEdge::BecameUnstable) => events.push(SessionEvent::new(
                t_ms,
                EventKind::StillnessUnstable {
                    score: self.stability.score(),
                },
            )),
            None => {}
        }

        self.centers.update(pose, self.adaptation_alpha());
        self.deviation = self.centers.deviation(pose);

        if let Some(outcome) = self.nod.update(self.deviation.pitch, t_ms) {
            events.push(SessionEvent::new(
                t_ms,
                EventKind::Nod {
                    magnitude: outcome.magnitude,
                },
            ));
        }
        if let Some(outcome) = self.shake.update(self.deviation.yaw, t_ms) {
            events.push(SessionEvent::new(
                t_ms,
                EventKind::Shake {
                    magnitude: outcome.magnitude,
                },
            ));
        }

        if let Some(imp) = self.turn.update(pose.yaw, t_ms) {
            events.push(SessionEvent::new(
                t_ms,
                EventKind::Turn {
                    direction: lateral(imp.positive),
                    speed: imp.speed,
                },
            ));
        }
        if let Some(imp) = self.tilt.update(pose.roll, t_ms) {
            events.push(SessionEvent::new(
                t_ms,
                EventKind::Tilt {
                    direction: lateral(imp.positive),
                    speed: imp.speed,
                },
            ));
        }

        events
    }

    /// Context-dependent baseline adaptation rate
    fn adaptation_alpha(&self) -> f64 {
        if self.nod.in_progress() || self.shake.in_progress() {
            self.cfg.centers.alpha_gesture
        } else if self.stability.is_stable() {
            self.cfg.centers.alpha_stable
        } else {
            self.cfg.centers.alpha_unstable
        }
    }

    pub fn snapshot(&self) -> PoseSnapshot {
        // Per-axis drift carries the axis weights so its norm matches
        // the reported magnitude
        let pw = self.cfg.stability.position_weight.sqrt();
        let rw = self.cfg.stability.rotation_weight.sqrt();
        let drift = PoseAxes {
            yaw: self.deviation.yaw * rw,
            pitch: self.deviation.pitch * rw,
            roll: self.deviation.roll * rw,
            x: self.deviation.x * pw,
            y: self.deviation.y * pw,
        };
        PoseSnapshot {
            deviation: self.deviation,
            stability: self.stability.score(),
            stable: self.stability.is_stable(),
            drift_magnitude: weighted_drift(&self.deviation, &self.cfg.stability),
            drift,
            nod_count: self.nod.count(),
            shake_count: self.shake.count(),
        }
    }

    pub fn reset(&mut self) {
        self.centers.reset();
        self.nod.reset();
        self.shake.reset();
        self.turn.reset();
        self.tilt.reset();
        self.stability.reset();
        self.deviation = PoseAxes::default();
    }
}

fn lateral(positive: bool) -> LateralDirection {
    if positive {
        LateralDirection::Right
    } else {
        LateralDirection::Left
    }
}
