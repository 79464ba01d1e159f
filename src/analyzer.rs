//! Session orchestration
//!
//! One [`SessionAnalyzer`] per tracked subject and session. Each external
//! frame tick hands in one [`FrameSample`]; every active detector runs to
//! completion before the call returns, so events derived from frame N are
//! always emitted before frame N+1 is processed and never reordered
//! relative to the measurement sequence. The analyzer is single-threaded
//! by construction: it owns all detector state exclusively and nothing
//! here blocks or suspends.

use crate::breath::BreathMonitor;
use crate::config::AnalyzerConfig;
use crate::face::{EyeMonitor, MouthMonitor, TongueMonitor};
use crate::pose::PoseMonitor;
use crate::types::{AnalyzerSnapshot, FaceSnapshot, FrameSample, SessionEvent};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Full fusion-and-calibration pipeline for one subject
pub struct SessionAnalyzer {
    cfg: AnalyzerConfig,
    instance_id: String,
    started_at: DateTime<Utc>,
    frame_count: u64,
    breath: BreathMonitor,
    pose: PoseMonitor,
    eyes: EyeMonitor,
    mouth: MouthMonitor,
    tongue: TongueMonitor,
}

impl Default for SessionAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl SessionAnalyzer {
    pub fn new(cfg: AnalyzerConfig) -> Self {
        Self {
            breath: BreathMonitor::new(cfg.breath.clone()),
            pose: PoseMonitor::new(cfg.pose.clone()),
            eyes: EyeMonitor::new(cfg.eyes.clone()),
            mouth: MouthMonitor::new(cfg.mouth.clone()),
            tongue: TongueMonitor::new(cfg.tongue.clone()),
            cfg,
            instance_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            frame_count: 0,
        }
    }

    /// Process one frame and return the events it produced
    ///
    /// Detectors whose measurements are absent (or degenerate, e.g. a
    /// zero scale) skip the frame with no state mutation.
    pub fn update(&mut self, frame: &FrameSample) -> Vec<SessionEvent> {
        self.frame_count += 1;
        let mut events = Vec::new();

        let head = frame.head.filter(|pose| pose.is_valid());

        if let Some(pose) = &head {
            events.extend(self.pose.update(pose, frame.t_ms));
        }
        events.extend(
            self.breath
                .update(head.as_ref(), frame.mouth_openness, frame.t_ms),
        );
        if let Some(ear) = frame.eye_openness {
            events.extend(self.eyes.update(ear, frame.t_ms));
        }
        if let Some(openness) = frame.mouth_openness {
            events.extend(self.mouth.update(openness, frame.t_ms));
        }
        if let Some(jaw) = frame.jaw_openness {
            events.extend(self.tongue.update(jaw, frame.t_ms));
        }

        events
    }

    /// Continuous signals as of the last processed frame
    pub fn snapshot(&self) -> AnalyzerSnapshot {
        AnalyzerSnapshot {
            instance_id: self.instance_id.clone(),
            started_at: self.started_at,
            frame_count: self.frame_count,
            breath: self.breath.snapshot(),
            pose: self.pose.snapshot(),
            face: FaceSnapshot {
                eyes_open: self.eyes.eyes_open(),
                eye_baseline: self.eyes.baseline(),
                mouth_open: self.mouth.mouth_open(),
                mouth_baseline: self.mouth.baseline(),
            },
        }
    }

    /// Analyzer configuration in effect
    pub fn config(&self) -> &AnalyzerConfig {
        &self.cfg
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Clear every rolling window, baseline, and state machine
    ///
    /// A reset analyzer resumes exactly as if newly constructed; only the
    /// instance id and configuration survive.
    pub fn reset(&mut self) {
        self.breath.reset();
        self.pose.reset();
        self.eyes.reset();
        self.mouth.reset();
        self.tongue.reset();
        self.frame_count = 0;
        self.started_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventKind, FusionPhase, HeadPose};
    use pretty_assertions::assert_eq;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    fn resting_frame(t_ms: f64) -> FrameSample {
        FrameSample {
            t_ms,
            head: Some(HeadPose {
                yaw: 0.001,
                pitch: 0.001,
                roll: 0.001,
                x: 0.5,
                y: 0.5,
                scale: 120.0,
            }),
            eye_openness: Some(0.30),
            mouth_openness: Some(0.03),
            jaw_openness: Some(0.02),
        }
    }

    fn breathing_frame(t_ms: f64) -> FrameSample {
        let mut frame = resting_frame(t_ms);
        if let Some(head) = &mut frame.head {
            head.pitch = 0.003 * (2.0 * std::f64::consts::PI * t_ms / 4000.0).sin();
        }
        frame
    }

    #[test]
    fn quiet_session_emits_no_events() {
        let mut analyzer = SessionAnalyzer::default();
        let mut t = 0.0;
        let mut events = Vec::new();
        for _ in 0..600 {
            events.extend(analyzer.update(&resting_frame(t)));
            t += FRAME_MS;
        }
        assert_eq!(events, Vec::new());
        let snap = analyzer.snapshot();
        assert_eq!(snap.frame_count, 600);
        assert!(snap.pose.stable);
        assert!(snap.face.eyes_open);
        assert!(!snap.face.mouth_open);
    }

    #[test]
    fn breathing_session_locks_and_emits_cycles() {
        let mut analyzer = SessionAnalyzer::default();
        let mut t = 0.0;
        let mut events = Vec::new();
        while t < 40_000.0 {
            events.extend(analyzer.update(&breathing_frame(t)));
            t += FRAME_MS;
        }
        let snap = analyzer.snapshot();
        assert_eq!(snap.breath.phase, FusionPhase::Locked);
        let bpm = snap.breath.rate_bpm.expect("respiration rate");
        assert!((bpm - 15.0).abs() < 2.0);
        assert!(events
            .iter()
            .any(|e| matches!(e.kind, EventKind::BreathInhale)));
    }

    #[test]
    fn speaking_suppresses_breath_but_mouth_events_still_fire() {
        let mut analyzer = SessionAnalyzer::default();
        let mut t = 0.0;
        // Settle with a closed mouth first so the baseline is honest
        for _ in 0..120 {
            analyzer.update(&resting_frame(t));
            t += FRAME_MS;
        }
        let mut events = Vec::new();
        while t < 30_000.0 {
            let mut frame = breathing_frame(t);
            frame.mouth_openness = Some(0.30);
            events.extend(analyzer.update(&frame));
            t += FRAME_MS;
        }
        assert_eq!(analyzer.snapshot().breath.phase, FusionPhase::Disturbed);
        assert!(!events
            .iter()
            .any(|e| matches!(e.kind, EventKind::BreathInhale)));
        assert!(events
            .iter()
            .any(|e| matches!(e.kind, EventKind::MouthOpen)));
    }

    #[test]
    fn shake_scenario_matches_expected_cadence() {
        let mut analyzer = SessionAnalyzer::default();
        let mut t = 0.0;
        for _ in 0..200 {
            analyzer.update(&resting_frame(t));
            t += FRAME_MS;
        }
        let start = t;
        let mut shakes = 0;
        while t - start < 20_000.0 {
            let mut frame = resting_frame(t);
            let phase = ((t - start) / 600.0) as u64;
            if let Some(head) = &mut frame.head {
                head.yaw = if phase % 2 == 0 { 0.021 } else { -0.019 };
            }
            for e in analyzer.update(&frame) {
                if matches!(e.kind, EventKind::Shake { .. }) {
                    shakes += 1;
                }
            }
            t += FRAME_MS;
        }
        assert_eq!(shakes, 20_000 / 1200);
        assert_eq!(analyzer.snapshot().pose.shake_count, 16);
    }

    #[test]
    fn empty_frames_mutate_nothing_but_the_frame_count() {
        let mut analyzer = SessionAnalyzer::default();
        let mut t = 0.0;
        for _ in 0..200 {
            analyzer.update(&resting_frame(t));
            t += FRAME_MS;
        }
        let before = analyzer.snapshot();

        let events = analyzer.update(&FrameSample::empty(t));
        assert!(events.is_empty());
        let after = analyzer.snapshot();
        assert_eq!(after.pose, before.pose);
        assert_eq!(after.face, before.face);
        assert_eq!(after.frame_count, before.frame_count + 1);
    }

    #[test]
    fn degenerate_scale_skips_head_detectors() {
        let mut analyzer = SessionAnalyzer::default();
        let mut t = 0.0;
        for _ in 0..200 {
            analyzer.update(&resting_frame(t));
            t += FRAME_MS;
        }
        let before = analyzer.snapshot();

        let mut frame = resting_frame(t);
        if let Some(head) = &mut frame.head {
            head.scale = 0.0;
            head.yaw = 5.0;
        }
        let events = analyzer.update(&frame);
        assert!(events.is_empty());
        assert_eq!(analyzer.snapshot().pose, before.pose);
    }

    #[test]
    fn reset_resumes_as_newly_constructed() {
        let mut analyzer = SessionAnalyzer::default();
        let mut t = 0.0;
        while t < 30_000.0 {
            analyzer.update(&breathing_frame(t));
            t += FRAME_MS;
        }
        let id = analyzer.instance_id().to_string();
        analyzer.reset();

        let snap = analyzer.snapshot();
        assert_eq!(snap.frame_count, 0);
        assert_eq!(snap.breath.phase, FusionPhase::Calibrating);
        assert!(snap.breath.rate_bpm.is_none());
        assert!(snap.face.eye_baseline.is_none());
        assert_eq!(analyzer.instance_id(), id);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut analyzer = SessionAnalyzer::default();
        analyzer.update(&resting_frame(0.0));
        let json = serde_json::to_string(&analyzer.snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"calibrating\""));
        assert!(json.contains("\"frame_count\":1"));
    }
}
