//! Core types for the attune pipeline
//!
//! This module defines the data that flows through each stage: per-frame
//! measurements from the external landmark detector, the discrete events
//! handed to the session-script engine, and the continuous-signal
//! snapshot polled each frame.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Head measurements derived from one detector frame
///
/// Angles are radians (signed); x/y are normalized to frame dimensions;
/// scale is an inter-feature pixel distance used as a depth/zoom proxy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl HeadPose {
    /// A scale at or below this is a degenerate measurement; the frame is
    /// skipped for every head-derived detector.
    pub const MIN_SCALE: f64 = 1e-6;

    pub fn is_valid(&self) -> bool {
        self.scale > Self::MIN_SCALE
    }
}

/// One timestamped set of measurements from the external detector
///
/// Absent groups mean the landmark was not resolved this frame; the
/// affected detectors skip the frame with no state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    /// Monotonic frame clock in milliseconds
    pub t_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<HeadPose>,
    /// Eye-aspect ratio (vertical lid distance / horizontal corner distance)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye_openness: Option<f64>,
    /// Mouth openness ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mouth_openness: Option<f64>,
    /// Chin-to-lip distance ratio used by the tongue heuristic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jaw_openness: Option<f64>,
}

impl FrameSample {
    /// An empty sample at `t_ms` (every detector skips it)
    pub fn empty(t_ms: f64) -> Self {
        Self {
            t_ms,
            head: None,
            eye_openness: None,
            mouth_openness: None,
            jaw_openness: None,
        }
    }
}

/// Calibration state of a fused signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionPhase {
    /// Initial state, and the state whenever no channel is reliable enough
    Calibrating,
    /// At least one channel is carrying trustworthy signal
    Locked,
    /// The veto condition holds (e.g. the subject is speaking)
    Disturbed,
}

/// Candidate measurement channels fused into the breath signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreathChannel {
    Pitch,
    Height,
    Scale,
}

impl BreathChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreathChannel::Pitch => "pitch",
            BreathChannel::Height => "height",
            BreathChannel::Scale => "scale",
        }
    }
}

/// Lateral direction payload for turn/tilt events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateralDirection {
    Left,
    Right,
}

/// Discrete event kinds emitted to the session-script engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Blink { closed_ms: f64 },
    EyesOpen,
    EyesClose,
    MouthOpen,
    MouthClose,
    TongueOut,
    Nod { magnitude: f64 },
    Shake { magnitude: f64 },
    Turn { direction: LateralDirection, speed: f64 },
    Tilt { direction: LateralDirection, speed: f64 },
    StillnessStable { score: f64 },
    StillnessUnstable { score: f64 },
    BreathInhale,
    BreathExhale,
    BreathRateChange { bpm: f64 },
}

/// A discrete event stamped with the frame clock it was derived from
///
/// Events from frame N are always emitted before frame N+1 is processed
/// and are never reordered relative to the measurement sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub at_ms: f64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl SessionEvent {
    pub fn new(at_ms: f64, kind: EventKind) -> Self {
        Self { at_ms, kind }
    }
}

/// Continuous breath signals, polled each frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreathSnapshot {
    pub phase: FusionPhase,
    /// Compressed display signal in -1.5..1.5
    pub signal: f64,
    /// Uncompressed fused signal
    pub raw_fused: f64,
    /// Confidence 0-1 (max reliability among qualifying channels)
    pub confidence: f64,
    /// Highest-reliability channel, when locked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_channel: Option<BreathChannel>,
    /// Respiration rate in breaths per minute, once measured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_bpm: Option<f64>,
}

/// Per-axis scalar set for pose deviation and drift reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseAxes {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub x: f64,
    pub y: f64,
}

/// Continuous pose signals, polled each frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSnapshot {
    /// Deviation of the current pose from the adaptive centers
    pub deviation: PoseAxes,
    /// Smoothed stillness score 0-1
    pub stability: f64,
    pub stable: bool,
    /// Weighted distance of the current pose from baseline
    pub drift_magnitude: f64,
    /// Per-axis drift components, carrying the axis weights so their
    /// norm equals `drift_magnitude`
    pub drift: PoseAxes,
    pub nod_count: u32,
    pub shake_count: u32,
}

/// Open/closed state of the binary detectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceSnapshot {
    pub eyes_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye_baseline: Option<f64>,
    pub mouth_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mouth_baseline: Option<f64>,
}

/// Full continuous-signal snapshot for one analyzer instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerSnapshot {
    /// Unique analyzer instance id for provenance
    pub instance_id: String,
    /// Wall-clock session start
    pub started_at: DateTime<Utc>,
    pub frame_count: u64,
    pub breath: BreathSnapshot,
    pub pose: PoseSnapshot,
    pub face: FaceSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_serializes_with_snake_case_tag() {
        let event = SessionEvent::new(
            1234.0,
            EventKind::Turn {
                direction: LateralDirection::Left,
                speed: 0.01,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"turn\""));
        assert!(json.contains("\"direction\":\"left\""));
        assert!(json.contains("\"at_ms\":1234.0"));

        let parsed: SessionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn unit_event_round_trips() {
        let event = SessionEvent::new(10.0, EventKind::BreathInhale);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"breath_inhale\""));
        let parsed: SessionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn frame_sample_deserializes_with_missing_groups() {
        let json = r#"{"t_ms": 16.7, "eye_openness": 0.31}"#;
        let frame: FrameSample = serde_json::from_str(json).unwrap();
        assert!(frame.head.is_none());
        assert_eq!(frame.eye_openness, Some(0.31));
        assert!(frame.mouth_openness.is_none());
    }

    #[test]
    fn degenerate_scale_is_invalid() {
        let pose = HeadPose {
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            x: 0.5,
            y: 0.5,
            scale: 0.0,
        };
        assert!(!pose.is_valid());
    }

    #[test]
    fn fusion_phase_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&FusionPhase::Calibrating).unwrap(),
            "\"calibrating\""
        );
    }
}
