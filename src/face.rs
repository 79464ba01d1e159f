//! Eye, mouth, and tongue monitors
//!
//! Thin instances of the shared [`BinaryStateDetector`] engine, each
//! binding its thresholds and mapping the generic engage/release
//! transitions onto the events the script engine consumes. A missing
//! measurement skips the frame for that monitor with no state change.

use crate::binary::{BinaryStateDetector, BinaryTransition, Deflection};
use crate::config::{EyeConfig, MouthConfig, TongueConfig};
use crate::types::{EventKind, SessionEvent};

/// Eyes-open/closed monitor over the eye-aspect ratio
///
/// A confirmed closure emits `eyes:close`; reopening emits `eyes:open`,
/// plus `blink` when the closure was short enough to be a blink rather
/// than deliberately held-closed eyes.
#[derive(Debug, Clone)]
pub struct EyeMonitor {
    cfg: EyeConfig,
    detector: BinaryStateDetector,
}

impl EyeMonitor {
    pub fn new(cfg: EyeConfig) -> Self {
        let detector = BinaryStateDetector::new(Deflection::Below, cfg.detector.clone());
        Self { cfg, detector }
    }

    pub fn update(&mut self, ear: f64, t_ms: f64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        match self.detector.update(ear, t_ms) {
            Some(BinaryTransition::Engaged) => {
                events.push(SessionEvent::new(t_ms, EventKind::EyesClose));
            }
            Some(BinaryTransition::Released { active_ms }) => {
                events.push(SessionEvent::new(t_ms, EventKind::EyesOpen));
                if active_ms <= self.cfg.blink_max_ms {
                    events.push(SessionEvent::new(
                        t_ms,
                        EventKind::Blink {
                            closed_ms: active_ms,
                        },
                    ));
                }
            }
            None => {}
        }
        events
    }

    /// True while the eyes are judged open
    pub fn eyes_open(&self) -> bool {
        !self.detector.is_active()
    }

    pub fn baseline(&self) -> Option<f64> {
        self.detector.baseline()
    }

    pub fn reset(&mut self) {
        self.detector.reset();
    }
}

/// Mouth-open/closed monitor over the mouth openness ratio
#[derive(Debug, Clone)]
pub struct MouthMonitor {
    detector: BinaryStateDetector,
}

impl MouthMonitor {
    pub fn new(cfg: MouthConfig) -> Self {
        let detector = BinaryStateDetector::new(Deflection::Above, cfg.detector);
        Self { detector }
    }

    pub fn update(&mut self, openness: f64, t_ms: f64) -> Vec<SessionEvent> {
        match self.detector.update(openness, t_ms) {
            Some(BinaryTransition::Engaged) => {
                vec![SessionEvent::new(t_ms, EventKind::MouthOpen)]
            }
            Some(BinaryTransition::Released { .. }) => {
                vec![SessionEvent::new(t_ms, EventKind::MouthClose)]
            }
            None => Vec::new(),
        }
    }

    pub fn mouth_open(&self) -> bool {
        self.detector.is_active()
    }

    pub fn baseline(&self) -> Option<f64> {
        self.detector.baseline()
    }

    pub fn reset(&mut self) {
        self.detector.reset();
    }
}

/// Tongue-out monitor over the chin-to-lip distance ratio
///
/// Only the engage edge is interesting: `tongue:out` is a momentary
/// event, rate-limited by the detector's debounce window.
#[derive(Debug, Clone)]
pub struct TongueMonitor {
    detector: BinaryStateDetector,
}

impl TongueMonitor {
    pub fn new(cfg: TongueConfig) -> Self {
        let detector = BinaryStateDetector::new(Deflection::Above, cfg.detector);
        Self { detector }
    }

    pub fn update(&mut self, jaw_ratio: f64, t_ms: f64) -> Vec<SessionEvent> {
        match self.detector.update(jaw_ratio, t_ms) {
            Some(BinaryTransition::Engaged) => {
                vec![SessionEvent::new(t_ms, EventKind::TongueOut)]
            }
            _ => Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.detector.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blink_sequence(monitor: &mut EyeMonitor, closed_frames: usize) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let mut t = 0.0;
        // Settle open
        for _ in 0..20 {
            events.extend(monitor.update(0.30, t));
            t += 16.0;
        }
        for _ in 0..closed_frames {
            events.extend(monitor.update(0.05, t));
            t += 16.0;
        }
        for _ in 0..20 {
            events.extend(monitor.update(0.30, t));
            t += 16.0;
        }
        events
    }

    #[test]
    fn short_closure_emits_close_open_and_blink() {
        let mut m = EyeMonitor::new(EyeConfig::default());
        // ~190 ms closed: a blink
        let events = blink_sequence(&mut m, 12);
        let kinds: Vec<_> = events.iter().map(|e| &e.kind).collect();
        assert!(kinds.iter().any(|k| matches!(k, EventKind::EyesClose)));
        assert!(kinds.iter().any(|k| matches!(k, EventKind::EyesOpen)));
        assert!(kinds.iter().any(|k| matches!(k, EventKind::Blink { .. })));
    }

    #[test]
    fn long_closure_is_not_a_blink() {
        let mut m = EyeMonitor::new(EyeConfig::default());
        // ~1 s closed: deliberate eyes-closed, not a blink
        let events = blink_sequence(&mut m, 60);
        let kinds: Vec<_> = events.iter().map(|e| &e.kind).collect();
        assert!(kinds.iter().any(|k| matches!(k, EventKind::EyesClose)));
        assert!(kinds.iter().any(|k| matches!(k, EventKind::EyesOpen)));
        assert!(!kinds.iter().any(|k| matches!(k, EventKind::Blink { .. })));
    }

    #[test]
    fn camera_glitch_produces_no_eye_events() {
        let mut m = EyeMonitor::new(EyeConfig::default());
        // ~64 ms dropout: under the 100 ms confirmation window
        let events = blink_sequence(&mut m, 4);
        assert!(events.is_empty());
    }

    #[test]
    fn eyes_open_tracks_state() {
        let mut m = EyeMonitor::new(EyeConfig::default());
        assert!(m.eyes_open());
        blink_sequence(&mut m, 60);
        assert!(m.eyes_open());
    }

    #[test]
    fn mouth_open_and_close_pair() {
        let mut m = MouthMonitor::new(MouthConfig::default());
        let mut t = 0.0;
        let mut events = Vec::new();
        for _ in 0..20 {
            events.extend(m.update(0.03, t));
            t += 16.0;
        }
        for _ in 0..20 {
            events.extend(m.update(0.30, t));
            t += 16.0;
        }
        assert!(m.mouth_open());
        for _ in 0..20 {
            events.extend(m.update(0.03, t));
            t += 16.0;
        }
        let kinds: Vec<_> = events.iter().map(|e| &e.kind).collect();
        assert_eq!(
            kinds
                .iter()
                .filter(|k| matches!(k, EventKind::MouthOpen))
                .count(),
            1
        );
        assert_eq!(
            kinds
                .iter()
                .filter(|k| matches!(k, EventKind::MouthClose))
                .count(),
            1
        );
    }

    #[test]
    fn repeated_tongue_pokes_are_debounced() {
        let mut m = TongueMonitor::new(TongueConfig::default());
        let mut t = 0.0;
        for _ in 0..20 {
            m.update(0.02, t);
            t += 16.0;
        }
        let mut fired = 0;
        // Three fast pokes inside 300 ms, then one after a gap
        for (poke_t, rest_t) in [(400.0, 480.0), (520.0, 600.0), (640.0, 720.0), (1200.0, 1280.0)]
        {
            for f in 0..6 {
                fired += m.update(0.15, poke_t + f as f64 * 16.0).len();
            }
            for f in 0..2 {
                fired += m.update(0.02, rest_t + f as f64 * 16.0).len();
            }
        }
        assert_eq!(fired, 2);
    }
}
