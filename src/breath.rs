//! Breath signal extraction
//!
//! Fuses the three head-derived candidate channels (pitch, vertical
//! position, scale proxy) into one normalized breath signal and measures
//! the respiration rate from it. Mouth openness acts as a hard veto:
//! while the subject is speaking the channels keep learning but nothing
//! they say is trusted, and the fused signal bleeds back to zero.

use crate::channel::ChannelSupervisor;
use crate::config::BreathConfig;
use crate::fusion::ConsensusFusion;
use crate::rhythm::{CycleEdge, PeriodicityDetector};
use crate::types::{BreathChannel, BreathSnapshot, EventKind, FusionPhase, HeadPose, SessionEvent};

/// Channel order inside the fusion
const CHANNELS: [BreathChannel; 3] = [
    BreathChannel::Pitch,
    BreathChannel::Height,
    BreathChannel::Scale,
];

/// Breath fusion, cycle detection, and event emission for one subject
#[derive(Debug, Clone)]
pub struct BreathMonitor {
    cfg: BreathConfig,
    fusion: ConsensusFusion,
    rhythm: PeriodicityDetector,
    last_reported_bpm: Option<f64>,
    snapshot: BreathSnapshot,
}

impl BreathMonitor {
    pub fn new(cfg: BreathConfig) -> Self {
        let supervisors = vec![
            ChannelSupervisor::new(cfg.pitch_channel.clone()),
            ChannelSupervisor::new(cfg.height_channel.clone()),
            ChannelSupervisor::new(cfg.scale_channel.clone()),
        ];
        let fusion = ConsensusFusion::new(cfg.fusion.clone(), supervisors);
        let rhythm = PeriodicityDetector::new(cfg.rhythm.clone());
        Self {
            cfg,
            fusion,
            rhythm,
            last_reported_bpm: None,
            snapshot: initial_snapshot(),
        }
    }

    /// Ingest one frame
    ///
    /// `head` carries the candidate channels; `mouth_openness` drives the
    /// speech veto. A missing mouth measurement means no veto judgment
    /// can be made and is treated as not vetoed.
    pub fn update(
        &mut self,
        head: Option<&HeadPose>,
        mouth_openness: Option<f64>,
        t_ms: f64,
    ) -> Vec<SessionEvent> {
        let raw: [Option<f64>; 3] = match head {
            Some(pose) => [Some(pose.pitch), Some(pose.y), Some(pose.scale)],
            None => [None, None, None],
        };
        let veto = mouth_openness.is_some_and(|m| m > self.cfg.veto_threshold);

        let frame = self.fusion.update(&raw, veto);

        let mut events = Vec::new();
        // The period detector only runs while the fusion is locked; in
        // any other phase the trigger holds its state
        if frame.phase == FusionPhase::Locked {
            match self.rhythm.update(frame.display, t_ms) {
                Some(CycleEdge::Rise) => {
                    events.push(SessionEvent::new(t_ms, EventKind::BreathInhale));
                    if let Some(event) = self.rate_change_event(t_ms) {
                        events.push(event);
                    }
                }
                Some(CycleEdge::Fall) => {
                    events.push(SessionEvent::new(t_ms, EventKind::BreathExhale));
                }
                None => {}
            }
        }

        self.snapshot = BreathSnapshot {
            phase: frame.phase,
            signal: frame.display,
            raw_fused: frame.fused,
            confidence: frame.confidence,
            active_channel: frame.active.map(channel_from_index),
            rate_bpm: self.rhythm.rate_per_minute(),
        };
        events
    }

    /// Emit a rate-change event when the rolling BPM moved enough
    fn rate_change_event(&mut self, t_ms: f64) -> Option<SessionEvent> {
        let bpm = self.rhythm.rate_per_minute()?;
        let moved = self
            .last_reported_bpm
            .map_or(true, |last| (bpm - last).abs() >= self.cfg.rate_change_min_bpm);
        if !moved {
            return None;
        }
        self.last_reported_bpm = Some(bpm);
        Some(SessionEvent::new(t_ms, EventKind::BreathRateChange { bpm }))
    }

    pub fn snapshot(&self) -> BreathSnapshot {
        self.snapshot.clone()
    }

    pub fn phase(&self) -> FusionPhase {
        self.snapshot.phase
    }

    pub fn rate_bpm(&self) -> Option<f64> {
        self.rhythm.rate_per_minute()
    }

    pub fn reset(&mut self) {
        self.fusion.reset();
        self.rhythm.reset();
        self.last_reported_bpm = None;
        self.snapshot = initial_snapshot();
    }
}

fn initial_snapshot() -> BreathSnapshot {
    BreathSnapshot {
        phase: FusionPhase::Calibrating,
        signal: 0.0,
        raw_fused: 0.0,
        confidence: 0.0,
        active_channel: None,
        rate_bpm: None,
    }
}

fn channel_from_index(index: usize) -> BreathChannel {
    CHANNELS[index.min(CHANNELS.len() - 1)]
}
