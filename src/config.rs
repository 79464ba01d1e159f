//! Detector configuration
//!
//! Every threshold, window size, and adaptation rate in the engine lives
//! here as a named, overridable default. The values are hand-tuned against
//! real tracking sessions; none of them is derived from first principles,
//! so they are preserved as documented defaults rather than recomputed.
//!
//! All structs deserialize with per-field defaults, so a partial JSON
//! override file only needs to name the fields it changes.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Per-channel supervision parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Long statistics window in samples (~5 s at 60 fps)
    pub long_window: usize,
    /// Short noise-estimation window in samples (~0.5 s at 60 fps)
    pub short_window: usize,
    /// Long-window std dev below which the channel is considered flat
    pub dead_zone: f64,
    /// Short/long std dev ratio above which jitter dominates
    pub noise_ratio_max: f64,
    /// Per-frame reliability rise/decay step
    pub reliability_step: f64,
    /// Sign flip so every channel increases on inhale (+1.0 or -1.0)
    pub polarity: f64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            long_window: 300,
            short_window: 30,
            dead_zone: 1e-4,
            noise_ratio_max: 0.6,
            reliability_step: 0.05,
            polarity: 1.0,
        }
    }
}

/// Consensus fusion parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Minimum reliability for a channel to join the consensus
    pub reliability_gate: f64,
    /// Smoothing toward zero while the veto holds
    pub veto_smoothing: f64,
    /// Smoothing toward zero while no channel qualifies
    pub calibrating_smoothing: f64,
    /// Low-pass factor applied to the fused signal while locked
    pub locked_smoothing: f64,
    /// Maximum per-frame change of the pre-smoothing target
    pub slew_limit: f64,
    /// Divisor applied to the fused signal for display
    pub display_compression: f64,
    /// Absolute clamp on the compressed display signal
    pub display_clamp: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            reliability_gate: 0.3,
            veto_smoothing: 0.1,
            calibrating_smoothing: 0.05,
            locked_smoothing: 0.1,
            slew_limit: 0.5,
            display_compression: 1.5,
            display_clamp: 1.5,
        }
    }
}

/// Schmitt-trigger period measurement parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmConfig {
    /// Upper trigger threshold on the compressed signal
    pub upper_threshold: f64,
    /// Lower trigger threshold on the compressed signal
    pub lower_threshold: f64,
    /// Shortest accepted cycle period (40 cycles/minute)
    pub min_period_ms: f64,
    /// Longest accepted cycle period (6 cycles/minute)
    pub max_period_ms: f64,
    /// Number of accepted periods averaged into the rate
    pub period_slots: usize,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            upper_threshold: 0.2,
            lower_threshold: -0.2,
            min_period_ms: 1500.0,
            max_period_ms: 10_000.0,
            period_slots: 5,
        }
    }
}

/// Breath monitor parameters: three supervised channels plus a veto
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreathConfig {
    /// Head pitch channel (rotation rises and falls with the breath cycle)
    pub pitch_channel: ChannelConfig,
    /// Vertical head position channel
    pub height_channel: ChannelConfig,
    /// Inter-feature scale proxy channel
    pub scale_channel: ChannelConfig,
    pub fusion: FusionConfig,
    pub rhythm: RhythmConfig,
    /// Mouth openness above this suppresses breath tracking (speech veto)
    pub veto_threshold: f64,
    /// Minimum BPM movement before a rate-change event is emitted
    pub rate_change_min_bpm: f64,
}

impl Default for BreathConfig {
    fn default() -> Self {
        Self {
            // Pitch and height fall on inhale in image coordinates
            pitch_channel: ChannelConfig {
                polarity: -1.0,
                ..ChannelConfig::default()
            },
            height_channel: ChannelConfig {
                polarity: -1.0,
                dead_zone: 5e-5,
                ..ChannelConfig::default()
            },
            scale_channel: ChannelConfig {
                polarity: 1.0,
                dead_zone: 1e-2,
                ..ChannelConfig::default()
            },
            fusion: FusionConfig::default(),
            rhythm: RhythmConfig::default(),
            veto_threshold: 0.15,
            rate_change_min_bpm: 0.5,
        }
    }
}

/// Baseline adaptation rates, conditioned on the subject's current state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterConfig {
    /// Re-centering rate while the subject is judged stable
    pub alpha_stable: f64,
    /// Rate while the subject is moving
    pub alpha_unstable: f64,
    /// Rate while a gesture latch is mid-flight
    pub alpha_gesture: f64,
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            alpha_stable: 0.05,
            alpha_unstable: 0.01,
            alpha_gesture: 0.001,
        }
    }
}

/// Latch thresholds for one gesture axis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureAxisConfig {
    /// Deviation beyond which a positive excursion latches
    pub positive_threshold: f64,
    /// Deviation beyond which a negative excursion latches (negative value)
    pub negative_threshold: f64,
    /// Fraction of the latch threshold used as the re-arm band
    pub release_fraction: f64,
    /// Idle time after which a half-finished sweep is abandoned
    pub sweep_timeout_ms: f64,
}

impl Default for GestureAxisConfig {
    fn default() -> Self {
        Self {
            positive_threshold: 0.015,
            negative_threshold: -0.015,
            release_fraction: 0.5,
            sweep_timeout_ms: 1000.0,
        }
    }
}

/// Momentary impulse (turn/tilt) parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpulseConfig {
    /// Smoothing applied to the per-frame velocity
    pub velocity_smoothing: f64,
    /// Smoothed velocity magnitude required to fire
    pub dead_zone: f64,
    /// Minimum gap between successive impulses
    pub debounce_ms: f64,
}

impl Default for ImpulseConfig {
    fn default() -> Self {
        Self {
            velocity_smoothing: 0.3,
            dead_zone: 0.004,
            debounce_ms: 300.0,
        }
    }
}

/// Stillness scoring parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Weight on positional deltas in the velocity norm
    pub position_weight: f64,
    /// Weight on rotational deltas in the velocity norm
    pub rotation_weight: f64,
    /// Velocity-to-instability scale
    pub velocity_scale: f64,
    /// Low-pass factor on the stability score
    pub smoothing: f64,
    /// Stable state ends below this score
    pub unstable_below: f64,
    /// Stable state resumes above this score
    pub stable_above: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            position_weight: 4.0,
            rotation_weight: 1.0,
            velocity_scale: 40.0,
            smoothing: 0.1,
            unstable_below: 0.4,
            stable_above: 0.5,
        }
    }
}

/// Head pose monitor parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    pub centers: CenterConfig,
    /// Pitch latch (nod): down-threshold and up-threshold are asymmetric
    /// because resting pitch is not perfectly centered
    pub nod: GestureAxisConfig,
    /// Yaw latch (shake)
    pub shake: GestureAxisConfig,
    /// Yaw velocity impulse (turn)
    pub turn: ImpulseConfig,
    /// Roll velocity impulse (tilt)
    pub tilt: ImpulseConfig,
    pub stability: StabilityConfig,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            centers: CenterConfig::default(),
            nod: GestureAxisConfig {
                positive_threshold: 0.012,
                negative_threshold: -0.010,
                ..GestureAxisConfig::default()
            },
            shake: GestureAxisConfig::default(),
            turn: ImpulseConfig::default(),
            tilt: ImpulseConfig {
                dead_zone: 0.005,
                ..ImpulseConfig::default()
            },
            stability: StabilityConfig::default(),
        }
    }
}

/// Generic adaptive open/closed detector parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryConfig {
    /// Deviation from baseline at which the active state begins
    pub engage_threshold: f64,
    /// Deviation below which the active state ends (release < engage, so
    /// the return to neutral is detected more eagerly than the departure)
    pub release_threshold: f64,
    /// Sustained deviation required before the engage is confirmed
    pub min_hold_ms: f64,
    /// Minimum gap between successive engage events
    pub debounce_ms: f64,
    /// Baseline adaptation rate while at rest
    pub baseline_alpha: f64,
    /// Baseline adapts only while |deviation| is inside this band
    pub resting_band: f64,
    /// When set, baseline only adapts away from the active direction
    pub adapt_toward_rest_only: bool,
    /// Baseline is kept at least this far from the tracked active level
    pub floor_margin: Option<f64>,
    /// Smoothing on the tracked active (e.g. closed-eye) level
    pub active_level_alpha: f64,
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            engage_threshold: 0.12,
            release_threshold: 0.08,
            min_hold_ms: 100.0,
            debounce_ms: 0.0,
            baseline_alpha: 0.02,
            resting_band: 0.05,
            adapt_toward_rest_only: false,
            floor_margin: None,
            active_level_alpha: 0.1,
        }
    }
}

/// Eye monitor parameters (EAR input)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeConfig {
    pub detector: BinaryConfig,
    /// Closures longer than this are eyes-closed, not blinks
    pub blink_max_ms: f64,
}

impl Default for EyeConfig {
    fn default() -> Self {
        Self {
            detector: BinaryConfig {
                engage_threshold: 0.12,
                release_threshold: 0.08,
                min_hold_ms: 100.0,
                floor_margin: Some(0.05),
                ..BinaryConfig::default()
            },
            blink_max_ms: 500.0,
        }
    }
}

/// Mouth monitor parameters (openness ratio input)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MouthConfig {
    pub detector: BinaryConfig,
}

impl Default for MouthConfig {
    fn default() -> Self {
        Self {
            detector: BinaryConfig {
                engage_threshold: 0.12,
                release_threshold: 0.08,
                min_hold_ms: 80.0,
                resting_band: 0.04,
                adapt_toward_rest_only: true,
                ..BinaryConfig::default()
            },
        }
    }
}

/// Tongue monitor parameters (chin-to-lip ratio input)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TongueConfig {
    pub detector: BinaryConfig,
}

impl Default for TongueConfig {
    fn default() -> Self {
        Self {
            detector: BinaryConfig {
                engage_threshold: 0.08,
                release_threshold: 0.05,
                min_hold_ms: 60.0,
                debounce_ms: 300.0,
                resting_band: 0.03,
                ..BinaryConfig::default()
            },
        }
    }
}

/// Complete configuration for one analyzer instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub breath: BreathConfig,
    pub pose: PoseConfig,
    pub eyes: EyeConfig,
    pub mouth: MouthConfig,
    pub tongue: TongueConfig,
}

impl AnalyzerConfig {
    /// Load a configuration from JSON, filling omitted fields with defaults
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations that would make detectors degenerate
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.breath.rhythm.min_period_ms >= self.breath.rhythm.max_period_ms {
            return Err(CoreError::InvalidConfig(
                "rhythm min_period_ms must be below max_period_ms".to_string(),
            ));
        }
        if self.breath.rhythm.upper_threshold <= self.breath.rhythm.lower_threshold {
            return Err(CoreError::InvalidConfig(
                "rhythm upper_threshold must be above lower_threshold".to_string(),
            ));
        }
        if self.pose.stability.stable_above < self.pose.stability.unstable_below {
            return Err(CoreError::InvalidConfig(
                "stability stable_above must not be below unstable_below".to_string(),
            ));
        }
        for (name, det) in [
            ("eyes", &self.eyes.detector),
            ("mouth", &self.mouth.detector),
            ("tongue", &self.tongue.detector),
        ] {
            if det.release_threshold >= det.engage_threshold {
                return Err(CoreError::InvalidConfig(format!(
                    "{name} release_threshold must be below engage_threshold"
                )));
            }
        }
        Ok(())
    }
}
