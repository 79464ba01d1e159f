//! attune-core - On-device fusion and calibration engine for biofeedback
//!
//! Turns noisy per-frame face/pose measurements from an external landmark
//! detector into reliable discrete events (blink, nod, shake, eyes
//! closed, mouth open, tongue out) and continuous signals (breath phase
//! and rate, stillness, drift) through a deterministic per-frame
//! pipeline: channel supervision → consensus fusion → period detection,
//! and adaptive baselines → latch state machines → debounced events.
//!
//! One [`SessionAnalyzer`] instance serves one subject and session; the
//! camera pipeline, the landmark model, audio, and the session-script
//! engine that consumes the events all live outside this crate.

pub mod analyzer;
pub mod binary;
pub mod breath;
pub mod center;
pub mod channel;
pub mod config;
pub mod error;
pub mod face;
pub mod fusion;
pub mod pose;
pub mod rhythm;
pub mod stats;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use analyzer::SessionAnalyzer;
pub use config::AnalyzerConfig;
pub use error::CoreError;
pub use types::{
    AnalyzerSnapshot, EventKind, FrameSample, FusionPhase, HeadPose, SessionEvent,
};

/// Engine version embedded in CLI and FFI output
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for provenance
pub const PRODUCER_NAME: &str = "attune-core";
