//! # focusplan core
//!
//! Adaptive planning of focus-session goals. Given a user's session
//! history, the planner decides how long the next session should be and
//! whether it is a stretch ("push") or a consolidation session.
//!
//! ## Architecture
//!
//! - **Engines** ([`engine`]): pure functions for metrics, the smoothed
//!   floor, time-bucket blending, wave scheduling and goal math
//! - **Planner** ([`planner`]): the BOOT → LINEAR → WAVE state machine,
//!   persisted through a [`StateStore`]
//! - **Storage** ([`storage`]): TOML configuration, JSON state store and
//!   JSON-lines session history
//! - **Simulation** ([`simulation`]): seeded user model driving the full loop
//!
//! The engines never perform I/O. History reads and state writes go through
//! the storage types so callers can swap them out.

pub mod engine;
pub mod error;
pub mod planner;
pub mod session;
pub mod simulation;
pub mod storage;

pub use engine::blend::{compute_blended_metrics, BlendedMetrics};
pub use engine::wave::{is_push_success, Momentum, MomentumLevel, PUSH_SUCCESS_FRACTION};
pub use error::{ConfigError, CoreError, HistoryError, Result, StateError};
pub use planner::{Plan, PlanContext, PlanMode, Planner, PlannerState};
pub use session::{
    BlockType, Intensity, Phase, SessionOutcome, SessionRecord, StopReason, TimeBucket,
};
pub use simulation::{run_simulation, SimulationProfile, SimulationReport, SimulationSummary};
pub use storage::{
    FileStateStore, HistoryFile, MemoryStateStore, PlannerConfig, StateStore, TrainingStrategy,
    WaveVisibility,
};
