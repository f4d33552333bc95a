//! Session records and the small enums shared by every engine.
//!
//! A [`SessionRecord`] is written once by the caller when a focus session
//! ends and is never mutated afterwards. The engines only read it, and they
//! tolerate missing or non-finite durations by skipping the record in
//! percentile math rather than rejecting it.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::blend::BlendedMetrics;
use crate::engine::wave::{is_push_success, Momentum};
use crate::planner::Plan;

/// Training phase of the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Progressive goal raising.
    #[default]
    Linear,
    /// Cyclic push/consolidate scheduling.
    Wave,
}

/// Kind of session the planner asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    #[default]
    Consolidate,
    Push,
}

impl BlockType {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            BlockType::Consolidate => "C",
            BlockType::Push => "P",
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    Completed,
    Distracted,
    Tired,
    Interrupted,
    Other,
}

impl std::str::FromStr for StopReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "completed" => Ok(StopReason::Completed),
            "distracted" => Ok(StopReason::Distracted),
            "tired" => Ok(StopReason::Tired),
            "interrupted" => Ok(StopReason::Interrupted),
            "other" => Ok(StopReason::Other),
            _ => Err(format!("unknown stop reason: {s}")),
        }
    }
}

/// Coarse time-of-day grouping used for bucket-specific statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum TimeBucket {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeBucket {
    /// Bucket for a local hour of day (0-23).
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeBucket::Morning,
            12..=16 => TimeBucket::Afternoon,
            17..=21 => TimeBucket::Evening,
            _ => TimeBucket::Night,
        }
    }

    pub fn for_time<Tz: chrono::TimeZone>(at: &DateTime<Tz>) -> Self {
        Self::from_hour(at.hour())
    }
}

impl std::str::FromStr for TimeBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "morning" => Ok(TimeBucket::Morning),
            "afternoon" => Ok(TimeBucket::Afternoon),
            "evening" => Ok(TimeBucket::Evening),
            "night" => Ok(TimeBucket::Night),
            _ => Err(format!("unknown time bucket: {s}")),
        }
    }
}

/// Where inside a target band the goal is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Intensity {
    Easy,
    #[default]
    Balanced,
    Hard,
}

impl Intensity {
    /// Fractional position inside the band.
    pub fn band_position(&self) -> f64 {
        match self {
            Intensity::Easy => 0.35,
            Intensity::Balanced => 0.50,
            Intensity::Hard => 0.65,
        }
    }
}

impl std::str::FromStr for Intensity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Intensity::Easy),
            "balanced" => Ok(Intensity::Balanced),
            "hard" => Ok(Intensity::Hard),
            _ => Err(format!("unknown intensity: {s}")),
        }
    }
}

/// Global, bucket and effective values of one metric at session time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricSnapshot {
    #[serde(default)]
    pub global: Option<u32>,
    #[serde(default)]
    pub bucket: Option<u32>,
    #[serde(default)]
    pub effective: Option<u32>,
}

/// One completed (or recovered) focus session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Seconds actually focused. `None` or non-finite marks a malformed record.
    #[serde(default)]
    pub focus_seconds: Option<f64>,
    #[serde(default)]
    pub goal_seconds: Option<f64>,
    #[serde(default)]
    pub floor: MetricSnapshot,
    #[serde(default)]
    pub median: MetricSnapshot,
    #[serde(default)]
    pub ceiling: MetricSnapshot,
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub crash: bool,
    #[serde(default)]
    pub overshoot: bool,
    #[serde(default)]
    pub win: bool,
    #[serde(default)]
    pub push_hit: bool,
    #[serde(default)]
    pub crash_threshold_seconds: Option<u32>,
    #[serde(default)]
    pub phase: Option<Phase>,
    #[serde(default)]
    pub block_type: Option<BlockType>,
    #[serde(default)]
    pub target_low_seconds: Option<u32>,
    #[serde(default)]
    pub target_high_seconds: Option<u32>,
    #[serde(default)]
    pub push_target_seconds: Option<u32>,
    #[serde(default)]
    pub cycle_id: u32,
    #[serde(default)]
    pub cycle_pos: u32,
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub bucket: Option<TimeBucket>,
    /// Sessions already completed on the same day before this one.
    #[serde(default)]
    pub blocks_today: u32,
    #[serde(default = "default_fatigue_factor")]
    pub fatigue_factor: f64,
    #[serde(default)]
    pub momentum: Option<Momentum>,
}

fn default_fatigue_factor() -> f64 {
    1.0
}

impl SessionRecord {
    /// Minimal record with a focus duration and optional goal.
    pub fn new(focus_seconds: f64, goal_seconds: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            focus_seconds: Some(focus_seconds),
            goal_seconds,
            floor: MetricSnapshot::default(),
            median: MetricSnapshot::default(),
            ceiling: MetricSnapshot::default(),
            valid: true,
            crash: false,
            overshoot: false,
            win: goal_seconds.is_some_and(|g| focus_seconds >= g),
            push_hit: false,
            crash_threshold_seconds: None,
            phase: None,
            block_type: None,
            target_low_seconds: None,
            target_high_seconds: None,
            push_target_seconds: None,
            cycle_id: 0,
            cycle_pos: 0,
            stop_reason: None,
            timestamp,
            bucket: Some(TimeBucket::for_time(&timestamp)),
            blocks_today: 0,
            fatigue_factor: 1.0,
            momentum: None,
        }
    }

    pub fn with_stop_reason(mut self, reason: StopReason) -> Self {
        self.stop_reason = Some(reason);
        self
    }

    pub fn with_crash(mut self, crash: bool, threshold: Option<u32>) -> Self {
        self.crash = crash;
        self.crash_threshold_seconds = threshold;
        self
    }

    pub fn with_push(mut self, push_target: u32) -> Self {
        self.block_type = Some(BlockType::Push);
        self.push_target_seconds = Some(push_target);
        if let Some(focus) = self.focus() {
            self.push_hit = is_push_success(focus, push_target as f64);
        }
        self
    }

    pub fn with_bucket(mut self, bucket: TimeBucket) -> Self {
        self.bucket = Some(bucket);
        self
    }

    pub fn with_blocks_today(mut self, blocks_today: u32) -> Self {
        self.blocks_today = blocks_today;
        self
    }

    /// Focus duration if it is present, finite and positive.
    pub fn focus(&self) -> Option<f64> {
        self.focus_seconds.filter(|f| f.is_finite() && *f > 0.0)
    }

    /// Goal duration if it is present, finite and positive.
    pub fn goal(&self) -> Option<f64> {
        self.goal_seconds.filter(|g| g.is_finite() && *g > 0.0)
    }

    pub fn is_push(&self) -> bool {
        self.block_type == Some(BlockType::Push)
    }

    pub fn is_distracted(&self) -> bool {
        self.stop_reason == Some(StopReason::Distracted)
    }

    /// Whether this session scores as a win for momentum and linear progress.
    ///
    /// Push sessions use the broadened push-success rule; everything else
    /// needs the focus time to reach the goal. Sessions without a goal or
    /// a usable duration return `None`.
    pub fn scored_win(&self) -> Option<bool> {
        let focus = self.focus_seconds.filter(|f| f.is_finite())?;
        let goal = self.goal()?;
        match self.push_target_seconds.filter(|p| *p > 0) {
            Some(push) if self.is_push() => Some(is_push_success(focus, push as f64)),
            _ => Some(focus >= goal),
        }
    }

    /// Build the record for a finished session from the plan it followed.
    ///
    /// `min_frac_goal` is the floor engine's validity fraction, so the
    /// stored `valid` flag matches what the percentile math counts.
    pub fn from_plan(
        plan: &Plan,
        metrics: &BlendedMetrics,
        min_frac_goal: f64,
        focus_seconds: f64,
        stop_reason: Option<StopReason>,
        timestamp: DateTime<Utc>,
        bucket: Option<TimeBucket>,
    ) -> Self {
        let push_target = (plan.push_target > 0).then_some(plan.push_target);
        let outcome = SessionOutcome::evaluate(
            focus_seconds,
            plan.goal_sec as f64,
            push_target,
            plan.block_type,
            metrics,
            min_frac_goal,
        );

        Self {
            id: Uuid::new_v4(),
            focus_seconds: Some(focus_seconds),
            goal_seconds: Some(plan.goal_sec as f64),
            floor: MetricSnapshot {
                global: metrics.floor_global,
                bucket: metrics.floor_bucket,
                effective: Some(plan.floor_sec),
            },
            median: MetricSnapshot {
                global: metrics.median_global,
                bucket: metrics.median_bucket,
                effective: metrics.median,
            },
            ceiling: MetricSnapshot {
                global: metrics.ceiling_global,
                bucket: metrics.ceiling_bucket,
                effective: metrics.ceiling,
            },
            valid: outcome.valid,
            crash: outcome.crash,
            overshoot: outcome.overshoot,
            win: outcome.win,
            push_hit: outcome.push_hit,
            crash_threshold_seconds: metrics.crash_threshold,
            phase: Some(plan.phase),
            block_type: Some(plan.block_type),
            target_low_seconds: Some(plan.target_low),
            target_high_seconds: Some(plan.target_high),
            push_target_seconds: push_target,
            cycle_id: plan.cycle_id,
            cycle_pos: plan.cycle_pos,
            stop_reason,
            timestamp,
            bucket: bucket.or_else(|| Some(TimeBucket::for_time(&timestamp))),
            blocks_today: plan.blocks_today,
            fatigue_factor: plan.fatigue_factor,
            momentum: Some(plan.momentum.clone()),
        }
    }
}

/// Flags computed for a session when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub valid: bool,
    pub crash: bool,
    pub overshoot: bool,
    pub win: bool,
    pub push_hit: bool,
}

impl SessionOutcome {
    pub fn evaluate(
        focus_seconds: f64,
        goal_seconds: f64,
        push_target: Option<u32>,
        block_type: BlockType,
        metrics: &BlendedMetrics,
        min_frac_goal: f64,
    ) -> Self {
        let crash = metrics
            .crash_threshold
            .is_some_and(|t| focus_seconds < t as f64);
        let overshoot = metrics
            .overshoot_threshold
            .is_some_and(|t| focus_seconds > t as f64);
        let push_hit = block_type == BlockType::Push
            && push_target.is_some_and(|p| is_push_success(focus_seconds, p as f64));
        let valid = focus_seconds > 0.0
            && (goal_seconds <= 0.0 || focus_seconds >= min_frac_goal * goal_seconds);

        Self {
            valid,
            crash,
            overshoot,
            win: focus_seconds >= goal_seconds,
            push_hit,
        }
    }
}

/// Number of sessions in `history` whose timestamp falls on `day`.
pub fn sessions_on_day(history: &[SessionRecord], day: NaiveDate) -> u32 {
    history
        .iter()
        .filter(|s| s.timestamp.date_naive() == day)
        .count() as u32
}
