use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::wave::Momentum;
use crate::session::{BlockType, Phase};

/// Which branch of the planner produced a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanMode {
    /// Calibration before metrics exist.
    Boot,
    Linear,
    Wave,
    /// Forced recovery session inside WAVE.
    WaveEasy,
}

/// The planner's answer for the next session. Durations in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub mode: PlanMode,
    pub phase: Phase,
    pub block_type: BlockType,
    pub target_low: u32,
    pub target_high: u32,
    /// 0 unless this is a PUSH slot.
    pub push_target: u32,
    pub goal_sec: u32,
    /// Goal before fatigue.
    pub raw_goal_sec: u32,
    pub floor_sec: u32,
    pub min_goal_sec: u32,
    pub tier: u8,
    pub cycle_id: u32,
    /// 1-based slot within the cycle, 0 outside WAVE.
    pub cycle_pos: u32,
    pub cycle_preview: Option<String>,
    pub fatigue_factor: f64,
    pub blocks_today: u32,
    pub momentum: Momentum,
    pub new_milestone: Option<u32>,
    pub earned_milestones: Vec<u32>,
    /// Free-form diagnostics. Keys are not a stable contract.
    #[serde(default)]
    pub diagnostics: BTreeMap<String, serde_json::Value>,
}

impl Plan {
    pub fn is_push(&self) -> bool {
        self.block_type == BlockType::Push
    }
}
