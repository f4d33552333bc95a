//! Persisted planner state.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::wave::{build_adaptive_cycle, MomentumLevel};
use crate::session::{BlockType, Phase};

/// Current schema version of [`PlannerState`].
pub const STATE_VERSION: u32 = 1;

fn default_version() -> u32 {
    STATE_VERSION
}

/// Everything the planner carries between invocations.
///
/// `cycle_pos` counts slots already consumed from `cycle`; the next slot to
/// hand out is `cycle[cycle_pos]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub phase: Phase,
    /// Running LINEAR training goal in seconds, 0 when unset.
    #[serde(default)]
    pub linear_goal_seconds: u32,
    #[serde(default)]
    pub cycle_id: u32,
    /// Equals `cycle.len()` once every slot is taken. The finished cycle stays
    /// persisted as is; the next WAVE plan replaces it with a fresh one.
    #[serde(default)]
    pub cycle_pos: u32,
    #[serde(default)]
    pub cycle: Vec<BlockType>,
    #[serde(default)]
    pub forced_easy: u32,
    #[serde(default)]
    pub forced_recovery: bool,
    #[serde(default)]
    pub floor_seconds: Option<u32>,
    #[serde(default)]
    pub floor_date: Option<NaiveDate>,
    #[serde(default)]
    pub earned_milestones: BTreeSet<u32>,
    #[serde(default)]
    pub prev_recent_iqr: Option<u32>,
}

impl Default for PlannerState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            phase: Phase::Linear,
            linear_goal_seconds: 0,
            cycle_id: 0,
            cycle_pos: 0,
            cycle: Vec::new(),
            forced_easy: 0,
            forced_recovery: false,
            floor_seconds: None,
            floor_date: None,
            earned_milestones: BTreeSet::new(),
            prev_recent_iqr: None,
        }
    }
}

impl PlannerState {
    /// Repair a state loaded from storage so the planner can rely on it.
    pub fn normalized(mut self) -> Self {
        self.version = STATE_VERSION;
        if self.phase == Phase::Wave && self.cycle.is_empty() {
            self.cycle = build_adaptive_cycle(MomentumLevel::Mid);
            self.cycle_pos = 0;
        }
        self.cycle_pos = self.cycle_pos.min(self.cycle.len() as u32);
        self
    }

    /// True when the next WAVE plan needs a fresh cycle.
    pub fn cycle_exhausted(&self) -> bool {
        self.cycle.is_empty() || self.cycle_pos as usize >= self.cycle.len()
    }

    /// Next slot without consuming it.
    pub fn peek_slot(&self) -> Option<BlockType> {
        self.cycle.get(self.cycle_pos as usize).copied()
    }

    /// Hand out the next slot.
    pub fn take_slot(&mut self) -> Option<BlockType> {
        let slot = self.peek_slot()?;
        self.cycle_pos += 1;
        Some(slot)
    }

    /// Record every milestone the floor has reached. Returns the highest
    /// milestone earned by this call.
    pub fn earn_milestones(&mut self, floor_sec: u32, milestones: &[u32]) -> Option<u32> {
        let mut newest = None;
        for &m in milestones {
            if floor_sec >= m.saturating_mul(60) && self.earned_milestones.insert(m) {
                newest = Some(m);
            }
        }
        newest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let state: PlannerState = serde_json::from_str("{\"phase\":\"WAVE\"}").unwrap();
        assert_eq!(state.phase, Phase::Wave);
        assert_eq!(state.version, STATE_VERSION);
        assert!(state.cycle.is_empty());
    }

    #[test]
    fn wave_without_cycle_gets_mid_cycle() {
        let state = PlannerState {
            phase: Phase::Wave,
            cycle_pos: 3,
            ..PlannerState::default()
        }
        .normalized();
        assert_eq!(state.cycle, build_adaptive_cycle(MomentumLevel::Mid));
        assert_eq!(state.cycle_pos, 0);
    }

    #[test]
    fn slots_are_consumed_in_order() {
        let mut state = PlannerState {
            cycle: build_adaptive_cycle(MomentumLevel::High),
            ..PlannerState::default()
        };
        assert_eq!(state.take_slot(), Some(BlockType::Push));
        assert_eq!(state.take_slot(), Some(BlockType::Consolidate));
        assert_eq!(state.take_slot(), Some(BlockType::Push));
        assert_eq!(state.take_slot(), Some(BlockType::Consolidate));
        assert!(state.cycle_exhausted());
        assert_eq!(state.take_slot(), None);
    }

    #[test]
    fn exhausted_cycle_survives_a_save_and_reload() {
        let mut state = PlannerState {
            phase: Phase::Wave,
            cycle: build_adaptive_cycle(MomentumLevel::Low),
            ..PlannerState::default()
        };
        while state.take_slot().is_some() {}
        assert_eq!(state.cycle_pos as usize, state.cycle.len());

        let json = serde_json::to_string(&state).unwrap();
        let reloaded = serde_json::from_str::<PlannerState>(&json).unwrap().normalized();
        assert_eq!(reloaded.cycle_pos as usize, reloaded.cycle.len());
        assert!(reloaded.cycle_exhausted());
        assert_eq!(reloaded.peek_slot(), None);
    }

    #[test]
    fn milestones_are_earned_once() {
        let mut state = PlannerState::default();
        let ms = [15, 20, 25, 30];
        assert_eq!(state.earn_milestones(1300, &ms), Some(20));
        assert_eq!(state.earn_milestones(1300, &ms), None);
        assert_eq!(state.earn_milestones(1000, &ms), None);
        assert_eq!(state.earn_milestones(1500, &ms), Some(25));
        assert_eq!(state.earned_milestones.len(), 3);
    }
}
