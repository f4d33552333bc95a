//! Goal engine: target bands and concrete goal durations.
//!
//! All inputs and outputs are whole seconds. Fatigue is applied last and the
//! result is re-clamped to the adaptive minimum.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::round_sec;
use super::wave::jittered_pct;
use crate::session::{Intensity, SessionRecord};
use crate::storage::WaveConfig;

/// Smallest gap between the bottom and top of a band, and between the band
/// top and a push target.
pub const MIN_BAND_GAP_SEC: u32 = 60;

/// WAVE bands never start below ten minutes.
pub const WAVE_BAND_MIN_LOW_SEC: u32 = 10 * 60;

fn minutes(m: f64) -> u32 {
    round_sec(m * 60.0)
}

/// Target range a goal is picked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub low: u32,
    pub high: u32,
}

impl Band {
    fn capped(low: u32, preferred_high: u32, median: u32) -> Self {
        Self {
            low,
            high: preferred_high.min(median).max(low.saturating_add(MIN_BAND_GAP_SEC)),
        }
    }

    pub fn pick(&self, intensity: Intensity) -> u32 {
        pick_goal_from_band(self.low, self.high, intensity)
    }
}

/// `low + t * (high - low)` with `t` from the intensity.
pub fn pick_goal_from_band(low: u32, high: u32, intensity: Intensity) -> u32 {
    let (low, high) = (low as f64, high as f64);
    round_sec(low + (high - low) * intensity.band_position())
}

/// Lowest goal the planner may propose for a given floor.
///
/// Below the milestone the minimum follows the floor down to the absolute
/// minimum; at or above it the milestone itself becomes the minimum.
pub fn adaptive_min_goal(floor_sec: u32, cfg: &WaveConfig) -> u32 {
    let absolute_min = minutes(cfg.absolute_min_minutes);
    let milestone = minutes(cfg.milestone_minutes);
    if floor_sec == 0 {
        return milestone;
    }
    let scaled = round_sec(cfg.adaptive_min_ratio * floor_sec as f64);
    if floor_sec < milestone {
        absolute_min.max(scaled)
    } else {
        milestone.max(scaled)
    }
}

/// Fixed calibration band used before metrics exist.
pub fn boot_band(cfg: &WaveConfig) -> Band {
    let low = minutes(cfg.start_goal_band_low_minutes);
    Band {
        low,
        high: minutes(cfg.start_goal_band_high_minutes).max(low),
    }
}

pub fn linear_band(floor: u32, median: u32, cfg: &WaveConfig) -> Band {
    let low = floor.max(minutes(cfg.start_goal_minutes));
    Band::capped(low, floor.saturating_add(minutes(cfg.consolidate_band_add_minutes)), median)
}

pub fn wave_band(floor: u32, median: u32, cfg: &WaveConfig) -> Band {
    let low = floor.max(WAVE_BAND_MIN_LOW_SEC);
    Band::capped(low, floor.saturating_add(minutes(cfg.target_band_add_minutes_wave)), median)
}

/// Recovery band for forced-easy sessions.
pub fn wave_easy_band(floor: u32, median: u32, cfg: &WaveConfig) -> Band {
    let low = floor.max(minutes(cfg.start_goal_minutes));
    Band::capped(low, floor.saturating_add(minutes(cfg.easy_band_add_minutes)), median)
}

/// Multiply by the fatigue factor and re-clamp to `min_goal`.
pub fn apply_fatigue(raw_sec: u32, fatigue_factor: f64, min_goal: u32) -> u32 {
    min_goal.max(round_sec(raw_sec as f64 * fatigue_factor))
}

pub fn linear_bump_for_tier(tier: u8, cfg: &WaveConfig) -> u32 {
    match tier {
        0 | 1 => cfg.linear_bump_tier1_sec,
        2 => cfg.linear_bump_tier2_sec,
        3 => cfg.linear_bump_tier3_sec,
        _ => cfg.linear_bump_tier4_sec,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LinearGoalInput<'a> {
    pub band: Band,
    pub min_goal: u32,
    pub intensity: Intensity,
    /// Running training goal from earlier LINEAR sessions, 0 if none.
    pub linear_goal: u32,
    pub history: &'a [SessionRecord],
    pub tier: u8,
    pub fatigue_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGoal {
    pub goal_sec: u32,
    /// Goal before fatigue.
    pub raw_goal_sec: u32,
    /// Value to carry forward as the running linear goal.
    pub next_linear_goal: u32,
    pub bumped: bool,
    pub window_n: usize,
    pub successes: usize,
}

/// Progressive LINEAR goal.
///
/// The goal never drops below the running linear goal, and gains a tier
/// bump once the last `linear_window_blocks` goal-bearing sessions contain
/// enough wins.
pub fn linear_goal(input: LinearGoalInput<'_>, cfg: &WaveConfig) -> LinearGoal {
    let window_n = cfg.linear_window_blocks.max(3);
    let scored: Vec<bool> = input
        .history
        .iter()
        .filter_map(SessionRecord::scored_win)
        .collect();
    let window = super::tail(&scored, window_n);
    let successes = window.iter().filter(|w| **w).count();

    let mut raw = input.min_goal.max(input.band.pick(input.intensity));
    if input.linear_goal > 0 {
        raw = raw.max(input.linear_goal);
    }

    let bumped = window.len() >= window_n && successes >= cfg.linear_success_needed;
    if bumped {
        raw = raw.saturating_add(linear_bump_for_tier(input.tier, cfg));
    }

    LinearGoal {
        goal_sec: apply_fatigue(raw, input.fatigue_factor, input.min_goal),
        raw_goal_sec: raw,
        next_linear_goal: raw,
        bumped,
        window_n: window.len(),
        successes,
    }
}

/// Stretch target for a PUSH session, before fatigue.
///
/// Clamps are applied in order: ceiling, floor + cap, then band top + 60s.
/// The last one wins if they conflict.
pub fn push_target(floor: u32, ceiling: u32, band: Band, pct: f64, cfg: &WaveConfig) -> u32 {
    round_sec(floor as f64 * (1.0 + pct))
        .min(ceiling)
        .min(floor.saturating_add(minutes(cfg.push_cap_add_minutes)))
        .max(band.high.saturating_add(MIN_BAND_GAP_SEC))
}

#[derive(Debug, Clone, Copy)]
pub struct WaveGoalInput {
    pub band: Band,
    pub floor: u32,
    pub ceiling: u32,
    pub min_goal: u32,
    pub intensity: Intensity,
    /// Push percentage for the current momentum level, before jitter.
    /// `None` for a consolidate slot.
    pub push_pct: Option<f64>,
    pub fatigue_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveGoal {
    pub goal_sec: u32,
    pub raw_goal_sec: u32,
    pub base_goal_sec: u32,
    /// Push target after fatigue, 0 for consolidate slots.
    pub push_target: u32,
    pub raw_push_target: u32,
    /// Jittered push percentage actually used.
    pub push_pct: Option<f64>,
}

pub fn wave_goal<R: Rng + ?Sized>(
    input: WaveGoalInput,
    cfg: &WaveConfig,
    rng: &mut R,
) -> WaveGoal {
    let base = input.min_goal.max(input.band.pick(input.intensity));

    let pct = input
        .push_pct
        .map(|base_pct| jittered_pct(base_pct, cfg.push_jitter_pct, rng));
    let raw_push = pct
        .map(|p| push_target(input.floor, input.ceiling, input.band, p, cfg))
        .unwrap_or(0);

    let raw = base.max(raw_push);
    let push_target = if raw_push > 0 {
        round_sec(raw_push as f64 * input.fatigue_factor)
    } else {
        0
    };

    WaveGoal {
        goal_sec: apply_fatigue(raw, input.fatigue_factor, input.min_goal),
        raw_goal_sec: raw,
        base_goal_sec: base,
        push_target,
        raw_push_target: raw_push,
        push_pct: pct,
    }
}
