//! Wave engine.
//!
//! Owns the pieces of WAVE scheduling that do not depend on planner state:
//! momentum, adaptive cycle generation, push intensity, fatigue, crash
//! recovery, plateau detection and the stability gate.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::blend::BlendedMetrics;
use super::floor::is_valid_session;
use super::tail;
use crate::session::{BlockType, SessionRecord};
use crate::storage::{AnalyticsConfig, WaveConfig, WaveVisibility};

/// Fraction of the push target that still counts as a successful push.
pub const PUSH_SUCCESS_FRACTION: f64 = 0.90;

/// Neutral momentum used until enough sessions qualify.
pub const NEUTRAL_MOMENTUM: f64 = 0.5;

/// Broadened push-success rule shared by momentum scoring and session
/// outcome evaluation.
pub fn is_push_success(focus_seconds: f64, push_target_seconds: f64) -> bool {
    push_target_seconds > 0.0 && focus_seconds >= push_target_seconds * PUSH_SUCCESS_FRACTION
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MomentumLevel {
    High,
    Mid,
    Low,
}

/// Rolling win rate over recent goal-bearing sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Momentum {
    pub rate: f64,
    pub level: MomentumLevel,
    #[serde(default)]
    pub wins: usize,
    #[serde(default)]
    pub sample_n: usize,
}

impl Momentum {
    /// Momentum as if nothing had gone right, used after a hard crash.
    pub fn recovery() -> Self {
        Self {
            rate: 0.0,
            level: MomentumLevel::Low,
            wins: 0,
            sample_n: 0,
        }
    }
}

pub fn momentum_level(rate: f64, cfg: &WaveConfig) -> MomentumLevel {
    if rate >= cfg.momentum_high_threshold {
        MomentumLevel::High
    } else if rate < cfg.momentum_low_threshold {
        MomentumLevel::Low
    } else {
        MomentumLevel::Mid
    }
}

/// Win rate over the last `momentum_window` goal-bearing sessions.
pub fn compute_momentum(history: &[SessionRecord], cfg: &WaveConfig) -> Momentum {
    let scored: Vec<bool> = history.iter().filter_map(SessionRecord::scored_win).collect();
    let window = tail(&scored, cfg.momentum_window.max(1));

    let rate = if window.len() < 2 {
        NEUTRAL_MOMENTUM
    } else {
        window.iter().filter(|w| **w).count() as f64 / window.len() as f64
    };
    let rate = rate.clamp(0.0, 1.0);

    Momentum {
        rate,
        level: momentum_level(rate, cfg),
        wins: window.iter().filter(|w| **w).count(),
        sample_n: window.len(),
    }
}

/// Tier from the absolute floor: larger floors progress in smaller steps.
pub fn tier_for_seconds(seconds: u32) -> u8 {
    match seconds {
        s if s >= 90 * 60 => 4,
        s if s >= 75 * 60 => 3,
        s if s >= 45 * 60 => 2,
        _ => 1,
    }
}

/// Slot pattern for a new cycle at the given momentum level.
pub fn build_adaptive_cycle(level: MomentumLevel) -> Vec<BlockType> {
    use BlockType::{Consolidate as C, Push as P};
    match level {
        MomentumLevel::High => vec![P, C, P, C],
        MomentumLevel::Mid => vec![P, C, C, P, C],
        MomentumLevel::Low => vec![C, C, P, C, C],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCycle {
    pub cycle_id: u32,
    pub cycle: Vec<BlockType>,
}

pub fn start_new_cycle(prev_id: u32, level: MomentumLevel) -> NewCycle {
    NewCycle {
        cycle_id: prev_id.saturating_add(1),
        cycle: build_adaptive_cycle(level),
    }
}

/// Compact cycle description according to the visibility setting.
pub fn cycle_preview(cycle: &[BlockType], visibility: WaveVisibility) -> Option<String> {
    if cycle.is_empty() {
        return None;
    }
    match visibility {
        WaveVisibility::Hidden => None,
        WaveVisibility::Subtle => Some("SUBTLE".to_string()),
        WaveVisibility::Full => Some(
            cycle
                .iter()
                .map(BlockType::abbreviation)
                .collect::<Vec<_>>()
                .join(" "),
        ),
    }
}

/// Push fraction above floor for a momentum level.
pub fn push_pct_for_level(level: MomentumLevel, cfg: &WaveConfig) -> f64 {
    match level {
        MomentumLevel::High => cfg.push_pct_high,
        MomentumLevel::Mid => cfg.push_pct_mid,
        MomentumLevel::Low => cfg.push_pct_low,
    }
}

/// `base` moved by a uniform draw in `[-jitter, jitter]`, clamped to [0, 0.5].
pub fn jittered_pct<R: Rng + ?Sized>(base: f64, jitter: f64, rng: &mut R) -> f64 {
    let jitter = jitter.abs();
    let offset = if jitter > 0.0 {
        rng.gen_range(-jitter..=jitter)
    } else {
        0.0
    };
    (base + offset).clamp(0.0, 0.5)
}

/// Same-day goal multiplier.
pub fn fatigue_factor(blocks_today: u32, cfg: &WaveConfig) -> f64 {
    (1.0 - cfg.fatigue_rate_per_block * blocks_today as f64).max(cfg.fatigue_floor)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrashSeverity {
    Mild,
    Hard,
}

/// Hard when focus fell below `hard_fraction` of the crash threshold.
pub fn classify_crash(
    focus_seconds: f64,
    crash_threshold: Option<u32>,
    hard_fraction: f64,
) -> CrashSeverity {
    match crash_threshold {
        Some(t) if t > 0 && focus_seconds < t as f64 * hard_fraction => CrashSeverity::Hard,
        _ => CrashSeverity::Mild,
    }
}

/// What the planner should do after a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashRecovery {
    pub severity: CrashSeverity,
    /// Crash happened late enough in the day that fatigue explains it.
    pub excused_by_fatigue: bool,
    pub forced_easy: u32,
    pub forced_recovery: bool,
}

/// Recovery policy for a crashed session.
///
/// `blocks_today` counts sessions completed earlier the same day, so the
/// crashing session is number `blocks_today + 1`.
pub fn crash_recovery(
    focus_seconds: f64,
    crash_threshold: Option<u32>,
    blocks_today: u32,
    cfg: &WaveConfig,
) -> CrashRecovery {
    let severity = classify_crash(focus_seconds, crash_threshold, cfg.hard_crash_fraction);

    if blocks_today.saturating_add(1) >= cfg.late_day_crash_block {
        return CrashRecovery {
            severity,
            excused_by_fatigue: true,
            forced_easy: 0,
            forced_recovery: false,
        };
    }

    match severity {
        CrashSeverity::Hard => CrashRecovery {
            severity,
            excused_by_fatigue: false,
            forced_easy: cfg.forced_easy_hard_crash,
            forced_recovery: true,
        },
        CrashSeverity::Mild => CrashRecovery {
            severity,
            excused_by_fatigue: false,
            forced_easy: cfg.forced_easy_mild_crash,
            forced_recovery: false,
        },
    }
}

/// Plateau vote over the recent valid sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateauSignal {
    pub plateau: bool,
    pub by_fails: bool,
    pub by_flat: bool,
    pub by_vol: bool,
    pub improve_pct: f64,
    pub vol_ratio: f64,
    pub fails: usize,
    pub sample_n: usize,
}

fn mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        0.0
    } else {
        vals.iter().sum::<f64>() / vals.len() as f64
    }
}

/// Two-of-three vote: fails, flat improvement, volatility.
pub fn plateau_vote(by_fails: bool, by_flat: bool, by_vol: bool) -> bool {
    [by_fails, by_flat, by_vol].iter().filter(|f| **f).count() >= 2
}

pub fn detect_plateau(
    history: &[SessionRecord],
    min_frac_goal: f64,
    cfg: &WaveConfig,
) -> PlateauSignal {
    let valid: Vec<&SessionRecord> = history
        .iter()
        .filter(|r| is_valid_session(r, min_frac_goal))
        .collect();
    let recent = tail(&valid, cfg.plateau_eval_blocks.max(6));
    let focus: Vec<f64> = recent.iter().filter_map(|r| r.focus()).collect();

    let avg = mean(&focus);
    let std = if focus.is_empty() {
        0.0
    } else {
        (focus.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / focus.len() as f64).sqrt()
    };

    let half = (focus.len() / 2).max(1).min(focus.len());
    let (first, second) = focus.split_at(half);
    let m1 = mean(first);
    let m2 = mean(second);
    let improve_pct = if m1 > 0.0 { (m2 - m1) / m1 } else { 0.0 };

    let fails = recent
        .iter()
        .filter(|r| r.is_distracted() || r.crash)
        .count();
    let vol_ratio = if avg > 0.0 { std / avg } else { 0.0 };

    let by_fails = fails >= cfg.plateau_fail_ge;
    let by_flat = improve_pct < cfg.plateau_flat_improve_pct;
    let by_vol = vol_ratio > cfg.plateau_volatility_up_pct;

    PlateauSignal {
        plateau: plateau_vote(by_fails, by_flat, by_vol),
        by_fails,
        by_flat,
        by_vol,
        improve_pct,
        vol_ratio,
        fails,
        sample_n: recent.len(),
    }
}

/// Why (and whether) the stability gate tripped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StabilityVerdict {
    pub tripped: bool,
    pub by_crashes: bool,
    pub by_overshoots: bool,
    pub by_iqr_widen: bool,
    pub iqr_widen_pct: Option<f64>,
}

/// Force easy sessions when recent performance looks unstable.
///
/// `prev_recent_iqr` is the recent IQR recorded by the previous planning
/// call, before the current one is stored.
pub fn stability_gate(
    m: &BlendedMetrics,
    prev_recent_iqr: Option<u32>,
    cfg: &AnalyticsConfig,
) -> StabilityVerdict {
    let by_crashes = m.recent_n >= cfg.recent_window_n
        && m.recent_crashes >= cfg.drop_to_stability_if_crashes_ge;
    let by_overshoots = m.recent_overshoots_7 >= cfg.drop_to_stability_if_overshoots_ge_in7;

    let iqr_widen_pct = match (prev_recent_iqr, m.recent_iqr) {
        (Some(prev), Some(cur)) if prev > 0 => Some((cur as f64 - prev as f64) / prev as f64),
        _ => None,
    };
    let by_iqr_widen =
        iqr_widen_pct.is_some_and(|w| w > cfg.drop_to_stability_if_recent_iqr_widens_pct);

    StabilityVerdict {
        tripped: by_crashes || by_overshoots || by_iqr_widen,
        by_crashes,
        by_overshoots,
        by_iqr_widen,
        iqr_widen_pct,
    }
}
