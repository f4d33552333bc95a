//! TOML-based planner configuration.
//!
//! Parameters are grouped by engine:
//! - `floor_engine`: raw floor window, smoothing rates and decay guard
//! - `analytics`: percentiles, recent windows, crash/overshoot thresholds,
//!   stability gate and bucket blending
//! - `wave`: goal bands, push intensity, momentum, fatigue, crash recovery,
//!   plateau detection and linear progression
//!
//! Every key has a default, so a partial (or empty) file always loads.
//! Out-of-range values are clamped by [`PlannerConfig::sanitized`] rather
//! than rejected. Configuration is stored at
//! `~/.config/focusplan/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;

/// Floor engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorEngineConfig {
    #[serde(default = "default_floor_window_n")]
    pub window_n: usize,
    #[serde(default = "default_floor_percentile")]
    pub percentile: f64,
    #[serde(default = "default_min_frac_goal")]
    pub min_frac_goal: f64,
    #[serde(default = "default_up_rate")]
    pub up_rate: f64,
    #[serde(default = "default_down_rate")]
    pub down_rate: f64,
    #[serde(default = "default_max_daily_drop_frac")]
    pub max_daily_drop_frac: f64,
}

/// Metrics, stability gate and bucket blending parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_median_percentile")]
    pub median_percentile: f64,
    #[serde(default = "default_ceiling_percentile")]
    pub ceiling_percentile: f64,
    #[serde(default = "default_iqr_low_percentile")]
    pub iqr_low_percentile: f64,
    #[serde(default = "default_iqr_high_percentile")]
    pub iqr_high_percentile: f64,
    #[serde(default = "default_metrics_window_n")]
    pub metrics_window_n: usize,
    #[serde(default = "default_recent_window_n")]
    pub recent_window_n: usize,
    #[serde(default = "default_crash_min_minutes")]
    pub crash_min_minutes: f64,
    #[serde(default = "default_crash_relative_mult")]
    pub crash_relative_mult: f64,
    #[serde(default = "default_overshoot_mult")]
    pub overshoot_mult: f64,
    #[serde(default = "default_stability_crashes_ge")]
    pub drop_to_stability_if_crashes_ge: usize,
    #[serde(default = "default_stability_overshoots_ge_in7")]
    pub drop_to_stability_if_overshoots_ge_in7: usize,
    #[serde(default = "default_stability_iqr_widen_pct")]
    pub drop_to_stability_if_recent_iqr_widens_pct: f64,
    #[serde(default = "default_bucket_min_n")]
    pub bucket_min_n: usize,
    #[serde(default = "default_bucket_full_n")]
    pub bucket_full_n: usize,
    #[serde(default = "default_bucket_recency_days")]
    pub bucket_recency_days: i64,
}

/// How much of the upcoming cycle the plan reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WaveVisibility {
    Hidden,
    #[default]
    Subtle,
    Full,
}

/// Phase progression strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainingStrategy {
    /// Start LINEAR, switch to WAVE once a plateau is detected.
    #[default]
    LinearThenWave,
    /// Go straight to WAVE.
    WaveOnly,
}

/// Goal, cycle and recovery parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    #[serde(default)]
    pub training_strategy: TrainingStrategy,
    #[serde(default = "default_start_goal_minutes")]
    pub start_goal_minutes: f64,
    #[serde(default = "default_absolute_min_minutes")]
    pub absolute_min_minutes: f64,
    #[serde(default = "default_milestone_minutes")]
    pub milestone_minutes: f64,
    #[serde(default = "default_adaptive_min_ratio")]
    pub adaptive_min_ratio: f64,
    #[serde(default = "default_boot_band_low_minutes")]
    pub start_goal_band_low_minutes: f64,
    #[serde(default = "default_boot_band_high_minutes")]
    pub start_goal_band_high_minutes: f64,
    #[serde(default = "default_push_pct_high")]
    pub push_pct_high: f64,
    #[serde(default = "default_push_pct_mid")]
    pub push_pct_mid: f64,
    #[serde(default = "default_push_pct_low")]
    pub push_pct_low: f64,
    #[serde(default = "default_push_jitter_pct")]
    pub push_jitter_pct: f64,
    #[serde(default = "default_consolidate_band_add_minutes")]
    pub consolidate_band_add_minutes: f64,
    #[serde(default = "default_target_band_add_minutes_wave")]
    pub target_band_add_minutes_wave: f64,
    #[serde(default = "default_easy_band_add_minutes")]
    pub easy_band_add_minutes: f64,
    #[serde(default = "default_push_cap_add_minutes")]
    pub push_cap_add_minutes: f64,
    #[serde(default)]
    pub wave_visibility: WaveVisibility,
    #[serde(default = "default_fatigue_rate_per_block")]
    pub fatigue_rate_per_block: f64,
    #[serde(default = "default_fatigue_floor")]
    pub fatigue_floor: f64,
    #[serde(default = "default_momentum_window")]
    pub momentum_window: usize,
    #[serde(default = "default_momentum_high_threshold")]
    pub momentum_high_threshold: f64,
    #[serde(default = "default_momentum_low_threshold")]
    pub momentum_low_threshold: f64,
    #[serde(default = "default_forced_easy_mild_crash")]
    pub forced_easy_mild_crash: u32,
    #[serde(default = "default_forced_easy_hard_crash")]
    pub forced_easy_hard_crash: u32,
    #[serde(default = "default_hard_crash_fraction")]
    pub hard_crash_fraction: f64,
    /// 1-based session index of the day from which crashes carry no penalty.
    #[serde(default = "default_late_day_crash_block")]
    pub late_day_crash_block: u32,
    #[serde(default = "default_plateau_eval_blocks")]
    pub plateau_eval_blocks: usize,
    #[serde(default = "default_plateau_fail_ge")]
    pub plateau_fail_ge: usize,
    #[serde(default = "default_plateau_flat_improve_pct")]
    pub plateau_flat_improve_pct: f64,
    #[serde(default = "default_plateau_volatility_up_pct")]
    pub plateau_volatility_up_pct: f64,
    #[serde(default = "default_linear_window_blocks")]
    pub linear_window_blocks: usize,
    #[serde(default = "default_linear_success_needed")]
    pub linear_success_needed: usize,
    #[serde(default = "default_linear_bump_tier1_sec")]
    pub linear_bump_tier1_sec: u32,
    #[serde(default = "default_linear_bump_tier2_sec")]
    pub linear_bump_tier2_sec: u32,
    #[serde(default = "default_linear_bump_tier3_sec")]
    pub linear_bump_tier3_sec: u32,
    #[serde(default = "default_linear_bump_tier4_sec")]
    pub linear_bump_tier4_sec: u32,
    /// Floor milestones in minutes.
    #[serde(default = "default_floor_milestones")]
    pub floor_milestones: Vec<u32>,
}

/// Planner configuration.
///
/// Serialized to/from TOML at `~/.config/focusplan/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlannerConfig {
    #[serde(default)]
    pub floor_engine: FloorEngineConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub wave: WaveConfig,
}

// Default functions
fn default_floor_window_n() -> usize {
    11
}
fn default_floor_percentile() -> f64 {
    0.35
}
fn default_min_frac_goal() -> f64 {
    0.5
}
fn default_up_rate() -> f64 {
    0.35
}
fn default_down_rate() -> f64 {
    0.10
}
fn default_max_daily_drop_frac() -> f64 {
    0.02
}
fn default_median_percentile() -> f64 {
    0.50
}
fn default_ceiling_percentile() -> f64 {
    0.80
}
fn default_iqr_low_percentile() -> f64 {
    0.25
}
fn default_iqr_high_percentile() -> f64 {
    0.75
}
fn default_metrics_window_n() -> usize {
    21
}
fn default_recent_window_n() -> usize {
    13
}
fn default_crash_min_minutes() -> f64 {
    8.0
}
fn default_crash_relative_mult() -> f64 {
    0.60
}
fn default_overshoot_mult() -> f64 {
    1.35
}
fn default_stability_crashes_ge() -> usize {
    3
}
fn default_stability_overshoots_ge_in7() -> usize {
    3
}
fn default_stability_iqr_widen_pct() -> f64 {
    0.35
}
fn default_bucket_min_n() -> usize {
    3
}
fn default_bucket_full_n() -> usize {
    9
}
fn default_bucket_recency_days() -> i64 {
    30
}
fn default_start_goal_minutes() -> f64 {
    25.0
}
fn default_absolute_min_minutes() -> f64 {
    15.0
}
fn default_milestone_minutes() -> f64 {
    25.0
}
fn default_adaptive_min_ratio() -> f64 {
    0.90
}
fn default_boot_band_low_minutes() -> f64 {
    20.0
}
fn default_boot_band_high_minutes() -> f64 {
    30.0
}
fn default_push_pct_high() -> f64 {
    0.12
}
fn default_push_pct_mid() -> f64 {
    0.08
}
fn default_push_pct_low() -> f64 {
    0.05
}
fn default_push_jitter_pct() -> f64 {
    0.02
}
fn default_consolidate_band_add_minutes() -> f64 {
    4.0
}
fn default_target_band_add_minutes_wave() -> f64 {
    6.0
}
fn default_easy_band_add_minutes() -> f64 {
    4.0
}
fn default_push_cap_add_minutes() -> f64 {
    10.0
}
fn default_fatigue_rate_per_block() -> f64 {
    0.06
}
fn default_fatigue_floor() -> f64 {
    0.75
}
fn default_momentum_window() -> usize {
    5
}
fn default_momentum_high_threshold() -> f64 {
    0.80
}
fn default_momentum_low_threshold() -> f64 {
    0.40
}
fn default_forced_easy_mild_crash() -> u32 {
    1
}
fn default_forced_easy_hard_crash() -> u32 {
    2
}
fn default_hard_crash_fraction() -> f64 {
    0.80
}
fn default_late_day_crash_block() -> u32 {
    4
}
fn default_plateau_eval_blocks() -> usize {
    10
}
fn default_plateau_fail_ge() -> usize {
    4
}
fn default_plateau_flat_improve_pct() -> f64 {
    0.01
}
fn default_plateau_volatility_up_pct() -> f64 {
    0.15
}
fn default_linear_window_blocks() -> usize {
    5
}
fn default_linear_success_needed() -> usize {
    3
}
fn default_linear_bump_tier1_sec() -> u32 {
    120
}
fn default_linear_bump_tier2_sec() -> u32 {
    60
}
fn default_linear_bump_tier3_sec() -> u32 {
    30
}
fn default_linear_bump_tier4_sec() -> u32 {
    15
}
fn default_floor_milestones() -> Vec<u32> {
    vec![15, 20, 25, 30, 40, 50, 60, 75, 90, 120]
}

impl Default for FloorEngineConfig {
    fn default() -> Self {
        Self {
            window_n: default_floor_window_n(),
            percentile: default_floor_percentile(),
            min_frac_goal: default_min_frac_goal(),
            up_rate: default_up_rate(),
            down_rate: default_down_rate(),
            max_daily_drop_frac: default_max_daily_drop_frac(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            median_percentile: default_median_percentile(),
            ceiling_percentile: default_ceiling_percentile(),
            iqr_low_percentile: default_iqr_low_percentile(),
            iqr_high_percentile: default_iqr_high_percentile(),
            metrics_window_n: default_metrics_window_n(),
            recent_window_n: default_recent_window_n(),
            crash_min_minutes: default_crash_min_minutes(),
            crash_relative_mult: default_crash_relative_mult(),
            overshoot_mult: default_overshoot_mult(),
            drop_to_stability_if_crashes_ge: default_stability_crashes_ge(),
            drop_to_stability_if_overshoots_ge_in7: default_stability_overshoots_ge_in7(),
            drop_to_stability_if_recent_iqr_widens_pct: default_stability_iqr_widen_pct(),
            bucket_min_n: default_bucket_min_n(),
            bucket_full_n: default_bucket_full_n(),
            bucket_recency_days: default_bucket_recency_days(),
        }
    }
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            training_strategy: TrainingStrategy::default(),
            start_goal_minutes: default_start_goal_minutes(),
            absolute_min_minutes: default_absolute_min_minutes(),
            milestone_minutes: default_milestone_minutes(),
            adaptive_min_ratio: default_adaptive_min_ratio(),
            start_goal_band_low_minutes: default_boot_band_low_minutes(),
            start_goal_band_high_minutes: default_boot_band_high_minutes(),
            push_pct_high: default_push_pct_high(),
            push_pct_mid: default_push_pct_mid(),
            push_pct_low: default_push_pct_low(),
            push_jitter_pct: default_push_jitter_pct(),
            consolidate_band_add_minutes: default_consolidate_band_add_minutes(),
            target_band_add_minutes_wave: default_target_band_add_minutes_wave(),
            easy_band_add_minutes: default_easy_band_add_minutes(),
            push_cap_add_minutes: default_push_cap_add_minutes(),
            wave_visibility: WaveVisibility::default(),
            fatigue_rate_per_block: default_fatigue_rate_per_block(),
            fatigue_floor: default_fatigue_floor(),
            momentum_window: default_momentum_window(),
            momentum_high_threshold: default_momentum_high_threshold(),
            momentum_low_threshold: default_momentum_low_threshold(),
            forced_easy_mild_crash: default_forced_easy_mild_crash(),
            forced_easy_hard_crash: default_forced_easy_hard_crash(),
            hard_crash_fraction: default_hard_crash_fraction(),
            late_day_crash_block: default_late_day_crash_block(),
            plateau_eval_blocks: default_plateau_eval_blocks(),
            plateau_fail_ge: default_plateau_fail_ge(),
            plateau_flat_improve_pct: default_plateau_flat_improve_pct(),
            plateau_volatility_up_pct: default_plateau_volatility_up_pct(),
            linear_window_blocks: default_linear_window_blocks(),
            linear_success_needed: default_linear_success_needed(),
            linear_bump_tier1_sec: default_linear_bump_tier1_sec(),
            linear_bump_tier2_sec: default_linear_bump_tier2_sec(),
            linear_bump_tier3_sec: default_linear_bump_tier3_sec(),
            linear_bump_tier4_sec: default_linear_bump_tier4_sec(),
            floor_milestones: default_floor_milestones(),
        }
    }
}

/// Clamp a probability-like value, mapping NaN to `fallback`.
fn clamp_or(value: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(lo, hi)
    } else {
        fallback
    }
}

/// Non-negative finite value, else `fallback`.
fn non_negative_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

impl PlannerConfig {
    /// Copy of this config with every value pulled into its usable range.
    ///
    /// Engines assume sanitized input; [`crate::Planner`] sanitizes on
    /// construction and on [`crate::Planner::set_config`].
    pub fn sanitized(&self) -> Self {
        let mut cfg = self.clone();

        let f = &mut cfg.floor_engine;
        f.window_n = f.window_n.max(3);
        f.percentile = clamp_or(f.percentile, 0.05, 0.95, default_floor_percentile());
        f.min_frac_goal = clamp_or(f.min_frac_goal, 0.0, 1.0, default_min_frac_goal());
        f.up_rate = clamp_or(f.up_rate, 0.0, 1.0, default_up_rate());
        f.down_rate = clamp_or(f.down_rate, 0.0, 1.0, default_down_rate());
        f.max_daily_drop_frac =
            clamp_or(f.max_daily_drop_frac, 0.0, 0.2, default_max_daily_drop_frac());

        let a = &mut cfg.analytics;
        a.median_percentile =
            clamp_or(a.median_percentile, 0.05, 0.95, default_median_percentile());
        a.ceiling_percentile =
            clamp_or(a.ceiling_percentile, 0.05, 0.95, default_ceiling_percentile());
        a.iqr_low_percentile =
            clamp_or(a.iqr_low_percentile, 0.05, 0.95, default_iqr_low_percentile());
        a.iqr_high_percentile =
            clamp_or(a.iqr_high_percentile, 0.05, 0.95, default_iqr_high_percentile());
        a.metrics_window_n = a.metrics_window_n.max(5);
        a.recent_window_n = a.recent_window_n.max(5);
        a.crash_min_minutes = non_negative_or(a.crash_min_minutes, default_crash_min_minutes());
        a.crash_relative_mult =
            clamp_or(a.crash_relative_mult, 0.0, 1.0, default_crash_relative_mult());
        a.overshoot_mult = clamp_or(a.overshoot_mult, 1.0, 5.0, default_overshoot_mult());
        a.drop_to_stability_if_recent_iqr_widens_pct = non_negative_or(
            a.drop_to_stability_if_recent_iqr_widens_pct,
            default_stability_iqr_widen_pct(),
        );
        a.bucket_full_n = a.bucket_full_n.max(a.bucket_min_n + 1);
        a.bucket_recency_days = a.bucket_recency_days.max(0);

        let w = &mut cfg.wave;
        w.start_goal_minutes = non_negative_or(w.start_goal_minutes, default_start_goal_minutes());
        w.absolute_min_minutes =
            non_negative_or(w.absolute_min_minutes, default_absolute_min_minutes());
        w.milestone_minutes = non_negative_or(w.milestone_minutes, default_milestone_minutes());
        w.adaptive_min_ratio =
            clamp_or(w.adaptive_min_ratio, 0.0, 1.0, default_adaptive_min_ratio());
        w.start_goal_band_low_minutes =
            non_negative_or(w.start_goal_band_low_minutes, default_boot_band_low_minutes());
        w.start_goal_band_high_minutes = non_negative_or(
            w.start_goal_band_high_minutes,
            default_boot_band_high_minutes(),
        )
        .max(w.start_goal_band_low_minutes);
        w.push_pct_high = clamp_or(w.push_pct_high, 0.0, 0.5, default_push_pct_high());
        w.push_pct_mid = clamp_or(w.push_pct_mid, 0.0, 0.5, default_push_pct_mid());
        w.push_pct_low = clamp_or(w.push_pct_low, 0.0, 0.5, default_push_pct_low());
        w.push_jitter_pct = clamp_or(w.push_jitter_pct, 0.0, 0.5, default_push_jitter_pct());
        w.consolidate_band_add_minutes = non_negative_or(
            w.consolidate_band_add_minutes,
            default_consolidate_band_add_minutes(),
        );
        w.target_band_add_minutes_wave = non_negative_or(
            w.target_band_add_minutes_wave,
            default_target_band_add_minutes_wave(),
        );
        w.easy_band_add_minutes =
            non_negative_or(w.easy_band_add_minutes, default_easy_band_add_minutes());
        w.push_cap_add_minutes =
            non_negative_or(w.push_cap_add_minutes, default_push_cap_add_minutes());
        w.fatigue_rate_per_block =
            clamp_or(w.fatigue_rate_per_block, 0.0, 1.0, default_fatigue_rate_per_block());
        w.fatigue_floor = clamp_or(w.fatigue_floor, 0.0, 1.0, default_fatigue_floor());
        w.momentum_window = w.momentum_window.max(2);
        w.momentum_high_threshold =
            clamp_or(w.momentum_high_threshold, 0.0, 1.0, default_momentum_high_threshold());
        w.momentum_low_threshold = clamp_or(
            w.momentum_low_threshold,
            0.0,
            w.momentum_high_threshold,
            default_momentum_low_threshold(),
        );
        w.hard_crash_fraction =
            clamp_or(w.hard_crash_fraction, 0.0, 1.0, default_hard_crash_fraction());
        w.late_day_crash_block = w.late_day_crash_block.max(1);
        w.plateau_eval_blocks = w.plateau_eval_blocks.max(6);
        w.plateau_flat_improve_pct =
            clamp_or(w.plateau_flat_improve_pct, -1.0, 1.0, default_plateau_flat_improve_pct());
        w.plateau_volatility_up_pct = non_negative_or(
            w.plateau_volatility_up_pct,
            default_plateau_volatility_up_pct(),
        );
        w.linear_window_blocks = w.linear_window_blocks.max(3);
        w.floor_milestones.sort_unstable();
        w.floor_milestones.dedup();

        cfg
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            let nan = || invalid(format!("cannot parse '{value}' as number"));
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(nan)?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default on-disk location.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from `path`, returning defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "config unreadable, using defaults");
                Self::default()
            }
        }
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::default_path()?)
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if key is unknown
    /// or the value does not fit the field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}
