//! Percentile planning metrics.
//!
//! Floor/median/ceiling/IQR come from the last `metrics_window_n` *valid*
//! sessions (see [`super::floor::is_valid_session`]). Crash and overshoot
//! counts and the recent IQR look at every session with a usable duration,
//! because a crash is by definition a short session the validity filter
//! would drop.

use serde::{Deserialize, Serialize};

use super::floor::extract_valid_focus;
use super::{quantile, round_sec, tail};
use crate::session::SessionRecord;
use crate::storage::PlannerConfig;

/// Trailing window used for the overshoot count.
pub const OVERSHOOT_WINDOW: usize = 7;

/// Minimum samples for a recent IQR.
const RECENT_IQR_MIN_SAMPLES: usize = 4;

/// Metrics snapshot for one history slice. All durations in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanningMetrics {
    pub floor: Option<u32>,
    pub median: Option<u32>,
    pub ceiling: Option<u32>,
    pub iqr: Option<u32>,
    pub recent_iqr: Option<u32>,
    pub recent_crashes: usize,
    pub recent_overshoots_7: usize,
    /// Sessions with a usable duration in the recent window.
    pub recent_n: usize,
    pub crash_threshold: Option<u32>,
    pub overshoot_threshold: Option<u32>,
    /// Valid samples feeding the percentiles.
    pub sample_n: usize,
}

impl PlanningMetrics {
    /// True once floor and median exist, i.e. planning can leave BOOT.
    pub fn is_ready(&self) -> bool {
        self.floor.is_some() && self.median.is_some()
    }
}

/// Compute planning metrics from a history slice.
///
/// Fewer than two valid samples yields an all-`None` snapshot.
pub fn compute_planning_metrics(history: &[SessionRecord], cfg: &PlannerConfig) -> PlanningMetrics {
    let a = &cfg.analytics;
    let valid = extract_valid_focus(history, cfg.floor_engine.min_frac_goal);

    if valid.len() < 2 {
        return PlanningMetrics {
            sample_n: valid.len(),
            ..PlanningMetrics::default()
        };
    }

    let vals = tail(&valid, a.metrics_window_n);

    let floor = quantile(vals, cfg.floor_engine.percentile).map(round_sec);
    let median = quantile(vals, a.median_percentile).map(round_sec);
    let ceiling = quantile(vals, a.ceiling_percentile).map(round_sec);
    let iqr = match (
        quantile(vals, a.iqr_low_percentile),
        quantile(vals, a.iqr_high_percentile),
    ) {
        (Some(q1), Some(q3)) => Some(round_sec(q3 - q1)),
        _ => None,
    };

    let crash_threshold = floor.map(|f| {
        let absolute = round_sec(a.crash_min_minutes * 60.0);
        absolute.max(round_sec(a.crash_relative_mult * f as f64))
    });
    let overshoot_threshold = median.map(|m| round_sec(a.overshoot_mult * m as f64));

    // Unfiltered: short sessions must stay visible here.
    let all_focus: Vec<f64> = history.iter().filter_map(SessionRecord::focus).collect();
    let recent = tail(&all_focus, a.recent_window_n);

    let recent_iqr = if recent.len() >= RECENT_IQR_MIN_SAMPLES {
        match (quantile(recent, 0.25), quantile(recent, 0.75)) {
            (Some(q1), Some(q3)) => Some(round_sec(q3 - q1)),
            _ => None,
        }
    } else {
        None
    };

    let recent_crashes = crash_threshold
        .map(|t| recent.iter().filter(|x| **x < t as f64).count())
        .unwrap_or(0);
    let recent_overshoots_7 = overshoot_threshold
        .map(|t| {
            tail(&all_focus, OVERSHOOT_WINDOW)
                .iter()
                .filter(|x| **x > t as f64)
                .count()
        })
        .unwrap_or(0);

    PlanningMetrics {
        floor,
        median,
        ceiling,
        iqr,
        recent_iqr,
        recent_crashes,
        recent_overshoots_7,
        recent_n: recent.len(),
        crash_threshold,
        overshoot_threshold,
        sample_n: vals.len(),
    }
}
