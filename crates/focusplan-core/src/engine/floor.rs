//! Floor engine: the user's reliable baseline.
//!
//! The raw floor is a low percentile over the last `window_n` valid
//! sessions. The effective floor follows it with asymmetric smoothing,
//! rising at `up_rate` and falling at `down_rate`, and can never drop more
//! than `max_daily_drop_frac` of its previous value per elapsed day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{quantile, round_sec, tail};
use crate::session::SessionRecord;
use crate::storage::FloorEngineConfig;

/// Minimum valid samples for a raw floor.
pub const RAW_FLOOR_MIN_SAMPLES: usize = 3;

/// A session counts for percentile math if it has a positive duration and
/// reached at least `min_frac_goal` of its goal (when it had one).
pub fn is_valid_session(record: &SessionRecord, min_frac_goal: f64) -> bool {
    let Some(focus) = record.focus() else {
        return false;
    };
    match record.goal() {
        Some(goal) => focus >= min_frac_goal * goal,
        None => true,
    }
}

/// Focus durations of valid sessions, in history order.
pub fn extract_valid_focus(history: &[SessionRecord], min_frac_goal: f64) -> Vec<f64> {
    history
        .iter()
        .filter(|r| is_valid_session(r, min_frac_goal))
        .filter_map(SessionRecord::focus)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFloor {
    pub seconds: Option<u32>,
    pub sample_n: usize,
}

/// Raw floor over the last `window_n` valid durations.
pub fn compute_raw_floor(
    history: &[SessionRecord],
    window_n: usize,
    percentile: f64,
    min_frac_goal: f64,
) -> RawFloor {
    let window_n = window_n.max(RAW_FLOOR_MIN_SAMPLES);
    let percentile = percentile.clamp(0.05, 0.95);
    let valid = extract_valid_focus(history, min_frac_goal);
    let vals = tail(&valid, window_n);

    if vals.len() < RAW_FLOOR_MIN_SAMPLES {
        return RawFloor {
            seconds: None,
            sample_n: vals.len(),
        };
    }

    RawFloor {
        seconds: quantile(vals, percentile).map(round_sec),
        sample_n: vals.len(),
    }
}

/// Smoothing parameters for [`update_effective_floor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorSmoothing {
    pub up_rate: f64,
    pub down_rate: f64,
    pub max_daily_drop_frac: f64,
}

impl Default for FloorSmoothing {
    fn default() -> Self {
        Self {
            up_rate: 0.35,
            down_rate: 0.10,
            max_daily_drop_frac: 0.02,
        }
    }
}

impl From<&FloorEngineConfig> for FloorSmoothing {
    fn from(cfg: &FloorEngineConfig) -> Self {
        Self {
            up_rate: cfg.up_rate,
            down_rate: cfg.down_rate,
            max_daily_drop_frac: cfg.max_daily_drop_frac,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorUpdate {
    pub floor_seconds: Option<u32>,
    pub date: NaiveDate,
}

/// Lowest value the floor may take `elapsed_days` after it was `prev`.
pub fn decay_guard_min(prev: u32, elapsed_days: i64, max_daily_drop_frac: f64) -> u32 {
    let days = elapsed_days.max(1) as f64;
    round_sec(prev as f64 * (1.0 - max_daily_drop_frac * days))
}

/// Move the effective floor toward the raw estimate.
///
/// `None` raw keeps the previous floor; `None` previous seeds from raw.
pub fn update_effective_floor(
    prev: Option<u32>,
    raw: Option<u32>,
    today: NaiveDate,
    prev_date: Option<NaiveDate>,
    smoothing: &FloorSmoothing,
) -> FloorUpdate {
    let up_rate = smoothing.up_rate.clamp(0.0, 1.0);
    let down_rate = smoothing.down_rate.clamp(0.0, 1.0);
    let max_drop = smoothing.max_daily_drop_frac.clamp(0.0, 0.2);

    let Some(raw) = raw else {
        return FloorUpdate {
            floor_seconds: prev,
            date: today,
        };
    };
    let Some(prev) = prev else {
        return FloorUpdate {
            floor_seconds: Some(raw),
            date: today,
        };
    };

    let delta = raw as f64 - prev as f64;
    let rate = if delta >= 0.0 { up_rate } else { down_rate };
    let smoothed = round_sec(prev as f64 + rate * delta);

    let elapsed_days = prev_date
        .map(|d| (today - d).num_days().max(0))
        .unwrap_or(0);
    let min_allowed = decay_guard_min(prev, elapsed_days, max_drop);

    FloorUpdate {
        floor_seconds: Some(smoothed.max(min_allowed)),
        date: today,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    fn step(prev: Option<u32>, raw: Option<u32>, today: u32, prev_day: Option<u32>) -> FloorUpdate {
        let s = FloorSmoothing::default();
        update_effective_floor(prev, raw, day(today), prev_day.map(day), &s)
    }

    fn history(durations: &[f64], goal: Option<f64>) -> Vec<SessionRecord> {
        let start = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| SessionRecord::new(*d, goal, start + Duration::hours(i as i64)))
            .collect()
    }

    #[test]
    fn interrupted_session_is_excluded_from_raw_floor() {
        let durations = [1320.0, 1440.0, 300.0, 1560.0, 1620.0, 1380.0, 1500.0];
        let raw = compute_raw_floor(&history(&durations, Some(1500.0)), 11, 0.35, 0.5);
        assert_eq!(raw.sample_n, 6);
        // sorted [1320,1380,1440,1500,1560,1620], idx 1.75 -> 1380 + 0.75 * 60
        assert_eq!(raw.seconds, Some(1425));
        assert!(raw.seconds.unwrap() > 1320);
    }

    #[test]
    fn raw_floor_needs_three_samples() {
        let raw = compute_raw_floor(&history(&[1500.0, 1600.0], None), 11, 0.35, 0.5);
        assert_eq!(raw.seconds, None);
        assert_eq!(raw.sample_n, 2);
    }

    #[test]
    fn sessions_without_goal_are_valid() {
        let h = history(&[100.0], None);
        assert!(is_valid_session(&h[0], 0.5));
        let h = history(&[100.0], Some(1500.0));
        assert!(!is_valid_session(&h[0], 0.5));
    }

    #[test]
    fn seeds_from_raw_when_no_previous() {
        let upd = step(None, Some(1500), 10, None);
        assert_eq!(upd.floor_seconds, Some(1500));
        assert_eq!(upd.date, day(10));
    }

    #[test]
    fn missing_raw_keeps_previous() {
        let upd = step(Some(1500), None, 10, Some(9));
        assert_eq!(upd.floor_seconds, Some(1500));
        assert_eq!(upd.date, day(10));
    }

    #[test]
    fn rises_at_up_rate() {
        let upd = step(Some(1200), Some(1800), 10, Some(9));
        assert_eq!(upd.floor_seconds, Some(1410));
    }

    #[test]
    fn falls_at_down_rate() {
        let upd = step(Some(1500), Some(1400), 10, Some(10));
        assert_eq!(upd.floor_seconds, Some(1490));
    }

    #[test]
    fn decay_guard_caps_same_day_drop() {
        let upd = step(Some(3600), Some(1200), 24, Some(24));
        // smoothing alone would give 3360
        assert_eq!(upd.floor_seconds, Some(3528));
    }

    #[test]
    fn decay_guard_scales_with_elapsed_days() {
        let upd = step(Some(3600), Some(1200), 24, Some(20));
        // four days allow 8%: 3312, smoothing gives 3360
        assert_eq!(upd.floor_seconds, Some(3360));

        let steep = FloorSmoothing {
            down_rate: 1.0,
            ..FloorSmoothing::default()
        };
        let upd = update_effective_floor(Some(3600), Some(0), day(24), Some(day(22)), &steep);
        assert_eq!(upd.floor_seconds, Some(3456));
    }
}
