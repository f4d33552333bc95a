//! Soft blending of global and time-bucket metrics.
//!
//! With few sessions in the current bucket the global metrics dominate; the
//! bucket weight ramps linearly from 0 at `bucket_min_n` samples to 1 at
//! `bucket_full_n`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::{compute_planning_metrics, PlanningMetrics};
use super::round_sec;
use crate::session::{SessionRecord, TimeBucket};
use crate::storage::PlannerConfig;

/// Bucket trust in [0, 1] for a bucket sample of `bucket_n` sessions.
pub fn bucket_blend_weight(bucket_n: usize, min_n: usize, full_n: usize) -> f64 {
    let full_n = full_n.max(min_n + 1);
    if bucket_n <= min_n {
        return 0.0;
    }
    ((bucket_n - min_n) as f64 / (full_n - min_n) as f64).clamp(0.0, 1.0)
}

/// `(1 - w) * global + w * bucket`, falling back to whichever side exists.
pub fn blend_scalar(global: Option<f64>, bucket: Option<f64>, w: f64) -> Option<f64> {
    let global = global.filter(|v| v.is_finite());
    let bucket = bucket.filter(|v| v.is_finite());
    match (global, bucket) {
        (Some(g), Some(b)) => Some((1.0 - w) * g + w * b),
        (Some(g), None) => Some(g),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn blend_sec(global: Option<u32>, bucket: Option<u32>, w: f64) -> Option<u32> {
    blend_scalar(global.map(f64::from), bucket.map(f64::from), w).map(round_sec)
}

/// Sessions from `bucket` no older than `recency_days` before `now`.
pub fn bucket_history(
    history: &[SessionRecord],
    bucket: TimeBucket,
    now: DateTime<Utc>,
    recency_days: i64,
) -> Vec<SessionRecord> {
    let cutoff = now - Duration::days(recency_days.max(0));
    history
        .iter()
        .filter(|s| s.bucket == Some(bucket) && s.timestamp >= cutoff)
        .cloned()
        .collect()
}

/// Metrics after bucket blending.
///
/// Blended scalars drive planning. Recent-window statistics and thresholds
/// are taken from the global metrics unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlendedMetrics {
    pub floor: Option<u32>,
    pub median: Option<u32>,
    pub ceiling: Option<u32>,
    pub iqr: Option<u32>,

    pub floor_global: Option<u32>,
    pub median_global: Option<u32>,
    pub ceiling_global: Option<u32>,
    pub iqr_global: Option<u32>,

    pub floor_bucket: Option<u32>,
    pub median_bucket: Option<u32>,
    pub ceiling_bucket: Option<u32>,
    pub iqr_bucket: Option<u32>,

    pub bucket_weight: f64,
    pub bucket_n: usize,

    pub recent_iqr: Option<u32>,
    pub recent_n: usize,
    pub recent_crashes: usize,
    pub recent_overshoots_7: usize,
    pub crash_threshold: Option<u32>,
    pub overshoot_threshold: Option<u32>,
}

impl BlendedMetrics {
    /// Global metrics only, bucket weight 0.
    pub fn from_global(global: &PlanningMetrics) -> Self {
        blend_metrics(global, &PlanningMetrics::default(), 0, 0, 1)
    }

    pub fn is_ready(&self) -> bool {
        self.floor.is_some() && self.median.is_some()
    }
}

/// Blend global and bucket metrics for a bucket sample of `bucket_n`.
pub fn blend_metrics(
    global: &PlanningMetrics,
    bucket: &PlanningMetrics,
    bucket_n: usize,
    min_n: usize,
    full_n: usize,
) -> BlendedMetrics {
    let w = bucket_blend_weight(bucket_n, min_n, full_n);

    BlendedMetrics {
        floor: blend_sec(global.floor, bucket.floor, w),
        median: blend_sec(global.median, bucket.median, w),
        ceiling: blend_sec(global.ceiling, bucket.ceiling, w),
        iqr: blend_sec(global.iqr, bucket.iqr, w),

        floor_global: global.floor,
        median_global: global.median,
        ceiling_global: global.ceiling,
        iqr_global: global.iqr,

        floor_bucket: bucket.floor,
        median_bucket: bucket.median,
        ceiling_bucket: bucket.ceiling,
        iqr_bucket: bucket.iqr,

        bucket_weight: w,
        bucket_n,

        recent_iqr: global.recent_iqr,
        recent_n: global.recent_n,
        recent_crashes: global.recent_crashes,
        recent_overshoots_7: global.recent_overshoots_7,
        crash_threshold: global.crash_threshold,
        overshoot_threshold: global.overshoot_threshold,
    }
}

/// Global metrics over `history`, bucket metrics over `bucket_history`,
/// blended with the configured ramp.
pub fn compute_blended_metrics(
    history: &[SessionRecord],
    bucket_history: &[SessionRecord],
    cfg: &PlannerConfig,
) -> BlendedMetrics {
    let global = compute_planning_metrics(history, cfg);
    let bucket = compute_planning_metrics(bucket_history, cfg);
    blend_metrics(
        &global,
        &bucket,
        bucket_history.len(),
        cfg.analytics.bucket_min_n,
        cfg.analytics.bucket_full_n,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn weight_ramps_between_min_and_full() {
        assert_eq!(bucket_blend_weight(0, 3, 9), 0.0);
        assert_eq!(bucket_blend_weight(3, 3, 9), 0.0);
        assert_eq!(bucket_blend_weight(6, 3, 9), 0.5);
        assert_eq!(bucket_blend_weight(9, 3, 9), 1.0);
        assert_eq!(bucket_blend_weight(40, 3, 9), 1.0);
    }

    #[test]
    fn blend_falls_back_to_present_side() {
        assert_eq!(blend_scalar(Some(100.0), None, 0.7), Some(100.0));
        assert_eq!(blend_scalar(None, Some(80.0), 0.0), Some(80.0));
        assert_eq!(blend_scalar(None, None, 0.5), None);
        assert_eq!(blend_scalar(Some(100.0), Some(200.0), 0.25), Some(125.0));
        assert_eq!(blend_scalar(Some(f64::NAN), Some(200.0), 0.25), Some(200.0));
    }

    #[test]
    fn recent_stats_come_from_global() {
        let global = PlanningMetrics {
            floor: Some(1500),
            median: Some(1800),
            recent_crashes: 2,
            crash_threshold: Some(900),
            ..PlanningMetrics::default()
        };
        let bucket = PlanningMetrics {
            floor: Some(2100),
            median: Some(2400),
            recent_crashes: 0,
            crash_threshold: Some(1260),
            ..PlanningMetrics::default()
        };
        let m = blend_metrics(&global, &bucket, 6, 3, 9);
        assert_eq!(m.floor, Some(1800));
        assert_eq!(m.median, Some(2100));
        assert_eq!(m.recent_crashes, 2);
        assert_eq!(m.crash_threshold, Some(900));
        assert_eq!(m.floor_bucket, Some(2100));
    }

    #[test]
    fn bucket_history_applies_recency_filter() {
        let now = Utc.with_ymd_and_hms(2026, 3, 31, 9, 0, 0).unwrap();
        let fresh = SessionRecord::new(1500.0, None, now - Duration::days(3));
        let stale = SessionRecord::new(1500.0, None, now - Duration::days(45));
        let other = SessionRecord::new(1500.0, None, now - Duration::days(3))
            .with_bucket(TimeBucket::Evening);
        let history = vec![stale, fresh, other];

        let sample = bucket_history(&history, TimeBucket::Morning, now, 30);
        assert_eq!(sample.len(), 1);
    }
}
