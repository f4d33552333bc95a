//! Planning engines, leaves first.
//!
//! - [`metrics`]: percentile metrics and crash/overshoot thresholds
//! - [`floor`]: smoothed effective floor with a daily decay guard
//! - [`blend`]: global vs. time-bucket blending
//! - [`wave`]: momentum, cycles, plateau, stability, fatigue, crash recovery
//! - [`goal`]: bands and concrete goal durations
//!
//! Every function here is pure. State lives in [`crate::planner`].

pub mod blend;
pub mod floor;
pub mod goal;
pub mod metrics;
pub mod wave;

/// Linear-interpolated rank statistic. `q` outside [0, 1] snaps to min/max.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    if q <= 0.0 {
        return sorted.first().copied();
    }
    if q >= 1.0 {
        return sorted.last().copied();
    }

    let idx = q * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let t = idx - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * t)
}

/// Round a non-negative duration to whole seconds.
pub(crate) fn round_sec(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// The last `n` items of a slice.
pub(crate) fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}
