//! Planner state machine.
//!
//! BOOT (no metrics) → LINEAR (progressive raising) → WAVE (push/consolidate
//! cycles), with WAVE_EASY recovery sessions inside WAVE. The transition to
//! WAVE is one-way.
//!
//! A [`Planner`] owns one user's [`PlannerState`] and writes it through an
//! injected [`StateStore`] after every mutating call. Plans are cached by
//! history length and an internal version counter that every mutation bumps.

mod plan;
mod state;

pub use plan::{Plan, PlanMode};
pub use state::{PlannerState, STATE_VERSION};

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::engine::blend::{blend_scalar, BlendedMetrics};
use crate::engine::floor::{compute_raw_floor, update_effective_floor, FloorSmoothing};
use crate::engine::goal::{
    adaptive_min_goal, apply_fatigue, boot_band, linear_band, linear_goal, wave_band,
    wave_easy_band, wave_goal, Band, LinearGoalInput, WaveGoalInput,
};
use crate::engine::round_sec;
use crate::engine::wave::{
    compute_momentum, crash_recovery, cycle_preview, detect_plateau, fatigue_factor,
    push_pct_for_level, stability_gate, start_new_cycle, tier_for_seconds, CrashRecovery,
    Momentum, MomentumLevel,
};
use crate::session::{BlockType, Intensity, Phase, SessionRecord, TimeBucket};
use crate::storage::{PlannerConfig, StateStore, TrainingStrategy};

/// Per-call inputs that are not part of the history.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub now: DateTime<Utc>,
    pub intensity: Intensity,
    /// Sessions already completed today.
    pub blocks_today: u32,
    pub bucket: Option<TimeBucket>,
    /// Bucket-restricted history. Empty means "use the full history".
    pub bucket_history: &'a [SessionRecord],
}

impl<'a> PlanContext<'a> {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            intensity: Intensity::default(),
            blocks_today: 0,
            bucket: None,
            bucket_history: &[],
        }
    }

    pub fn with_intensity(mut self, intensity: Intensity) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_blocks_today(mut self, blocks_today: u32) -> Self {
        self.blocks_today = blocks_today;
        self
    }

    pub fn with_bucket(mut self, bucket: TimeBucket, bucket_history: &'a [SessionRecord]) -> Self {
        self.bucket = Some(bucket);
        self.bucket_history = bucket_history;
        self
    }
}

#[derive(Debug, Clone)]
struct CachedPlan {
    history_len: usize,
    version: u64,
    plan: Plan,
}

pub struct Planner<S: StateStore> {
    config: PlannerConfig,
    state: PlannerState,
    store: S,
    version: u64,
    cache: Option<CachedPlan>,
    last_persist_error: Option<String>,
}

impl<S: StateStore> Planner<S> {
    /// Build a planner, loading any stored state.
    ///
    /// Stored state that cannot be loaded is replaced by defaults.
    pub fn new(config: PlannerConfig, store: S) -> Self {
        let state = match store.load() {
            Ok(Some(state)) => state.normalized(),
            Ok(None) => PlannerState::default(),
            Err(e) => {
                warn!(error = %e, "planner state unreadable, starting fresh");
                PlannerState::default()
            }
        };

        Self {
            config: config.sanitized(),
            state,
            store,
            version: 0,
            cache: None,
            last_persist_error: None,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Error from the most recent failed save, cleared by the next success.
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    pub fn set_config(&mut self, config: PlannerConfig) {
        self.config = config.sanitized();
        self.invalidate();
    }

    /// Drop the cached plan.
    pub fn invalidate(&mut self) {
        self.version += 1;
        self.cache = None;
    }

    /// Forget all progress and clear the stored state.
    pub fn reset(&mut self) {
        self.state = PlannerState::default();
        self.invalidate();
        match self.store.clear() {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                warn!(error = %e, "failed to clear planner state");
                self.last_persist_error = Some(e.to_string());
            }
        }
        info!("planner state reset");
    }

    fn persist(&mut self) {
        match self.store.save(&self.state) {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                warn!(error = %e, "failed to persist planner state");
                self.last_persist_error = Some(e.to_string());
            }
        }
    }

    /// Plan the next session.
    ///
    /// Returns the cached plan when neither the history length nor the
    /// planner version changed since the last call.
    pub fn plan_next<R: Rng + ?Sized>(
        &mut self,
        history: &[SessionRecord],
        metrics: &BlendedMetrics,
        ctx: &PlanContext<'_>,
        rng: &mut R,
    ) -> Plan {
        if let Some(cached) = &self.cache {
            if cached.history_len == history.len() && cached.version == self.version {
                debug!(history_len = history.len(), "plan cache hit");
                return cached.plan.clone();
            }
        }

        let plan = compute_plan(&self.config, &mut self.state, history, metrics, ctx, rng);
        self.persist();

        self.version += 1;
        self.cache = Some(CachedPlan {
            history_len: history.len(),
            version: self.version,
            plan: plan.clone(),
        });
        plan
    }

    /// Apply the outcome of a finished session.
    ///
    /// Returns the recovery decision when the session crashed during WAVE.
    pub fn update_after_block(&mut self, record: &SessionRecord) -> Option<CrashRecovery> {
        self.invalidate();

        if self.state.phase != Phase::Wave {
            self.state.forced_easy = 0;
            self.persist();
            return None;
        }

        if !record.crash {
            self.persist();
            return None;
        }

        let recovery = crash_recovery(
            record.focus_seconds.filter(|f| f.is_finite()).unwrap_or(0.0),
            record.crash_threshold_seconds,
            record.blocks_today,
            &self.config.wave,
        );
        self.state.forced_easy = recovery.forced_easy;
        if recovery.forced_recovery {
            self.state.forced_recovery = true;
        }
        info!(
            severity = ?recovery.severity,
            forced_easy = recovery.forced_easy,
            forced_recovery = recovery.forced_recovery,
            excused = recovery.excused_by_fatigue,
            "crash recovery applied"
        );

        self.persist();
        Some(recovery)
    }
}

/// Result of moving the effective floor for one planning call.
struct FloorStep {
    effective: Option<u32>,
    raw_global: Option<u32>,
    raw_bucket: Option<u32>,
    raw_blended: Option<u32>,
    new_milestone: Option<u32>,
}

fn step_floor(
    config: &PlannerConfig,
    state: &mut PlannerState,
    history: &[SessionRecord],
    eval_history: &[SessionRecord],
    bucket_weight: f64,
    today: NaiveDate,
) -> FloorStep {
    let fc = &config.floor_engine;
    let raw_global =
        compute_raw_floor(history, fc.window_n, fc.percentile, fc.min_frac_goal).seconds;
    let raw_bucket =
        compute_raw_floor(eval_history, fc.window_n, fc.percentile, fc.min_frac_goal).seconds;
    let raw_blended = blend_scalar(
        raw_global.map(f64::from),
        raw_bucket.map(f64::from),
        bucket_weight,
    )
    .map(round_sec);

    let update = update_effective_floor(
        state.floor_seconds,
        raw_blended,
        today,
        state.floor_date,
        &FloorSmoothing::from(fc),
    );
    if update.floor_seconds != state.floor_seconds {
        debug!(
            prev = ?state.floor_seconds,
            next = ?update.floor_seconds,
            raw = ?raw_blended,
            "effective floor updated"
        );
    }
    state.floor_seconds = update.floor_seconds;
    state.floor_date = Some(update.date);

    let new_milestone = update
        .floor_seconds
        .and_then(|f| state.earn_milestones(f, &config.wave.floor_milestones));
    if let Some(m) = new_milestone {
        info!(milestone_minutes = m, "floor milestone reached");
    }

    FloorStep {
        effective: update.floor_seconds,
        raw_global,
        raw_bucket,
        raw_blended,
        new_milestone,
    }
}

/// Fields shared by every plan of one call.
struct PlanShell {
    fatigue_factor: f64,
    blocks_today: u32,
    momentum: Momentum,
    new_milestone: Option<u32>,
    earned_milestones: Vec<u32>,
    diagnostics: BTreeMap<String, serde_json::Value>,
}

impl PlanShell {
    fn into_plan(self, mode: PlanMode, phase: Phase, block_type: BlockType, band: Band) -> Plan {
        let mut diagnostics = self.diagnostics;
        diagnostics.insert("mode".into(), json!(mode));

        Plan {
            mode,
            phase,
            block_type,
            target_low: band.low,
            target_high: band.high,
            push_target: 0,
            goal_sec: 0,
            raw_goal_sec: 0,
            floor_sec: 0,
            min_goal_sec: 0,
            tier: 1,
            cycle_id: 0,
            cycle_pos: 0,
            cycle_preview: None,
            fatigue_factor: self.fatigue_factor,
            blocks_today: self.blocks_today,
            momentum: self.momentum,
            new_milestone: self.new_milestone,
            earned_milestones: self.earned_milestones,
            diagnostics,
        }
    }
}

fn compute_plan<R: Rng + ?Sized>(
    config: &PlannerConfig,
    state: &mut PlannerState,
    history: &[SessionRecord],
    metrics: &BlendedMetrics,
    ctx: &PlanContext<'_>,
    rng: &mut R,
) -> Plan {
    let w = &config.wave;
    let eval_history = if ctx.bucket_history.is_empty() {
        history
    } else {
        ctx.bucket_history
    };

    // Compare against the IQR seen by the previous call, then remember this one.
    let prev_recent_iqr = state.prev_recent_iqr;
    if metrics.recent_iqr.is_some() {
        state.prev_recent_iqr = metrics.recent_iqr;
    }

    let fs = step_floor(
        config,
        state,
        history,
        eval_history,
        metrics.bucket_weight,
        ctx.now.date_naive(),
    );
    let momentum = compute_momentum(history, w);
    let ff = fatigue_factor(ctx.blocks_today, w);

    let mut diagnostics = BTreeMap::new();
    diagnostics.insert("strategy".into(), json!(w.training_strategy));
    diagnostics.insert("intensity".into(), json!(ctx.intensity));
    diagnostics.insert("bucket".into(), json!(ctx.bucket));
    diagnostics.insert("bucket_weight".into(), json!(metrics.bucket_weight));
    diagnostics.insert("floor_raw_global".into(), json!(fs.raw_global));
    diagnostics.insert("floor_raw_bucket".into(), json!(fs.raw_bucket));
    diagnostics.insert("floor_raw_blended".into(), json!(fs.raw_blended));
    diagnostics.insert("floor_metric".into(), json!(metrics.floor));

    let shell = PlanShell {
        fatigue_factor: ff,
        blocks_today: ctx.blocks_today,
        momentum: momentum.clone(),
        new_milestone: fs.new_milestone,
        earned_milestones: state.earned_milestones.iter().copied().collect(),
        diagnostics,
    };

    let (Some(metric_floor), Some(median)) = (metrics.floor, metrics.median) else {
        let band = boot_band(w);
        let goal = band.pick(ctx.intensity);
        let mut plan = shell.into_plan(PlanMode::Boot, Phase::Linear, BlockType::Consolidate, band);
        plan.goal_sec = goal;
        plan.raw_goal_sec = goal;
        plan.min_goal_sec = round_sec(w.milestone_minutes * 60.0);
        plan.cycle_id = state.cycle_id;
        return plan;
    };

    let floor = fs.effective.unwrap_or(metric_floor);
    let ceiling = metrics.ceiling.unwrap_or(median);
    let min_goal = adaptive_min_goal(floor, w);
    let tier = tier_for_seconds(floor);
    let plateau = detect_plateau(eval_history, config.floor_engine.min_frac_goal, w);

    match w.training_strategy {
        TrainingStrategy::LinearThenWave => {
            if state.phase != Phase::Wave && plateau.plateau {
                state.phase = Phase::Wave;
                state.linear_goal_seconds = 0;
                let nc = start_new_cycle(state.cycle_id, momentum.level);
                state.cycle_id = nc.cycle_id;
                state.cycle = nc.cycle;
                state.cycle_pos = 0;
                info!(
                    cycle_id = state.cycle_id,
                    fails = plateau.fails,
                    improve_pct = plateau.improve_pct,
                    vol_ratio = plateau.vol_ratio,
                    "plateau detected, switching to WAVE"
                );
            }
        }
        TrainingStrategy::WaveOnly => {
            if state.phase != Phase::Wave {
                info!("wave-only strategy, entering WAVE");
                state.phase = Phase::Wave;
                state.linear_goal_seconds = 0;
            }
        }
    }

    let mut shell = shell;
    let d = &mut shell.diagnostics;
    d.insert("plateau".into(), json!(plateau));
    d.insert("floor_effective".into(), json!(floor));
    d.insert("tier".into(), json!(tier));

    if state.phase == Phase::Wave {
        let verdict = stability_gate(metrics, prev_recent_iqr, &config.analytics);
        if verdict.tripped {
            state.forced_easy = state.forced_easy.max(w.forced_easy_hard_crash);
            warn!(
                by_crashes = verdict.by_crashes,
                by_overshoots = verdict.by_overshoots,
                by_iqr_widen = verdict.by_iqr_widen,
                forced_easy = state.forced_easy,
                "stability gate tripped"
            );
        }
        d.insert("stability".into(), json!(verdict));
    }

    if state.phase == Phase::Linear {
        let band = linear_band(floor, median, w);
        let lin = linear_goal(
            LinearGoalInput {
                band,
                min_goal,
                intensity: ctx.intensity,
                linear_goal: state.linear_goal_seconds,
                history: eval_history,
                tier,
                fatigue_factor: ff,
            },
            w,
        );
        state.linear_goal_seconds = lin.next_linear_goal;

        d.insert("linear_successes".into(), json!(lin.successes));
        d.insert("linear_window_n".into(), json!(lin.window_n));
        d.insert("linear_bumped".into(), json!(lin.bumped));

        let mut plan =
            shell.into_plan(PlanMode::Linear, Phase::Linear, BlockType::Consolidate, band);
        plan.goal_sec = lin.goal_sec;
        plan.raw_goal_sec = lin.raw_goal_sec;
        plan.floor_sec = floor;
        plan.min_goal_sec = min_goal;
        plan.tier = tier;
        plan.cycle_id = state.cycle_id;
        return plan;
    }

    if state.cycle_exhausted() {
        let level = if state.forced_recovery {
            MomentumLevel::Low
        } else {
            momentum.level
        };
        state.forced_recovery = false;
        let nc = start_new_cycle(state.cycle_id, level);
        debug!(cycle_id = nc.cycle_id, level = ?level, "new wave cycle");
        state.cycle_id = nc.cycle_id;
        state.cycle = nc.cycle;
        state.cycle_pos = 0;
    }
    let preview = cycle_preview(&state.cycle, w.wave_visibility);

    if state.forced_easy > 0 {
        state.forced_easy -= 1;
        let band = wave_easy_band(floor, median, w);
        let raw = min_goal.max(band.pick(ctx.intensity));

        d.insert("forced_easy_left".into(), json!(state.forced_easy));

        let mut plan =
            shell.into_plan(PlanMode::WaveEasy, Phase::Wave, BlockType::Consolidate, band);
        plan.goal_sec = apply_fatigue(raw, ff, min_goal);
        plan.raw_goal_sec = raw;
        plan.floor_sec = floor;
        plan.min_goal_sec = min_goal;
        plan.tier = tier;
        plan.cycle_id = state.cycle_id;
        plan.cycle_pos = state.cycle_pos + 1;
        plan.cycle_preview = preview;
        return plan;
    }

    let block_type = state.take_slot().unwrap_or_default();
    let band = wave_band(floor, median, w);
    let push_pct = (block_type == BlockType::Push).then(|| push_pct_for_level(momentum.level, w));
    let wg = wave_goal(
        WaveGoalInput {
            band,
            floor,
            ceiling,
            min_goal,
            intensity: ctx.intensity,
            push_pct,
            fatigue_factor: ff,
        },
        w,
        rng,
    );

    d.insert("base_goal".into(), json!(wg.base_goal_sec));
    d.insert("raw_push_target".into(), json!(wg.raw_push_target));
    d.insert("push_pct".into(), json!(wg.push_pct));

    let mut plan = shell.into_plan(PlanMode::Wave, Phase::Wave, block_type, band);
    plan.push_target = wg.push_target;
    plan.goal_sec = wg.goal_sec;
    plan.raw_goal_sec = wg.raw_goal_sec;
    plan.floor_sec = floor;
    plan.min_goal_sec = min_goal;
    plan.tier = tier;
    plan.cycle_id = state.cycle_id;
    plan.cycle_pos = state.cycle_pos;
    plan.cycle_preview = preview;
    plan
}
