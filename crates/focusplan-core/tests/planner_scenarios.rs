//! Planner state machine scenarios.
//!
//! Each test drives the planner the way a caller would: compute metrics
//! from the history, plan, record the outcome, update.

use chrono::{DateTime, Duration, TimeZone, Utc};
use focusplan_core::engine::goal::pick_goal_from_band;
use focusplan_core::engine::wave::{build_adaptive_cycle, MomentumLevel};
use focusplan_core::{
    compute_blended_metrics, BlockType, Intensity, MemoryStateStore, Phase, Plan, PlanContext,
    PlanMode, Planner, PlannerConfig, PlannerState, SessionRecord, StopReason, TrainingStrategy,
};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;

// ============================================================================
// Helpers
// ============================================================================

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

fn rng() -> Mcg128Xsl64 {
    Mcg128Xsl64::seed_from_u64(99)
}

/// Ten valid sessions of the same length, all meeting their goal.
fn flat_history(focus: f64) -> Vec<SessionRecord> {
    (0..10)
        .map(|i| SessionRecord::new(focus, Some(focus), t0() + Duration::hours(i)))
        .collect()
}

/// Steadily improving sessions: no plateau.
fn improving_history() -> Vec<SessionRecord> {
    (0..10)
        .map(|i| {
            let focus = 1500.0 + 30.0 * i as f64;
            SessionRecord::new(focus, Some(1500.0), t0() + Duration::hours(i))
        })
        .collect()
}

/// Flat sessions where every other one ended distracted: plateau by fails and flatness.
fn plateau_history() -> Vec<SessionRecord> {
    (0..10)
        .map(|i| {
            let rec = SessionRecord::new(1500.0, Some(1500.0), t0() + Duration::hours(i));
            if i % 2 == 0 {
                rec.with_stop_reason(StopReason::Distracted)
            } else {
                rec
            }
        })
        .collect()
}

struct Harness {
    planner: Planner<MemoryStateStore>,
    history: Vec<SessionRecord>,
    rng: Mcg128Xsl64,
}

impl Harness {
    fn new(
        config: PlannerConfig,
        state: Option<PlannerState>,
        history: Vec<SessionRecord>,
    ) -> Self {
        let store = match state {
            Some(s) => MemoryStateStore::with_state(s),
            None => MemoryStateStore::new(),
        };
        Self {
            planner: Planner::new(config, store),
            history,
            rng: rng(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        t0() + Duration::hours(self.history.len() as i64 + 1)
    }

    fn plan(&mut self) -> Plan {
        let metrics = compute_blended_metrics(&self.history, &[], self.planner.config());
        let ctx = PlanContext::new(self.now());
        self.planner.plan_next(&self.history, &metrics, &ctx, &mut self.rng)
    }

    /// Plan, then complete the session with `focus` seconds.
    fn session(&mut self, focus: f64) -> Plan {
        let plan = self.plan();
        let metrics = compute_blended_metrics(&self.history, &[], self.planner.config());
        let rec = SessionRecord::from_plan(
            &plan,
            &metrics,
            self.planner.config().floor_engine.min_frac_goal,
            focus,
            Some(StopReason::Completed),
            self.now(),
            None,
        );
        self.planner.update_after_block(&rec);
        self.history.push(rec);
        plan
    }
}

// ============================================================================
// BOOT and LINEAR
// ============================================================================

#[test]
fn empty_history_boots_at_25_minutes() {
    let mut h = Harness::new(PlannerConfig::default(), None, Vec::new());
    let plan = h.plan();
    assert_eq!(plan.mode, PlanMode::Boot);
    assert_eq!(plan.phase, Phase::Linear);
    assert_eq!(plan.block_type, BlockType::Consolidate);
    assert_eq!((plan.target_low, plan.target_high), (1200, 1800));
    assert_eq!(plan.goal_sec, 1500);
    assert_eq!(plan.push_target, 0);
}

#[test]
fn linear_bumps_after_enough_wins() {
    let mut h = Harness::new(PlannerConfig::default(), None, improving_history());
    let plan = h.plan();
    assert_eq!(plan.mode, PlanMode::Linear);
    assert_eq!(plan.tier, 1);
    assert_eq!(plan.target_low, plan.floor_sec);
    let pick = pick_goal_from_band(plan.target_low, plan.target_high, Intensity::Balanced);
    assert_eq!(plan.raw_goal_sec, pick.max(plan.min_goal_sec) + 120);
    assert_eq!(plan.goal_sec, plan.raw_goal_sec);
    assert_eq!(h.planner.state().linear_goal_seconds, plan.raw_goal_sec);
}

#[test]
fn linear_goal_never_regresses() {
    let mut h = Harness::new(PlannerConfig::default(), None, improving_history());
    let first = h.session(1400.0);
    let second = h.plan();
    assert_eq!(second.phase, Phase::Linear);
    assert!(second.raw_goal_sec >= first.raw_goal_sec);
}

#[test]
fn fatigue_scales_linear_goal() {
    let mut h = Harness::new(PlannerConfig::default(), None, improving_history());
    let metrics = compute_blended_metrics(&h.history, &[], h.planner.config());
    let ctx = PlanContext::new(h.now()).with_blocks_today(5);
    let plan = h.planner.plan_next(&h.history, &metrics, &ctx, &mut h.rng);
    assert_eq!(plan.fatigue_factor, 0.75);
    let expected = ((plan.raw_goal_sec as f64) * 0.75).round() as u32;
    assert_eq!(plan.goal_sec, expected.max(plan.min_goal_sec));
}

// ============================================================================
// Phase transitions
// ============================================================================

#[test]
fn plateau_switches_to_wave() {
    let mut h = Harness::new(PlannerConfig::default(), None, plateau_history());
    let plan = h.plan();
    assert_eq!(plan.phase, Phase::Wave);
    assert_eq!(plan.mode, PlanMode::Wave);
    assert_eq!(plan.cycle_id, 1);
    assert_eq!(plan.cycle_pos, 1);
    // every scored session was a win, so momentum is HIGH and the cycle opens with a push
    assert_eq!(plan.momentum.level, MomentumLevel::High);
    assert_eq!(plan.block_type, BlockType::Push);
    assert_eq!(plan.push_target, plan.target_high + 60);
    assert_eq!(plan.goal_sec, plan.push_target);
    assert_eq!(h.planner.state().linear_goal_seconds, 0);
}

#[test]
fn wave_consumes_cycle_then_regenerates() {
    let mut h = Harness::new(PlannerConfig::default(), None, plateau_history());
    let mut kinds = Vec::new();
    let mut ids = Vec::new();
    for _ in 0..5 {
        let plan = h.session(1500.0);
        kinds.push(plan.block_type);
        ids.push(plan.cycle_id);
    }
    assert_eq!(&kinds[..4], build_adaptive_cycle(MomentumLevel::High).as_slice());
    assert_eq!(ids, vec![1, 1, 1, 1, 2]);
    assert_eq!(h.planner.state().phase, Phase::Wave);
}

#[test]
fn wave_is_terminal() {
    let mut h = Harness::new(PlannerConfig::default(), None, plateau_history());
    h.session(1500.0);
    for _ in 0..6 {
        // strong improvement would never trip a plateau, yet the phase stays WAVE
        let plan = h.session(2400.0);
        assert_eq!(plan.phase, Phase::Wave);
    }
}

#[test]
fn wave_only_strategy_skips_linear() {
    let mut cfg = PlannerConfig::default();
    cfg.wave.training_strategy = TrainingStrategy::WaveOnly;
    let mut h = Harness::new(cfg, None, improving_history());
    let plan = h.plan();
    assert_eq!(plan.phase, Phase::Wave);
    assert_ne!(plan.mode, PlanMode::Linear);
    assert!(!h.planner.state().cycle.is_empty());
}

#[test]
fn single_plateau_signal_stays_linear() {
    // flat but clean: only the flatness flag is raised
    let mut h = Harness::new(PlannerConfig::default(), None, flat_history(1500.0));
    let plan = h.plan();
    assert_eq!(plan.phase, Phase::Linear);
}

// ============================================================================
// Effective floor
// ============================================================================

#[test]
fn floor_rises_fast_and_drops_slowly_within_a_day() {
    let today = t0().date_naive();
    let state = PlannerState {
        floor_seconds: Some(1200),
        floor_date: Some(today),
        ..PlannerState::default()
    };
    let mut h = Harness::new(PlannerConfig::default(), Some(state), flat_history(1800.0));
    let jump = h.plan();
    // 1200 + 0.35 * (1800 - 1200)
    assert_eq!(jump.floor_sec, 1410);
    assert_eq!(h.planner.state().floor_seconds, Some(1410));
    assert_eq!(jump.diagnostics["floor_raw_blended"], 1800);

    let mut lower = flat_history(1000.0);
    lower.push(SessionRecord::new(1000.0, Some(1000.0), t0() + Duration::hours(10)));
    h.history = lower;
    assert_eq!(h.now().date_naive(), today);
    let drop = h.plan();
    // smoothing alone would give 1410 - 0.10 * 410 = 1369; the daily guard keeps 1410 * 0.98
    assert_eq!(drop.floor_sec, 1382);
    assert_eq!(h.planner.state().floor_seconds, Some(1382));
    assert_eq!(h.planner.state().floor_date, Some(today));
}

#[test]
fn small_same_day_drop_follows_smoothing() {
    let today = t0().date_naive();
    let state = PlannerState {
        floor_seconds: Some(1300),
        floor_date: Some(today),
        ..PlannerState::default()
    };
    let mut h = Harness::new(PlannerConfig::default(), Some(state), flat_history(1200.0));
    // 1300 - 0.10 * 100 = 1290, above the guard at 1274
    assert_eq!(h.plan().floor_sec, 1290);
}

#[test]
fn huge_sessions_saturate_instead_of_overflowing() {
    let history: Vec<SessionRecord> = (0..10)
        .map(|i| SessionRecord::new(5e9, Some(5e9), t0() + Duration::hours(i)))
        .collect();
    let mut h = Harness::new(PlannerConfig::default(), None, history);
    let first = h.session(5e9);
    assert_eq!(first.floor_sec, u32::MAX);
    assert!(first.target_low <= first.target_high);
    assert!(first.goal_sec >= first.min_goal_sec);

    let mut wave = Harness::new(PlannerConfig::default(), Some(wave_state()), h.history.clone());
    for _ in 0..4 {
        let plan = wave.session(5e9);
        assert!(plan.goal_sec >= plan.min_goal_sec);
        assert!(plan.target_low <= plan.target_high);
    }
}

// ============================================================================
// Recovery
// ============================================================================

fn wave_state() -> PlannerState {
    PlannerState {
        phase: Phase::Wave,
        cycle_id: 1,
        cycle: build_adaptive_cycle(MomentumLevel::Mid),
        ..PlannerState::default()
    }
}

#[test]
fn hard_crash_forces_two_easy_sessions() {
    let mut h = Harness::new(PlannerConfig::default(), Some(wave_state()), flat_history(1500.0));
    let crash = SessionRecord::new(300.0, Some(1500.0), h.now()).with_crash(true, Some(900));
    let recovery = h.planner.update_after_block(&crash).unwrap();
    assert_eq!(recovery.forced_easy, 2);
    assert!(recovery.forced_recovery);
    h.history.push(crash);

    let first = h.session(1500.0);
    let second = h.session(1500.0);
    let third = h.session(1500.0);

    for easy in [&first, &second] {
        assert_eq!(easy.mode, PlanMode::WaveEasy);
        assert_eq!(easy.block_type, BlockType::Consolidate);
        assert_eq!(easy.push_target, 0);
        assert!(easy.goal_sec >= easy.min_goal_sec);
        // easy sessions do not consume a slot
        assert_eq!(easy.cycle_pos, 1);
    }
    assert_eq!(third.mode, PlanMode::Wave);
    assert_eq!(third.block_type, BlockType::Push);
    assert_eq!(h.planner.state().forced_easy, 0);
}

#[test]
fn mild_crash_forces_one_easy_session() {
    let mut h = Harness::new(PlannerConfig::default(), Some(wave_state()), flat_history(1500.0));
    let crash = SessionRecord::new(800.0, Some(1500.0), h.now()).with_crash(true, Some(900));
    let recovery = h.planner.update_after_block(&crash).unwrap();
    assert_eq!(recovery.forced_easy, 1);
    assert!(!recovery.forced_recovery);
    assert!(!h.planner.state().forced_recovery);
}

#[test]
fn late_day_crash_is_not_penalized() {
    let mut h = Harness::new(PlannerConfig::default(), Some(wave_state()), flat_history(1500.0));
    let crash = SessionRecord::new(100.0, Some(1500.0), h.now())
        .with_crash(true, Some(900))
        .with_blocks_today(3);
    let recovery = h.planner.update_after_block(&crash).unwrap();
    assert!(recovery.excused_by_fatigue);
    assert_eq!(h.planner.state().forced_easy, 0);
    assert!(!h.planner.state().forced_recovery);
}

#[test]
fn forced_recovery_builds_low_cycle() {
    let state = PlannerState {
        phase: Phase::Wave,
        cycle_id: 3,
        cycle: build_adaptive_cycle(MomentumLevel::High),
        cycle_pos: 4,
        forced_recovery: true,
        ..PlannerState::default()
    };
    let mut h = Harness::new(PlannerConfig::default(), Some(state), flat_history(1500.0));
    let plan = h.plan();
    assert_eq!(plan.cycle_id, 4);
    assert_eq!(plan.block_type, BlockType::Consolidate);
    assert_eq!(h.planner.state().cycle, build_adaptive_cycle(MomentumLevel::Low));
    assert!(!h.planner.state().forced_recovery);
}

#[test]
fn overshoots_trip_stability_gate() {
    let mut history = flat_history(1500.0);
    for i in 0..3 {
        history.push(SessionRecord::new(2100.0, Some(1500.0), t0() + Duration::hours(20 + i)));
    }
    let mut h = Harness::new(PlannerConfig::default(), Some(wave_state()), history);
    let plan = h.plan();
    assert_eq!(plan.mode, PlanMode::WaveEasy);
    assert_eq!(h.planner.state().forced_easy, 1);
    assert!(plan.diagnostics.contains_key("stability"));
}

// ============================================================================
// Caching and milestones
// ============================================================================

#[test]
fn unchanged_history_returns_cached_plan() {
    let mut h = Harness::new(PlannerConfig::default(), Some(wave_state()), flat_history(1500.0));
    let a = h.plan();
    let b = h.plan();
    assert_eq!(a, b);
    assert_eq!(h.planner.state().cycle_pos, 1);
    assert_eq!(h.planner.store().save_count(), 1);
}

#[test]
fn config_change_invalidates_cache() {
    let mut h = Harness::new(PlannerConfig::default(), None, improving_history());
    let a = h.plan();
    let mut cfg = PlannerConfig::default();
    cfg.wave.linear_bump_tier1_sec = 300;
    h.planner.set_config(cfg);
    let b = h.plan();
    // the running linear goal carries over, the bump grows
    assert_eq!(b.raw_goal_sec, a.raw_goal_sec + 300);
}

#[test]
fn milestones_reported_once() {
    let mut h = Harness::new(PlannerConfig::default(), None, flat_history(1500.0));
    let first = h.session(1500.0);
    assert_eq!(first.new_milestone, Some(25));
    assert_eq!(first.earned_milestones, vec![15, 20, 25]);
    let second = h.plan();
    assert_eq!(second.new_milestone, None);
    assert_eq!(second.earned_milestones, vec![15, 20, 25]);
}

#[test]
fn reset_returns_to_defaults() {
    let mut h = Harness::new(PlannerConfig::default(), Some(wave_state()), flat_history(1500.0));
    h.plan();
    h.planner.reset();
    assert_eq!(h.planner.state(), &PlannerState::default());
    assert!(h.planner.store().stored().is_none());
}
