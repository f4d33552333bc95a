//! Deterministic simulation of a user training with the planner.
//!
//! A seeded user model answers each plan with a focus duration. The loop is
//! the same one a real caller runs: metrics, plan, outcome, update. The same
//! seed always produces the same session durations.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use crate::engine::blend::{bucket_history, compute_blended_metrics};
use crate::planner::{Plan, PlanContext, PlanMode, Planner};
use crate::session::{Intensity, Phase, SessionRecord, StopReason, TimeBucket};
use crate::storage::{MemoryStateStore, PlannerConfig};

/// Hours (UTC) at which simulated sessions start, cycled per day.
const SESSION_HOURS: [u32; 4] = [9, 12, 16, 20];

/// Seed for deterministic simulation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulationSeed(pub u64);

impl SimulationSeed {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }
}

impl Default for SimulationSeed {
    fn default() -> Self {
        Self(42)
    }
}

/// How the simulated user performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserModel {
    /// Starting skill in [0.05, 0.95]. At 0.5 the user averages ~90% of goal.
    pub base_skill: f64,
    /// Skill gained per session until `plateau_day`.
    pub learn_rate: f64,
    /// Per-session skill noise amplitude.
    pub noise: f64,
    /// Skill lost per earlier session on the same day.
    pub fatigue: f64,
    /// Day index from which the user stops learning.
    #[serde(default)]
    pub plateau_day: Option<u32>,
    /// Skip every n-th day (day 0 is never skipped).
    #[serde(default)]
    pub gap_every: Option<u32>,
    pub interruption_prob: f64,
    pub distraction_prob: f64,
}

impl Default for UserModel {
    fn default() -> Self {
        Self {
            base_skill: 0.55,
            learn_rate: 0.015,
            noise: 0.08,
            fatigue: 0.06,
            plateau_day: None,
            gap_every: None,
            interruption_prob: 0.05,
            distraction_prob: 0.08,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationProfile {
    pub name: String,
    pub seed: SimulationSeed,
    pub days: u32,
    pub blocks_per_day: u32,
    pub start: NaiveDate,
    #[serde(default)]
    pub intensity: Intensity,
    pub model: UserModel,
}

fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 5).unwrap_or_default()
}

impl SimulationProfile {
    pub fn new(name: impl Into<String>, seed: u64, days: u32, blocks_per_day: u32) -> Self {
        Self {
            name: name.into(),
            seed: SimulationSeed::new(seed),
            days,
            blocks_per_day,
            start: default_start(),
            intensity: Intensity::Balanced,
            model: UserModel::default(),
        }
    }

    pub fn with_model(mut self, model: UserModel) -> Self {
        self.model = model;
        self
    }

    pub fn builtin_names() -> &'static [&'static str] {
        &["steady", "volatile", "plateau", "gaps", "elite"]
    }

    /// Named reference profiles.
    pub fn builtin(name: &str) -> Option<Self> {
        let p = match name {
            "steady" => Self::new("steady", 1337, 10, 4).with_model(UserModel::default()),
            "volatile" => Self::new("volatile", 2025, 10, 4).with_model(UserModel {
                base_skill: 0.50,
                learn_rate: 0.010,
                noise: 0.18,
                fatigue: 0.08,
                ..UserModel::default()
            }),
            "plateau" => Self::new("plateau", 4242, 14, 4).with_model(UserModel {
                base_skill: 0.58,
                learn_rate: 0.006,
                noise: 0.10,
                fatigue: 0.07,
                plateau_day: Some(6),
                ..UserModel::default()
            }),
            "gaps" => Self::new("gaps", 9001, 18, 3).with_model(UserModel {
                base_skill: 0.55,
                learn_rate: 0.012,
                noise: 0.12,
                fatigue: 0.06,
                gap_every: Some(4),
                ..UserModel::default()
            }),
            "elite" => Self::new("elite", 777, 10, 4).with_model(UserModel {
                base_skill: 0.75,
                learn_rate: 0.004,
                noise: 0.06,
                fatigue: 0.05,
                ..UserModel::default()
            }),
            _ => return None,
        };
        Some(p)
    }

    fn session_time(&self, day: u32, block: u32) -> DateTime<Utc> {
        let hour = SESSION_HOURS[block as usize % SESSION_HOURS.len()];
        let date = self.start + Duration::days(day as i64);
        let naive = date.and_hms_opt(hour, 0, 0).unwrap_or_default();
        Utc.from_utc_datetime(&naive)
    }
}

/// Mutable user state while a simulation runs.
#[derive(Debug, Clone)]
struct SimUser {
    skill: f64,
}

struct SimulatedFocus {
    seconds: f64,
    stop_reason: StopReason,
}

impl SimUser {
    fn respond(
        &mut self,
        goal_sec: u32,
        day: u32,
        block_today: u32,
        model: &UserModel,
        rng: &mut Mcg128Xsl64,
    ) -> SimulatedFocus {
        let goal = goal_sec as f64;
        let noise = rng.gen_range(-1.0..=1.0) * model.noise;
        let fatigue = block_today as f64 * model.fatigue;
        let skill = (self.skill + noise - fatigue).clamp(0.05, 0.95);

        let learning = match model.plateau_day {
            Some(p) if day >= p => 0.0,
            _ => model.learn_rate,
        };
        self.skill = (self.skill + learning).clamp(0.05, 0.95);

        let mult = (0.45 + 0.9 * skill + rng.gen_range(-0.20..=0.20)).clamp(0.40, 1.40);

        if rng.gen_bool(model.interruption_prob.clamp(0.0, 1.0)) {
            return SimulatedFocus {
                seconds: (goal * 0.3).round(),
                stop_reason: StopReason::Interrupted,
            };
        }
        if rng.gen_bool(model.distraction_prob.clamp(0.0, 1.0)) {
            return SimulatedFocus {
                seconds: (goal * rng.gen_range(0.55..0.70)).round(),
                stop_reason: StopReason::Distracted,
            };
        }

        let seconds = (goal * mult).round();
        let stop_reason = if seconds >= goal {
            StopReason::Completed
        } else {
            StopReason::Tired
        };
        SimulatedFocus {
            seconds,
            stop_reason,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub sessions: usize,
    /// Index of the first session planned in WAVE.
    pub phase_switch_index: Option<usize>,
    pub final_phase: Phase,
    pub final_floor: Option<u32>,
    pub push_count: usize,
    pub push_hits: usize,
    pub crash_count: usize,
    pub win_count: usize,
    pub boot_plans: usize,
    pub easy_plans: usize,
    pub cycles_started: u32,
    pub milestones: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub profile: String,
    pub seed: SimulationSeed,
    pub sessions: Vec<SessionRecord>,
    pub plans: Vec<Plan>,
    pub summary: SimulationSummary,
}

/// Run `profile` against a fresh in-memory planner.
pub fn run_simulation(profile: &SimulationProfile, config: &PlannerConfig) -> SimulationReport {
    let mut rng = Mcg128Xsl64::seed_from_u64(profile.seed.0);
    let mut planner = Planner::new(config.clone(), MemoryStateStore::new());
    let cfg = planner.config().clone();
    let mut user = SimUser {
        skill: profile.model.base_skill.clamp(0.05, 0.95),
    };

    let mut sessions: Vec<SessionRecord> = Vec::new();
    let mut plans: Vec<Plan> = Vec::new();

    for day in 0..profile.days {
        if let Some(every) = profile.model.gap_every.filter(|e| *e > 0) {
            if day > 0 && day % every == 0 {
                continue;
            }
        }

        for block in 0..profile.blocks_per_day {
            let now = profile.session_time(day, block);
            let bucket = TimeBucket::for_time(&now);
            let bucket_sample =
                bucket_history(&sessions, bucket, now, cfg.analytics.bucket_recency_days);
            let metrics = compute_blended_metrics(&sessions, &bucket_sample, &cfg);

            let ctx = PlanContext::new(now)
                .with_intensity(profile.intensity)
                .with_blocks_today(block)
                .with_bucket(bucket, &bucket_sample);
            let plan = planner.plan_next(&sessions, &metrics, &ctx, &mut rng);

            let focus = user.respond(plan.goal_sec, day, block, &profile.model, &mut rng);
            let record = SessionRecord::from_plan(
                &plan,
                &metrics,
                cfg.floor_engine.min_frac_goal,
                focus.seconds,
                Some(focus.stop_reason),
                now,
                Some(bucket),
            );
            planner.update_after_block(&record);

            sessions.push(record);
            plans.push(plan);
        }
    }

    let state = planner.state();
    let summary = summarize(&sessions, &plans, state.floor_seconds, state.phase);
    tracing::debug!(
        profile = %profile.name,
        sessions = summary.sessions,
        final_floor = ?summary.final_floor,
        "simulation finished"
    );

    SimulationReport {
        profile: profile.name.clone(),
        seed: profile.seed,
        sessions,
        plans,
        summary,
    }
}

fn summarize(
    sessions: &[SessionRecord],
    plans: &[Plan],
    final_floor: Option<u32>,
    final_phase: Phase,
) -> SimulationSummary {
    let mut cycles: Vec<u32> = plans
        .iter()
        .filter(|p| p.phase == Phase::Wave)
        .map(|p| p.cycle_id)
        .collect();
    cycles.dedup();

    SimulationSummary {
        sessions: sessions.len(),
        phase_switch_index: plans.iter().position(|p| p.phase == Phase::Wave),
        final_phase,
        final_floor,
        push_count: plans.iter().filter(|p| p.is_push()).count(),
        push_hits: sessions.iter().filter(|s| s.push_hit).count(),
        crash_count: sessions.iter().filter(|s| s.crash).count(),
        win_count: sessions.iter().filter(|s| s.win).count(),
        boot_plans: plans.iter().filter(|p| p.mode == PlanMode::Boot).count(),
        easy_plans: plans.iter().filter(|p| p.mode == PlanMode::WaveEasy).count(),
        cycles_started: cycles.len() as u32,
        milestones: plans
            .last()
            .map(|p| p.earned_milestones.clone())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn focus_trace(report: &SimulationReport) -> Vec<Option<f64>> {
        report.sessions.iter().map(|s| s.focus_seconds).collect()
    }

    #[test]
    fn same_seed_same_run() {
        let profile = SimulationProfile::builtin("steady").unwrap();
        let cfg = PlannerConfig::default();
        let a = run_simulation(&profile, &cfg);
        let b = run_simulation(&profile, &cfg);
        assert_eq!(focus_trace(&a), focus_trace(&b));
        assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn different_seed_different_run() {
        let cfg = PlannerConfig::default();
        let a = run_simulation(&SimulationProfile::new("a", 1, 5, 4), &cfg);
        let b = run_simulation(&SimulationProfile::new("b", 2, 5, 4), &cfg);
        assert_ne!(focus_trace(&a), focus_trace(&b));
    }

    #[test]
    fn gap_days_are_skipped() {
        let profile = SimulationProfile::builtin("gaps").unwrap();
        let report = run_simulation(&profile, &PlannerConfig::default());
        // days 4, 8, 12, 16 are skipped out of 18
        assert_eq!(report.summary.sessions, 14 * 3);
    }

    #[test]
    fn first_sessions_are_boot() {
        let profile = SimulationProfile::new("boot", 5, 1, 2);
        let report = run_simulation(&profile, &PlannerConfig::default());
        assert_eq!(report.plans[0].mode, PlanMode::Boot);
        assert_eq!(report.plans[0].goal_sec, 1500);
        assert!(report.summary.boot_plans >= 1);
    }

    #[test]
    fn push_count_matches_push_plans() {
        let profile = SimulationProfile::builtin("plateau").unwrap();
        let report = run_simulation(&profile, &PlannerConfig::default());
        let pushes = report
            .plans
            .iter()
            .filter(|p| p.block_type == crate::session::BlockType::Push)
            .count();
        assert_eq!(report.summary.push_count, pushes);
    }

    #[test]
    fn sessions_are_spread_over_the_day() {
        let profile = SimulationProfile::new("hours", 3, 1, 4);
        let report = run_simulation(&profile, &PlannerConfig::default());
        let buckets: Vec<_> = report.sessions.iter().map(|s| s.bucket).collect();
        assert_eq!(
            buckets,
            vec![
                Some(TimeBucket::Morning),
                Some(TimeBucket::Afternoon),
                Some(TimeBucket::Afternoon),
                Some(TimeBucket::Evening),
            ]
        );
    }
}
