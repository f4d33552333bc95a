//! File-backed planner state, history and config.

use chrono::{Duration, TimeZone, Utc};
use focusplan_core::{
    compute_blended_metrics, FileStateStore, HistoryFile, Phase, PlanContext, PlanMode, Planner,
    PlannerConfig, SessionRecord, StateStore, StopReason,
};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;

fn plateau_history() -> Vec<SessionRecord> {
    let start = Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap();
    (0..10)
        .map(|i| {
            let rec = SessionRecord::new(1500.0, Some(1500.0), start + Duration::hours(i));
            if i % 2 == 0 {
                rec.with_stop_reason(StopReason::Distracted)
            } else {
                rec
            }
        })
        .collect()
}

#[test]
fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner_state.json");
    let history = plateau_history();
    let cfg = PlannerConfig::default();
    let metrics = compute_blended_metrics(&history, &[], &cfg);
    let now = Utc.with_ymd_and_hms(2026, 6, 2, 9, 0, 0).unwrap();
    let mut rng = Mcg128Xsl64::seed_from_u64(5);

    let before = {
        let mut planner = Planner::new(cfg.clone(), FileStateStore::new(&path));
        let plan = planner.plan_next(&history, &metrics, &PlanContext::new(now), &mut rng);
        assert_eq!(plan.phase, Phase::Wave);
        assert!(planner.last_persist_error().is_none());
        planner.state().clone()
    };

    let planner = Planner::new(cfg, FileStateStore::new(&path));
    assert_eq!(planner.state(), &before);
    assert_eq!(planner.state().cycle_pos, 1);
    assert_eq!(planner.state().floor_seconds, Some(1500));
}

#[test]
fn corrupt_state_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner_state.json");
    std::fs::write(&path, "{ definitely not json").unwrap();

    let mut planner = Planner::new(PlannerConfig::default(), FileStateStore::new(&path));
    assert_eq!(planner.state().phase, Phase::Linear);

    let now = Utc.with_ymd_and_hms(2026, 6, 2, 9, 0, 0).unwrap();
    let mut rng = Mcg128Xsl64::seed_from_u64(5);
    let plan = planner.plan_next(&[], &Default::default(), &PlanContext::new(now), &mut rng);
    assert_eq!(plan.mode, PlanMode::Boot);

    // the bad file was replaced by a valid one
    let reloaded = FileStateStore::new(&path).load().unwrap();
    assert!(reloaded.is_some());
}

#[test]
fn failed_save_still_returns_plan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("planner_state.json");
    let mut planner = Planner::new(PlannerConfig::default(), FileStateStore::new(&path));

    let now = Utc.with_ymd_and_hms(2026, 6, 2, 9, 0, 0).unwrap();
    let mut rng = Mcg128Xsl64::seed_from_u64(5);
    let plan = planner.plan_next(&[], &Default::default(), &PlanContext::new(now), &mut rng);
    assert_eq!(plan.goal_sec, 1500);
    assert!(planner.last_persist_error().is_some());
}

#[test]
fn history_and_planner_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let history_file = HistoryFile::new(dir.path().join("sessions.jsonl"));
    for rec in plateau_history() {
        history_file.append(&rec).unwrap();
    }
    let history = history_file.load().unwrap();
    assert_eq!(history.len(), 10);
    assert_eq!(
        history.iter().filter(|r| r.is_distracted()).count(),
        5
    );

    let cfg = PlannerConfig::default();
    let metrics = compute_blended_metrics(&history, &[], &cfg);
    assert_eq!(metrics.floor, Some(1500));
}

#[test]
fn config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut cfg = PlannerConfig::default();
    cfg.set("wave.push_pct_high", "0.15").unwrap();
    cfg.set("wave.training_strategy", "WAVE_ONLY").unwrap();
    cfg.save_to(&path).unwrap();

    let loaded = PlannerConfig::load_from(&path).unwrap();
    assert_eq!(loaded, cfg);
    assert_eq!(loaded.get("wave.push_pct_high").as_deref(), Some("0.15"));
    assert!(PlannerConfig::load_from(&dir.path().join("absent.toml")).is_ok());
}
