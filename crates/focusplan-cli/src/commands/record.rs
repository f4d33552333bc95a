use clap::Args;
use focusplan_core::{Intensity, SessionRecord, StopReason, TimeBucket};
use serde_json::json;

use super::{open_planner, CmdResult, PendingPlan, PlanOptions, Workbench};

#[derive(Args)]
pub struct RecordArgs {
    /// Seconds actually focused
    #[arg(long)]
    pub focus: f64,
    /// Goal in seconds, overriding the planned one
    #[arg(long)]
    pub goal: Option<u32>,
    /// Why the session ended (completed, distracted, tired, interrupted, other)
    #[arg(long)]
    pub stop_reason: Option<StopReason>,
    /// Used only when no plan is pending
    #[arg(long, default_value = "balanced")]
    pub intensity: Intensity,
    /// Used only when no plan is pending
    #[arg(long)]
    pub bucket: Option<TimeBucket>,
    /// Used only when no plan is pending
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: RecordArgs) -> CmdResult {
    if !args.focus.is_finite() || args.focus < 0.0 {
        let msg = format!("focus must be a non-negative number of seconds, got {}", args.focus);
        return Err(msg.into());
    }

    let bench = Workbench::open()?;
    let pending = match PendingPlan::load_matching(bench.history.len()) {
        Some(pending) => pending,
        None => bench.plan(PlanOptions {
            intensity: args.intensity,
            bucket: args.bucket,
            blocks_today: None,
            seed: args.seed,
        })?,
    };

    let mut plan = pending.plan;
    if let Some(goal) = args.goal {
        plan.goal_sec = goal;
    }

    let mut planner = open_planner(bench.config.clone())?;
    let record = SessionRecord::from_plan(
        &plan,
        &pending.metrics,
        planner.config().floor_engine.min_frac_goal,
        args.focus,
        args.stop_reason,
        bench.now,
        Some(pending.bucket),
    );
    bench.history_file.append(&record)?;

    let recovery = planner.update_after_block(&record);
    if let Some(err) = planner.last_persist_error() {
        tracing::warn!(error = err, "planner state was not saved");
    }
    PendingPlan::clear()?;

    let out = json!({
        "record": record,
        "recovery": recovery,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
