use clap::Args;
use focusplan_core::{Intensity, TimeBucket};

use super::{CmdResult, PlanOptions, Workbench};

#[derive(Args)]
pub struct PlanArgs {
    /// Where to aim inside the target band (easy, balanced, hard)
    #[arg(long, default_value = "balanced")]
    pub intensity: Intensity,
    /// Time-of-day bucket (morning, afternoon, evening, night); defaults to now
    #[arg(long)]
    pub bucket: Option<TimeBucket>,
    /// Sessions already finished today; defaults to today's history count
    #[arg(long)]
    pub blocks_today: Option<u32>,
    /// Seed for push-target jitter
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: PlanArgs) -> CmdResult {
    let bench = Workbench::open()?;
    let pending = bench.plan(PlanOptions {
        intensity: args.intensity,
        bucket: args.bucket,
        blocks_today: args.blocks_today,
        seed: args.seed,
    })?;
    println!("{}", serde_json::to_string_pretty(&pending.plan)?);
    Ok(())
}
