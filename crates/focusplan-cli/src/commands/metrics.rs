use clap::Args;
use focusplan_core::TimeBucket;

use super::{CmdResult, Workbench};

#[derive(Args)]
pub struct MetricsArgs {
    /// Time-of-day bucket to blend in; defaults to now
    #[arg(long)]
    pub bucket: Option<TimeBucket>,
}

pub fn run(args: MetricsArgs) -> CmdResult {
    let bench = Workbench::open()?;
    let metrics = bench.metrics(bench.bucket(args.bucket));
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}
