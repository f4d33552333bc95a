use clap::Args;
use focusplan_core::{run_simulation, PlannerConfig, SimulationProfile};

use super::CmdResult;

#[derive(Args)]
pub struct SimulateArgs {
    /// Built-in user profile (steady, volatile, plateau, gaps, elite)
    #[arg(long, default_value = "steady")]
    pub profile: String,
    /// Simulated days
    #[arg(long)]
    pub days: Option<u32>,
    /// Sessions per simulated day
    #[arg(long)]
    pub blocks_per_day: Option<u32>,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Day from which the simulated user stops improving
    #[arg(long)]
    pub plateau_day: Option<u32>,
    /// Use default config instead of the saved one
    #[arg(long)]
    pub default_config: bool,
    /// Print every plan and session, not only the summary
    #[arg(long)]
    pub full: bool,
}

pub fn run(args: SimulateArgs) -> CmdResult {
    let mut profile = SimulationProfile::builtin(&args.profile).ok_or_else(|| {
        format!(
            "unknown profile: {} (expected one of {})",
            args.profile,
            SimulationProfile::builtin_names().join(", ")
        )
    })?;
    if let Some(days) = args.days {
        profile.days = days;
    }
    if let Some(blocks) = args.blocks_per_day {
        profile.blocks_per_day = blocks;
    }
    if let Some(seed) = args.seed {
        profile.seed.0 = seed;
    }
    if args.plateau_day.is_some() {
        profile.model.plateau_day = args.plateau_day;
    }

    let config = if args.default_config {
        PlannerConfig::default()
    } else {
        PlannerConfig::load()?
    };

    tracing::info!(
        profile = %profile.name,
        seed = profile.seed.0,
        days = profile.days,
        "running simulation"
    );
    let report = run_simulation(&profile, &config);

    let json = if args.full {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string_pretty(&serde_json::json!({
            "profile": report.profile,
            "seed": report.seed,
            "summary": report.summary,
        }))?
    };
    println!("{json}");
    Ok(())
}
