use clap::Subcommand;
use focusplan_core::{FileStateStore, PlannerConfig, StateStore};

use super::{open_planner, CmdResult, PendingPlan};

#[derive(Subcommand)]
pub enum StateAction {
    /// Print persisted planner state as JSON
    Show,
    /// Forget planner state (phase, floor, cycle, milestones)
    Reset,
}

pub fn run(action: StateAction) -> CmdResult {
    match action {
        StateAction::Show => {
            let store = FileStateStore::open_default()?;
            let state = store.load()?.map(|s| s.normalized());
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        StateAction::Reset => {
            let mut planner = open_planner(PlannerConfig::load_or_default())?;
            planner.reset();
            if let Some(err) = planner.last_persist_error() {
                return Err(err.to_string().into());
            }
            PendingPlan::clear()?;
            println!("planner state reset");
        }
    }
    Ok(())
}
