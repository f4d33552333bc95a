use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focusplan", version, about = "Adaptive focus-session goal planner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan the next focus session
    Plan(commands::plan::PlanArgs),
    /// Record a finished focus session
    Record(commands::record::RecordArgs),
    /// Print blended performance metrics
    Metrics(commands::metrics::MetricsArgs),
    /// Persisted planner state
    State {
        #[command(subcommand)]
        action: commands::state::StateAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run a deterministic simulated user through the planner
    Simulate(commands::simulate::SimulateArgs),
}

fn init_logging() {
    let debug = std::env::var("FOCUSPLAN_DEBUG_LOG")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false);

    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Plan(args) => commands::plan::run(args),
        Commands::Record(args) => commands::record::run(args),
        Commands::Metrics(args) => commands::metrics::run(args),
        Commands::State { action } => commands::state::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Simulate(args) => commands::simulate::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
