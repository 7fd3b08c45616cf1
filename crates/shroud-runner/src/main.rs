//! Sweep driver binary.
//!
//! Runs the configured parameter grid and writes per-run results plus
//! `summary.json`. Configuration comes from `SHROUD_*` environment
//! variables; see `--help`.

use shroud_runner::{run_sweep, SweepConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_usage() {
    eprintln!("shroud-runner - sweep driver for the mesh metadata-privacy simulator");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  shroud-runner            Run the configured sweep");
    eprintln!("  shroud-runner --help     Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SHROUD_USERS             Comma list of community sizes (default 50,75,100,150,200,300,400)");
    eprintln!("  SHROUD_HMAX              Comma list of hop budgets (default 1,3)");
    eprintln!("  SHROUD_SEEDS             Comma list of seeds (default 1..10)");
    eprintln!("  SHROUD_OBSERVERS         Comma list of observer counts (default 5)");
    eprintln!("  SHROUD_PLACEMENTS        Comma list of random|high-degree|cluster (default all)");
    eprintln!("  SHROUD_COVER_RATES       Comma list of cover rates, 0 disables (default 0,0.05,0.1)");
    eprintln!("  SHROUD_HORIZON           Epochs per run (default 200)");
    eprintln!("  SHROUD_P_INTIMATE        Intimate tier probability (default 0.02)");
    eprintln!("  SHROUD_P_FRIEND          Friend tier probability (default 0.05)");
    eprintln!("  SHROUD_P_ACQUAINTANCE    Acquaintance tier probability (default 0.10)");
    eprintln!("  SHROUD_OUT_DIR           Result directory (default ./out)");
    eprintln!("  SHROUD_GROUND_TRUTH_DIR  Ground-truth directory (default ./ground_truth)");
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shroud=info,shroud_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if std::env::args().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let config = match SweepConfig::from_env().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    tracing::info!(runs = config.run_count(), "shroud sweep starting");

    if let Err(e) = run_sweep(&config) {
        tracing::error!(error = %e, "sweep failed");
        std::process::exit(1);
    }
}
