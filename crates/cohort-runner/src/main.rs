//! Cohort runner binary.

use clap::Parser;
use cohort_runner::{run, Args};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let summary = run(&args)?;

    tracing::info!(
        "Built {} cohort(s), {} failed; outputs in {}",
        summary.built.len(),
        summary.failed.len(),
        summary.output_dir.display()
    );
    if !summary.failed.is_empty() {
        tracing::warn!("Failed cohorts: {}", summary.failed.join(", "));
    }
    Ok(())
}
