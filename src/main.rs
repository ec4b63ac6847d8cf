use anyhow::Result;
use clap::Parser;
use navsync::log::init_logging;

/// Reconcile the portfolio ledger against live market data: USD prices,
/// asset values, weight ratios and threshold alerts. One invocation is one
/// run; scheduling lives outside the process.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Run the valuation only; skip threshold checks and alert dispatch
    #[arg(long)]
    skip_alerts: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = navsync::run(navsync::RunOptions {
        skip_alerts: cli.skip_alerts,
    })
    .await;

    if let Err(e) = &result {
        tracing::error!(error = %e, "Reconciliation run failed");
    }
    result
}
