//! Wenet beacon GATT probe entry point

use clap::Parser;

use wenet_cli::probe::run_probe;
use wenet_cli::{setup_logging, ProbeCli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = ProbeCli::parse();
    setup_logging();
    run_probe(&cli).await
}
