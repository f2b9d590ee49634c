//! Wenet BLE relay entry point

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use wenet_ble::BleTransport;
use wenet_cli::{error::Result, load_relay_config, setup_logging, RelayCli};
use wenet_runtime::{RelayRuntime, UdpFrameSink};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = RelayCli::parse();
    setup_logging();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: RelayCli) -> Result<()> {
    let config = load_relay_config(&cli)?;

    info!("Initializing Bluetooth adapter...");
    let transport = BleTransport::new().await?;
    let sink = UdpFrameSink::open(&config.relay_host, config.relay_port).await?;

    let runtime = RelayRuntime::new(config, transport)?;
    let shutdown = runtime.cancellation_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, shutting down"),
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
        shutdown.cancel();
    });

    let stats = runtime.run(sink).await;
    info!("Relayed {} batches", stats.datagrams_sent);
    Ok(())
}
