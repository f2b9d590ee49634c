//! GATT probe: inspect one beacon and print its notifications

use std::time::Duration;

use anyhow::Context;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;
use wenet_ble::inspect::{describe_characteristics, find_device, format_notification};
use wenet_ble::{BleDiscovery, BleLink, BleTransportConfig};
use wenet_core::BeaconLink;

use crate::cli::ProbeCli;

/// How long to scan for the requested device
pub const DEVICE_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run_probe(cli: &ProbeCli) -> anyhow::Result<()> {
    let config = BleTransportConfig::default();
    let discovery = BleDiscovery::initialize(&config)
        .await
        .context("Failed to open the Bluetooth adapter")?;

    let selector = cli.selector()?;
    println!("Scanning for device with {}...", selector);
    let peripheral = find_device(&discovery, &selector, DEVICE_SEARCH_TIMEOUT).await?;

    let link = BleLink::open(peripheral, &config)
        .await
        .with_context(|| format!("Failed to connect to device with {}", selector))?;
    println!("Connected to {}", link.address());

    let reports = describe_characteristics(link.peripheral(), &cli.services).await;
    if reports.is_empty() {
        warn!("No characteristics matched the requested services");
    }
    for report in &reports {
        println!("{}", report);
    }

    let mut subscriptions = Vec::new();
    for report in reports.iter().filter(|r| r.notifies()) {
        let characteristic: Uuid = report.characteristic.uuid;
        match link.subscribe(characteristic).await {
            Ok(values) => subscriptions.push(values.map(move |value| (characteristic, value))),
            Err(e) => warn!("Failed to subscribe to {}: {}", characteristic, e),
        }
    }
    info!(
        "Listening on {} characteristics for {}s",
        subscriptions.len(),
        cli.duration
    );

    let mut streaming = !subscriptions.is_empty();
    let mut notifications = stream::select_all(subscriptions);
    let listen = tokio::time::sleep(Duration::from_secs(cli.duration));
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(listen, interrupt);

    loop {
        tokio::select! {
            _ = &mut listen => break,
            _ = &mut interrupt => {
                info!("Interrupted");
                break;
            }
            notification = notifications.next(), if streaming => match notification {
                Some((characteristic, value)) => {
                    println!("{}", format_notification(characteristic, &value));
                }
                None => {
                    warn!("All notification streams ended");
                    streaming = false;
                }
            },
        }
    }

    link.disconnect().await?;
    Ok(())
}
