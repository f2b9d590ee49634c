//! End-to-end pipeline tests against a mock beacon transport
//!
//! Every test runs on tokio's paused clock, so batch windows, connection
//! timeouts and liveness checks advance deterministically.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{
    notification, test_config, wait_until, ChannelSink, ConnectBehavior, FixedClock, MockBeacon,
    MockTransport, FIXED_TIME_MS,
};
use tokio::time::{timeout, Instant};
use uuid::Uuid;
use wenet_core::{
    OutputEnvelope, RelayConfig, TelemetryFrame, BINARY_PAYLOAD_LEN, FRAME_LEN, WENET_SERVICE_UUID,
};
use wenet_runtime::{RelayHandle, RelayRuntime};

fn start(
    config: RelayConfig,
    beacons: Vec<Arc<MockBeacon>>,
) -> (
    RelayHandle,
    tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>,
    Arc<std::sync::atomic::AtomicBool>,
) {
    let runtime = RelayRuntime::new(config, MockTransport::new(beacons))
        .unwrap()
        .with_time_source(Arc::new(FixedClock));
    let (sink, datagrams, closed) = ChannelSink::new();
    (runtime.spawn(sink), datagrams, closed)
}

fn expected_frame(id: u8, sequence: u16, payload: &[u8]) -> TelemetryFrame {
    TelemetryFrame::from_notification(&notification(id, sequence, payload), FIXED_TIME_MS).unwrap()
}

// ----------------------------------------------------------------------------
// Batch Assembly
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_full_batch_is_sent_before_timeout() {
    let beacon = MockBeacon::new("AA:00:00:00:00:01");
    let (handle, mut datagrams, _closed) = start(test_config(1), vec![beacon.clone()]);
    wait_until("beacon streaming", || beacon.is_streaming()).await;

    let sent_at = Instant::now();
    for sequence in 0..11u16 {
        assert!(beacon.notify(notification(4, sequence, &[sequence as u8; 16])));
    }

    let datagram = timeout(Duration::from_secs(5), datagrams.recv())
        .await
        .expect("full batch should not wait for the window")
        .unwrap();
    assert!(sent_at.elapsed() < Duration::from_secs(10));

    let envelope = OutputEnvelope::from_bytes(&datagram).unwrap();
    assert_eq!(envelope.kind, "WENET_TX_SEC_PAYLOAD");
    assert_eq!(envelope.id, 1);
    assert_eq!(envelope.repeats, 1);
    assert_eq!(envelope.packet.len(), BINARY_PAYLOAD_LEN);
    assert_eq!(envelope.packet[0], 11);

    for sequence in 0..11u16 {
        let start = 1 + sequence as usize * FRAME_LEN;
        let frame = expected_frame(4, sequence, &[sequence as u8; 16]);
        assert_eq!(&envelope.packet[start..start + FRAME_LEN], frame.as_bytes());
    }

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_partial_batch_is_sent_when_window_expires() {
    let beacon = MockBeacon::new("AA:00:00:00:00:01");
    let (handle, mut datagrams, _closed) = start(test_config(1), vec![beacon.clone()]);
    wait_until("beacon streaming", || beacon.is_streaming()).await;

    for sequence in 0..5u16 {
        assert!(beacon.notify(notification(2, sequence, &[0x10, 0x20])));
    }

    let datagram = timeout(Duration::from_secs(11), datagrams.recv())
        .await
        .expect("partial batch should be flushed by the window")
        .unwrap();
    let envelope = OutputEnvelope::from_bytes(&datagram).unwrap();

    assert_eq!(envelope.packet[0], 5);
    let real = 5 * FRAME_LEN;
    assert_eq!(real, 115);
    let frame = expected_frame(2, 0, &[0x10, 0x20]);
    assert_eq!(&envelope.packet[1..1 + FRAME_LEN], frame.as_bytes());
    assert!(envelope.packet[1 + real..].iter().all(|&b| b == 0));
    assert_eq!(envelope.packet[1 + real..].len(), 138);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_empty_windows_send_nothing() {
    let beacon = MockBeacon::new("AA:00:00:00:00:01");
    let (handle, mut datagrams, _closed) = start(test_config(1), vec![beacon.clone()]);
    wait_until("beacon streaming", || beacon.is_streaming()).await;

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert!(datagrams.try_recv().is_err());
    assert_eq!(handle.stats().snapshot().batches_emitted, 0);

    handle.shutdown().await;
}

// ----------------------------------------------------------------------------
// Packet Capture
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_sequence_gap_is_reported_once_and_capture_continues() {
    let beacon = MockBeacon::new("AA:00:00:00:00:01");
    let (handle, mut datagrams, _closed) = start(test_config(1), vec![beacon.clone()]);
    let stats = handle.stats();
    wait_until("beacon streaming", || beacon.is_streaming()).await;

    for sequence in [1u16, 2, 3, 5, 6] {
        beacon.notify(notification(1, sequence, &[]));
    }
    wait_until("frames enqueued", || {
        stats.frames_enqueued.load(Ordering::SeqCst) == 5
    })
    .await;
    assert_eq!(stats.snapshot().sequence_gaps, 1);

    let envelope = OutputEnvelope::from_bytes(&datagrams.recv().await.unwrap()).unwrap();
    assert_eq!(envelope.packet[0], 5);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_sequence_baseline_resets_on_reconnect() {
    let beacon = MockBeacon::new("AA:00:00:00:00:01");
    let (handle, _datagrams, _closed) = start(test_config(1), vec![beacon.clone()]);
    let stats = handle.stats();
    wait_until("beacon streaming", || beacon.is_streaming()).await;

    beacon.notify(notification(1, 10, &[]));
    beacon.notify(notification(1, 11, &[]));
    wait_until("first frames", || stats.frames_enqueued.load(Ordering::SeqCst) == 2).await;

    beacon.drop_link();
    wait_until("reconnected", || beacon.connect_attempts() == 2 && beacon.is_streaming()).await;

    beacon.notify(notification(1, 500, &[]));
    wait_until("frame after reconnect", || {
        stats.frames_enqueued.load(Ordering::SeqCst) == 3
    })
    .await;
    assert_eq!(stats.snapshot().sequence_gaps, 0);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_malformed_notifications_keep_link_up() {
    let beacon = MockBeacon::new("AA:00:00:00:00:01");
    let (handle, _datagrams, _closed) = start(test_config(1), vec![beacon.clone()]);
    let stats = handle.stats();
    wait_until("beacon streaming", || beacon.is_streaming()).await;

    beacon.notify(vec![0x01, 0x02]);
    beacon.notify(notification(1, 1, &[0u8; 17]));
    beacon.notify(notification(1, 2, &[0u8; 16]));
    wait_until("valid frame", || stats.frames_enqueued.load(Ordering::SeqCst) == 1).await;

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.notifications_received, 3);
    assert_eq!(snapshot.notifications_rejected, 2);
    assert!(beacon.is_streaming());
    assert_eq!(beacon.connect_attempts(), 1);

    handle.shutdown().await;
}

// ----------------------------------------------------------------------------
// Admission Control
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_pool_never_exceeds_device_count() {
    let beacons: Vec<_> = (1..=3)
        .map(|i| MockBeacon::new(&format!("AA:00:00:00:00:0{}", i)))
        .collect();
    let transport_beacons = beacons.clone();
    let runtime = RelayRuntime::new(test_config(2), MockTransport::new(transport_beacons))
        .unwrap()
        .with_time_source(Arc::new(FixedClock));
    let limiter = runtime.limiter();
    let (sink, _datagrams, _closed) = ChannelSink::new();
    let handle = runtime.spawn(sink);

    wait_until("two connections", || {
        beacons[0].is_streaming() && beacons[1].is_streaming()
    })
    .await;

    // The third beacon stays unconnected while both slots are held
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(beacons[2].connect_attempts(), 0);
    assert_eq!(limiter.active(), 2);
    assert_eq!(limiter.available(), 0);

    beacons[0].drop_link();
    wait_until("third beacon admitted", || beacons[2].is_streaming()).await;

    let connected = beacons.iter().filter(|b| b.is_connected()).count();
    assert_eq!(connected, 2);
    assert_eq!(limiter.peak(), 2);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_scanning_pauses_while_pool_is_full() {
    let beacons = vec![
        MockBeacon::new("AA:00:00:00:00:01"),
        MockBeacon::new("AA:00:00:00:00:02"),
    ];
    let transport = MockTransport::new(beacons.clone());
    let runtime = RelayRuntime::new(test_config(1), transport).unwrap();
    let (sink, _datagrams, _closed) = ChannelSink::new();
    let handle = runtime.spawn(sink);

    wait_until("first beacon", || beacons[0].is_streaming()).await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(beacons[1].connect_attempts(), 0);
    assert_eq!(handle.stats().snapshot().connections_opened, 1);
    assert_eq!(handle.limiter().active(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_weak_or_foreign_advertisements_are_ignored() {
    let weak = MockBeacon::with_advertisement("AA:00:00:00:00:01", Some(-101), vec![WENET_SERVICE_UUID]);
    let silent = MockBeacon::with_advertisement("AA:00:00:00:00:02", None, vec![WENET_SERVICE_UUID]);
    let foreign = MockBeacon::with_advertisement("AA:00:00:00:00:03", Some(-40), vec![Uuid::from_u128(7)]);
    let good = MockBeacon::with_advertisement("AA:00:00:00:00:04", Some(-100), vec![WENET_SERVICE_UUID]);

    let (handle, _datagrams, _closed) = start(
        test_config(3),
        vec![weak.clone(), silent.clone(), foreign.clone(), good.clone()],
    );
    wait_until("good beacon", || good.is_streaming()).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(weak.connect_attempts(), 0);
    assert_eq!(silent.connect_attempts(), 0);
    assert_eq!(foreign.connect_attempts(), 0);
    assert!(handle.stats().snapshot().advertisements_rejected >= 3);

    handle.shutdown().await;
}

// ----------------------------------------------------------------------------
// Connection Failures
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_connect_timeout_frees_slot() {
    let stuck = MockBeacon::new("AA:00:00:00:00:01");
    stuck.set_behavior(ConnectBehavior::Hang);
    let healthy = MockBeacon::new("AA:00:00:00:00:02");

    let (handle, _datagrams, _closed) = start(test_config(1), vec![stuck.clone(), healthy.clone()]);

    wait_until("healthy beacon", || healthy.is_streaming()).await;
    let snapshot = handle.stats().snapshot();
    assert!(snapshot.connection_failures >= 1);
    assert_eq!(snapshot.connections_opened, 1);
    assert!(stuck.connect_attempts() >= 1);
    assert!(handle.limiter().peak() <= 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout_after_link_up_disconnects_device() {
    let stalled = MockBeacon::new("AA:00:00:00:00:01");
    stalled.set_behavior(ConnectBehavior::StallAfterConnect);
    let (handle, _datagrams, _closed) = start(test_config(1), vec![stalled.clone()]);

    wait_until("abandoned link torn down", || {
        stalled.disconnect_calls() >= 1 && !stalled.is_connected()
    })
    .await;
    assert!(handle.stats().snapshot().connection_failures >= 1);
    assert_eq!(handle.stats().snapshot().connections_opened, 0);

    // Advertising again once released, so it can be picked up
    stalled.set_behavior(ConnectBehavior::Succeed);
    wait_until("beacon streaming", || stalled.is_streaming()).await;

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_refused_connection_is_retried() {
    let beacon = MockBeacon::new("AA:00:00:00:00:01");
    beacon.set_behavior(ConnectBehavior::Refuse);
    let (handle, _datagrams, _closed) = start(test_config(1), vec![beacon.clone()]);

    wait_until("refusals", || beacon.connect_attempts() >= 2).await;
    assert!(handle.limiter().active() <= 1);
    assert!(!beacon.is_connected());

    beacon.set_behavior(ConnectBehavior::Succeed);
    wait_until("beacon streaming", || beacon.is_streaming()).await;
    assert!(handle.stats().snapshot().connection_failures >= 2);

    handle.shutdown().await;
}

// ----------------------------------------------------------------------------
// Shutdown
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_shutdown_flushes_queued_frames_and_closes_everything() {
    let beacon = MockBeacon::new("AA:00:00:00:00:01");
    let (handle, mut datagrams, closed) = start(test_config(1), vec![beacon.clone()]);
    let stats = handle.stats();
    wait_until("beacon streaming", || beacon.is_streaming()).await;

    for sequence in 0..3u16 {
        beacon.notify(notification(9, sequence, &[0xEE]));
    }
    wait_until("frames queued", || stats.frames_enqueued.load(Ordering::SeqCst) == 3).await;

    let limiter = handle.limiter().clone();
    let snapshot = handle.shutdown().await;

    let envelope = OutputEnvelope::from_bytes(&datagrams.recv().await.unwrap()).unwrap();
    assert_eq!(envelope.packet[0], 3);
    assert!(datagrams.recv().await.is_none());

    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(beacon.disconnect_calls(), 1);
    assert!(!beacon.is_connected());
    assert_eq!(limiter.active(), 0);
    assert_eq!(snapshot.batches_emitted, 1);
    assert_eq!(snapshot.datagrams_sent, 1);
    assert_eq!(snapshot.frames_dropped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_returns_after_cancellation() {
    let beacon = MockBeacon::new("AA:00:00:00:00:01");
    let runtime = RelayRuntime::new(test_config(1), MockTransport::new(vec![beacon.clone()]))
        .unwrap();
    let token = runtime.cancellation_token();
    let (sink, _datagrams, closed) = ChannelSink::new();

    let relay = tokio::spawn(runtime.run(sink));
    wait_until("beacon streaming", || beacon.is_streaming()).await;

    token.cancel();
    let snapshot = timeout(Duration::from_secs(30), relay)
        .await
        .expect("relay should stop")
        .unwrap();

    assert_eq!(snapshot.connections_opened, 1);
    assert_eq!(snapshot.disconnects, 1);
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = RelayRuntime::new(test_config(0), MockTransport::new(Vec::new()));
    assert!(result.is_err());
}
