// tests/publisher_loop.rs

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};

use mq_publisher::{
    // ---
    create_memory_transport_with_hub,
    shutdown_channel,
    Broker,
    BrokerBuilder,
    BrokerConfig,
    Error,
    MemoryHub,
    TransportPtr,
};

/// Transport and broker publishing to `queue` on the given hub.
///
/// The transport pointer is returned alongside the broker so tests can
/// reach the backend directly, for example to close it underneath a
/// running loop.
async fn broker_on(hub: &Arc<MemoryHub>, queue: &str) -> (Broker, TransportPtr) {
    // ---
    let config = BrokerConfig::new(queue);

    let transport = create_memory_transport_with_hub(&config, hub.clone())
        .await
        .expect("failed to create memory transport");

    let broker = BrokerBuilder::new()
        .queue(queue)
        .transport(transport.clone())
        .build()
        .await
        .expect("failed to build broker");

    (broker, transport)
}

#[tokio::test]
async fn queued_payloads_arrive_in_order_before_shutdown_completes() {
    // ---
    // Arrange
    // ---
    init_logging();

    let hub = MemoryHub::new();
    let (broker, _transport) = broker_on(&hub, "jobs").await;

    let (tx, rx) = mpsc::channel(16);
    let (handle, signal) = shutdown_channel();
    let publisher = broker.spawn_publisher(rx, signal);

    // ---
    // Act
    // ---
    for payload in [&b"first"[..], b"second", b"third"] {
        tx.send(Bytes::from_static(payload))
            .await
            .expect("outbound queue refused a payload");
    }

    let ack = handle.request().await;
    ack.acknowledge().await;

    timeout(Duration::from_secs(1), publisher)
        .await
        .expect("loop did not stop after the handshake")
        .expect("publisher task panicked");

    // ---
    // Assert
    // ---
    let expected = vec![
        Bytes::from_static(b"first"),
        Bytes::from_static(b"second"),
        Bytes::from_static(b"third"),
    ];
    assert_eq!(hub.published("jobs").await, expected);

    broker.close().await.expect("close failed");
}

#[tokio::test]
async fn each_payload_is_delivered_exactly_once() {
    // ---
    let hub = MemoryHub::new();
    let (broker, _transport) = broker_on(&hub, "jobs").await;

    let (tx, rx) = mpsc::channel(16);
    let (_handle, signal) = shutdown_channel();
    let publisher = broker.spawn_publisher(rx, signal);

    let expected: Vec<Bytes> = (0..20)
        .map(|i| Bytes::from(format!("payload-{i:02}")))
        .collect();

    for payload in &expected {
        tx.send(payload.clone())
            .await
            .expect("outbound queue refused a payload");
    }

    // Dropping the last producer drains the queue and ends the loop.
    drop(tx);

    timeout(Duration::from_secs(1), publisher)
        .await
        .expect("loop did not stop after its producers vanished")
        .expect("publisher task panicked");

    assert_eq!(hub.published("jobs").await, expected);
}

#[tokio::test]
async fn shutdown_with_an_empty_queue_completes() {
    // ---
    let hub = MemoryHub::new();
    let (broker, _transport) = broker_on(&hub, "jobs").await;

    let (tx, rx) = mpsc::channel(4);
    let (handle, signal) = shutdown_channel();
    let publisher = broker.spawn_publisher(rx, signal);

    let ack = handle.request().await;
    ack.acknowledge().await;

    timeout(Duration::from_secs(1), publisher)
        .await
        .expect("loop did not stop after the handshake")
        .expect("publisher task panicked");

    assert!(hub.published("jobs").await.is_empty());
    drop(tx);
}

#[tokio::test]
async fn stop_request_closes_intake_while_the_loop_still_runs() {
    // ---
    init_logging();

    let hub = MemoryHub::new();
    let (broker, _transport) = broker_on(&hub, "jobs").await;

    let (tx, rx) = mpsc::channel(16);
    let (handle, signal) = shutdown_channel();
    let publisher = broker.spawn_publisher(rx, signal);

    let ack = handle.request().await;

    // The loop closes intake when it observes the request; keep probing
    // until a send is refused.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while tx.send(Bytes::from_static(b"late")).await.is_ok() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "intake never closed"
        );
        sleep(Duration::from_millis(5)).await;
    }

    // Intake is closed but the handshake is not acknowledged: the loop
    // must still be alive.
    assert!(!publisher.is_finished());

    ack.acknowledge().await;

    timeout(Duration::from_secs(1), publisher)
        .await
        .expect("loop did not stop after acknowledgment")
        .expect("publisher task panicked");
}

#[tokio::test]
async fn loop_returns_only_after_acknowledgment() {
    // ---
    let hub = MemoryHub::new();
    let (broker, _transport) = broker_on(&hub, "jobs").await;

    let (_tx, rx) = mpsc::channel::<Bytes>(4);
    let (handle, signal) = shutdown_channel();
    let publisher = broker.spawn_publisher(rx, signal);

    let ack = handle.request().await;

    sleep(Duration::from_millis(100)).await;
    assert!(
        !publisher.is_finished(),
        "loop returned before the acknowledgment"
    );

    ack.acknowledge().await;

    timeout(Duration::from_secs(1), publisher)
        .await
        .expect("loop did not stop after acknowledgment")
        .expect("publisher task panicked");
}

#[tokio::test]
async fn failed_sends_are_reported_with_their_payload() {
    // ---
    init_logging();

    let hub = MemoryHub::new();
    let (broker, transport) = broker_on(&hub, "jobs").await;

    let (tx, rx) = mpsc::channel(4);
    let (_handle, signal) = shutdown_channel();
    let (failure_tx, mut failure_rx) = mpsc::channel(4);
    let publisher = broker.spawn_publisher_with_failures(rx, signal, failure_tx);

    // Close the backend underneath the loop so every send is refused.
    transport.close().await.expect("close failed");

    tx.send(Bytes::from_static(b"doomed"))
        .await
        .expect("outbound queue refused a payload");

    let failure = timeout(Duration::from_secs(1), failure_rx.recv())
        .await
        .expect("no failure report arrived")
        .expect("failure channel closed unexpectedly");

    assert_eq!(failure.payload, Bytes::from_static(b"doomed"));
    assert!(matches!(failure.error, Error::Publish { .. }));
    assert!(hub.published("jobs").await.is_empty());

    drop(tx);
    timeout(Duration::from_secs(1), publisher)
        .await
        .expect("loop did not stop after its producers vanished")
        .expect("publisher task panicked");
}

#[tokio::test]
async fn long_sequences_keep_enqueue_order() {
    // ---
    let hub = MemoryHub::new();
    let (broker, _transport) = broker_on(&hub, "jobs").await;

    let (tx, rx) = mpsc::channel(256);
    let (handle, signal) = shutdown_channel();
    let publisher = broker.spawn_publisher(rx, signal);

    let expected: Vec<Bytes> = (0..200)
        .map(|i| Bytes::from(format!("payload-{i:03}")))
        .collect();

    for payload in &expected {
        tx.send(payload.clone())
            .await
            .expect("outbound queue refused a payload");
    }

    let ack = handle.request().await;
    ack.acknowledge().await;

    timeout(Duration::from_secs(5), publisher)
        .await
        .expect("loop did not stop after the handshake")
        .expect("publisher task panicked");

    assert_eq!(hub.published("jobs").await, expected);
}

#[cfg(feature = "logging")]
mod imp {
    use std::sync::Once;

    static INIT: Once = Once::new();

    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        });
    }
}

#[cfg(not(feature = "logging"))]
mod imp {
    #[inline]
    pub fn init() {}
}

pub fn init_logging() {
    imp::init();
}
