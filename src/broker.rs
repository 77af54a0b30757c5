//! The broker handle: one transport bound to one declared queue.
//!
//! A [`Broker`] is an explicitly owned resource. Whoever builds it keeps
//! it, spawns at most one publisher loop from it, and releases it exactly
//! once with [`Broker::close`]; there is no ambient or library-level
//! connection state anywhere in this crate.

use std::fmt;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{
    // ---
    publisher::PublisherLoop,
    PublishFailure,
    QueueRef,
    Result,
    ShutdownSignal,
    TransportPtr,
};

/// Handle binding a live transport to one declared queue.
///
/// Built by [`BrokerBuilder`](crate::BrokerBuilder). The transport
/// connection and its channel are not safe for concurrent ad-hoc
/// publishing; the outbound queue feeding the publisher loop is the sole
/// publish path, so spawn at most one loop per broker.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use mq_publisher::{shutdown_channel, BrokerBuilder};
/// use tokio::sync::mpsc;
///
/// # async fn example() -> mq_publisher::Result<()> {
/// let broker = BrokerBuilder::new()
///     .queue("jobs")
///     .transport_type("memory")
///     .build()
///     .await?;
///
/// let (tx, rx) = mpsc::channel(64);
/// let (handle, signal) = shutdown_channel();
/// let publisher = broker.spawn_publisher(rx, signal);
///
/// tx.send(Bytes::from_static(b"payload")).await.ok();
///
/// let ack = handle.request().await;
/// ack.acknowledge().await;
/// publisher.await.ok();
///
/// broker.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Broker {
    transport: TransportPtr,
    queue: QueueRef,
}

// The transport is a trait object; show the declared queue instead.
impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl Broker {
    pub(crate) fn new(transport: TransportPtr, queue: QueueRef) -> Self {
        Self { transport, queue }
    }

    /// The queue this broker publishes to, as declared.
    pub fn queue(&self) -> &QueueRef {
        &self.queue
    }

    /// Shorthand for the declared queue name.
    pub fn queue_name(&self) -> &str {
        self.queue.name()
    }

    /// Spawn the publisher loop over the given outbound queue and shutdown
    /// signal.
    ///
    /// The loop forwards each payload to the broker queue in enqueue order
    /// and runs until the shutdown handshake completes or every producer
    /// handle is dropped. Send failures are logged and otherwise dropped;
    /// use [`spawn_publisher_with_failures`](Self::spawn_publisher_with_failures)
    /// to observe them. The returned handle resolves once the loop has
    /// fully stopped.
    pub fn spawn_publisher(
        &self,
        outbound: mpsc::Receiver<Bytes>,
        shutdown: ShutdownSignal,
    ) -> JoinHandle<()> {
        self.spawn(outbound, shutdown, None)
    }

    /// Like [`spawn_publisher`](Self::spawn_publisher), but each failed
    /// send is also reported over `failures` together with its payload.
    ///
    /// Reports are sent without blocking; when the failure channel is full
    /// or closed the report is dropped after logging.
    pub fn spawn_publisher_with_failures(
        &self,
        outbound: mpsc::Receiver<Bytes>,
        shutdown: ShutdownSignal,
        failures: mpsc::Sender<PublishFailure>,
    ) -> JoinHandle<()> {
        self.spawn(outbound, shutdown, Some(failures))
    }

    fn spawn(
        &self,
        outbound: mpsc::Receiver<Bytes>,
        shutdown: ShutdownSignal,
        failures: Option<mpsc::Sender<PublishFailure>>,
    ) -> JoinHandle<()> {
        // ---
        let publisher = PublisherLoop::new(
            self.transport.clone(),
            self.queue.clone(),
            outbound,
            shutdown,
            failures,
        );

        tokio::spawn(publisher.run())
    }

    /// Release the transport: channel first, then connection, both always
    /// attempted.
    ///
    /// Consuming `self` makes closing twice unrepresentable. Stop the
    /// publisher loop before closing; sends issued after close fail and
    /// surface through the failure policy.
    ///
    /// # Errors
    ///
    /// `Error::Close` aggregating every resource that failed to release.
    pub async fn close(self) -> Result<()> {
        self.transport.close().await
    }
}
