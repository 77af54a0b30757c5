// src/publisher.rs

//! The publisher loop: drains the in-process outbound queue onto the
//! transport sink until shut down.
//!
//! ## Select discipline
//!
//! Each turn of the loop waits on exactly two events: a payload arriving
//! on the outbound queue, or a stop request on the shutdown signal. The
//! select is biased toward the outbound queue, so every payload already
//! buffered when a stop request lands is forwarded before the request is
//! observed. A producer that never lets the queue go empty therefore
//! delays shutdown; payloads racing the request itself carry no ordering
//! promise.
//!
//! ## Shutdown handshake
//!
//! On observing the stop request the loop closes the outbound queue
//! (producer sends fail fast from then on), waits for the initiator's
//! acknowledgment, and returns. Payloads still buffered behind the closed
//! intake are dropped: shutdown means "stop accepting new work now," not
//! "drain whatever remains."
//!
//! The loop also returns when every producer handle has been dropped and
//! the queue is drained; with no producers left there is nothing left to
//! forward and nobody left to handshake with.
//!
//! ## Failure policy
//!
//! Sends are best-effort. A refused send never stops the loop and is never
//! retried: it is logged, and when the loop was spawned with a failure
//! channel the payload and error are handed over there. Failure reports
//! use a non-blocking send; if the failure channel is full or its consumer
//! is gone, the report is dropped after logging.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::{
    //
    log_debug,
    log_info,
    log_warn,
    Error,
    QueueRef,
    ShutdownSignal,
    TransportPtr,
};

/// A payload the publisher loop could not hand to the transport sink.
///
/// Delivered over the failure channel of
/// [`Broker::spawn_publisher_with_failures`](crate::Broker::spawn_publisher_with_failures).
#[derive(Debug)]
pub struct PublishFailure {
    /// The payload that was not delivered.
    pub payload: Bytes,

    /// The error the send attempt raised.
    pub error: Error,
}

/// State owned by one running publisher loop.
pub(crate) struct PublisherLoop {
    // ---
    transport: TransportPtr,
    queue: QueueRef,
    outbound: mpsc::Receiver<Bytes>,
    shutdown: ShutdownSignal,
    failures: Option<mpsc::Sender<PublishFailure>>,
}

impl PublisherLoop {
    pub(crate) fn new(
        transport: TransportPtr,
        queue: QueueRef,
        outbound: mpsc::Receiver<Bytes>,
        shutdown: ShutdownSignal,
        failures: Option<mpsc::Sender<PublishFailure>>,
    ) -> Self {
        Self {
            transport,
            queue,
            outbound,
            shutdown,
            failures,
        }
    }

    pub(crate) async fn run(mut self) {
        // ---
        log_info!("publisher loop started for queue {}", self.queue.name());

        loop {
            tokio::select! {
                // Buffered payloads win over a concurrent stop request.
                biased;

                maybe_body = self.outbound.recv() => match maybe_body {
                    Some(body) => self.forward(body).await,
                    None => {
                        // Every producer is gone and the queue is drained.
                        log_debug!("outbound queue disconnected for {}", self.queue.name());
                        break;
                    }
                },

                _ = self.shutdown.requested() => {
                    // Intake closes before the handshake completes, so the
                    // initiator observes "no further sends" while the loop
                    // is still alive.
                    self.outbound.close();
                    self.shutdown.acknowledged().await;
                    break;
                }
            }
        }

        log_info!("publisher loop stopped for queue {}", self.queue.name());
    }

    async fn forward(&self, body: Bytes) {
        // ---
        if let Err(error) = self.transport.send(self.queue.name(), body.clone()).await {
            log_warn!("publish to queue {} failed: {error}", self.queue.name());

            if let Some(failures) = &self.failures {
                let report = PublishFailure {
                    payload: body,
                    error,
                };
                if failures.try_send(report).is_err() {
                    log_warn!("publish failure report dropped: listener full or gone");
                }
            }
        }
    }
}
