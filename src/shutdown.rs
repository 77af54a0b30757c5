//! Two-phase shutdown handshake for the publisher loop.
//!
//! Stopping the loop is a conversation, not a signal: the initiator first
//! asks the loop to stop accepting work, and the loop then holds its final
//! breath until the initiator confirms it has finished observing that
//! intake is closed. Only after that confirmation does the loop return.
//! The second phase exists so the initiator can release or reuse the
//! outbound queue knowing the loop is no longer touching it.
//!
//! The phases are encoded in types: [`ShutdownHandle::request`] consumes
//! the handle and yields a [`ShutdownAck`], whose
//! [`acknowledge`](ShutdownAck::acknowledge) consumes it in turn.
//! Requesting twice, acknowledging first, or acknowledging twice does not
//! compile.
//!
//! ## Drop semantics
//!
//! - Dropping the [`ShutdownHandle`] without requesting leaves the signal
//!   inert. The loop keeps serving producers and ends only when every
//!   producer handle is gone.
//! - Dropping the [`ShutdownAck`] without acknowledging counts as the
//!   acknowledgment: an initiator that no longer exists cannot be waiting,
//!   so the loop exits instead of blocking on a confirmation that can
//!   never arrive. While the `ShutdownAck` is alive and silent, the loop
//!   waits indefinitely.

use tokio::sync::mpsc;

/// Create a linked handle/signal pair for one shutdown handshake.
///
/// The [`ShutdownSignal`] goes to the publisher loop; the
/// [`ShutdownHandle`] stays with whoever decides when publishing stops.
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    // Capacity two: both phases buffer without ever blocking the caller.
    let (tx, rx) = mpsc::channel(2);

    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

/// Caller side of the handshake, before the stop request.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: mpsc::Sender<()>,
}

impl ShutdownHandle {
    /// Phase one: ask the loop to stop accepting work.
    ///
    /// Returns the [`ShutdownAck`] used to finish the handshake. If the
    /// loop is already gone the request is a no-op.
    pub async fn request(self) -> ShutdownAck {
        let _ = self.tx.send(()).await;

        ShutdownAck { tx: self.tx }
    }
}

/// Caller side of the handshake, after the stop request.
#[derive(Debug)]
pub struct ShutdownAck {
    tx: mpsc::Sender<()>,
}

impl ShutdownAck {
    /// Phase two: confirm that closure has been observed and release the
    /// loop to return.
    pub async fn acknowledge(self) {
        let _ = self.tx.send(()).await;
    }
}

/// Loop side of the handshake.
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: mpsc::Receiver<()>,
}

impl ShutdownSignal {
    /// Resolve when a stop request arrives.
    ///
    /// A dropped [`ShutdownHandle`] never requested anything; in that case
    /// this pends forever and the loop lives on its other exit paths.
    ///
    /// Cancel safe: a request is consumed only when this resolves.
    pub(crate) async fn requested(&mut self) {
        match self.rx.recv().await {
            Some(()) => {}
            None => std::future::pending::<()>().await,
        }
    }

    /// Resolve when the initiator acknowledges, or when the initiator's
    /// [`ShutdownAck`] is dropped.
    pub(crate) async fn acknowledged(&mut self) {
        let _ = self.rx.recv().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;
    use tokio::time::timeout;

    // ---

    #[tokio::test]
    async fn handshake_resolves_in_phase_order() {
        let (handle, mut signal) = shutdown_channel();

        let ack = handle.request().await;

        timeout(Duration::from_millis(100), signal.requested())
            .await
            .expect("request must be observable");

        ack.acknowledge().await;

        timeout(Duration::from_millis(100), signal.acknowledged())
            .await
            .expect("acknowledgment must be observable");
    }

    #[tokio::test]
    async fn dropped_handle_is_inert() {
        let (handle, mut signal) = shutdown_channel();

        drop(handle);

        let waited = timeout(Duration::from_millis(50), signal.requested()).await;
        assert!(waited.is_err(), "no request may appear out of thin air");
    }

    #[tokio::test]
    async fn silent_ack_keeps_the_loop_waiting() {
        let (handle, mut signal) = shutdown_channel();

        let ack = handle.request().await;
        signal.requested().await;

        let waited = timeout(Duration::from_millis(50), signal.acknowledged()).await;
        assert!(waited.is_err(), "acknowledgment must not be assumed");

        ack.acknowledge().await;
        timeout(Duration::from_millis(100), signal.acknowledged())
            .await
            .expect("explicit acknowledgment releases the wait");
    }

    #[tokio::test]
    async fn dropped_ack_counts_as_acknowledgment() {
        let (handle, mut signal) = shutdown_channel();

        let ack = handle.request().await;
        signal.requested().await;

        drop(ack);

        timeout(Duration::from_millis(100), signal.acknowledged())
            .await
            .expect("a vanished initiator cannot be waited for");
    }
}
