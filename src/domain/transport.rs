// src/domain/transport.rs

//! Transport domain abstractions.
//!
//! This module defines what the publishing pipeline needs from a message
//! broker and nothing about how a concrete broker provides it. It
//! intentionally avoids any reference to concrete protocols, brokers, or
//! client libraries; those live under `src/transport/` behind this seam.
//!
//! ## Semantics
//!
//! - `declare_queue` is idempotent: declaring an existing queue with the
//!   same properties succeeds and refers to the same underlying queue,
//!   while declaring it with different properties is an error.
//! - `send` is best-effort: it resolves once the backend has accepted the
//!   payload for the named queue, with no delivery acknowledgment. A
//!   payload routed to a queue nobody declared is dropped, matching
//!   default-exchange behavior on a real broker.
//! - `close` releases every resource the transport holds, attempting each
//!   one even when an earlier release fails, and reports all failures
//!   aggregated.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::Result;

/// Properties a queue is declared with.
///
/// The defaults describe a transient work queue: not durable, not
/// auto-deleted, not exclusive, declaration confirmed by the broker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueOptions {
    /// Queue survives a broker restart.
    pub durable: bool,

    /// Queue is deleted once its last consumer disconnects.
    pub auto_delete: bool,

    /// Queue is private to the declaring connection.
    pub exclusive: bool,

    /// Do not wait for the broker to confirm the declaration.
    pub no_wait: bool,
}

/// A queue as the transport declared it: the name plus the properties the
/// declaration used.
///
/// Comparable so callers can verify that two declarations met the same
/// underlying queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRef {
    name: Arc<str>,
    options: QueueOptions,
}

impl QueueRef {
    pub(crate) fn new(name: impl Into<Arc<str>>, options: QueueOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    /// The declared queue name, used as the routing key for every publish.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The properties the queue was declared with.
    pub fn options(&self) -> QueueOptions {
        self.options
    }
}

/// Publish-side operations a concrete message broker must provide.
///
/// Implementations are shared behind [`TransportPtr`]. During normal
/// operation the publisher loop is the only caller issuing `send`; the
/// in-process outbound queue is the sole publish path.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Idempotently ensure the named queue exists with the given properties.
    ///
    /// # Errors
    ///
    /// `Error::Declaration` when a queue of the same name exists with
    /// incompatible properties, or on transport failure.
    async fn declare_queue(&self, name: &str, options: QueueOptions) -> Result<QueueRef>;

    /// Best-effort enqueue of `body` onto the named queue.
    ///
    /// # Errors
    ///
    /// `Error::Publish` when the transport refuses the payload, for
    /// example after the transport has been closed.
    async fn send(&self, queue: &str, body: Bytes) -> Result<()>;

    /// Release the transport's resources.
    ///
    /// # Errors
    ///
    /// `Error::Close` aggregating every resource that failed to release.
    async fn close(&self) -> Result<()>;
}

/// Shared pointer to a transport implementation.
pub type TransportPtr = Arc<dyn Transport>;
