// src/transport/memory.rs

//! In-memory transport implementation.
//!
//! This module provides a pure in-process implementation of the domain-level
//! `Transport` trait. It is intended primarily for testing, local execution,
//! and as a reference for transport semantics.
//!
//! ## Reference Semantics
//!
//! The in-memory transport defines the **reference behavior** for the
//! transport layer. Other implementations are expected to approximate it as
//! closely as their underlying systems allow:
//!
//! - Declaring a queue that already exists with the same properties
//!   succeeds and refers to the same queue; different properties are
//!   rejected and the original declaration stands.
//! - Payloads sent to a declared queue are accepted in publish order and
//!   none are dropped due to timing or scheduling.
//! - Payloads sent to a queue nobody declared vanish, the way a real
//!   broker drops unroutable messages published without the mandatory
//!   flag.
//!
//! ## Hubs
//!
//! All state lives in a [`MemoryHub`]. [`create_memory_transport`] puts
//! each transport on a hub of its own, so independent brokers stay
//! independent. Tests that need several transports on one bus, for example
//! to verify that two brokers declaring the same queue meet the same
//! underlying queue, share a hub explicitly through
//! [`create_memory_transport_with_hub`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;

#[allow(unused_imports)]
use crate::{
    // ---
    log_debug,
    log_warn,
    BrokerConfig,
    Error,
    QueueOptions,
    QueueRef,
    Result,
    Transport,
    TransportPtr,
};

/// One declared queue: its properties and every payload accepted so far.
#[derive(Debug, Default)]
struct MemoryQueue {
    options: QueueOptions,
    messages: Vec<Bytes>,
}

/// Shared state of the in-memory broker: declared queues and the payloads
/// published to them.
///
/// The accessors exposing stored payloads exist for observability in tests;
/// a real broker offers nothing equivalent.
pub struct MemoryHub {
    queues: RwLock<HashMap<String, MemoryQueue>>,
}

impl MemoryHub {
    /// Create an empty hub.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queues: RwLock::new(HashMap::new()),
        })
    }

    async fn declare(&self, name: &str, options: QueueOptions) -> Result<QueueRef> {
        let mut queues = self.queues.write().await;

        match queues.get(name) {
            Some(existing) if existing.options != options => Err(Error::Declaration {
                queue: name.to_string(),
                reason: format!(
                    "queue already declared with different properties ({:?})",
                    existing.options
                ),
            }),
            Some(_) => Ok(QueueRef::new(name, options)),
            None => {
                queues.insert(
                    name.to_string(),
                    MemoryQueue {
                        options,
                        messages: Vec::new(),
                    },
                );
                Ok(QueueRef::new(name, options))
            }
        }
    }

    async fn accept(&self, queue: &str, body: Bytes) {
        let mut queues = self.queues.write().await;

        match queues.get_mut(queue) {
            Some(entry) => entry.messages.push(body),
            None => {
                // Unroutable: no such queue, payload vanishes.
                log_debug!("memory hub dropped payload for undeclared queue {queue}");
            }
        }
    }

    /// Every payload the named queue has accepted, in publish order.
    /// Empty when the queue was never declared.
    pub async fn published(&self, queue: &str) -> Vec<Bytes> {
        let queues = self.queues.read().await;

        queues
            .get(queue)
            .map(|entry| entry.messages.clone())
            .unwrap_or_default()
    }

    /// Properties the named queue was declared with, if it exists.
    pub async fn queue_options(&self, queue: &str) -> Option<QueueOptions> {
        let queues = self.queues.read().await;

        queues.get(queue).map(|entry| entry.options)
    }
}

/// Transport handle onto a hub.
///
/// Closing the handle detaches it; the hub itself, and any other handles
/// onto it, keep working.
struct MemoryTransport {
    hub: Arc<MemoryHub>,
    closed: AtomicBool,
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn declare_queue(&self, name: &str, options: QueueOptions) -> Result<QueueRef> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Declaration {
                queue: name.to_string(),
                reason: "transport is closed".into(),
            });
        }

        self.hub.declare(name, options).await
    }

    async fn send(&self, queue: &str, body: Bytes) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Publish {
                queue: queue.to_string(),
                reason: "transport is closed".into(),
            });
        }

        self.hub.accept(queue, body).await;

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // Idempotent: a second close finds the flag already set.
        self.closed.store(true, Ordering::Release);

        Ok(())
    }
}

/// Create a memory transport on a hub of its own.
pub async fn create_memory_transport(config: &BrokerConfig) -> Result<TransportPtr> {
    create_memory_transport_with_hub(config, MemoryHub::new()).await
}

/// Create a memory transport on a caller-provided hub.
///
/// Transports sharing a hub behave like nodes connected to the same
/// broker: queues declared by one are visible to the others.
pub async fn create_memory_transport_with_hub(
    config: &BrokerConfig,
    hub: Arc<MemoryHub>,
) -> Result<TransportPtr> {
    if config.queue.is_empty() {
        return Err(Error::MissingConfig("queue".into()));
    }

    log_debug!("creating memory transport for queue {}", config.queue);

    Ok(Arc::new(MemoryTransport {
        hub,
        closed: AtomicBool::new(false),
    }))
}
