//! Queue publishing over AMQP with an acknowledged shutdown handshake
//!
//! This library provides a simple, ergonomic API for publishing byte
//! payloads to a message-broker queue. It handles connection and queue
//! setup, a channel-fed publisher loop running on its own task, and a
//! two-phase shutdown handshake that lets the host decide when the loop
//! may stop.
//!

// Import all sub modules once...
mod broker;
mod broker_builder;
mod domain;
mod publisher;
mod shutdown;
mod transport;

mod broker_config;

mod error;
mod macros;

#[allow(unused_imports)]
pub(crate) use macros::{log_debug, log_error, log_info, log_warn};

// Re-export main types
pub use broker::Broker;
pub use broker_builder::BrokerBuilder;

pub use broker_config::BrokerConfig;

pub use error::{CloseFailure, CloseReport, Error, Result};
pub use publisher::PublishFailure;
pub use shutdown::{shutdown_channel, ShutdownAck, ShutdownHandle, ShutdownSignal};

pub use transport::create_transport;
pub use transport::{create_memory_transport, create_memory_transport_with_hub, MemoryHub};

#[cfg(feature = "amqp")]
pub use transport::create_amqp_transport;

// --- public re-exports
pub use domain::{
    //
    QueueOptions,
    QueueRef,
    Transport,
    TransportPtr,
};
