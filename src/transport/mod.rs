//! Transport implementations.
//!
//! This module provides concrete implementations of the domain-level
//! `Transport` trait, each exposed only through a constructor function.
//! Backend selection happens in [`create_transport`]: explicit
//! configuration first, compiled features second.
//!
//! Domain code must not depend on transport-specific types.

mod memory;

#[cfg(feature = "amqp")]
mod amqp;

pub use memory::{create_memory_transport, create_memory_transport_with_hub, MemoryHub};

#[cfg(feature = "amqp")]
pub use amqp::create_amqp_transport;

use crate::{BrokerConfig, Error, Result, TransportPtr};

/// Create the transport the configuration asks for.
///
/// With `transport_type` unset, the AMQP backend is selected when compiled
/// in and the configuration carries a uri; otherwise the memory backend.
///
/// # Errors
///
/// `Error::UnsupportedTransport` for an unknown backend name, or when the
/// configuration needs a backend that is not compiled in. Factory errors
/// pass through unchanged.
pub async fn create_transport(config: &BrokerConfig) -> Result<TransportPtr> {
    // ---
    match config.transport_type.as_deref() {
        Some("memory") => create_memory_transport(config).await,

        #[cfg(feature = "amqp")]
        Some("amqp") => create_amqp_transport(config).await,

        #[cfg(not(feature = "amqp"))]
        Some("amqp") => Err(Error::UnsupportedTransport(
            "amqp support is not compiled in".into(),
        )),

        Some(other) => Err(Error::UnsupportedTransport(other.into())),

        None => {
            #[cfg(feature = "amqp")]
            if config.uri.is_some() {
                return create_amqp_transport(config).await;
            }

            #[cfg(not(feature = "amqp"))]
            if config.uri.is_some() {
                return Err(Error::UnsupportedTransport(
                    "no compiled backend can reach a broker uri".into(),
                ));
            }

            create_memory_transport(config).await
        }
    }
}
