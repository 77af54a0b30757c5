//! AMQP transport implementation using `lapin`.
//!
//! ## Concurrency model
//!
//! The transport owns one broker connection and one channel opened on it.
//! There is no internal locking and no command actor: during normal
//! operation the publisher loop is the only caller, and the lapin channel
//! serializes its own frame I/O internally.
//!
//! ## Connection behavior
//!
//! Connection happens eagerly in [`create_amqp_transport`]: the factory
//! either returns a transport with a live connection and channel or fails
//! without leaving anything allocated. There is no reconnect logic; a lost
//! connection surfaces as publish failures until the host builds a new
//! broker.
//!
//! ## Queue semantics
//!
//! Queues are declared with caller-chosen [`QueueOptions`]; the defaults
//! describe a transient work queue (not durable, not auto-deleted, not
//! exclusive). Declaration arguments are always the empty table.
//!
//! Publishes go through the default exchange with the queue name as the
//! routing key and no mandatory or immediate flags, so an unroutable
//! payload is dropped by the broker rather than returned.
//!
//! This module intentionally avoids exposing AMQP-specific concepts
//! (exchanges, routing keys, message properties) outside the transport
//! boundary.

use lapin::{
    //
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties,
    Channel,
    Connection,
    ConnectionProperties,
};

use std::sync::Arc;

use bytes::Bytes;

use crate::{
    //
    log_debug,
    log_error,
    log_info,
    BrokerConfig,
    CloseReport,
    Error,
    QueueOptions,
    QueueRef,
    Result,
    Transport,
    TransportPtr,
};

/// Concrete Transport backed by lapin.
///
/// All AMQP-specific concerns (exchanges, routing keys, connection state)
/// are contained within this type.
struct AmqpTransport {
    // ---
    connection: Connection,
    channel: Channel,
}

#[async_trait::async_trait]
impl Transport for AmqpTransport {
    // ---
    async fn declare_queue(&self, name: &str, options: QueueOptions) -> Result<QueueRef> {
        let declare = QueueDeclareOptions {
            passive: false,
            durable: options.durable,
            exclusive: options.exclusive,
            auto_delete: options.auto_delete,
            nowait: options.no_wait,
        };

        let queue = self
            .channel
            .queue_declare(name, declare, FieldTable::default())
            .await
            .map_err(|e| Error::Declaration {
                queue: name.to_string(),
                reason: e.to_string(),
            })?;

        log_info!("declared queue {}", queue.name().as_str());

        Ok(QueueRef::new(queue.name().as_str(), options))
    }

    async fn send(&self, queue: &str, body: Bytes) -> Result<()> {
        // ---
        // Fire and forget: the broker confirm is dropped, not awaited.
        let _confirm = self
            .channel
            .basic_publish(
                "",    // default exchange
                queue, // routing key = queue name
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| Error::Publish {
                queue: queue.to_string(),
                reason: e.to_string(),
            })?;

        log_debug!("published {} bytes to queue {queue}", body.len());

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // ---
        // Channel first, then the connection carrying it. Both are always
        // attempted; failures are aggregated, never short-circuited.
        let mut report = CloseReport::new();

        if let Err(e) = self.channel.close(200, "Normal shutdown").await {
            log_error!("could not close broker channel: {e}");
            report.record("channel", e.to_string());
        }

        if let Err(e) = self.connection.close(200, "Normal shutdown").await {
            log_error!("could not close broker connection: {e}");
            report.record("connection", e.to_string());
        }

        report.into_result()
    }
}

/// Create an AMQP transport: connect to the broker, then open one channel.
///
/// This is the only symbol exposed from this module.
///
/// # Errors
///
/// `Error::MissingConfig` when the configuration has no uri,
/// `Error::Connection` when the broker is unreachable or refuses the
/// credentials, `Error::Channel` when the channel cannot be opened.
pub async fn create_amqp_transport(config: &BrokerConfig) -> Result<TransportPtr> {
    // ---
    let uri = config
        .uri
        .as_deref()
        .ok_or_else(|| Error::MissingConfig("uri".into()))?;

    let connection = Connection::connect(uri, ConnectionProperties::default())
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

    log_info!("connected to message broker at {uri}");

    let channel = match connection.create_channel().await {
        Ok(channel) => channel,
        Err(e) => {
            // Construction aborts whole: nothing half-open is handed back.
            let _ = connection.close(200, "setup failed").await;
            return Err(Error::Channel(e.to_string()));
        }
    };

    Ok(Arc::new(AmqpTransport {
        connection,
        channel,
    }))
}
