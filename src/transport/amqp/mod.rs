//! AMQP protocol transport.
//!
//! Adapts the lapin client (AMQP 0-9-1, RabbitMQ) to the domain-level
//! `Transport` trait without leaking AMQP concepts upward.

mod lapin;

pub use self::lapin::create_amqp_transport;
