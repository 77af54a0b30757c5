//! Domain layer public interface.
//!
//! This module defines what the publishing pipeline requires from a
//! message broker, independent of any concrete protocol or client
//! library.
//!
//! Domain consumers import symbols via this module, not by referencing
//! individual files directly.

mod transport;

// --- Transport domain re-exports ---

pub use transport::{
    //
    QueueOptions,
    QueueRef,
    Transport,
    TransportPtr,
};
