use std::fmt;

use thiserror::Error;

/// Errors that can occur while setting up, feeding, or tearing down a broker
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level connection could not be established
    #[error("could not connect to message broker: {0}")]
    Connection(String),

    /// Channel could not be opened on an established connection
    #[error("could not open broker channel: {0}")]
    Channel(String),

    /// Queue declaration was rejected or failed
    #[error("could not declare queue {queue}: {reason}")]
    Declaration { queue: String, reason: String },

    /// The transport refused a publish attempt
    #[error("could not publish to queue {queue}: {reason}")]
    Publish { queue: String, reason: String },

    /// One or more resources failed to release during close
    #[error("{0}")]
    Close(CloseReport),

    /// A required configuration field was not provided
    #[error("missing required configuration: {0}")]
    MissingConfig(String),

    /// Two configuration options contradict each other
    #[error("conflicting configuration: {0}")]
    ConfigConflict(String),

    /// The requested transport backend is unknown or compiled out
    #[error("unsupported transport type: {0}")]
    UnsupportedTransport(String),
}

/// Result type alias for broker operations
pub type Result<T> = std::result::Result<T, Error>;

/// A single resource that failed to release during teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFailure {
    /// Which resource failed ("channel", "connection")
    pub resource: &'static str,
    /// Underlying failure description
    pub reason: String,
}

/// Every failure observed during one close call.
///
/// Teardown never short-circuits: each resource is released even when an
/// earlier release fails, and every failure lands in the report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CloseReport {
    failures: Vec<CloseFailure>,
}

impl CloseReport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, resource: &'static str, reason: impl Into<String>) {
        self.failures.push(CloseFailure {
            resource,
            reason: reason.into(),
        });
    }

    /// True when every resource released cleanly.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// The individual failures, in the order the releases were attempted.
    pub fn failures(&self) -> &[CloseFailure] {
        &self.failures
    }

    /// Ok when the report is empty, otherwise the aggregated close error.
    pub(crate) fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Close(self))
        }
    }
}

impl fmt::Display for CloseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(
                f,
                "could not close broker {}: {}",
                failure.resource, failure.reason
            )?;
        }
        Ok(())
    }
}
