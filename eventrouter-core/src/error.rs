use crate::EventKey;
use std::time::Duration;
use thiserror::Error;

/// A notification payload that is not a `v1/Event`
///
/// Produced by the subscription when it fails to parse a raw object.
/// The identity is still known since it comes from the object metadata.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("object {key} of type {found} is not a v1 Event: {reason}")]
pub struct TypeMismatch {
    /// Identity read from the raw object metadata
    pub key: EventKey,
    /// `apiVersion/kind` of the raw object, or `<unknown>`
    pub found: String,
    /// Why parsing failed
    pub reason: String,
}

impl TypeMismatch {
    /// Build a mismatch for the object identified by `key`
    pub fn new(key: EventKey, found: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            key,
            found: found.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures reported by a [`Sink`](crate::Sink)
///
/// The router logs these and moves on; delivery is never retried.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The record could not be encoded
    #[error("failed to serialize event: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Writing to a local destination failed
    #[error("failed to write event: {0}")]
    Io(#[source] std::io::Error),

    /// The transport to a remote destination failed
    #[error("failed to send event: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The remote destination answered with a non-success status
    #[error("destination rejected event with status {status}")]
    Status {
        /// HTTP status code returned
        status: u16,
    },

    /// The remote destination did not answer in time
    #[error("timed out after {0:?} delivering event")]
    Timeout(Duration),

    /// Some children of a composite sink failed
    #[error("{failed} of {total} sinks failed, first error: {first}")]
    Fanout {
        /// Number of failed children
        failed: usize,
        /// Number of children attempted
        total: usize,
        /// The first failure, in child order
        #[source]
        first: Box<SinkError>,
    },
}
