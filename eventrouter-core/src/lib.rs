//! Types and traits shared by the event router runtime and its sinks
//!
//! This crate holds everything that does not need a Kubernetes client:
//! the routed event pair, the identity of an event, the typed payload that
//! a subscription hands to its handlers, and the [`Sink`] capability.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod event;
pub use event::{EventData, EventKey, Payload, RoutedEvent, Verb};

pub mod sink;
pub use sink::Sink;

mod error;
pub use error::{SinkError, TypeMismatch};

/// The only resource kind this router watches
pub use k8s_openapi::api::core::v1::Event;

/// Convenient alias for the result of a sink operation
pub type Result<T, E = SinkError> = std::result::Result<T, E>;
