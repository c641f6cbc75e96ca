//! Forwards the stream of Kubernetes Events in a cluster to pluggable sinks
//!
//! # Overview
//!
//! An [`Informer`](runtime::Informer) watches `v1/Event` objects and hands every
//! notification to an [`EventRouter`](runtime::EventRouter), which drops no-op updates and
//! deletions and forwards everything else to a [`Sink`](core::Sink).
//!
//! The main modules are:
//!
//! - [`config`] for the file based [`Config`](config::Config)
//! - [`sinks`] with the bundled sinks and [`manufacture_sink`](sinks::manufacture_sink)
//! - [`runtime`] with the informer and the router
//! - [`core`] with the routed event types and the sink contract
//!
//! The `eventrouter` binary wires these together; see `src/main.rs`.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]

pub mod config;
pub use config::Config;

pub mod sinks;

mod error;
pub use error::Error;

pub use eventrouter_core as core;
pub use eventrouter_runtime as runtime;

/// Convenient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;
