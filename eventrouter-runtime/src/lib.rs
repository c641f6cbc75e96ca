//! Runtime components for routing Kubernetes Events to sinks
//!
//! The [`Informer`] turns a `kube` watcher stream into add/update/delete notifications
//! and reports when its initial listing has been delivered.
//! The [`EventRouter`] receives those notifications, drops the ones that carry no change,
//! and forwards the rest to a [`Sink`](eventrouter_core::Sink).
//!
//! ```no_run
//! use eventrouter_runtime::{EventRouter, Informer};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! # async fn wrapper(sink: Arc<dyn eventrouter_core::Sink>) -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let informer = Informer::events(client, None, Default::default());
//! let router = Arc::new(EventRouter::new(informer.ready_token(), sink));
//! let stop = CancellationToken::new();
//!
//! let handler = router.clone();
//! let watch_stop = stop.child_token();
//! tokio::spawn(async move { informer.run(&*handler, watch_stop).await });
//! router.run(stop).await?;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]

pub mod informer;
pub use informer::{EventHandler, Informer, ReadyToken};

pub mod router;
pub use router::{EventRouter, LifecycleState};

mod error;
pub use error::Error;

#[cfg(test)] pub(crate) mod test_utils;

/// Convenient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;
