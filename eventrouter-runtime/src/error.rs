use crate::LifecycleState;
use thiserror::Error;

/// Failures of the event router lifecycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The stop signal fired before the informer finished its initial listing
    ///
    /// The router never retries the sync; restarting is up to the caller.
    #[error("timed out waiting for caches to sync")]
    SyncTimeout,

    /// [`EventRouter::run`](crate::EventRouter::run) was called more than once
    #[error("event router was already started and is {0:?}")]
    AlreadyStarted(LifecycleState),
}
