//! Routes Event notifications to a sink and manages the router lifecycle
use crate::{informer::EventHandler, Error, ReadyToken, Result};
use async_trait::async_trait;
use eventrouter_core::{event::resource_version, EventKey, Payload, RoutedEvent, Sink, TypeMismatch};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, warn, Instrument, Span};

/// Where an [`EventRouter`] is in its life
///
/// `Created → WaitingForSync → Ready → ShuttingDown → Stopped`, or
/// `WaitingForSync → Stopped` when the stop signal beats the initial sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, [`EventRouter::run`] not called yet
    Created,
    /// Waiting for the informer to deliver its initial listing
    WaitingForSync,
    /// Synced, waiting for the stop signal
    Ready,
    /// Stop signal received, closing the sink
    ShuttingDown,
    /// Done
    Stopped,
}

/// Forwards a deduplicated stream of Event changes to a [`Sink`]
///
/// The router is the [`EventHandler`] of an [`Informer`](crate::Informer):
///
/// - additions are delivered with no previous state,
/// - updates are delivered with the previous state, unless the resource version did not move,
/// - deletions are never delivered; events only disappear through TTL garbage collection.
///
/// Payloads that are not Events are logged and dropped. Nothing a single notification does
/// stops the router.
pub struct EventRouter {
    sink: Arc<dyn Sink>,
    synced: ReadyToken,
    span: Span,
    state: RwLock<LifecycleState>,
    // read-held for each delivery, write-held to close the sink; `true` once closed
    closed: tokio::sync::RwLock<bool>,
}

impl EventRouter {
    /// Wire a router to the sync state of a subscription and to a sink
    #[must_use]
    pub fn new(synced: ReadyToken, sink: Arc<dyn Sink>) -> Self {
        Self {
            sink,
            synced,
            span: info_span!("eventrouter"),
            state: RwLock::new(LifecycleState::Created),
            closed: tokio::sync::RwLock::new(false),
        }
    }

    /// Emit all diagnostics inside `span` instead of the default `eventrouter` span
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// Whether the subscription has delivered its initial listing
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.synced.is_ready()
    }

    /// Wait for the initial sync, then serve until `stop` is cancelled
    ///
    /// Notifications are delivered by the informer the whole time, this only gates readiness
    /// and closes the sink on the way out. Deliveries in flight when `stop` fires complete
    /// before the sink is closed; later notifications are dropped.
    ///
    /// # Errors
    ///
    /// [`Error::SyncTimeout`] if `stop` fires before the initial sync; the sink is left untouched.
    /// [`Error::AlreadyStarted`] if the router was run before.
    pub async fn run(&self, stop: CancellationToken) -> Result<()> {
        {
            let mut state = self.state.write();
            if *state != LifecycleState::Created {
                return Err(Error::AlreadyStarted(*state));
            }
            *state = LifecycleState::WaitingForSync;
        }
        self.lifecycle(stop).instrument(self.span.clone()).await
    }

    async fn lifecycle(&self, stop: CancellationToken) -> Result<()> {
        info!("starting event router");
        let synced = tokio::select! {
            biased;
            _ = self.synced.ready() => true,
            _ = stop.cancelled() => false,
        };
        if !synced {
            self.transition(LifecycleState::Stopped);
            error!("timed out waiting for caches to sync");
            return Err(Error::SyncTimeout);
        }
        self.transition(LifecycleState::Ready);
        info!(sink = self.sink.name(), "caches synced, routing events");

        stop.cancelled().await;
        self.transition(LifecycleState::ShuttingDown);
        {
            let mut closed = self.closed.write().await;
            *closed = true;
            if let Err(err) = self.sink.close().await {
                warn!(sink = self.sink.name(), error = %err, "failed to close sink");
            }
        }
        self.transition(LifecycleState::Stopped);
        info!("shutting down event router");
        Ok(())
    }

    fn transition(&self, to: LifecycleState) {
        let mut state = self.state.write();
        debug!(from = ?*state, to = ?to, "lifecycle transition");
        *state = to;
    }

    async fn deliver(&self, routed: RoutedEvent) {
        let key = routed.key();
        let verb = routed.verb();
        let closed = self.closed.read().await;
        if *closed {
            debug!(%key, %verb, "sink closed, dropping event");
            return;
        }
        trace!(%key, %verb, "delivering event");
        if let Err(err) = self.sink.deliver(&routed.current, routed.previous.as_deref()).await {
            warn!(sink = self.sink.name(), %key, %verb, error = %err, "sink failed to deliver event");
        }
    }

    async fn add(&self, obj: Payload) {
        match obj {
            Ok(event) => self.deliver(RoutedEvent::created(event)).await,
            Err(mismatch) => dropped("add", &mismatch),
        }
    }

    async fn update(&self, old: Payload, new: Payload) {
        let old = match old {
            Ok(old) => old,
            Err(mismatch) => return dropped("update", &mismatch),
        };
        let new = match new {
            Ok(new) => new,
            Err(mismatch) => return dropped("update", &mismatch),
        };
        if resource_version(&old) == resource_version(&new) {
            trace!(key = %EventKey::from_event(&new), "resource version unchanged, skipping update");
            return;
        }
        self.deliver(RoutedEvent::updated(new, old)).await;
    }

    fn delete(&self, obj: Payload) {
        match obj {
            Ok(event) => debug!(
                key = %EventKey::from_event(&event),
                reason = event.reason.as_deref().unwrap_or_default(),
                "event deleted from the system"
            ),
            Err(mismatch) => dropped("delete", &mismatch),
        }
    }
}

fn dropped(notification: &'static str, mismatch: &TypeMismatch) {
    error!(notification, error = %mismatch, "dropping notification that is not a v1 Event");
}

#[async_trait]
impl EventHandler for EventRouter {
    async fn on_add(&self, obj: Payload) {
        self.add(obj).instrument(self.span.clone()).await
    }

    async fn on_update(&self, old: Payload, new: Payload) {
        self.update(old, new).instrument(self.span.clone()).await
    }

    async fn on_delete(&self, obj: Payload) {
        self.span.in_scope(|| self.delete(obj))
    }
}
