//! Turns a watch of `v1/Event` objects into add/update/delete notifications
//!
//! The [`Informer`] sits on top of a [`kube::runtime::watcher`] stream, keeps the last seen
//! state of every event in a [`Store`], and calls an [`EventHandler`] for each change.
//! Raw objects are parsed into [`Event`]s before a handler sees them; objects that do not
//! parse are handed over as [`TypeMismatch`] so the handler can decide what to log.

pub mod store;

pub use self::store::Store;

use async_trait::async_trait;
use eventrouter_core::{Event, EventKey, Payload, TypeMismatch};
use futures::{stream::BoxStream, FutureExt, Stream, StreamExt};
use kube::{
    api::{Api, ApiResource, DynamicObject},
    runtime::{watcher, WatchStreamExt},
    Client,
};
use std::{any::Any, collections::HashSet, future::Future, panic::AssertUnwindSafe, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Callback target of an [`Informer`]
///
/// For a single informer, calls never overlap: each one is awaited before the next
/// notification is pulled from the watch.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// An event was seen for the first time, either live or during the initial listing
    async fn on_add(&self, obj: Payload);

    /// A known event was seen again
    ///
    /// Relists re-deliver unchanged objects, so `old` and `new` may carry the same resource version.
    async fn on_update(&self, old: Payload, new: Payload);

    /// An event was removed from the cluster, or vanished while the watch was down
    async fn on_delete(&self, obj: Payload);
}

#[async_trait]
impl<H: EventHandler + ?Sized> EventHandler for Arc<H> {
    async fn on_add(&self, obj: Payload) {
        (**self).on_add(obj).await
    }

    async fn on_update(&self, old: Payload, new: Payload) {
        (**self).on_update(old, new).await
    }

    async fn on_delete(&self, obj: Payload) {
        (**self).on_delete(obj).await
    }
}

/// Signals that an [`Informer`] has delivered its initial listing
///
/// All clones observe the same signal, and a synced token never goes back.
#[derive(Clone, Debug, Default)]
pub struct ReadyToken(CancellationToken);

impl ReadyToken {
    /// A token for a subscription that has not synced yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the initial listing has been delivered
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Wait for the initial listing, returning at once if it was already delivered
    pub async fn ready(&self) {
        self.0.cancelled().await;
    }

    pub(crate) fn mark_ready(&self) {
        self.0.cancel();
    }
}

type WatchStream = BoxStream<'static, watcher::Result<watcher::Event<DynamicObject>>>;

/// A shared-informer style subscription to `v1/Event` objects
///
/// Tracks sync state through a [`ReadyToken`] that turns ready the first time the
/// watcher finishes its initial listing, and stays ready across later relists.
pub struct Informer {
    stream: WatchStream,
    state: CacheState,
}

/// What the informer remembers between notifications
struct CacheState {
    writer: store::Writer,
    ready: ReadyToken,
    // keys seen since the last `Init`, `None` outside of a relist
    relist: Option<HashSet<EventKey>>,
}

impl Informer {
    /// Subscribe to `v1/Event` objects in `namespace`, or cluster-wide with `None`
    ///
    /// The watch recovers from errors on its own using the default `kube` backoff.
    #[must_use]
    pub fn events(client: Client, namespace: Option<&str>, config: watcher::Config) -> Self {
        let resource = ApiResource::erase::<Event>(&());
        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(client, ns, &resource),
            None => Api::all_with(client, &resource),
        };
        Self::new(watcher(api, config).default_backoff())
    }

    /// Build an informer on top of any watcher-shaped stream
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = watcher::Result<watcher::Event<DynamicObject>>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
            state: CacheState {
                writer: store::Writer::default(),
                ready: ReadyToken::new(),
                relist: None,
            },
        }
    }

    /// Handle that becomes ready once the initial listing has been delivered
    #[must_use]
    pub fn ready_token(&self) -> ReadyToken {
        self.state.ready.clone()
    }

    /// Whether the initial listing has been delivered
    #[must_use]
    pub fn has_synced(&self) -> bool {
        self.state.ready.is_ready()
    }

    /// Read handle to the cache of last seen events
    #[must_use]
    pub fn store(&self) -> Store {
        self.state.writer.as_reader()
    }

    /// Drive the watch and call `handler` for every notification
    ///
    /// Returns when `stop` is cancelled or the watch stream ends.
    /// `stop` is only checked between notifications; a handler call in flight always completes.
    pub async fn run<H: EventHandler + ?Sized>(self, handler: &H, stop: CancellationToken) {
        let Self { mut stream, mut state } = self;
        loop {
            let next = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                next = stream.next() => next,
            };
            match next {
                Some(Ok(event)) => state.process(event, handler).await,
                Some(Err(err)) => warn!(error = %err, "watch failed, waiting for it to recover"),
                None => {
                    info!("watch stream ended");
                    break;
                }
            }
        }
        debug!("informer stopped");
    }
}

impl CacheState {
    async fn process<H: EventHandler + ?Sized>(&mut self, event: watcher::Event<DynamicObject>, handler: &H) {
        match event {
            watcher::Event::Apply(obj) => self.apply(obj, handler).await,
            watcher::Event::Delete(obj) => {
                let (key, payload) = parse(obj);
                self.writer.remove(&key);
                dispatch("delete", &key, handler.on_delete(payload)).await;
            }
            watcher::Event::Init => {
                debug!("relist started");
                self.relist = Some(HashSet::new());
            }
            watcher::Event::InitApply(obj) => {
                if let Some(seen) = &mut self.relist {
                    seen.insert(EventKey::from_meta(&obj.metadata));
                }
                self.apply(obj, handler).await;
            }
            watcher::Event::InitDone => {
                let seen = self.relist.take().unwrap_or_default();
                for gone in self.writer.retain_seen(&seen) {
                    let key = EventKey::from_event(&gone);
                    dispatch("delete", &key, handler.on_delete(Ok(gone))).await;
                }
                if !self.ready.is_ready() {
                    info!(events = seen.len(), "initial listing delivered");
                    self.ready.mark_ready();
                } else {
                    debug!(events = seen.len(), "relist delivered");
                }
            }
        }
    }

    async fn apply<H: EventHandler + ?Sized>(&mut self, obj: DynamicObject, handler: &H) {
        let (key, payload) = parse(obj);
        if let Ok(event) = &payload {
            if let Some(old) = self.writer.get(&key) {
                self.writer.insert(key.clone(), event.clone());
                return dispatch("update", &key, handler.on_update(Ok(old), payload)).await;
            }
            self.writer.insert(key.clone(), event.clone());
        } else if let Some(old) = self.writer.get(&key) {
            return dispatch("update", &key, handler.on_update(Ok(old), payload)).await;
        }
        dispatch("add", &key, handler.on_add(payload)).await;
    }
}

/// Parse a raw object into an [`Event`], keeping its identity either way
fn parse(obj: DynamicObject) -> (EventKey, Payload) {
    let key = EventKey::from_meta(&obj.metadata);
    let found = obj
        .types
        .as_ref()
        .map_or_else(|| "<unknown>".to_string(), |t| format!("{}/{}", t.api_version, t.kind));
    let payload = obj
        .try_parse::<Event>()
        .map(Arc::new)
        .map_err(|err| TypeMismatch::new(key.clone(), found, err));
    (key, payload)
}

/// Run one handler call, containing any panic so the watch keeps flowing
async fn dispatch(notification: &'static str, key: &EventKey, call: impl Future<Output = ()>) {
    if let Err(panic) = AssertUnwindSafe(call).catch_unwind().await {
        error!(
            notification,
            %key,
            panic = panic_message(panic.as_ref()),
            "event handler panicked, continuing with next notification"
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
