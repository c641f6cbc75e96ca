use async_trait::async_trait;
use eventrouter_core::{Event, RoutedEvent, Sink, SinkError};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DynamicObject, TypeMeta};
use parking_lot::Mutex;
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};
use tracing::{field::Field, Level, Subscriber};
use tracing_subscriber::{layer::Context, Layer};

pub fn event(namespace: &str, name: &str, resource_version: &str) -> Event {
    Event {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: Some(resource_version.to_string()),
            ..ObjectMeta::default()
        },
        reason: Some("Scheduled".to_string()),
        message: Some(format!("{name} assigned to node-1")),
        type_: Some("Normal".to_string()),
        ..Event::default()
    }
}

/// The raw form an [`Event`] takes on the wire
pub fn dynamic(event: &Event) -> DynamicObject {
    serde_json::from_value(serde_json::to_value(event).unwrap()).unwrap()
}

/// A raw object that is not an [`Event`]
pub fn mismatched(namespace: &str, name: &str) -> DynamicObject {
    DynamicObject {
        types: Some(TypeMeta {
            api_version: "v1".into(),
            kind: "Pod".into(),
        }),
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: Some("1".to_string()),
            ..ObjectMeta::default()
        },
        data: serde_json::json!({}),
    }
}

/// Sink that remembers every delivery
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<RoutedEvent>>,
    failing: AtomicBool,
    closed: AtomicUsize,
}

impl RecordingSink {
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.failing.store(true, Ordering::SeqCst);
        sink
    }

    pub fn delivered(&self) -> Vec<RoutedEvent> {
        self.delivered.lock().clone()
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, current: &Event, previous: Option<&Event>) -> Result<(), SinkError> {
        self.delivered.lock().push(RoutedEvent {
            current: Arc::new(current.clone()),
            previous: previous.cloned().map(Arc::new),
        });
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Status { status: 503 });
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Tracing layer that captures `(level, message)` of every event
#[derive(Clone, Default)]
pub struct Diagnostics(Arc<Mutex<Vec<(Level, String)>>>);

impl Diagnostics {
    pub fn count(&self, level: Level) -> usize {
        self.0.lock().iter().filter(|(l, _)| *l == level).count()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Diagnostics {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0.lock().push((*event.metadata().level(), visitor.0));
    }
}

/// Capture diagnostics emitted on this thread until the guard drops
pub fn capture_diagnostics() -> (Diagnostics, tracing::subscriber::DefaultGuard) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let diagnostics = Diagnostics::default();
    let guard = tracing_subscriber::registry().with(diagnostics.clone()).set_default();
    (diagnostics, guard)
}
