use crate::core::{Event, EventData, Sink, SinkError};
use async_trait::async_trait;
use tracing::{info, warn};

/// Emits each routed event as a structured log line
///
/// `Warning` events are logged at warn level, everything else at info level.
/// The full [`EventData`] JSON is attached as the `event` field.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    /// A log sink using the process wide subscriber
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Sink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, current: &Event, previous: Option<&Event>) -> Result<(), SinkError> {
        let data = EventData::new(current, previous);
        let json = serde_json::to_string(&data).map_err(SinkError::Serialize)?;
        let verb = data.verb;
        let reason = current.reason.as_deref().unwrap_or_default();
        if current.type_.as_deref() == Some("Warning") {
            warn!(target: "eventrouter::event", %verb, reason, event = %json);
        } else {
            info!(target: "eventrouter::event", %verb, reason, event = %json);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LogSink;
    use crate::core::{Event, Sink};
    use parking_lot::Mutex;
    use std::{collections::HashMap, fmt, sync::Arc};
    use tracing::{field::Field, Level, Subscriber};
    use tracing_subscriber::{layer::Context, layer::SubscriberExt, util::SubscriberInitExt, Layer};

    /// Level and fields of every log record
    #[derive(Clone, Default)]
    struct Records(Arc<Mutex<Vec<(Level, HashMap<String, String>)>>>);

    struct Fields(HashMap<String, String>);

    impl tracing::field::Visit for Fields {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name().to_string(), format!("{value:?}"));
        }
    }

    impl<S: Subscriber> Layer<S> for Records {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if event.metadata().target() != "eventrouter::event" {
                return;
            }
            let mut fields = Fields(HashMap::new());
            event.record(&mut fields);
            self.0.lock().push((*event.metadata().level(), fields.0));
        }
    }

    #[tokio::test]
    async fn level_follows_event_type() {
        let records = Records::default();
        let _guard = tracing_subscriber::registry().with(records.clone()).set_default();
        let sink = LogSink::new();
        let normal = Event {
            type_: Some("Normal".into()),
            reason: Some("Scheduled".into()),
            ..Event::default()
        };
        let warning = Event {
            type_: Some("Warning".into()),
            reason: Some("BackOff".into()),
            ..Event::default()
        };

        sink.deliver(&normal, None).await.unwrap();
        sink.deliver(&warning, Some(&normal)).await.unwrap();
        sink.close().await.unwrap();

        let records = records.0.lock().clone();
        assert_eq!(records.len(), 2);
        let (level, fields) = &records[0];
        assert_eq!(*level, Level::INFO);
        assert_eq!(fields["verb"], "ADDED");
        assert_eq!(fields["reason"], "Scheduled");
        let json: serde_json::Value = serde_json::from_str(&fields["event"]).unwrap();
        assert_eq!(json["verb"], "ADDED");
        assert_eq!(json["event"]["type"], "Normal");
        assert!(json.get("old_event").is_none());

        let (level, fields) = &records[1];
        assert_eq!(*level, Level::WARN);
        let json: serde_json::Value = serde_json::from_str(&fields["event"]).unwrap();
        assert_eq!(json["verb"], "UPDATED");
        assert_eq!(json["event"]["reason"], "BackOff");
        assert_eq!(json["old_event"]["reason"], "Scheduled");
    }
}
