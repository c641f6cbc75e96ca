//! Identity, payload and routed pair of a watched [`Event`]
use crate::{Event, TypeMismatch};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;
use std::{fmt, sync::Arc};

/// A notification payload as handed to an event handler
///
/// The subscription parses raw objects before invoking its handlers,
/// so a handler only ever sees a typed [`Event`] or the reason it could not be produced.
pub type Payload = Result<Arc<Event>, TypeMismatch>;

/// Stable identity of an event across its lifetime
///
/// Two notifications with the same key describe the same subject.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    /// Namespace of the object, `None` for cluster-scoped objects
    pub namespace: Option<String>,
    /// Name of the object
    pub name: String,
}

impl EventKey {
    /// Build a key from any object metadata
    ///
    /// A missing name maps to the empty string, which the apiserver never hands out.
    #[must_use]
    pub fn from_meta(meta: &ObjectMeta) -> Self {
        Self {
            namespace: meta.namespace.clone(),
            name: meta.name.clone().unwrap_or_default(),
        }
    }

    /// Build the key of an [`Event`]
    #[must_use]
    pub fn from_event(event: &Event) -> Self {
        Self::from_meta(&event.metadata)
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Returns the opaque resource version of an event
#[must_use]
pub fn resource_version(event: &Event) -> Option<&str> {
    event.metadata.resource_version.as_deref()
}

/// What happened to the subject of a [`RoutedEvent`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    /// First sighting of the subject
    Added,
    /// A semantic change to a subject that was seen before
    Updated,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Added => f.write_str("ADDED"),
            Verb::Updated => f.write_str("UPDATED"),
        }
    }
}

/// The unit handed to a sink for one semantic change
///
/// `previous` is absent for creations and present for updates.
/// Deletions never produce a `RoutedEvent`.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutedEvent {
    /// State after the change
    pub current: Arc<Event>,
    /// State before the change
    pub previous: Option<Arc<Event>>,
}

impl RoutedEvent {
    /// A newly created event
    #[must_use]
    pub fn created(current: Arc<Event>) -> Self {
        Self {
            current,
            previous: None,
        }
    }

    /// An event that changed from `previous` to `current`
    #[must_use]
    pub fn updated(current: Arc<Event>, previous: Arc<Event>) -> Self {
        Self {
            current,
            previous: Some(previous),
        }
    }

    /// Identity of the routed subject
    #[must_use]
    pub fn key(&self) -> EventKey {
        EventKey::from_event(&self.current)
    }

    /// Whether this pair describes a creation or an update
    #[must_use]
    pub fn verb(&self) -> Verb {
        if self.previous.is_some() {
            Verb::Updated
        } else {
            Verb::Added
        }
    }

    /// Serializable sink record for this pair
    #[must_use]
    pub fn data(&self) -> EventData<'_> {
        EventData::new(&self.current, self.previous.as_deref())
    }
}

/// The record written by the bundled sinks
///
/// Serializes as `{"verb":"UPDATED","event":{..},"old_event":{..}}`,
/// with `old_event` omitted for creations.
#[derive(Debug, Serialize)]
pub struct EventData<'a> {
    /// Creation or update
    pub verb: Verb,
    /// Current state of the event
    pub event: &'a Event,
    /// Previous state, only for updates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_event: Option<&'a Event>,
}

impl<'a> EventData<'a> {
    /// Build a record from the arguments of [`Sink::deliver`](crate::Sink::deliver)
    #[must_use]
    pub fn new(event: &'a Event, old_event: Option<&'a Event>) -> Self {
        let verb = if old_event.is_some() {
            Verb::Updated
        } else {
            Verb::Added
        };
        Self {
            verb,
            event,
            old_event,
        }
    }

    /// Serialize to a single line of JSON
    ///
    /// # Errors
    ///
    /// Fails only if the event contains data that `serde_json` refuses to encode.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    fn event(name: &str, rv: &str) -> Event {
        Event {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                resource_version: Some(rv.to_string()),
                ..ObjectMeta::default()
            },
            message: Some("Pulled image".to_string()),
            ..Event::default()
        }
    }

    #[test]
    fn key_displays_namespace_and_name() {
        let key = EventKey::from_event(&event("a", "1"));
        assert_eq!(key.to_string(), "default/a");
        let cluster = EventKey {
            namespace: None,
            name: "b".into(),
        };
        assert_eq!(cluster.to_string(), "b");
    }

    #[test]
    fn routed_event_verb_follows_previous() {
        let created = RoutedEvent::created(Arc::new(event("a", "1")));
        assert_eq!(created.verb(), Verb::Added);
        let updated = RoutedEvent::updated(Arc::new(event("a", "2")), Arc::new(event("a", "1")));
        assert_eq!(updated.verb(), Verb::Updated);
        assert_eq!(updated.key(), created.key());
    }

    #[test]
    fn event_data_omits_old_event_for_creations() {
        let ev = event("a", "1");
        let json = EventData::new(&ev, None).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_json_eq!(
            value,
            json!({
                "verb": "ADDED",
                "event": {
                    "apiVersion": "v1",
                    "kind": "Event",
                    "metadata": {"name": "a", "namespace": "default", "resourceVersion": "1"},
                    "involvedObject": {},
                    "message": "Pulled image",
                }
            })
        );
    }

    #[test]
    fn event_data_carries_old_event_for_updates() {
        let old = event("a", "1");
        let new = event("a", "2");
        let value = serde_json::to_value(EventData::new(&new, Some(&old))).unwrap();
        assert_eq!(value["verb"], "UPDATED");
        assert_eq!(value["event"]["metadata"]["resourceVersion"], "2");
        assert_eq!(value["old_event"]["metadata"]["resourceVersion"], "1");
    }
}
