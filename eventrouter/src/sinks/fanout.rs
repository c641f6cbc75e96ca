use crate::core::{Event, Sink, SinkError};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::debug;

/// Delivers every routed event to a set of child sinks
///
/// Children are delivered to concurrently and all of them are attempted, even when one fails.
/// The delivery as a whole fails if any child fails.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl FanoutSink {
    /// Compose `sinks` behind a single handle
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    fn collect(&self, results: Vec<Result<(), SinkError>>, op: &str) -> Result<(), SinkError> {
        let total = results.len();
        let mut failures = results
            .into_iter()
            .zip(&self.sinks)
            .filter_map(|(res, sink)| res.err().map(|err| (sink.name(), err)))
            .inspect(|(child, err)| debug!(child, error = %err, "fanout child failed to {op}"))
            .map(|(_, err)| err)
            .collect::<Vec<_>>();
        if failures.is_empty() {
            return Ok(());
        }
        Err(SinkError::Fanout {
            failed: failures.len(),
            total,
            first: Box::new(failures.swap_remove(0)),
        })
    }
}

#[async_trait]
impl Sink for FanoutSink {
    fn name(&self) -> &str {
        "fanout"
    }

    async fn deliver(&self, current: &Event, previous: Option<&Event>) -> Result<(), SinkError> {
        let results = join_all(self.sinks.iter().map(|sink| sink.deliver(current, previous))).await;
        self.collect(results, "deliver")
    }

    async fn close(&self) -> Result<(), SinkError> {
        let results = join_all(self.sinks.iter().map(|sink| sink.close())).await;
        self.collect(results, "close")
    }
}
