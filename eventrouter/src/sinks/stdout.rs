use crate::core::{Event, EventData, Sink, SinkError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::{self, Write};

/// Writes one JSON [`EventData`] line per routed event
///
/// Lines are written whole under a lock, so concurrent deliveries never interleave.
pub struct StdoutSink<W = io::Stdout> {
    writer: Mutex<W>,
}

impl StdoutSink {
    /// Sink writing to the process stdout
    #[must_use]
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> StdoutSink<W> {
    /// Sink writing to any destination
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Take the destination back
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W: Write + Send> Sink for StdoutSink<W> {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn deliver(&self, current: &Event, previous: Option<&Event>) -> Result<(), SinkError> {
        let mut line = EventData::new(current, previous)
            .to_json()
            .map_err(SinkError::Serialize)?;
        line.push(b'\n');
        let mut writer = self.writer.lock();
        writer.write_all(&line).map_err(SinkError::Io)?;
        writer.flush().map_err(SinkError::Io)
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.writer.lock().flush().map_err(SinkError::Io)
    }
}
