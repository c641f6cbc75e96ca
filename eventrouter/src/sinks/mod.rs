//! Bundled [`Sink`] implementations
//!
//! Every sink writes the same [`EventData`](crate::core::EventData) record, so downstream
//! consumers can switch between them without changing their parsing.

mod fanout;
mod http;
mod log;
mod stdout;

pub use self::{fanout::FanoutSink, http::HttpSink, log::LogSink, stdout::StdoutSink};

use crate::{config::SinkConfig, core::Sink, Result};
use std::sync::Arc;

/// Build the sink described by `config`
///
/// # Errors
///
/// Fails on invalid settings, such as a relative http url or an empty fanout.
pub fn manufacture_sink(config: &SinkConfig) -> Result<Arc<dyn Sink>> {
    config.validate()?;
    let sink: Arc<dyn Sink> = match config {
        SinkConfig::Stdout => Arc::new(StdoutSink::new()),
        SinkConfig::Log => Arc::new(LogSink::new()),
        SinkConfig::Http(http) => Arc::new(HttpSink::new(http.uri()?, http.timeout())?),
        SinkConfig::Fanout { sinks } => Arc::new(FanoutSink::new(
            sinks.iter().map(manufacture_sink).collect::<Result<Vec<_>>>()?,
        )),
    };
    tracing::info!(sink = sink.name(), "manufactured sink");
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::manufacture_sink;
    use crate::{
        config::{HttpSinkConfig, SinkConfig},
        Error,
    };

    #[test]
    fn builds_nested_sinks() {
        let sink = manufacture_sink(&SinkConfig::Fanout {
            sinks: vec![SinkConfig::Stdout, SinkConfig::Log, SinkConfig::Fanout {
                sinks: vec![SinkConfig::Log],
            }],
        })
        .unwrap();
        assert_eq!(sink.name(), "fanout");
        assert_eq!(manufacture_sink(&SinkConfig::Stdout).unwrap().name(), "stdout");
        assert_eq!(manufacture_sink(&SinkConfig::Log).unwrap().name(), "log");
    }

    #[tokio::test]
    async fn builds_http_sink() {
        let sink = manufacture_sink(&SinkConfig::Http(HttpSinkConfig {
            url: "http://localhost:8080/events".into(),
            timeout_seconds: Some(1),
        }))
        .unwrap();
        assert_eq!(sink.name(), "http");
    }

    #[test]
    fn rejects_invalid_children() {
        let err = manufacture_sink(&SinkConfig::Fanout {
            sinks: vec![SinkConfig::Http(HttpSinkConfig {
                url: "not a url".into(),
                timeout_seconds: None,
            })],
        })
        .err()
        .unwrap();
        assert!(matches!(err, Error::InvalidSink(_)), "{err}");
    }
}
