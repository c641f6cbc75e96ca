use crate::{
    core::{Event, EventData, Sink, SinkError},
    Error,
};
use async_trait::async_trait;
use bytes::Bytes;
use http::{header, Method, Request, Uri};
use http_body_util::Full;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;
use tracing::trace;

/// POSTs each routed event as JSON to a webhook
///
/// One request per event, no batching and no retries. Any non-2xx answer is a failed delivery.
pub struct HttpSink {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    uri: Uri,
    timeout: Option<Duration>,
}

impl HttpSink {
    /// Sink posting to `uri`, giving up on a request after `timeout`
    ///
    /// # Errors
    ///
    /// Fails if the TLS stack cannot be initialized.
    pub fn new(uri: Uri, timeout: Option<Duration>) -> Result<Self, Error> {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(Error::Tls)?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(https);
        Ok(Self { client, uri, timeout })
    }

    async fn post(&self, body: Vec<u8>) -> Result<(), SinkError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.uri.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|err| SinkError::Http(err.into()))?;
        let response = self.client.request(request);
        let response = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, response)
                .await
                .map_err(|_| SinkError::Timeout(timeout))?,
            None => response.await,
        }
        .map_err(|err| SinkError::Http(err.into()))?;

        let status = response.status();
        trace!(uri = %self.uri, %status, "posted event");
        if status.is_success() {
            Ok(())
        } else {
            Err(SinkError::Status {
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl Sink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn deliver(&self, current: &Event, previous: Option<&Event>) -> Result<(), SinkError> {
        let body = EventData::new(current, previous)
            .to_json()
            .map_err(SinkError::Serialize)?;
        self.post(body).await
    }
}
