//! HTTP transport for streaming chat requests.
//!
//! The session talks to the network through the [`Transport`] trait so that it can be driven
//! by a scripted byte stream in tests.  [`ChatClient`] is the reqwest implementation.

use std::pin::Pin;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use futures::stream::{self, StreamExt};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client as ReqwestClient;
use url::Url;

use crate::chat::ChatConfig;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_BAD_STATUS, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_TTFB};
use crate::types::ChatRequest;

/// A response body, delivered as chunks of raw bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The head of a streaming response together with its body.
pub struct StreamResponse {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for `status`, empty if there is none.
    pub status_text: String,
    /// The body, if the response has a readable one.
    pub body: Option<ByteStream>,
}

impl StreamResponse {
    /// Creates a `200 OK` response around `body`.
    pub fn ok(body: ByteStream) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            body: Some(body),
        }
    }

    /// Creates a bodiless response with the given status.
    pub fn status(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: None,
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("body", &self.body.is_some())
            .finish()
    }
}

/// Issues a chat request and hands back the streaming response.
///
/// An `Err` means no response was received at all.  A response with an unsuccessful status
/// is still an `Ok`; interpreting it is the caller's business.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response head and body.
    async fn open_stream(&self, request: &ChatRequest) -> Result<StreamResponse>;
}

/// Client for the chat service's streaming endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: ReqwestClient,
    stream_url: Url,
    connect_timeout: Duration,
    idle_timeout: Option<Duration>,
}

impl ChatClient {
    /// Create a new client from the given configuration.
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let stream_url = config.stream_url()?;
        let client = ReqwestClient::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            stream_url,
            connect_timeout: config.connect_timeout,
            idle_timeout: config.idle_timeout,
        })
    }

    /// The URL requests are posted to.
    pub fn stream_url(&self) -> &Url {
        &self.stream_url
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        headers
    }
}

#[async_trait::async_trait]
impl Transport for ChatClient {
    async fn open_stream(&self, request: &ChatRequest) -> Result<StreamResponse> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let pending = self
            .client
            .post(self.stream_url.clone())
            .headers(Self::default_headers())
            .json(request)
            .send();
        // The idle timeout also bounds the wait for the response head.
        let sent = match self.idle_timeout {
            Some(idle) => tokio::time::timeout(idle, pending).await.map_err(|_| {
                CLIENT_REQUEST_ERRORS.click();
                Error::timeout(
                    format!("no response received for {} ms", idle.as_millis()),
                    Some(idle.as_secs_f64()),
                )
            })?,
            None => pending.await,
        };
        let response = sent.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            if e.is_timeout() {
                Error::timeout(
                    format!("Request timed out: {e}"),
                    Some(self.connect_timeout.as_secs_f64()),
                )
            } else if e.is_connect() {
                Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
            } else {
                Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
            }
        })?;
        STREAM_TTFB.add(start.elapsed().as_secs_f64());

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        if !status.is_success() {
            CLIENT_BAD_STATUS.click();
            return Ok(StreamResponse::status(status.as_u16(), status_text));
        }

        let body = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        let body: ByteStream = match self.idle_timeout {
            Some(idle) => Box::pin(with_idle_timeout(Box::pin(body), idle)),
            None => Box::pin(body),
        };
        Ok(StreamResponse {
            status: status.as_u16(),
            status_text,
            body: Some(body),
        })
    }
}

/// Fail the stream if no chunk arrives within `idle` of the previous one.
pub fn with_idle_timeout<S>(byte_stream: S, idle: Duration) -> impl Stream<Item = Result<Bytes>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    stream::unfold(Some(byte_stream), move |state| async move {
        let mut stream = state?;
        match tokio::time::timeout(idle, stream.next()).await {
            Ok(Some(item)) => Some((item, Some(stream))),
            Ok(None) => None,
            Err(_) => Some((
                Err(Error::timeout(
                    format!("no data received for {} ms", idle.as_millis()),
                    Some(idle.as_secs_f64()),
                )),
                None,
            )),
        }
    })
}
