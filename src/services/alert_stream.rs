use std::{collections::VecDeque, pin::Pin};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use reqwest::{header, Client};

use crate::{error::StreamError, models::SessionToken, services::sse::SseDecoder};

/// One open server-push channel.
#[async_trait]
pub trait AlertConnection: Send {
    /// Next raw payload. `None` once the server ends the stream or after `close`.
    async fn next_message(&mut self) -> Option<Result<String, StreamError>>;

    /// Idempotent.
    fn close(&mut self);
}

/// Opens bearer-authorized alert streams.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn connect(&self, session: &SessionToken) -> Result<Box<dyn AlertConnection>, StreamError>;
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// `text/event-stream` response body decoded frame by frame.
pub struct SseConnection {
    body: Option<ByteStream>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
}

impl SseConnection {
    pub fn from_stream<S>(body: S) -> Self
    where
        S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    {
        Self {
            body: Some(Box::pin(body)),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.body.is_none() && self.pending.is_empty()
    }
}

#[async_trait]
impl AlertConnection for SseConnection {
    async fn next_message(&mut self) -> Option<Result<String, StreamError>> {
        loop {
            if let Some(data) = self.pending.pop_front() {
                return Some(Ok(data));
            }

            let body = self.body.as_mut()?;
            match body.next().await {
                Some(Ok(chunk)) => {
                    let frames = self.decoder.push(&chunk);
                    self.pending.extend(frames.into_iter().map(|f| f.data));
                }
                Some(Err(err)) => {
                    self.body = None;
                    return Some(Err(StreamError::Transport(err.to_string())));
                }
                None => {
                    self.body = None;
                    let dropped = self.decoder.finish();
                    if dropped > 0 {
                        tracing::debug!(bytes = dropped, "discarding unterminated frame at end of stream");
                    }
                }
            }
        }
    }

    fn close(&mut self) {
        self.body = None;
        self.pending.clear();
    }
}

/// HTTP SSE transport against the backend's alert stream endpoint.
#[derive(Clone)]
pub struct SseTransport {
    http: Client,
    url: String,
}

impl SseTransport {
    pub fn new(http: Client, url: String) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl AlertTransport for SseTransport {
    async fn connect(&self, session: &SessionToken) -> Result<Box<dyn AlertConnection>, StreamError> {
        tracing::debug!(url = %self.url, subject = %session.subject, "opening alert stream");

        let res = self
            .http
            .get(&self.url)
            .bearer_auth(&session.bearer)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(StreamError::Status(status.as_u16()));
        }

        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !is_event_stream(content_type) {
            return Err(StreamError::Connect(format!(
                "expected text/event-stream, got {content_type:?}"
            )));
        }

        Ok(Box::new(SseConnection::from_stream(res.bytes_stream())))
    }
}

fn is_event_stream(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("text/event-stream"))
}
