use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::lines::{FramedLines, LineError};
use super::retry::RetryPolicy;
use crate::constants::{HEALTH_CHECK_TIMEOUT_SECS, MAX_STREAM_LINE_BYTES};
use crate::models::StreamEvent;
use crate::provider::StreamFrame;
use crate::utils::GatewayError;

/// How a stream pump stopped
#[derive(Debug, PartialEq, Eq)]
enum PumpEnd {
    /// End marker or connection close; `delivered` chunks were sent
    Finished { delivered: usize },
    /// The consumer went away
    Cancelled,
}

/// HTTP transport shared by every provider dialect.
///
/// Unary calls are retried per [`RetryPolicy`]; streams are opened once.
/// A single configured timeout bounds each attempt and each stream.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    probe_client: Client,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(timeout: Duration, retry: RetryPolicy, api_key: Option<String>) -> Result<Self, GatewayError> {
        let build = |timeout: Duration| {
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {}", e)))
        };

        Ok(Self {
            client: build(timeout)?,
            probe_client: build(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS).min(timeout))?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            retry,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Same connection settings, different retry policy
    pub fn with_retry(&self, retry: RetryPolicy) -> Self {
        Self {
            retry,
            ..self.clone()
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    /// POST a JSON body and decode a JSON reply, retrying transient failures
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<Value, GatewayError> {
        self.retry
            .run(url, |_| self.send_json(self.client.post(url).json(body)))
            .await
    }

    /// GET a JSON document with a single attempt
    pub async fn get_json(&self, url: &str) -> Result<Value, GatewayError> {
        self.send_json(self.client.get(url))
            .await
            .map_err(GatewayError::ProviderUnavailable)
    }

    /// Probe a URL with the short health timeout, returning the HTTP status
    pub async fn probe(&self, url: &str) -> Result<u16, String> {
        self.authorize(self.probe_client.get(url))
            .send()
            .await
            .map(|r| r.status().as_u16())
            .map_err(|e| describe(&e))
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value, String> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| describe(&e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {}", status.as_u16(), snippet(&text)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| format!("invalid JSON reply: {}", describe(&e)))
    }

    /// Stream a POST response line by line into `tx`.
    ///
    /// Every line goes through `parse`; malformed lines are skipped. The
    /// stream ends on the dialect's end marker or on connection close. Any
    /// failure is delivered as one final `Error: ...` chunk. Unless the
    /// consumer hung up, `StreamEvent::End` is always the last event sent.
    pub async fn stream_into<P>(&self, url: &str, body: &Value, parse: P, tx: &mpsc::Sender<StreamEvent>)
    where
        P: Fn(&str) -> Result<StreamFrame, serde_json::Error>,
    {
        match self.pump(url, body, parse, tx).await {
            Ok(PumpEnd::Cancelled) => {
                debug!("Stream consumer disconnected, closing upstream connection to {}", url);
                return;
            }
            Ok(PumpEnd::Finished { delivered: 0 }) => {
                warn!("Stream from {} ended without any usable content", url);
            }
            Ok(PumpEnd::Finished { delivered }) => {
                debug!("Stream from {} finished after {} chunks", url, delivered);
            }
            Err(cause) => {
                warn!("Stream from {} failed: {}", url, cause);
                if tx.send(StreamEvent::Delta(format!("Error: {}", cause))).await.is_err() {
                    return;
                }
            }
        }

        let _ = tx.send(StreamEvent::End).await;
    }

    async fn pump<P>(&self, url: &str, body: &Value, parse: P, tx: &mpsc::Sender<StreamEvent>) -> Result<PumpEnd, String>
    where
        P: Fn(&str) -> Result<StreamFrame, serde_json::Error>,
    {
        let request = self.authorize(self.client.post(url).json(body));
        let response = tokio::select! {
            _ = tx.closed() => return Ok(PumpEnd::Cancelled),
            response = request.send() => response.map_err(|e| describe(&e))?,
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {}", status.as_u16(), snippet(&text)));
        }

        // Dropping `lines` drops the response body, which closes the connection
        let mut lines = FramedLines::new(response.bytes_stream(), MAX_STREAM_LINE_BYTES);
        let mut delivered = 0;

        loop {
            let next = tokio::select! {
                _ = tx.closed() => return Ok(PumpEnd::Cancelled),
                next = lines.next_line() => next,
            };

            let line = match next {
                None => break,
                Some(Err(LineError::Interrupted(cause))) => return Err(cause),
                Some(Err(LineError::Malformed(cause))) => {
                    debug!("Skipping malformed stream line: {}", cause);
                    continue;
                }
                Some(Ok(line)) => line,
            };

            match parse(&line) {
                Ok(StreamFrame::Delta(text)) => {
                    if tx.send(StreamEvent::Delta(text)).await.is_err() {
                        return Ok(PumpEnd::Cancelled);
                    }
                    delivered += 1;
                }
                Ok(StreamFrame::Skip) => {}
                Ok(StreamFrame::Done) => break,
                Ok(StreamFrame::Error(message)) => return Err(message),
                Err(e) => debug!("Skipping malformed stream line ({}): {}", e, snippet(&line)),
            }
        }

        Ok(PumpEnd::Finished { delivered })
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}

fn snippet(text: &str) -> String {
    const MAX: usize = 200;
    if text.chars().count() > MAX {
        format!("{}...", text.chars().take(MAX).collect::<String>())
    } else {
        text.to_string()
    }
}
