//! Upstream service client
//!
//! The three backing services (embeddings, document search, answer
//! generation) all speak the same contract: a JSON object is POSTed and a
//! JSON object comes back. [`Upstream`] abstracts that contract so the
//! pipeline can be driven by the real HTTP client or by an in-memory double.

use crate::config::UpstreamConfig;
use crate::errors::Result;
use crate::metrics;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Decoded JSON object returned by an upstream service.
pub type JsonObject = Map<String, Value>;

/// The backing services the pipeline talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Embeddings,
    Search,
    Answer,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Embeddings => "embeddings",
            Endpoint::Search => "search",
            Endpoint::Answer => "answer",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an upstream call produced no usable object.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl UpstreamError {
    /// Short label used in metrics and step statuses
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Transport { .. } => "transport",
            UpstreamError::Timeout { .. } => "timeout",
            UpstreamError::Status { .. } => "status",
            UpstreamError::Decode { .. } => "decode",
        }
    }

    fn from_reqwest(url: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }
        } else if err.is_decode() {
            UpstreamError::Decode {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            UpstreamError::Transport {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// A JSON-over-HTTP service reachable at a fixed set of endpoints.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// POST `body` to `endpoint` and return the response object.
    async fn post_json(
        &self,
        endpoint: Endpoint,
        body: &Value,
    ) -> std::result::Result<JsonObject, UpstreamError>;
}

/// reqwest-backed [`Upstream`] with bounded timeouts per endpoint.
pub struct HttpUpstream {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl HttpUpstream {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()?;

        Ok(Self { client, config })
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        match endpoint {
            Endpoint::Embeddings => self.config.embeddings_url(),
            Endpoint::Search => self.config.search_url(),
            Endpoint::Answer => self.config.answer_url(),
        }
    }

    fn timeout(&self, endpoint: Endpoint) -> Duration {
        match endpoint {
            Endpoint::Embeddings => self.config.embeddings_timeout(),
            Endpoint::Search => self.config.search_timeout(),
            Endpoint::Answer => self.config.answer_timeout(),
        }
    }

    async fn send(
        &self,
        url: &str,
        timeout: Duration,
        body: &Value,
    ) -> std::result::Result<JsonObject, UpstreamError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, timeout, e))?;

        match value {
            Value::Object(object) => Ok(object),
            other => Err(UpstreamError::Decode {
                url: url.to_string(),
                message: format!("expected a JSON object, got {}", json_type(&other)),
            }),
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn post_json(
        &self,
        endpoint: Endpoint,
        body: &Value,
    ) -> std::result::Result<JsonObject, UpstreamError> {
        let url = self.url(endpoint);
        let timeout = self.timeout(endpoint);
        let start = Instant::now();

        let result = self.send(&url, timeout, body).await;
        let elapsed = start.elapsed();

        metrics::record_upstream_call(endpoint.as_str(), elapsed.as_secs_f64(), result.is_ok());

        match &result {
            Ok(_) => tracing::debug!(
                endpoint = %endpoint,
                url = %url,
                latency_ms = elapsed.as_millis() as u64,
                "Upstream call succeeded"
            ),
            Err(e) => tracing::warn!(
                endpoint = %endpoint,
                url = %url,
                kind = e.kind(),
                error = %e,
                latency_ms = elapsed.as_millis() as u64,
                "Upstream call failed"
            ),
        }

        result
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
