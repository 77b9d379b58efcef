//! # Job Queue Transport
//!
//! Hosted models run behind a job queue: a job is enqueued, its status is
//! polled until it completes, then its result is fetched. [`QueueTransport`]
//! abstracts those three calls so the polling logic in
//! [`UpscaleClient`](super::UpscaleClient) can run against any queue,
//! including a scripted one in tests.
//!
//! ## Wire protocol ([`FalQueue`])
//!
//! | Step | Request | Response |
//! |------|---------|----------|
//! | enqueue | `POST {queue}/{model}` + JSON arguments | `{request_id, status_url?, response_url?}` |
//! | status | `GET {status_url}?logs=1` | `{status, queue_position?, logs?, error?}` |
//! | result | `GET {response_url}` | model output, e.g. `{image: {url, ...}}` |
//!
//! Every call carries `Authorization: Key <api key>`.

use std::{error::Error as StdError, fmt};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{Credentials, Endpoint};

/// Identifies an enqueued job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    pub request_id: String,
    pub status_url: String,
    pub response_url: String,
}

/// One log line emitted by the remote worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogEntry {
    pub message: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: None,
            timestamp: None,
        }
    }
}

/// State of a job as reported by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueStatus {
    InQueue { position: Option<u64> },
    InProgress { logs: Vec<LogEntry> },
    Completed { logs: Vec<LogEntry>, error: Option<String> },
}

/// Failures talking to the queue.
#[derive(Debug)]
pub enum QueueError {
    /// The request never produced a response (DNS, connect, TLS, reset...)
    Transport(Box<dyn StdError + Send + Sync>),
    /// The queue answered with a non-success status
    Rejected { status: u16, detail: String },
    /// The response body did not have the expected shape
    Malformed(String),
    /// The job ran and reported an error
    Failed(String),
}

impl QueueError {
    /// HTTP status of a rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            QueueError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401 and 403 mean the API key was refused.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Transport(source) => write!(f, "transport failure: {}", source),
            QueueError::Rejected { status, detail } => {
                write!(f, "request rejected with HTTP {}: {}", status, detail)
            }
            QueueError::Malformed(reason) => write!(f, "malformed response: {}", reason),
            QueueError::Failed(reason) => write!(f, "remote job failed: {}", reason),
        }
    }
}

impl StdError for QueueError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            QueueError::Transport(source) => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for QueueError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            QueueError::Malformed(error.to_string())
        } else {
            QueueError::Transport(Box::new(error))
        }
    }
}

/// A job queue hosting the model.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Submit a job and return its handle.
    async fn enqueue(
        &self,
        credentials: &Credentials,
        arguments: &Value,
    ) -> Result<QueueHandle, QueueError>;

    /// Current status of a job, including the worker's logs.
    async fn status(
        &self,
        credentials: &Credentials,
        handle: &QueueHandle,
    ) -> Result<QueueStatus, QueueError>;

    /// Output of a completed job.
    async fn result(
        &self,
        credentials: &Credentials,
        handle: &QueueHandle,
    ) -> Result<Value, QueueError>;

    /// Model identifier, used in logs and errors.
    fn model_id(&self) -> &str;
}

#[derive(Deserialize)]
struct EnqueueBody {
    request_id: String,
    #[serde(default)]
    status_url: Option<String>,
    #[serde(default)]
    response_url: Option<String>,
}

#[derive(Deserialize)]
struct StatusBody {
    status: String,
    #[serde(default)]
    queue_position: Option<u64>,
    #[serde(default)]
    logs: Option<Vec<LogEntry>>,
    #[serde(default)]
    error: Option<String>,
}

/// Map a status body onto [`QueueStatus`].
pub fn parse_status(body: &Value) -> Result<QueueStatus, QueueError> {
    let body: StatusBody = serde_json::from_value(body.clone())
        .map_err(|e| QueueError::Malformed(format!("status body: {}", e)))?;
    let logs = body.logs.unwrap_or_default();
    match body.status.as_str() {
        "IN_QUEUE" => Ok(QueueStatus::InQueue {
            position: body.queue_position,
        }),
        "IN_PROGRESS" => Ok(QueueStatus::InProgress { logs }),
        "COMPLETED" => Ok(QueueStatus::Completed {
            logs,
            error: body.error,
        }),
        other => Err(QueueError::Malformed(format!("unknown job status '{}'", other))),
    }
}

/// HTTP client for the hosted queue API.
#[derive(Debug, Clone)]
pub struct FalQueue {
    http: Client,
    endpoint: Endpoint,
}

impl FalQueue {
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(http: Client, endpoint: Endpoint) -> Self {
        Self { http, endpoint }
    }

    fn authorized(&self, builder: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        builder.header(
            reqwest::header::AUTHORIZATION,
            format!("Key {}", credentials.expose()),
        )
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<Value, QueueError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(QueueError::Rejected {
                status: status.as_u16(),
                detail: rejection_detail(status, &text),
            });
        }
        serde_json::from_str(&text).map_err(|e| QueueError::Malformed(e.to_string()))
    }
}

/// Prefer the `detail` field of a JSON error body, else the raw text.
fn rejection_detail(status: StatusCode, text: &str) -> String {
    let detail = serde_json::from_str::<Value>(text).ok().and_then(|body| {
        match body.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    });
    match detail {
        Some(detail) => detail,
        None if text.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("no details")
            .to_string(),
        None => text.trim().to_string(),
    }
}

#[async_trait]
impl QueueTransport for FalQueue {
    async fn enqueue(
        &self,
        credentials: &Credentials,
        arguments: &Value,
    ) -> Result<QueueHandle, QueueError> {
        let url = self.endpoint.submit_url();
        debug!(%url, "enqueueing job");
        let body = self
            .send_json(self.authorized(self.http.post(&url), credentials).json(arguments))
            .await?;
        let body: EnqueueBody = serde_json::from_value(body)
            .map_err(|e| QueueError::Malformed(format!("enqueue body: {}", e)))?;

        Ok(QueueHandle {
            status_url: body
                .status_url
                .unwrap_or_else(|| self.endpoint.status_url(&body.request_id)),
            response_url: body
                .response_url
                .unwrap_or_else(|| self.endpoint.response_url(&body.request_id)),
            request_id: body.request_id,
        })
    }

    async fn status(
        &self,
        credentials: &Credentials,
        handle: &QueueHandle,
    ) -> Result<QueueStatus, QueueError> {
        let request = self
            .authorized(self.http.get(&handle.status_url), credentials)
            .query(&[("logs", "1")]);
        let body = self.send_json(request).await?;
        parse_status(&body)
    }

    async fn result(
        &self,
        credentials: &Credentials,
        handle: &QueueHandle,
    ) -> Result<Value, QueueError> {
        let request = self.authorized(self.http.get(&handle.response_url), credentials);
        self.send_json(request).await
    }

    fn model_id(&self) -> &str {
        &self.endpoint.model_id
    }
}
