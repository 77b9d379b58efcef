//! # Upscale Client
//!
//! Drives one remote job from submission to result:
//!
//! 1. refuse to run without credentials (no network traffic at all)
//! 2. enqueue the job
//! 3. poll its status, relaying every report to the observer in arrival order
//! 4. fetch the output and extract the artifact reference
//!
//! Nothing is retried. Any failure is returned as
//! [`UpscalerError::Upscale`] with the [`QueueError`] as its source.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::client::progress::{ProgressEvent, ProgressObserver};
use crate::client::queue::{FalQueue, QueueError, QueueStatus, QueueTransport};
use crate::client::request::UpscaleRequest;
use crate::config::{Credentials, SessionConfig};
use crate::error::{UpscalerError, UpscalerResult};

/// Reference to the finished artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpscaleResult {
    pub request_id: String,
    /// `http(s)` URL or `data:` URI of the output image.
    pub image_url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub content_type: Option<String>,
    pub seed: Option<u64>,
}

impl UpscaleResult {
    /// Extract the artifact reference from a model output of the form
    /// `{"image": {"url": ..., "width"?, "height"?, "content_type"?}, "seed"?}`.
    pub fn from_output(request_id: impl Into<String>, output: &Value) -> Result<Self, QueueError> {
        let image = output
            .get("image")
            .ok_or_else(|| QueueError::Malformed("output has no 'image' field".to_string()))?;
        let image_url = image
            .get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| QueueError::Malformed("output image has no 'url'".to_string()))?;

        let dimension = |key: &str| {
            image
                .get(key)
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
        };

        Ok(Self {
            request_id: request_id.into(),
            image_url: image_url.to_string(),
            width: dimension("width"),
            height: dimension("height"),
            content_type: image
                .get("content_type")
                .and_then(Value::as_str)
                .map(str::to_string),
            seed: output.get("seed").and_then(Value::as_u64),
        })
    }
}

/// Client for the remote upscaling model.
pub struct UpscaleClient<T: QueueTransport = FalQueue> {
    transport: T,
    poll_interval: Duration,
}

impl UpscaleClient<FalQueue> {
    /// Client talking HTTP to the endpoint named in `config`.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(FalQueue::new(config.endpoint.clone()), config.poll_interval)
    }
}

impl<T: QueueTransport> UpscaleClient<T> {
    pub fn new(transport: T, poll_interval: Duration) -> Self {
        Self {
            transport,
            poll_interval,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn model_id(&self) -> &str {
        self.transport.model_id()
    }

    /// Run one job to completion and return its artifact reference.
    ///
    /// Fails with [`UpscalerError::Auth`] before any transport call when the
    /// credentials are blank. Progress events are passed to `observer` in the
    /// order the queue reports them; none are delivered after this returns.
    #[instrument(skip_all, fields(model = %self.transport.model_id()))]
    pub async fn submit(
        &self,
        request: &UpscaleRequest,
        credentials: &Credentials,
        observer: &dyn ProgressObserver,
    ) -> UpscalerResult<UpscaleResult> {
        if !credentials.is_present() {
            warn!("refusing to submit without an API key");
            return Err(UpscalerError::auth("submit", "no API key provided")
                .with_recovery_suggestion("Enter your API key (or set FAL_KEY) and try again"));
        }

        let handle = self
            .transport
            .enqueue(credentials, &request.to_arguments())
            .await
            .map_err(|e| self.failure("submission failed", e))?;
        info!(request_id = %handle.request_id, "job enqueued");

        loop {
            let status = self
                .transport
                .status(credentials, &handle)
                .await
                .map_err(|e| self.failure("status check failed", e))?;

            match status {
                QueueStatus::InQueue { position } => {
                    observer.on_progress(ProgressEvent::queued(position));
                }
                QueueStatus::InProgress { logs } => {
                    if logs.is_empty() {
                        observer.on_progress(ProgressEvent::in_progress("processing"));
                    }
                    for log in logs {
                        debug!(message = %log.message, "remote log");
                        observer.on_progress(ProgressEvent::in_progress(log.message));
                    }
                }
                QueueStatus::Completed { error: Some(error), .. } => {
                    return Err(self.failure("job failed", QueueError::Failed(error)));
                }
                QueueStatus::Completed { error: None, .. } => {
                    observer.on_progress(ProgressEvent::completed());
                    break;
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        let output = self
            .transport
            .result(credentials, &handle)
            .await
            .map_err(|e| self.failure("fetching job output failed", e))?;
        let result = UpscaleResult::from_output(handle.request_id, &output)
            .map_err(|e| self.failure("unexpected job output", e))?;

        info!(request_id = %result.request_id, "job completed");
        Ok(result)
    }

    fn failure(&self, reason: &str, cause: QueueError) -> UpscalerError {
        let unauthorized = cause.is_unauthorized();
        let error = UpscalerError::upscale(self.transport.model_id(), reason, Some(Box::new(cause)));
        if unauthorized {
            error.with_recovery_suggestion("Check that the API key is valid")
        } else {
            error
        }
    }
}
