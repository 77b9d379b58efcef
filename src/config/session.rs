//! # Session Settings
//!
//! Everything a session needs besides the upscaling parameters: the API key,
//! which remote model to call and where, how often to poll, and where the
//! result goes. The key is an explicit value owned by the session; nothing is
//! read from or written to process-wide state after startup.

use std::{fmt, path::PathBuf, time::Duration};

/// Environment variable the CLI reads the API key from.
pub const API_KEY_ENV: &str = "FAL_KEY";

/// Queue API base URL of the hosted inference provider.
pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";

/// Model identifier of the upscaler.
pub const DEFAULT_MODEL_ID: &str = "fal-ai/clarity-upscaler";

/// Delay between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// File name used for the downloadable result.
pub const DEFAULT_OUTPUT: &str = crate::bitmap::DOWNLOAD_FILE_NAME;

/// API key for the inference provider.
///
/// `Debug` never prints the secret.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// A key is present when it has at least one non-whitespace character.
    pub fn is_present(&self) -> bool {
        !self.0.trim().is_empty()
    }

    /// The raw key, for building the authorization header.
    pub fn expose(&self) -> &str {
        self.0.trim()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_present() {
            f.write_str("Credentials(<redacted>)")
        } else {
            f.write_str("Credentials(<empty>)")
        }
    }
}

/// Remote model address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Base URL of the queue API, without trailing slash.
    pub queue_url: String,
    /// Vendor/model identifier, e.g. `fal-ai/clarity-upscaler`.
    pub model_id: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
        }
    }
}

impl Endpoint {
    pub fn new(queue_url: impl Into<String>, model_id: impl Into<String>) -> Self {
        let queue_url = queue_url.into().trim_end_matches('/').to_string();
        let model_id = model_id.into().trim_matches('/').to_string();
        Self {
            queue_url,
            model_id,
        }
    }

    /// URL jobs are submitted to.
    pub fn submit_url(&self) -> String {
        format!("{}/{}", self.queue_url, self.model_id)
    }

    /// URL of a request's result, used when the queue does not return one.
    pub fn response_url(&self, request_id: &str) -> String {
        format!("{}/{}/requests/{}", self.queue_url, self.model_id, request_id)
    }

    /// URL of a request's status, used when the queue does not return one.
    pub fn status_url(&self, request_id: &str) -> String {
        format!("{}/status", self.response_url(request_id))
    }
}

/// Settings for one interactive session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub credentials: Credentials,
    pub endpoint: Endpoint,
    pub poll_interval: Duration,
    pub output: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            endpoint: Endpoint::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl SessionConfig {
    pub fn new(
        credentials: Credentials,
        endpoint: Endpoint,
        poll_interval: Duration,
        output: PathBuf,
    ) -> Self {
        Self {
            credentials,
            endpoint,
            poll_interval,
            output,
        }
    }
}
