//! # Error Handling
//!
//! Every failure in the upscaling pipeline is an [`UpscalerError`]. Each variant
//! corresponds to one stage of the pipeline and carries an [`ErrorContext`]
//! with a recovery suggestion and a severity.
//!
//! ## Taxonomy
//!
//! | Variant | Raised by | Meaning |
//! |---------|-----------|---------|
//! | `Auth` | `UpscaleClient::submit` | No API key supplied |
//! | `Decode` | codec, `ResultFetcher` | Bytes are not a valid raster image |
//! | `Encode` | codec | Bitmap could not be serialized |
//! | `Fetch` | `ResultFetcher` | Result download failed (network or non-2xx) |
//! | `Upscale` | `UpscaleClient::submit` | Remote submission or processing failed |
//! | `Validation` | config | A parameter is out of range |
//! | `State` | `UpscaleSession` | Illegal state machine transition |
//! | `Io` | file input/output | Reading the upload or writing the download failed |
//!
//! Errors are never retried. The session turns them into a user-visible
//! message and the user decides whether to resubmit.
//!
//! ## Usage
//!
//! ```rust
//! use image_upscaler::error::{HasRecoverySuggestion, HasSeverity, ErrorSeverity, UpscalerError};
//!
//! let error = UpscalerError::auth("submit", "API key is empty")
//!     .with_recovery_suggestion("Pass --api-key or set FAL_KEY");
//!
//! assert_eq!(error.category(), "auth");
//! assert_eq!(error.severity(), ErrorSeverity::Warning);
//! assert_eq!(error.recovery_suggestion(), Some("Pass --api-key or set FAL_KEY"));
//! ```

use std::{error::Error as StdError, fmt};

use upscale_codec::CodecError;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Problems the user can fix themselves (missing input, bad parameter)
    Warning,
    /// Errors that abort the current action
    Error,
    /// Errors that leave the session unusable
    Critical,
}

/// What the user can do about an error, and how bad it is
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with the given severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Boxed underlying cause
pub type BoxedCause = Box<dyn StdError + Send + Sync>;

/// Base error type for the upscaler
#[derive(Debug)]
pub enum UpscalerError {
    /// Credentials are missing or blank
    Auth {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// Bytes could not be decoded into a bitmap
    Decode {
        origin: String,
        source: CodecError,
        context: ErrorContext,
    },
    /// A bitmap could not be encoded for submission
    Encode {
        source: CodecError,
        context: ErrorContext,
    },
    /// Retrieving the result artifact failed
    Fetch {
        url: String,
        status: Option<u16>,
        source: Option<BoxedCause>,
        context: ErrorContext,
    },
    /// The remote submission or processing failed
    Upscale {
        model: String,
        reason: String,
        source: Option<BoxedCause>,
        context: ErrorContext,
    },
    /// A parameter violates its constraint
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
    /// Invalid state machine transition
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// File I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
}

impl UpscalerError {
    /// Create an authentication error. Severity is `Warning`: the user only
    /// needs to enter a key.
    pub fn auth(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Auth {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Create a decode error for bytes that came from `origin`
    pub fn decode(origin: impl Into<String>, source: CodecError) -> Self {
        Self::Decode {
            origin: origin.into(),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an encode error
    pub fn encode(source: CodecError) -> Self {
        Self::Encode {
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create a fetch error
    pub fn fetch(
        url: impl Into<String>,
        status: Option<u16>,
        source: Option<BoxedCause>,
    ) -> Self {
        Self::Fetch {
            url: url.into(),
            status,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an upscale error wrapping the underlying cause
    pub fn upscale(
        model: impl Into<String>,
        reason: impl Into<String>,
        source: Option<BoxedCause>,
    ) -> Self {
        Self::Upscale {
            model: model.into(),
            reason: reason.into(),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Create a state error
    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Critical),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Attach the path an I/O error refers to
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        if let Self::Io { path: slot, .. } = &mut self {
            *slot = Some(path.into());
        }
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Auth { context, .. } => context,
            Self::Decode { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::Fetch { context, .. } => context,
            Self::Upscale { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Io { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Auth { context, .. } => context,
            Self::Decode { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::Fetch { context, .. } => context,
            Self::Upscale { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Io { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::Decode { .. } => "decode",
            Self::Encode { .. } => "encode",
            Self::Fetch { .. } => "fetch",
            Self::Upscale { .. } => "upscale",
            Self::Validation { .. } => "validation",
            Self::State { .. } => "state",
            Self::Io { .. } => "io",
        }
    }

    /// The message followed by every `source()` in the chain, outermost first.
    pub fn cause_chain(&self) -> Vec<String> {
        let mut chain = vec![self.to_string()];
        let mut current = self.source();
        while let Some(cause) = current {
            chain.push(cause.to_string());
            current = cause.source();
        }
        chain
    }
}

impl fmt::Display for UpscalerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpscalerError::Auth {
                operation, reason, ..
            } => {
                write!(f, "Authentication error during {}: {}", operation, reason)
            }
            UpscalerError::Decode { origin, source, .. } => {
                write!(f, "Could not decode image from {}: {}", origin, source)
            }
            UpscalerError::Encode { source, .. } => {
                write!(f, "Could not encode image for upload: {}", source)
            }
            UpscalerError::Fetch { url, status, .. } => {
                if let Some(status) = status {
                    write!(f, "Fetching result from {} failed with HTTP {}", url, status)
                } else {
                    write!(f, "Fetching result from {} failed", url)
                }
            }
            UpscalerError::Upscale { model, reason, .. } => {
                write!(f, "Upscaling with {} failed: {}", model, reason)
            }
            UpscalerError::Validation {
                field,
                constraint,
                value,
                ..
            } => {
                write!(
                    f,
                    "Validation failed for '{}': {} (value: {})",
                    field, constraint, value
                )
            }
            UpscalerError::State {
                current_state,
                attempted_operation,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Invalid state transition from '{}' when attempting '{}': {}",
                    current_state, attempted_operation, reason
                )
            }
            UpscalerError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
        }
    }
}

impl StdError for UpscalerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Decode { source, .. } => Some(source),
            Self::Encode { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::Fetch {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            Self::Upscale {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type UpscalerResult<T> = Result<T, UpscalerError>;

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for UpscalerError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for UpscalerError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Codec failures map onto the stage they happened in: reading bytes is a
/// decode error, writing them an encode error.
impl From<CodecError> for UpscalerError {
    fn from(error: CodecError) -> Self {
        if error.is_decode() {
            Self::decode("image bytes", error)
        } else {
            Self::encode(error)
        }
    }
}
