//! # Image Upscaler Library
//!
//! A thin client for a hosted AI upscaling model: it encodes an uploaded
//! image, submits it to the provider's job queue, follows the job's progress,
//! then downloads and decodes the enhanced result.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `bitmap`: the uploaded [`SourceImage`] and the decoded [`OutputImage`]
//! - `client`: request building, the job queue transport and the polling client
//! - `fetch`: downloading and decoding the result artifact
//! - `session`: the per-action state machine the front end drives
//! - `config`: upscaling parameters and session settings
//! - `error`: the [`UpscalerError`] taxonomy
//!
//! Image encoding lives in the `upscale-codec` workspace crate.
//!
//! ## Flow
//!
//! ```text
//! SourceImage ─encode─▶ UpscaleRequest ─submit─▶ ProgressEvent* ─▶ UpscaleResult ─fetch─▶ OutputImage
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use image_upscaler::{
//!     Credentials, NoopObserver, SessionConfig, SessionState, SourceImage, UpscaleConfig,
//!     UpscaleSession,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig {
//!     credentials: Credentials::new(std::env::var("FAL_KEY").unwrap_or_default()),
//!     ..SessionConfig::default()
//! };
//! let mut session = UpscaleSession::from_config(&config, UpscaleConfig::default());
//! session.set_source(Some(SourceImage::from_path("photo.png").await?));
//!
//! if let SessionState::Displaying(output) = session.run(&NoopObserver).await {
//!     println!("New size: {:?}", output.dimensions());
//! }
//! session.download(&config.output).await?;
//! # Ok(())
//! # }
//! ```

pub mod bitmap;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod session;

/// Re-export error types for convenience
pub use error::{ErrorSeverity, HasRecoverySuggestion, HasSeverity, UpscalerError, UpscalerResult};

pub use bitmap::{DOWNLOAD_FILE_NAME, OutputImage, SourceImage};
pub use client::{
    ChannelObserver, FalQueue, NoopObserver, ProgressEvent, ProgressObserver, ProgressStage,
    QueueTransport, UpscaleClient, UpscaleRequest, UpscaleResult,
};
pub use config::{Credentials, Endpoint, SessionConfig, UpscaleConfig};
pub use fetch::ResultFetcher;
pub use session::{
    FailureReport, MISSING_INPUT_WARNING, ProgressIndicator, SessionPhase, SessionState,
    UpscaleSession,
};
