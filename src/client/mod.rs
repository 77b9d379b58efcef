//! # Remote Upscaling Client
//!
//! Submits an [`UpscaleRequest`] to the hosted model, relays progress
//! notifications and returns the artifact reference of the finished job.
//!
//! ## Layers
//!
//! 1. **[`UpscaleRequest`]**: frozen argument map for one job
//! 2. **[`QueueTransport`]**: enqueue / status / result against a job queue
//! 3. **[`FalQueue`]**: HTTP implementation of the queue protocol
//! 4. **[`UpscaleClient`]**: credential check, polling loop, progress relay

pub mod progress;
pub mod queue;
pub mod request;
pub mod upscale;

pub use progress::{ChannelObserver, NoopObserver, ProgressEvent, ProgressObserver, ProgressStage};
pub use queue::{FalQueue, LogEntry, QueueError, QueueHandle, QueueStatus, QueueTransport};
pub use request::UpscaleRequest;
pub use upscale::{UpscaleClient, UpscaleResult};
