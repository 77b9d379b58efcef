//! # Upscale Session
//!
//! Orchestrates one user action at a time as an explicit state machine:
//!
//! ```text
//! Idle ─load─▶ AwaitingInput ─run─▶ Submitting ─▶ Polling ─▶ Fetching ─▶ Displaying
//!                   │                   │            │           │
//!                   └───────────────────┴────────────┴───────────┴──────▶ Failed
//! Displaying / Failed ─reset─▶ Idle
//! ```
//!
//! `run` takes `&mut self`, so at most one request is ever in flight. Errors
//! never escape `run`: they end the action in [`SessionState::Failed`] with a
//! [`FailureReport`] the front end shows to the user.
//!
//! Progress of the running job is published on a `tokio::sync::watch`
//! channel as a coarse [`ProgressIndicator`], and forwarded verbatim to the
//! observer passed to `run`.

use std::path::Path;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::bitmap::{OutputImage, SourceImage};
use crate::client::{
    FalQueue, ProgressEvent, ProgressObserver, QueueTransport, UpscaleClient, UpscaleRequest,
};
use crate::config::{Credentials, SessionConfig, UpscaleConfig};
use crate::error::{ErrorSeverity, HasRecoverySuggestion, HasSeverity, UpscalerError, UpscalerResult};
use crate::fetch::ResultFetcher;

/// Warning shown when the action is triggered without image or API key.
pub const MISSING_INPUT_WARNING: &str = "Please upload an image and enter your API key.";

/// Payload-free view of [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingInput,
    Submitting,
    Polling,
    Fetching,
    Displaying,
    Failed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "Idle",
            SessionPhase::AwaitingInput => "AwaitingInput",
            SessionPhase::Submitting => "Submitting",
            SessionPhase::Polling => "Polling",
            SessionPhase::Fetching => "Fetching",
            SessionPhase::Displaying => "Displaying",
            SessionPhase::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Displaying | SessionPhase::Failed)
    }

    /// Transition table of the state machine.
    pub fn can_transition_to(&self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (*self, next),
            (Idle, AwaitingInput)
                | (AwaitingInput, Submitting)
                | (Submitting, Polling)
                | (Polling, Fetching)
                | (Fetching, Displaying)
                | (AwaitingInput | Submitting | Polling | Fetching, Failed)
                | (Displaying | Failed, Idle)
        )
    }
}

/// What the user is told after a failed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub category: &'static str,
    /// `Warning` when the user can fix the input and retry.
    pub severity: ErrorSeverity,
    /// The error's display form.
    pub message: String,
    /// Underlying causes, outermost first, without `message` itself.
    pub causes: Vec<String>,
    pub recovery_suggestion: Option<String>,
}

impl From<&UpscalerError> for FailureReport {
    fn from(error: &UpscalerError) -> Self {
        let mut chain = error.cause_chain();
        let message = chain.remove(0);
        Self {
            category: error.category(),
            severity: error.severity(),
            message,
            causes: chain,
            recovery_suggestion: error.recovery_suggestion().map(str::to_string),
        }
    }
}

/// State of the current action.
#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    AwaitingInput,
    Submitting,
    Polling,
    Fetching,
    Displaying(OutputImage),
    Failed(FailureReport),
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::AwaitingInput => SessionPhase::AwaitingInput,
            SessionState::Submitting => SessionPhase::Submitting,
            SessionState::Polling => SessionPhase::Polling,
            SessionState::Fetching => SessionPhase::Fetching,
            SessionState::Displaying(_) => SessionPhase::Displaying,
            SessionState::Failed(_) => SessionPhase::Failed,
        }
    }
}

/// Coarse progress shown while a job runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressIndicator {
    /// `false` when no job is running; the indicator is hidden.
    pub active: bool,
    pub fraction: f32,
    pub message: String,
}

impl ProgressIndicator {
    fn from_event(event: &ProgressEvent) -> Self {
        Self {
            active: true,
            fraction: event.stage.coarse_fraction(),
            message: event.message.clone(),
        }
    }
}

/// Updates the indicator, then hands the event to the caller's observer.
struct ProgressRelay<'a> {
    indicator: &'a watch::Sender<ProgressIndicator>,
    observer: &'a dyn ProgressObserver,
}

impl ProgressObserver for ProgressRelay<'_> {
    fn on_progress(&self, event: ProgressEvent) {
        self.indicator.send_replace(ProgressIndicator::from_event(&event));
        self.observer.on_progress(event);
    }
}

/// One interactive upscaling session.
pub struct UpscaleSession<T: QueueTransport = FalQueue> {
    client: UpscaleClient<T>,
    fetcher: ResultFetcher,
    credentials: Credentials,
    params: UpscaleConfig,
    source: Option<SourceImage>,
    state: SessionState,
    history: Vec<SessionPhase>,
    warning: Option<String>,
    progress: watch::Sender<ProgressIndicator>,
}

impl UpscaleSession<FalQueue> {
    /// Session talking to the endpoint named in `config`.
    pub fn from_config(config: &SessionConfig, params: UpscaleConfig) -> Self {
        Self::new(
            UpscaleClient::from_config(config),
            ResultFetcher::new(),
            config.credentials.clone(),
            params,
        )
    }
}

impl<T: QueueTransport> UpscaleSession<T> {
    pub fn new(
        client: UpscaleClient<T>,
        fetcher: ResultFetcher,
        credentials: Credentials,
        params: UpscaleConfig,
    ) -> Self {
        let (progress, _) = watch::channel(ProgressIndicator::default());
        Self {
            client,
            fetcher,
            credentials,
            params,
            source: None,
            state: SessionState::Idle,
            history: vec![SessionPhase::Idle],
            warning: None,
            progress,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    /// Phases visited since the last reset, oldest first.
    pub fn history(&self) -> &[SessionPhase] {
        &self.history
    }

    /// Warning from the last `run`, if it could not start.
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn client(&self) -> &UpscaleClient<T> {
        &self.client
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    /// The decoded result while in `Displaying`.
    pub fn output(&self) -> Option<&OutputImage> {
        match &self.state {
            SessionState::Displaying(output) => Some(output),
            _ => None,
        }
    }

    /// Subscribe to the progress indicator.
    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressIndicator> {
        self.progress.subscribe()
    }

    pub fn set_source(&mut self, source: Option<SourceImage>) {
        self.source = source;
    }

    pub fn set_params(&mut self, params: UpscaleConfig) {
        self.params = params;
    }

    /// Both an image and an API key are present.
    pub fn can_submit(&self) -> bool {
        self.source.is_some() && self.credentials.is_present()
    }

    /// Make the session ready for input, resetting a finished action first.
    pub fn load(&mut self) {
        if self.phase().is_terminal() {
            self.reset();
        }
        if self.phase() == SessionPhase::Idle {
            self.history.push(SessionPhase::AwaitingInput);
            self.state = SessionState::AwaitingInput;
        }
    }

    /// Leave a finished action and return to `Idle`. No-op otherwise.
    pub fn reset(&mut self) {
        if self.phase().can_transition_to(SessionPhase::Idle) {
            self.state = SessionState::Idle;
            self.history = vec![SessionPhase::Idle];
            self.progress.send_replace(ProgressIndicator::default());
        }
    }

    /// Run one upscale action and return the state it ended in.
    ///
    /// Without image or API key this is a no-op that records
    /// [`MISSING_INPUT_WARNING`] and stays in `AwaitingInput`.
    pub async fn run(&mut self, observer: &dyn ProgressObserver) -> &SessionState {
        self.load();
        self.warning = None;

        if !self.can_submit() {
            warn!("{}", MISSING_INPUT_WARNING);
            self.warning = Some(MISSING_INPUT_WARNING.to_string());
            return &self.state;
        }

        match self.execute(observer).await {
            Ok(output) => {
                info!(width = output.width(), height = output.height(), "upscale finished");
                self.progress.send_replace(ProgressIndicator::default());
                if let Err(error) = self.transition(SessionState::Displaying(output)) {
                    self.fail(error);
                }
            }
            Err(error) => self.fail(error),
        }
        &self.state
    }

    async fn execute(&mut self, observer: &dyn ProgressObserver) -> UpscalerResult<OutputImage> {
        self.transition(SessionState::Submitting)?;

        let image_url = match &self.source {
            Some(source) => source.to_embeddable()?,
            None => {
                return Err(UpscalerError::state(
                    SessionPhase::Submitting.as_str(),
                    "encode",
                    "no source image",
                ));
            }
        };
        let request = UpscaleRequest::new(image_url, &self.params)?;
        info!(model = self.client.model_id(), "submitting upscale job");

        self.transition(SessionState::Polling)?;
        let relay = ProgressRelay {
            indicator: &self.progress,
            observer,
        };
        let result = self
            .client
            .submit(&request, &self.credentials, &relay)
            .await?;

        self.transition(SessionState::Fetching)?;
        self.fetcher.fetch(&result).await
    }

    fn transition(&mut self, next: SessionState) -> UpscalerResult<()> {
        let (from, to) = (self.phase(), next.phase());
        if !from.can_transition_to(to) {
            return Err(UpscalerError::state(
                from.as_str(),
                to.as_str(),
                "transition not allowed",
            ));
        }
        info!(from = from.as_str(), to = to.as_str(), "session transition");
        self.history.push(to);
        self.state = next;
        Ok(())
    }

    fn fail(&mut self, error: UpscalerError) {
        let report = FailureReport::from(&error);
        if report.severity <= ErrorSeverity::Warning {
            warn!(category = report.category, "{}", report.message);
        } else {
            error!(
                category = report.category,
                causes = ?report.causes,
                "Error occurred: {}",
                report.message
            );
        }
        self.progress.send_replace(ProgressIndicator::default());
        self.history.push(SessionPhase::Failed);
        self.state = SessionState::Failed(report);
    }

    /// Write the result PNG to `path`. Only valid while `Displaying`.
    pub async fn download(&self, path: impl AsRef<Path>) -> UpscalerResult<()> {
        match &self.state {
            SessionState::Displaying(output) => output.save_png(path).await,
            other => Err(UpscalerError::state(
                other.phase().as_str(),
                "download",
                "no result to download",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::SessionPhase::*;

    #[test]
    fn test_transition_table() {
        assert!(Idle.can_transition_to(AwaitingInput));
        assert!(AwaitingInput.can_transition_to(Submitting));
        assert!(Submitting.can_transition_to(Polling));
        assert!(Polling.can_transition_to(Fetching));
        assert!(Fetching.can_transition_to(Displaying));
        assert!(Displaying.can_transition_to(Idle));
        assert!(Failed.can_transition_to(Idle));

        for phase in [AwaitingInput, Submitting, Polling, Fetching] {
            assert!(phase.can_transition_to(Failed), "{:?} -> Failed", phase);
        }

        assert!(!Idle.can_transition_to(Submitting));
        assert!(!AwaitingInput.can_transition_to(Polling));
        assert!(!Polling.can_transition_to(Displaying));
        assert!(!Displaying.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Submitting));
        assert!(!Idle.can_transition_to(Failed));
    }

    #[test]
    fn test_terminal_phases() {
        assert!(Displaying.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Polling.is_terminal());
    }

    #[test]
    fn test_failure_report_splits_causes() {
        let cause = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let error = UpscalerError::upscale("m", "submission failed", Some(Box::new(cause)))
            .with_recovery_suggestion("try later");
        let report = FailureReport::from(&error);

        assert_eq!(report.category, "upscale");
        assert_eq!(report.severity, ErrorSeverity::Error);
        assert_eq!(report.message, "Upscaling with m failed: submission failed");
        assert_eq!(report.causes, vec!["timed out".to_string()]);
        assert_eq!(report.recovery_suggestion.as_deref(), Some("try later"));
    }

    #[test]
    fn test_failure_report_keeps_severity() {
        let report = FailureReport::from(&UpscalerError::validation("upscale_factor", "must be between 1 and 4", "8"));
        assert_eq!(report.severity, ErrorSeverity::Warning);
        assert!(report.causes.is_empty());
    }

    #[test]
    fn test_indicator_from_event() {
        let indicator = ProgressIndicator::from_event(&ProgressEvent::in_progress("step 4"));
        assert!(indicator.active);
        assert_eq!(indicator.fraction, 0.5);
        assert_eq!(indicator.message, "step 4");
        assert!(!ProgressIndicator::default().active);
    }
}
