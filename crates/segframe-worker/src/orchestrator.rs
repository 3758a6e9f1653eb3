//! Acquisition orchestrator: locate, fetch and extract with whole-pipeline retries.
//!
//! Each attempt runs every stage from the start. The temp clip of an attempt
//! is removed before the attempt returns, whatever the outcome, so nothing
//! accumulates in the temp directory across retries.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::Instrument;

use segframe_media::{ensure_dir, MediaToolkit};
use segframe_models::{AcquisitionResult, SegmentDescriptor};

use crate::artifact::TempArtifact;
use crate::config::PipelineConfig;
use crate::error::AcquisitionError;
use crate::extractor::FrameExtractor;
use crate::fetcher::SegmentFetcher;
use crate::locator::{validate_window, SegmentLocator};
use crate::logging::SegmentLogger;
use crate::retry::{retry_async, RetryConfig, RetryResult};

/// Pipeline state of one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Pending,
    Locating,
    Fetching,
    Extracting,
    Succeeded,
    Failed,
}

impl AcquisitionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionState::Pending => "pending",
            AcquisitionState::Locating => "locating",
            AcquisitionState::Fetching => "fetching",
            AcquisitionState::Extracting => "extracting",
            AcquisitionState::Succeeded => "succeeded",
            AcquisitionState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AcquisitionState::Succeeded | AcquisitionState::Failed)
    }
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final report for one descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionOutcome {
    pub state: AcquisitionState,
    /// Attempts started, including the successful one
    pub attempts: u32,
    pub result: Option<AcquisitionResult>,
    /// Reason for the final failure; `None` on success
    pub last_error: Option<AcquisitionError>,
}

impl AcquisitionOutcome {
    pub fn is_success(&self) -> bool {
        self.state == AcquisitionState::Succeeded
    }

    pub fn is_cancelled(&self) -> bool {
        self.last_error.as_ref().is_some_and(AcquisitionError::is_cancelled)
    }
}

/// Drives descriptors through the acquisition pipeline.
pub struct AcquisitionOrchestrator<T: MediaToolkit + ?Sized> {
    toolkit: Arc<T>,
    config: PipelineConfig,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl<T: MediaToolkit + ?Sized> AcquisitionOrchestrator<T> {
    pub fn new(toolkit: Arc<T>, config: PipelineConfig) -> Self {
        Self {
            toolkit,
            config,
            cancel_rx: None,
        }
    }

    /// Stop at the next state transition or backoff once `cancel_rx` turns true.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn retry_config(&self) -> RetryConfig {
        let config = RetryConfig::new("acquire")
            .with_max_attempts(self.config.max_attempts)
            .with_base_delay(self.config.backoff_base);
        match &self.cancel_rx {
            Some(rx) => config.with_cancel(rx.clone()),
            None => config,
        }
    }

    /// Acquire a frame for `descriptor`, retrying the whole pipeline on failure.
    ///
    /// Never returns an error: every failure is reported in the outcome.
    pub async fn acquire(&self, descriptor: &SegmentDescriptor) -> AcquisitionOutcome {
        let logger = SegmentLogger::new(descriptor);
        let span = logger.create_span();
        self.acquire_logged(descriptor, &logger).instrument(span).await
    }

    async fn acquire_logged(
        &self,
        descriptor: &SegmentDescriptor,
        logger: &SegmentLogger,
    ) -> AcquisitionOutcome {
        logger.log_transition(0, AcquisitionState::Pending.as_str());

        let retry_permanent = self.config.retry_permanent_failures;
        let should_retry = |e: &AcquisitionError| {
            !e.is_cancelled() && (retry_permanent || !e.is_permanent())
        };

        let result = retry_async(&self.retry_config(), should_retry, move |attempt| {
            self.run_attempt(descriptor, attempt, logger)
        })
        .await;

        let attempts = result.attempts();
        let outcome = match result {
            RetryResult::Success { value, .. } => AcquisitionOutcome {
                state: AcquisitionState::Succeeded,
                attempts,
                result: Some(value),
                last_error: None,
            },
            RetryResult::Failed { error, .. } => AcquisitionOutcome {
                state: AcquisitionState::Failed,
                attempts,
                result: None,
                last_error: Some(error),
            },
            RetryResult::Interrupted { .. } => AcquisitionOutcome {
                state: AcquisitionState::Failed,
                attempts,
                result: None,
                last_error: Some(AcquisitionError::Cancelled),
            },
        };

        logger.log_transition(attempts, outcome.state.as_str());
        match &outcome.last_error {
            None => logger.log_progress(&format!("Acquired frame after {} attempt(s)", attempts)),
            Some(e) => logger.log_error(&format!(
                "Giving up after {} attempt(s) ({}): {}",
                attempts,
                e.kind(),
                e
            )),
        }
        outcome
    }

    /// One full pass of the pipeline. The temp clip is gone when this returns.
    async fn run_attempt(
        &self,
        descriptor: &SegmentDescriptor,
        attempt: u32,
        logger: &SegmentLogger,
    ) -> Result<AcquisitionResult, AcquisitionError> {
        let mut artifact = TempArtifact::reserve(&self.config.temp_dir, descriptor.source_id());
        let result = self
            .run_stages(descriptor, attempt, &mut artifact, logger)
            .await;
        artifact.cleanup().await;

        if let Err(e) = &result {
            logger.log_warning(&format!(
                "Attempt {}/{} failed ({}): {}",
                attempt,
                self.config.max_attempts,
                e.kind(),
                e
            ));
        }
        result
    }

    async fn run_stages(
        &self,
        descriptor: &SegmentDescriptor,
        attempt: u32,
        artifact: &mut TempArtifact,
        logger: &SegmentLogger,
    ) -> Result<AcquisitionResult, AcquisitionError> {
        let toolkit = self.toolkit.as_ref();
        let span_secs = self.config.clip_span_secs;

        self.enter(AcquisitionState::Locating, attempt, logger)?;
        let info = SegmentLocator::new(toolkit)
            .locate(descriptor.source_id())
            .await?;
        let download_start = validate_window(descriptor, &info, span_secs)?;

        self.enter(AcquisitionState::Fetching, attempt, logger)?;
        ensure_dir(&self.config.temp_dir)
            .await
            .map_err(|e| AcquisitionError::download_failed(e.to_string()))?;
        let strategy = SegmentFetcher::new(toolkit, self.config.min_artifact_bytes)
            .fetch(
                &descriptor.source_url(),
                download_start,
                span_secs,
                artifact.path(),
            )
            .await?;
        logger.log_progress(&format!("Clip fetched via {}", strategy));

        self.enter(AcquisitionState::Extracting, attempt, logger)?;
        ensure_dir(&self.config.frames_dir)
            .await
            .map_err(|e| AcquisitionError::extract_failed(e.to_string()))?;
        let frame_path = FrameExtractor::new(toolkit)
            .for_span(span_secs)
            .extract(artifact, self.config.frame_path(descriptor.sequence_index()))
            .await?;

        Ok(AcquisitionResult::for_descriptor(
            descriptor,
            absolute(frame_path),
        ))
    }

    /// Log the transition unless cancellation has been requested.
    fn enter(
        &self,
        state: AcquisitionState,
        attempt: u32,
        logger: &SegmentLogger,
    ) -> Result<(), AcquisitionError> {
        if self.is_cancelled() {
            return Err(AcquisitionError::Cancelled);
        }
        logger.log_transition(attempt, state.as_str());
        Ok(())
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}
