//! Structured acquisition logging utilities.
//!
//! Provides consistent, structured logging for segment acquisition with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use segframe_models::SegmentDescriptor;

/// Install the global subscriber.
///
/// Colored output for terminals, JSON when `LOG_FORMAT=json`. `RUST_LOG`
/// overrides the default `segframe=info` directive.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("segframe=info,segframe_worker=info,segframe_media=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Logger that tags every line with the descriptor being acquired.
#[derive(Debug, Clone)]
pub struct SegmentLogger {
    source_id: String,
    sequence_index: u64,
}

impl SegmentLogger {
    pub fn new(descriptor: &SegmentDescriptor) -> Self {
        Self {
            source_id: descriptor.source_id().to_string(),
            sequence_index: descriptor.sequence_index(),
        }
    }

    /// Log entry into a pipeline state.
    pub fn log_transition(&self, attempt: u32, state: &str) {
        info!(
            source_id = %self.source_id,
            sequence_index = self.sequence_index,
            attempt = attempt,
            state = state,
            "Acquisition state: {}", state
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            source_id = %self.source_id,
            sequence_index = self.sequence_index,
            "{}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            source_id = %self.source_id,
            sequence_index = self.sequence_index,
            "{}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            source_id = %self.source_id,
            sequence_index = self.sequence_index,
            "{}", message
        );
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn sequence_index(&self) -> u64 {
        self.sequence_index
    }

    /// Span covering the whole acquisition of this descriptor.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "acquire",
            source_id = %self.source_id,
            sequence_index = self.sequence_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_logger_creation() {
        let descriptor = SegmentDescriptor::new("--PJHxphWEs", 30.0, 10.0, 7).unwrap();
        let logger = SegmentLogger::new(&descriptor);

        assert_eq!(logger.source_id(), "--PJHxphWEs");
        assert_eq!(logger.sequence_index(), 7);
    }
}
