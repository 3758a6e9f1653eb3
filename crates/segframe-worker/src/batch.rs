//! Batch acquisition over a list of descriptors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info};

use segframe_media::MediaToolkit;
use segframe_models::SegmentDescriptor;

use crate::orchestrator::{AcquisitionOrchestrator, AcquisitionOutcome};
use crate::writer::DatasetWriter;

/// Counts reported after a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &AcquisitionOutcome, written: bool) {
        if outcome.is_success() && written {
            self.succeeded += 1;
        } else if outcome.is_cancelled() {
            self.cancelled += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Runs the orchestrator for every descriptor and appends successes to the table.
pub struct BatchRunner<T: MediaToolkit + ?Sized> {
    orchestrator: Arc<AcquisitionOrchestrator<T>>,
    writer: Arc<DatasetWriter>,
    max_concurrent: usize,
}

impl<T: MediaToolkit + ?Sized> BatchRunner<T> {
    pub fn new(orchestrator: Arc<AcquisitionOrchestrator<T>>, writer: Arc<DatasetWriter>) -> Self {
        let max_concurrent = orchestrator.config().max_concurrent.max(1);
        Self {
            orchestrator,
            writer,
            max_concurrent,
        }
    }

    /// Acquire every descriptor. A failed descriptor never stops the batch.
    pub async fn run(&self, descriptors: Vec<SegmentDescriptor>) -> BatchSummary {
        let total = descriptors.len();
        let succeeded = AtomicUsize::new(0);
        let succeeded = &succeeded;

        info!(total, max_concurrent = self.max_concurrent, "Starting batch");

        let results: Vec<(AcquisitionOutcome, bool)> = stream::iter(descriptors.into_iter().enumerate())
            .map(move |(i, descriptor)| async move {
                info!("[{}/{}] Processing {}", i + 1, total, descriptor.source_id());
                let outcome = self.orchestrator.acquire(&descriptor).await;

                let mut written = false;
                if let Some(row) = &outcome.result {
                    match self.writer.append(row).await {
                        Ok(()) => {
                            written = true;
                            let done = succeeded.fetch_add(1, Ordering::SeqCst) + 1;
                            info!(
                                source_id = descriptor.source_id(),
                                frame = %row.frame_path.display(),
                                "Success: {}/{} frames collected",
                                done,
                                total
                            );
                        }
                        Err(e) => error!(
                            source_id = descriptor.source_id(),
                            "Failed to append row to {}: {}",
                            self.writer.path().display(),
                            e
                        ),
                    }
                }
                (outcome, written)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut summary = BatchSummary {
            total,
            ..Default::default()
        };
        for (outcome, written) in &results {
            summary.record(outcome, *written);
        }

        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Batch finished"
        );
        summary
    }
}
