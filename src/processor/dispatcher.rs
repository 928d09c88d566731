//! Worker pool driving the document processor
//!
//! Items arrive on a bounded channel. Each one is processed on a blocking
//! thread, with a semaphore bounding how many run at once. The dispatcher
//! emits the resulting events to the `Collector` and then acknowledges the
//! item, exactly once, whatever happened while processing it.

use crate::config::DispatcherConfig;
use crate::processor::{DocumentProcessor, ParsedRecord, ProcessingResult, StatusEvent, WorkItem};
use crate::ProcessingError;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle};

/// Receives the outputs of the dispatcher
///
/// For every work item the dispatcher calls, in order: `emit_status` for each
/// discovery, `emit_parsed` for each record (or `emit_status` once for the
/// error), then `ack` exactly once.
pub trait Collector: Send + Sync {
    fn emit_parsed(&self, record: ParsedRecord);

    fn emit_status(&self, event: StatusEvent);

    fn ack(&self, item_id: u64);
}

/// Totals reported when the work queue is drained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl DispatchSummary {
    fn record(&mut self, outcome: Result<bool, JoinError>) {
        self.processed += 1;
        match outcome {
            Ok(true) => self.succeeded += 1,
            Ok(false) => self.failed += 1,
            Err(e) => {
                tracing::error!("Dispatch task failed: {}", e);
                self.failed += 1;
            }
        }
    }
}

/// Creates the bounded channel feeding a dispatcher
pub fn work_queue(config: &DispatcherConfig) -> (mpsc::Sender<WorkItem>, mpsc::Receiver<WorkItem>) {
    mpsc::channel(config.queue_capacity.max(1) as usize)
}

/// Concurrent driver of a shared `DocumentProcessor`
pub struct Dispatcher {
    processor: Arc<DocumentProcessor>,
    collector: Arc<dyn Collector>,
    workers: usize,
}

impl Dispatcher {
    pub fn new(
        processor: Arc<DocumentProcessor>,
        collector: Arc<dyn Collector>,
        config: &DispatcherConfig,
    ) -> Self {
        Self {
            processor,
            collector,
            workers: config.workers.max(1) as usize,
        }
    }

    /// Processes items until the channel is closed and every item is acknowledged
    ///
    /// # Arguments
    ///
    /// * `receiver` - Receiving half of [`work_queue`]
    ///
    /// # Returns
    ///
    /// Counts of processed, succeeded and failed items
    pub async fn run(&self, mut receiver: mpsc::Receiver<WorkItem>) -> DispatchSummary {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles: Vec<JoinHandle<bool>> = Vec::new();
        let mut summary = DispatchSummary::default();

        tracing::info!("Starting dispatcher with {} workers", self.workers);

        // a worker slot is taken before an item is, so no received item is left unhandled
        loop {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!("Worker pool closed: {}", e);
                    break;
                }
            };
            let Some(item) = receiver.recv().await else {
                break;
            };

            let processor = Arc::clone(&self.processor);
            let collector = Arc::clone(&self.collector);

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                handle_item(processor, collector.as_ref(), item).await
            }));

            let (finished, pending): (Vec<_>, Vec<_>) =
                handles.into_iter().partition(|handle| handle.is_finished());
            handles = pending;
            for handle in finished {
                summary.record(handle.await);
            }
        }

        for handle in handles {
            summary.record(handle.await);
        }

        tracing::info!(
            "Dispatcher drained: {} processed, {} succeeded, {} failed",
            summary.processed,
            summary.succeeded,
            summary.failed
        );
        summary
    }
}

/// Processes one item and emits its events followed by its acknowledgment
///
/// Returns true on success.
async fn handle_item(
    processor: Arc<DocumentProcessor>,
    collector: &dyn Collector,
    item: WorkItem,
) -> bool {
    let id = item.id;
    let url = item.url.clone();
    let metadata = item.metadata.clone();

    let worker = Arc::clone(&processor);
    let result = match tokio::task::spawn_blocking(move || worker.process(item)).await {
        Ok(result) => result,
        Err(e) => {
            let error = ProcessingError::Panicked {
                url: url.clone(),
                message: e.to_string(),
            };
            processor.fail(url, metadata, error)
        }
    };

    let succeeded = result.is_success();
    match result {
        ProcessingResult::Success {
            records,
            discoveries,
        } => {
            for event in discoveries {
                collector.emit_status(event);
            }
            for record in records {
                collector.emit_parsed(record);
            }
        }
        ProcessingResult::Error { event, .. } => collector.emit_status(event),
    }

    collector.ack(id);
    succeeded
}
