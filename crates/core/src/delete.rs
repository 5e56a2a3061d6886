//! Batch delete coordinator
//!
//! Bulk delete takes up to 1000 keys per request, so deletes are not routed
//! through the worker pool. Batches are issued one after another and each
//! key still yields its own outcome.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::MAX_DELETE_BATCH;
use crate::enumerate::RemoteObjectEntry;
use crate::error::Error;
use crate::executor::TransferEvent;
use crate::task::{TransferOutcome, TransferTask};
use crate::traits::{DeleteFailure, ObjectStore};

pub struct BatchDeleter {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    batch_size: usize,
    dry_run: bool,
}

impl BatchDeleter {
    /// `batch_size` is clamped to `1..=1000`
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, batch_size: usize) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            batch_size: batch_size.clamp(1, MAX_DELETE_BATCH),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn batch_count(&self, items: usize) -> usize {
        items.div_ceil(self.batch_size)
    }

    /// Delete every entry, emitting one `Finished` event per key.
    ///
    /// Keys the store refuses fail individually. A failed request fails
    /// every key of its batch and is not retried; later batches still run.
    /// Successful deletes report the listed object size as bytes.
    pub async fn run(&self, entries: Vec<RemoteObjectEntry>, mut emit: impl FnMut(TransferEvent)) {
        tracing::info!(
            objects = entries.len(),
            batches = self.batch_count(entries.len()),
            dry_run = self.dry_run,
            "Deleting objects"
        );
        for (index, chunk) in entries.chunks(self.batch_size).enumerate() {
            let batch = index + 1;
            emit(TransferEvent::BatchSubmitted {
                batch,
                tasks: chunk.len(),
            });

            if self.dry_run {
                for entry in chunk {
                    tracing::debug!(key = %entry.key, bytes = entry.size, "Would delete");
                    emit(TransferEvent::Finished(TransferOutcome::succeeded(
                        delete_task(entry),
                        entry.size,
                    )));
                }
                continue;
            }

            let keys: Vec<String> = chunk.iter().map(|e| e.key.clone()).collect();
            tracing::debug!(batch, keys = keys.len(), "Issuing bulk delete");

            match self.store.delete_objects(&self.bucket, keys).await {
                Ok(report) => {
                    let refused: HashMap<&str, &DeleteFailure> = report
                        .failures
                        .iter()
                        .map(|f| (f.key.as_str(), f))
                        .collect();

                    for entry in chunk {
                        let outcome = match refused.get(entry.key.as_str()) {
                            Some(failure) => {
                                tracing::warn!(
                                    key = %entry.key,
                                    code = %failure.code,
                                    message = %failure.message,
                                    "Delete refused"
                                );
                                let reason = format!("{}: {}", failure.code, failure.message);
                                TransferOutcome::failed(
                                    delete_task(entry),
                                    Error::delete_failed(&entry.key, reason),
                                )
                            }
                            None => TransferOutcome::succeeded(delete_task(entry), entry.size),
                        };
                        emit(TransferEvent::Finished(outcome));
                    }
                }
                Err(e) => {
                    tracing::warn!(batch, keys = chunk.len(), error = %e, "Bulk delete request failed");
                    for entry in chunk {
                        emit(TransferEvent::Finished(TransferOutcome::failed(
                            delete_task(entry),
                            Error::delete_failed(&entry.key, e.to_string()),
                        )));
                    }
                }
            }
        }
    }
}

fn delete_task(entry: &RemoteObjectEntry) -> TransferTask {
    TransferTask::delete(&entry.key, Some(entry.size))
}
