//! Bounded-concurrency transfer executor
//!
//! Tasks are handed to a pool of at most `min(max_workers, N)` concurrent
//! workers in fixed-size submission batches. Every task yields exactly one
//! [`TransferOutcome`] on a completion channel, in completion order. The
//! channel is the only point where workers synchronize with the caller.

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use futures::FutureExt;
use tempfile::TempPath;
use tokio::sync::{Semaphore, mpsc};

use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::path::RemotePath;
use crate::retry::retry_with_backoff;
use crate::task::{TransferKind, TransferOutcome, TransferTask};
use crate::traits::ObjectStore;

/// Affixes of the temporary file a download streams into before it is
/// persisted. The middle of the name is random and the file is created
/// exclusively.
const PARTIAL_PREFIX: &str = ".xfer-";
const PARTIAL_SUFFIX: &str = ".part";

/// Tuning and mode switches for one executor run
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub max_workers: usize,
    pub batch_size: usize,
    pub dry_run: bool,
    /// Replace existing local files on download
    pub overwrite: bool,
    pub retry: RetryConfig,
}

impl ExecutorOptions {
    pub fn from_config(config: &Config, dry_run: bool, overwrite: bool) -> Self {
        Self {
            max_workers: config.transfer.max_workers,
            batch_size: config.transfer.batch_size,
            dry_run,
            overwrite,
            retry: config.retry.clone(),
        }
    }
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self::from_config(&Config::default(), false, false)
    }
}

/// Progress notifications from a running executor
#[derive(Debug)]
pub enum TransferEvent {
    /// Every task of batch `batch` (1-based) has been handed to a worker
    BatchSubmitted { batch: usize, tasks: usize },
    Finished(TransferOutcome),
}

/// What a worker did with one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemResult {
    Transferred(u64),
    Skipped,
}

pub struct TransferExecutor {
    worker: Arc<Worker>,
    options: ExecutorOptions,
}

/// State shared by all workers of a run
struct Worker {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    dry_run: bool,
    overwrite: bool,
    retry: RetryConfig,
}

impl TransferExecutor {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, options: ExecutorOptions) -> Self {
        let worker = Worker {
            store,
            bucket: bucket.into(),
            dry_run: options.dry_run,
            overwrite: options.overwrite,
            retry: options.retry.clone(),
        };
        Self {
            worker: Arc::new(worker),
            options,
        }
    }

    /// Pool size for `items` tasks
    pub fn worker_count(&self, items: usize) -> usize {
        self.options.max_workers.max(1).min(items)
    }

    /// Start executing `tasks` and return the completion channel.
    ///
    /// Submission runs in the background: batch k+1 is submitted while batch
    /// k is still in flight, and outcomes can be consumed as soon as the
    /// first worker finishes. The channel closes after the last outcome.
    pub fn start(&self, tasks: Vec<TransferTask>, kind: TransferKind) -> mpsc::UnboundedReceiver<TransferEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let workers = self.worker_count(tasks.len());
        let batch_size = self.options.batch_size.max(1);

        tracing::info!(
            tasks = tasks.len(),
            workers,
            batch_size,
            dry_run = self.options.dry_run,
            "Starting transfer workers"
        );

        tokio::spawn(submit(self.worker.clone(), tasks, kind, workers, batch_size, tx));
        rx
    }
}

async fn submit(
    worker: Arc<Worker>,
    tasks: Vec<TransferTask>,
    kind: TransferKind,
    workers: usize,
    batch_size: usize,
    tx: mpsc::UnboundedSender<TransferEvent>,
) {
    let pool = Arc::new(Semaphore::new(workers));
    let mut pending = tasks.into_iter();
    let mut batch_index = 0;

    loop {
        let batch: Vec<TransferTask> = pending.by_ref().take(batch_size).collect();
        if batch.is_empty() {
            break;
        }
        batch_index += 1;
        let submitted = batch.len();

        for task in batch {
            let permit = match pool.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    let cause = Error::General(format!("worker pool unavailable: {e}"));
                    let error = Error::item_failed(task.to_string(), &cause);
                    let _ = tx.send(TransferEvent::Finished(TransferOutcome::failed(task, error)));
                    continue;
                }
            };

            let worker = worker.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = worker.run_item(task, kind).await;
                drop(permit);
                let _ = tx.send(TransferEvent::Finished(outcome));
            });
        }

        tracing::debug!(batch = batch_index, tasks = submitted, "Submitted batch");
        let _ = tx.send(TransferEvent::BatchSubmitted {
            batch: batch_index,
            tasks: submitted,
        });
    }
}

impl Worker {
    /// Execute one task, converting every failure (panics included) into a
    /// failed outcome for that task alone.
    async fn run_item(&self, task: TransferTask, kind: TransferKind) -> TransferOutcome {
        let result = AssertUnwindSafe(self.execute(&task, kind))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(Error::General("worker panicked".to_string())));

        match result {
            Ok(ItemResult::Transferred(bytes)) => TransferOutcome::succeeded(task, bytes),
            Ok(ItemResult::Skipped) => TransferOutcome::skipped(task),
            Err(e) => {
                tracing::warn!(item = %task, error = %e, "Transfer failed");
                let error = Error::item_failed(task.to_string(), &e);
                TransferOutcome::failed(task, error)
            }
        }
    }

    async fn execute(&self, task: &TransferTask, kind: TransferKind) -> Result<ItemResult> {
        match kind {
            TransferKind::Put => {
                let (Some(source), Some(key)) = (task.source.as_local(), task.destination.as_remote())
                else {
                    return Err(Error::InvalidMapping(format!("not an upload task: {task}")));
                };
                self.put(source, key, task.size_hint).await
            }
            TransferKind::Get => {
                let (Some(key), Some(destination)) = (task.source.as_remote(), task.destination.as_local())
                else {
                    return Err(Error::InvalidMapping(format!("not a download task: {task}")));
                };
                self.get(key, destination, task.size_hint).await
            }
        }
    }

    async fn put(&self, source: &Path, key: &str, size_hint: Option<u64>) -> Result<ItemResult> {
        if self.dry_run {
            let bytes = match size_hint {
                Some(size) => size,
                None => tokio::fs::metadata(source).await?.len(),
            };
            tracing::debug!(path = %source.display(), key, bytes, "Would upload");
            return Ok(ItemResult::Transferred(bytes));
        }

        let remote = RemotePath::new(&self.bucket, key);
        tracing::debug!(path = %source.display(), key, "Starting upload");
        let bytes = retry_with_backoff(&self.retry, key, || {
            self.store.upload_file(&remote, source, None)
        })
        .await?;
        tracing::debug!(path = %source.display(), key, bytes, "Completed upload");

        Ok(ItemResult::Transferred(bytes))
    }

    async fn get(&self, key: &str, destination: &Path, size_hint: Option<u64>) -> Result<ItemResult> {
        if !self.overwrite && tokio::fs::try_exists(destination).await? {
            tracing::debug!(path = %destination.display(), key, "Skipping existing file");
            return Ok(ItemResult::Skipped);
        }

        if self.dry_run {
            let bytes = size_hint.unwrap_or(0);
            tracing::debug!(key, path = %destination.display(), bytes, "Would download");
            return Ok(ItemResult::Transferred(bytes));
        }

        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        tokio::fs::create_dir_all(parent).await?;

        let remote = RemotePath::new(&self.bucket, key);
        // Deleted on drop unless persisted
        let partial = partial_file(parent)?;
        tracing::debug!(key, path = %destination.display(), "Starting download");

        let bytes = retry_with_backoff(&self.retry, key, || {
            self.store.download_file(&remote, &partial)
        })
        .await?;

        partial.persist(destination).map_err(|e| Error::Io(e.error))?;
        tracing::debug!(key, path = %destination.display(), bytes, "Completed download");

        Ok(ItemResult::Transferred(bytes))
    }
}

/// Create an empty, uniquely named temporary file in `dir`
fn partial_file(dir: &Path) -> Result<TempPath> {
    let file = tempfile::Builder::new()
        .prefix(PARTIAL_PREFIX)
        .suffix(PARTIAL_SUFFIX)
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}
