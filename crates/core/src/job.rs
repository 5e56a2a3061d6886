//! Job driver
//!
//! Wires enumeration, key mapping, execution and aggregation together for
//! one upload, download or delete job:
//!
//! ```text
//! Idle -> Enumerating -> (DryRunReport | Transferring) -> Reporting -> Done
//!            \___________________________________________________/
//!                                  Failed
//! ```
//!
//! Item failures never leave `Transferring` early; they only flip the
//! overall success flag. Fatal errors end the job in `Failed` and are
//! returned to the caller without a summary.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use humansize::{BINARY, format_size};
use serde::Serialize;

use crate::aggregate::{JobSummary, Operation, OutcomeAggregator};
use crate::config::Config;
use crate::delete::BatchDeleter;
use crate::enumerate::{Filter, RemoteObjectEntry, enumerate_local, enumerate_remote};
use crate::error::{Error, Result};
use crate::executor::{ExecutorOptions, TransferEvent, TransferExecutor};
use crate::keymap::{local_to_remote_key, remote_key_to_local_path};
use crate::path::{ParsedPath, RemotePath, parse_path};
use crate::report::ReportSink;
use crate::task::{TransferKind, TransferTask};
use crate::traits::ObjectStore;

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Enumerating,
    DryRunReport,
    Transferring,
    Reporting,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Idle => "idle",
            JobState::Enumerating => "enumerating",
            JobState::DryRunReport => "dry_run_report",
            JobState::Transferring => "transferring",
            JobState::Reporting => "reporting",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What a job does and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobMode {
    Upload {
        source: PathBuf,
        destination: RemotePath,
    },
    Download {
        source: RemotePath,
        destination: PathBuf,
    },
    Delete {
        target: RemotePath,
    },
}

impl JobMode {
    pub fn operation(&self) -> Operation {
        match self {
            JobMode::Upload { .. } => Operation::Upload,
            JobMode::Download { .. } => Operation::Download,
            JobMode::Delete { .. } => Operation::Delete,
        }
    }

    /// The remote side of the job
    pub fn remote(&self) -> &RemotePath {
        match self {
            JobMode::Upload { destination, .. } => destination,
            JobMode::Download { source, .. } => source,
            JobMode::Delete { target } => target,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    pub recursive: bool,
    pub dry_run: bool,
    pub overwrite: bool,
    pub filter: Filter,
    pub config: Config,
}

/// Candidate work produced by enumeration
#[derive(Debug, Clone)]
pub enum Plan {
    Transfers {
        kind: TransferKind,
        tasks: Vec<TransferTask>,
    },
    Deletes(Vec<RemoteObjectEntry>),
}

impl Plan {
    pub fn len(&self) -> usize {
        match self {
            Plan::Transfers { tasks, .. } => tasks.len(),
            Plan::Deletes(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> u64 {
        match self {
            Plan::Transfers { tasks, .. } => tasks.iter().filter_map(|t| t.size_hint).sum(),
            Plan::Deletes(entries) => entries.iter().map(|e| e.size).sum(),
        }
    }
}

/// Result of a job that reached `Done`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    /// AND of every item outcome
    pub success: bool,
    pub dry_run: bool,
    pub planned_files: u64,
    pub planned_bytes: u64,
    pub summary: JobSummary,
}

#[derive(Debug, Clone)]
pub struct Job {
    mode: JobMode,
    options: JobOptions,
}

impl Job {
    pub fn new(mode: JobMode, options: JobOptions) -> Self {
        Self { mode, options }
    }

    /// Build a job from raw source/destination locations.
    ///
    /// A delete targets the destination when it is remote, else the source.
    /// Otherwise exactly one side must be remote: a remote destination
    /// means upload, a remote source means download.
    pub fn from_locations(
        source: Option<&str>,
        destination: Option<&str>,
        delete: bool,
        options: JobOptions,
    ) -> Result<Self> {
        let source = source.map(parse_path).transpose()?;
        let destination = destination.map(parse_path).transpose()?;

        let mode = if delete {
            match (destination, source) {
                (Some(ParsedPath::Remote(target)), _) | (_, Some(ParsedPath::Remote(target))) => {
                    JobMode::Delete { target }
                }
                _ => {
                    return Err(Error::Validation(
                        "Delete requires a remote location (s3://bucket/prefix)".into(),
                    ));
                }
            }
        } else {
            match (source, destination) {
                (Some(ParsedPath::Local(source)), Some(ParsedPath::Remote(destination))) => {
                    JobMode::Upload {
                        source,
                        destination,
                    }
                }
                (Some(ParsedPath::Remote(source)), Some(ParsedPath::Local(destination))) => {
                    JobMode::Download {
                        source,
                        destination,
                    }
                }
                (Some(ParsedPath::Remote(_)), Some(ParsedPath::Remote(_))) => {
                    return Err(Error::Validation(
                        "Remote-to-remote transfers are not supported".into(),
                    ));
                }
                (Some(ParsedPath::Local(_)), Some(ParsedPath::Local(_))) => {
                    return Err(Error::Validation(
                        "One of source or destination must be a remote location (s3://bucket/prefix)"
                            .into(),
                    ));
                }
                _ => {
                    return Err(Error::Validation(
                        "Both source and destination are required".into(),
                    ));
                }
            }
        };

        Ok(Self::new(mode, options))
    }

    pub fn mode(&self) -> &JobMode {
        &self.mode
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// Whether running this job issues any store request
    pub fn touches_store(&self) -> bool {
        !(self.options.dry_run && matches!(self.mode, JobMode::Upload { .. }))
    }

    /// Enumerate the candidate set and map every item to its destination
    pub async fn plan(&self, store: &dyn ObjectStore) -> Result<Plan> {
        let JobOptions {
            recursive,
            filter,
            config,
            ..
        } = &self.options;
        tracing::debug!(
            operation = %self.mode.operation(),
            recursive,
            filter = filter.as_str().unwrap_or("*"),
            "Enumerating candidates"
        );

        match &self.mode {
            JobMode::Upload {
                source,
                destination,
            } => {
                let root = source.clone();
                let walk_filter = filter.clone();
                let recursive = *recursive;
                let listing =
                    tokio::task::spawn_blocking(move || enumerate_local(&root, recursive, &walk_filter))
                        .await
                        .map_err(|e| Error::General(format!("Local enumeration aborted: {e}")))??;

                let tasks = listing
                    .entries
                    .iter()
                    .map(|entry| {
                        let key = local_to_remote_key(&listing.base, &entry.path, destination.prefix())?;
                        Ok(TransferTask::upload(&entry.path, key, Some(entry.size)))
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(Plan::Transfers {
                    kind: TransferKind::Put,
                    tasks,
                })
            }
            JobMode::Download {
                source,
                destination,
            } => {
                let entries =
                    enumerate_remote(store, source, *recursive, filter, &config.retry).await?;
                let tasks = entries
                    .into_iter()
                    .map(|entry| {
                        let path = remote_key_to_local_path(&entry.key, source.prefix(), destination)?;
                        Ok(TransferTask::download(entry.key, path, Some(entry.size)))
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(Plan::Transfers {
                    kind: TransferKind::Get,
                    tasks,
                })
            }
            JobMode::Delete { target } => {
                let entries =
                    enumerate_remote(store, target, *recursive, filter, &config.retry).await?;
                Ok(Plan::Deletes(entries))
            }
        }
    }

    /// Run the job to completion.
    ///
    /// Returns `Ok` once the job reaches `Done`, whatever the item outcomes.
    /// Any fatal error moves the job to `Failed` and is returned.
    pub async fn run(&self, store: Arc<dyn ObjectStore>, sink: &dyn ReportSink) -> Result<JobReport> {
        let mut state = JobState::Idle;
        sink.state_changed(state);

        match self.drive(store, sink, &mut state).await {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::debug!(from = %state, error = %e, "Job failed");
                transition(sink, &mut state, JobState::Failed);
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        store: Arc<dyn ObjectStore>,
        sink: &dyn ReportSink,
        state: &mut JobState,
    ) -> Result<JobReport> {
        let options = &self.options;
        let operation = self.mode.operation();
        options.config.validate()?;

        transition(sink, state, JobState::Enumerating);
        let plan = self.plan(store.as_ref()).await?;
        let planned_files = plan.len();
        let planned_bytes = plan.total_bytes();
        tracing::info!(
            "Found {} files ({})",
            planned_files,
            format_size(planned_bytes, BINARY)
        );

        if plan.is_empty() {
            tracing::warn!(location = %self.mode.remote(), "No files found");
            transition(sink, state, JobState::Reporting);
            let summary = JobSummary::empty(operation);
            sink.job_finished(&summary);
            transition(sink, state, JobState::Done);
            return Ok(JobReport {
                success: true,
                dry_run: options.dry_run,
                planned_files: 0,
                planned_bytes: 0,
                summary,
            });
        }

        if options.dry_run {
            transition(sink, state, JobState::DryRunReport);
            tracing::info!(
                "Would {} {} files ({})",
                operation,
                planned_files,
                format_size(planned_bytes, BINARY)
            );
        } else {
            transition(sink, state, JobState::Transferring);
            if let JobMode::Download { destination, .. } = &self.mode {
                tokio::fs::create_dir_all(destination).await?;
            }
        }

        sink.job_started(operation, planned_files, planned_bytes, options.dry_run);
        let mut aggregator = OutcomeAggregator::start(operation);
        let bucket = self.mode.remote().bucket.clone();

        match plan {
            Plan::Transfers { kind, tasks } => {
                let executor = TransferExecutor::new(
                    store,
                    bucket,
                    ExecutorOptions::from_config(&options.config, options.dry_run, options.overwrite),
                );
                let mut events = executor.start(tasks, kind);
                while let Some(event) = events.recv().await {
                    observe(event, &mut aggregator, sink);
                }
            }
            Plan::Deletes(entries) => {
                BatchDeleter::new(store, bucket, options.config.transfer.delete_batch_size)
                    .dry_run(options.dry_run)
                    .run(entries, |event| observe(event, &mut aggregator, sink))
                    .await;
            }
        }

        let seen = aggregator.items();
        if seen != planned_files as u64 {
            return Err(Error::General(format!(
                "Received {seen} outcomes for {planned_files} tasks"
            )));
        }

        transition(sink, state, JobState::Reporting);
        let success = aggregator.success();
        let summary = aggregator.finish();
        tracing::info!(
            operation = %operation,
            files = summary.total_files,
            bytes = summary.total_bytes,
            failures = summary.failures,
            skipped = summary.skipped,
            duration_secs = summary.duration_seconds,
            "Job finished"
        );
        sink.job_finished(&summary);
        transition(sink, state, JobState::Done);

        Ok(JobReport {
            success,
            dry_run: options.dry_run,
            planned_files: planned_files as u64,
            planned_bytes,
            summary,
        })
    }
}

fn transition(sink: &dyn ReportSink, state: &mut JobState, next: JobState) {
    tracing::debug!(from = %state, to = %next, "Job state");
    *state = next;
    sink.state_changed(next);
}

fn observe(event: TransferEvent, aggregator: &mut OutcomeAggregator, sink: &dyn ReportSink) {
    match event {
        TransferEvent::BatchSubmitted { tasks, .. } => sink.batch_submitted(tasks),
        TransferEvent::Finished(outcome) => {
            aggregator.record(&outcome);
            sink.item_finished(&outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::report::NullSink;
    use crate::test_support::MemoryStore;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        states: Mutex<Vec<JobState>>,
        items: Mutex<usize>,
        batches: Mutex<Vec<usize>>,
        started: Mutex<Option<(usize, u64)>>,
        summary: Mutex<Option<JobSummary>>,
    }

    impl ReportSink for RecordingSink {
        fn state_changed(&self, state: JobState) {
            self.states.lock().unwrap().push(state);
        }

        fn job_started(&self, _operation: Operation, items: usize, total_bytes: u64, _dry_run: bool) {
            *self.started.lock().unwrap() = Some((items, total_bytes));
        }

        fn batch_submitted(&self, tasks: usize) {
            self.batches.lock().unwrap().push(tasks);
        }

        fn item_finished(&self, _outcome: &crate::task::TransferOutcome) {
            *self.items.lock().unwrap() += 1;
        }

        fn job_finished(&self, summary: &JobSummary) {
            *self.summary.lock().unwrap() = Some(summary.clone());
        }
    }

    fn write(root: &Path, relative: &str, size: usize) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, vec![b'x'; size]).unwrap();
    }

    fn options(recursive: bool) -> JobOptions {
        let config = Config {
            retry: RetryConfig {
                max_attempts: 2,
                initial_backoff_ms: 1,
                max_backoff_ms: 2,
            },
            ..Config::default()
        };
        JobOptions {
            recursive,
            config,
            ..JobOptions::default()
        }
    }

    fn upload(source: &Path, destination: &str, options: JobOptions) -> Job {
        Job::from_locations(
            Some(source.to_str().unwrap()),
            Some(destination),
            false,
            options,
        )
        .unwrap()
    }

    #[test]
    fn test_mode_resolution() {
        let job = Job::from_locations(Some("/data"), Some("s3://b/p"), false, JobOptions::default())
            .unwrap();
        assert!(matches!(job.mode(), JobMode::Upload { .. }));

        let job = Job::from_locations(Some("s3://b/p"), Some("/data"), false, JobOptions::default())
            .unwrap();
        assert!(matches!(job.mode(), JobMode::Download { .. }));

        let job = Job::from_locations(Some("/data"), Some("s3://b/p"), true, JobOptions::default())
            .unwrap();
        assert_eq!(
            job.mode(),
            &JobMode::Delete {
                target: RemotePath::new("b", "p")
            }
        );

        let job = Job::from_locations(Some("s3://b/q"), None, true, JobOptions::default()).unwrap();
        assert_eq!(job.mode().remote(), &RemotePath::new("b", "q"));
    }

    #[test]
    fn test_mode_validation_errors() {
        let cases = [
            (Some("/a"), Some("/b"), false),
            (Some("s3://a/x"), Some("s3://b/y"), false),
            (Some("/a"), None, false),
            (None, None, false),
            (Some("/a"), Some("/b"), true),
        ];
        for (source, destination, delete) in cases {
            let err = Job::from_locations(source, destination, delete, JobOptions::default())
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{source:?} {destination:?}");
        }

        let err = Job::from_locations(Some("/a"), Some("s3://"), false, JobOptions::default())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_touches_store() {
        let opts = JobOptions {
            dry_run: true,
            ..JobOptions::default()
        };
        let job = Job::from_locations(Some("/a"), Some("s3://b"), false, opts.clone()).unwrap();
        assert!(!job.touches_store());

        let job = Job::from_locations(Some("s3://b"), Some("/a"), false, opts).unwrap();
        assert!(job.touches_store());
    }

    #[tokio::test]
    async fn test_dry_run_upload_runs_without_store() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "a.txt", 10);
        write(temp_dir.path(), "sub/b.jpg", 20);

        let mut dry = options(true);
        dry.dry_run = true;
        let job = upload(temp_dir.path(), "s3://bucket/p", dry);
        assert!(!job.touches_store());

        let report = job.run(Arc::new(crate::OfflineStore), &NullSink).await.unwrap();
        assert!(report.success);
        assert_eq!(report.summary.total_files, 2);
        assert_eq!(report.summary.total_bytes, 30);
    }

    #[tokio::test]
    async fn test_filtered_upload_scenario() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "a.txt", 10);
        write(temp_dir.path(), "sub/b.jpg", 20);

        let mut opts = options(true);
        opts.filter = Filter::new(Some("*.txt")).unwrap();
        let job = upload(temp_dir.path(), "s3://bucket/data", opts);
        let store = Arc::new(MemoryStore::new());

        let plan = job.plan(store.as_ref()).await.unwrap();
        let Plan::Transfers { kind, tasks } = &plan else {
            panic!("expected transfers");
        };
        assert_eq!(*kind, TransferKind::Put);
        assert_eq!(
            tasks,
            &vec![TransferTask::upload(temp_dir.path().join("a.txt"), "data/a.txt", Some(10))]
        );

        let report = job.run(store.clone(), &NullSink).await.unwrap();
        assert!(report.success);
        assert_eq!(report.summary.total_files, 1);
        assert_eq!(report.summary.total_bytes, 10);
        assert_eq!(store.object("bucket", "data/a.txt"), Some(vec![b'x'; 10]));
        assert_eq!(store.object_count("bucket"), 1);
    }

    #[tokio::test]
    async fn test_state_sequence_and_sink_events() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "a.txt", 3);
        write(temp_dir.path(), "b.txt", 4);

        let job = upload(temp_dir.path(), "s3://bucket", options(false));
        let sink = RecordingSink::default();
        let report = job.run(Arc::new(MemoryStore::new()), &sink).await.unwrap();

        assert!(report.success);
        assert_eq!(
            *sink.states.lock().unwrap(),
            vec![
                JobState::Idle,
                JobState::Enumerating,
                JobState::Transferring,
                JobState::Reporting,
                JobState::Done,
            ]
        );
        assert_eq!(*sink.items.lock().unwrap(), 2);
        assert_eq!(*sink.batches.lock().unwrap(), vec![2]);
        assert_eq!(*sink.started.lock().unwrap(), Some((2, 7)));
        assert_eq!(sink.summary.lock().unwrap().as_ref(), Some(&report.summary));
    }

    #[tokio::test]
    async fn test_dry_run_totals_match_real_run() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..6 {
            write(temp_dir.path(), &format!("d{}/f{i}.bin", i % 2), 100 + i);
        }
        let store = Arc::new(MemoryStore::new());

        let mut dry = options(true);
        dry.dry_run = true;
        let sink = RecordingSink::default();
        let projected = upload(temp_dir.path(), "s3://bucket/p", dry)
            .run(store.clone(), &sink)
            .await
            .unwrap();
        assert_eq!(store.put_calls(), 0);
        assert!(sink.states.lock().unwrap().contains(&JobState::DryRunReport));

        let actual = upload(temp_dir.path(), "s3://bucket/p", options(true))
            .run(store.clone(), &NullSink)
            .await
            .unwrap();

        assert_eq!(projected.summary.total_files, actual.summary.total_files);
        assert_eq!(projected.summary.total_bytes, actual.summary.total_bytes);
        assert_eq!(actual.summary.total_bytes, (100..106).sum::<u64>());
        assert!(projected.dry_run);
    }

    #[tokio::test]
    async fn test_download_twice_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.insert("bucket", "data/a.txt", vec![1; 10]);
        store.insert("bucket", "data/sub/b.jpg", vec![2; 20]);
        store.insert("bucket", "data2/other.txt", vec![3; 5]);

        let destination = temp_dir.path().join("restore");
        let job = Job::from_locations(
            Some("s3://bucket/data"),
            Some(destination.to_str().unwrap()),
            false,
            options(true),
        )
        .unwrap();

        let first = job.run(store.clone(), &NullSink).await.unwrap();
        assert!(first.success);
        assert_eq!(first.summary.total_files, 2);
        assert_eq!(first.summary.total_bytes, 30);
        assert_eq!(std::fs::read(destination.join("sub/b.jpg")).unwrap(), vec![2; 20]);
        assert!(!destination.join("other.txt").exists());

        let second = job.run(store.clone(), &NullSink).await.unwrap();
        assert!(second.success);
        assert_eq!(second.summary.total_bytes, 0);
        assert_eq!(second.summary.skipped, 2);
    }

    #[tokio::test]
    async fn test_dry_run_download_totals_match_real_run() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.insert("bucket", "data/a.txt", vec![1; 10]);
        store.insert("bucket", "data/sub/b.jpg", vec![2; 20]);
        store.insert("bucket", "data/sub/c.jpg", vec![3; 30]);

        let destination = temp_dir.path().join("restore");
        write(&destination, "sub/b.jpg", 4);

        let download = |options: JobOptions| {
            Job::from_locations(
                Some("s3://bucket/data"),
                Some(destination.to_str().unwrap()),
                false,
                options,
            )
            .unwrap()
        };

        let mut dry = options(true);
        dry.dry_run = true;
        let projected = download(dry).run(store.clone(), &NullSink).await.unwrap();
        assert_eq!(store.get_calls(), 0);
        assert!(!destination.join("a.txt").exists());

        let actual = download(options(true))
            .run(store.clone(), &NullSink)
            .await
            .unwrap();

        assert_eq!(projected.summary.skipped, 1);
        assert_eq!(projected.summary.skipped, actual.summary.skipped);
        assert_eq!(projected.summary.total_files, actual.summary.total_files);
        assert_eq!(projected.summary.total_bytes, actual.summary.total_bytes);
        assert_eq!(actual.summary.total_bytes, 40);
        assert_eq!(std::fs::read(destination.join("sub/b.jpg")).unwrap(), vec![b'x'; 4]);
    }

    #[tokio::test]
    async fn test_success_is_and_of_outcomes() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            write(temp_dir.path(), name, 5);
        }
        let store = Arc::new(MemoryStore::new());
        store.fail_key("b.txt");

        let sink = RecordingSink::default();
        let report = upload(temp_dir.path(), "s3://bucket", options(false))
            .run(store.clone(), &sink)
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.summary.total_files, 3);
        assert_eq!(report.summary.failures, 1);
        assert_eq!(report.summary.total_bytes, 10);
        assert_eq!(sink.states.lock().unwrap().last(), Some(&JobState::Done));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_pool() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..20 {
            write(temp_dir.path(), &format!("f{i:02}.bin"), 8);
        }
        let store = Arc::new(MemoryStore::new().with_delay(Duration::from_millis(10)));

        let mut opts = options(false);
        opts.config.transfer.max_workers = 4;
        opts.config.transfer.batch_size = 7;
        let sink = RecordingSink::default();
        let report = upload(temp_dir.path(), "s3://bucket/x", opts)
            .run(store.clone(), &sink)
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.summary.total_files, 20);
        assert!(store.max_in_flight() <= 4);
        assert_eq!(*sink.batches.lock().unwrap(), vec![7, 7, 6]);
    }

    #[tokio::test]
    async fn test_delete_job() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..5 {
            store.insert("bucket", &format!("old/f{i}"), vec![0; 4]);
        }
        store.insert("bucket", "keep/f0", vec![0; 4]);
        store.refuse_delete("old/f1");

        let job = Job::from_locations(None, Some("s3://bucket/old"), true, options(true)).unwrap();
        let report = job.run(store.clone(), &NullSink).await.unwrap();

        assert!(!report.success);
        assert_eq!(report.summary.total_files, 5);
        assert_eq!(report.summary.failures, 1);
        assert_eq!(report.summary.total_bytes, 16);
        assert_eq!(store.object_count("bucket"), 2);
    }

    #[tokio::test]
    async fn test_empty_set_is_success() {
        let temp_dir = TempDir::new().unwrap();
        let job = upload(temp_dir.path(), "s3://bucket", options(true));
        let report = job.run(Arc::new(MemoryStore::new()), &NullSink).await.unwrap();
        assert!(report.success);
        assert_eq!(report.summary, JobSummary::empty(Operation::Upload));
    }

    #[tokio::test]
    async fn test_missing_source_fails_job() {
        let temp_dir = TempDir::new().unwrap();
        let job = upload(&temp_dir.path().join("missing"), "s3://bucket", options(true));
        let sink = RecordingSink::default();

        let err = job.run(Arc::new(MemoryStore::new()), &sink).await.unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
        assert_eq!(
            *sink.states.lock().unwrap(),
            vec![JobState::Idle, JobState::Enumerating, JobState::Failed]
        );
        assert!(sink.summary.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listing_failure_fails_job() {
        let temp_dir = TempDir::new().unwrap();
        let job = Job::from_locations(
            Some("s3://bucket/data"),
            Some(temp_dir.path().to_str().unwrap()),
            false,
            options(true),
        )
        .unwrap();

        let err = job
            .run(Arc::new(MemoryStore::new().failing_listings()), &NullSink)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_traversal_key_fails_job() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.insert("bucket", "data/../escape.txt", vec![1]);

        let job = Job::from_locations(
            Some("s3://bucket/data"),
            Some(temp_dir.path().to_str().unwrap()),
            false,
            options(true),
        )
        .unwrap();
        let err = job.run(store, &NullSink).await.unwrap_err();
        assert!(matches!(err, Error::InvalidMapping(_)));
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_enumeration() {
        let temp_dir = TempDir::new().unwrap();
        let mut opts = options(true);
        opts.config.transfer.delete_batch_size = 5000;
        let sink = RecordingSink::default();

        let err = upload(temp_dir.path(), "s3://bucket", opts)
            .run(Arc::new(MemoryStore::new()), &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(
            *sink.states.lock().unwrap(),
            vec![JobState::Idle, JobState::Failed]
        );
    }
}
