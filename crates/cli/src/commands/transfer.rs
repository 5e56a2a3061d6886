//! transfer - upload, download or delete a file set
//!
//! The direction comes from which side is an `s3://bucket/prefix` location.
//! `--delete` removes the objects under the remote side instead.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use xfer_core::{
    Config, ConfigManager, Filter, Job, JobOptions, JobReport, ObjectStore, OfflineStore,
};
use xfer_s3::S3Client;

use crate::exit_code::ExitCode;
use crate::output::{ConsoleSink, Formatter, OutputConfig};

/// Default upload source, used only when the directory exists
pub const SOURCE_ENV: &str = "IFCB_DATA_DIR";

#[derive(Args, Debug, Default)]
pub struct TransferArgs {
    /// Local path or s3://bucket/prefix to read from [env: IFCB_DATA_DIR, if the directory exists]
    #[arg(long)]
    pub source: Option<String>,

    /// Local directory or s3://bucket/prefix to write to
    #[arg(long, env = "AWS_UPLOAD_URL")]
    pub destination: Option<String>,

    /// Include subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Show what would be transferred without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Only include files whose name matches this glob (e.g. '*.png')
    #[arg(long)]
    pub filter: Option<String>,

    /// Replace local files that already exist when downloading
    #[arg(long)]
    pub overwrite: bool,

    /// Delete the objects under the remote location
    #[arg(long)]
    pub delete: bool,

    /// Maximum number of concurrent transfers
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,
}

impl TransferArgs {
    /// Source from the command line, else from the environment
    pub fn source(&self) -> Option<String> {
        self.source.clone().or_else(|| {
            std::env::var(SOURCE_ENV)
                .ok()
                .filter(|dir| !dir.is_empty() && Path::new(dir).is_dir())
        })
    }

    /// Whether any location was given, directly or through the environment
    pub fn has_location(&self) -> bool {
        self.source().is_some() || self.destination.is_some()
    }
}

/// Execute a transfer or delete job
pub async fn execute(args: TransferArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    match run(&args, &formatter).await {
        Ok(report) => {
            formatter.report(&report);
            let summary = &report.summary;
            if report.success {
                formatter.success(&format!(
                    "{} finished: {} files",
                    summary.operation.label(),
                    summary.total_files
                ));
            } else {
                formatter.warning(&format!(
                    "{} of {} files failed",
                    summary.failures, summary.total_files
                ));
            }
            ExitCode::from_success(report.success)
        }
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            if is_usage_error(&e) {
                formatter.warning("Run 'xfer --help' for usage and examples");
            }
            ExitCode::Failure
        }
    }
}

async fn run(args: &TransferArgs, formatter: &Formatter) -> anyhow::Result<JobReport> {
    let filter = Filter::new(args.filter.as_deref())?;
    let config = load_config(args.workers)?;
    let source = args.source();

    let options = JobOptions {
        recursive: args.recursive,
        dry_run: args.dry_run,
        overwrite: args.overwrite,
        filter,
        config,
    };
    let job = Job::from_locations(
        source.as_deref(),
        args.destination.as_deref(),
        args.delete,
        options,
    )?;

    let remote = job.mode().remote();
    tracing::info!(
        operation = %job.mode().operation(),
        bucket = %remote.bucket,
        prefix = remote.prefix(),
        "Using {remote}"
    );

    let store: Arc<dyn ObjectStore> = if job.touches_store() {
        let client = S3Client::new(&job.options().config.store)
            .await
            .context("Failed to create S3 client")?;
        client
            .validate_credentials()
            .await
            .context("AWS credentials validation failed")?;
        tracing::info!("AWS credentials validated");
        Arc::new(client)
    } else {
        tracing::debug!("Dry-run upload, no store connection");
        Arc::new(OfflineStore)
    };

    let sink = ConsoleSink::new(formatter.clone());
    let report = job.run(store, &sink).await?;
    Ok(report)
}

/// Whether a failure came from the arguments or config rather than the run
fn is_usage_error(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<xfer_core::Error>()
        .is_some_and(xfer_core::Error::is_validation)
}

pub(crate) fn load_config(workers: Option<u16>) -> anyhow::Result<Config> {
    let manager = ConfigManager::new().context("Failed to locate configuration directory")?;
    let mut config = manager
        .load()
        .with_context(|| format!("Failed to load {}", manager.config_path().display()))?;

    if let Some(workers) = workers {
        config.transfer.max_workers = usize::from(workers);
    }

    Ok(config)
}
