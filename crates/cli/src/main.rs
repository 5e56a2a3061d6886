//! xfer - bulk file transfers between local directories and S3
//!
//! Uploads a directory tree to `s3://bucket/prefix`, downloads a prefix into
//! a directory, or bulk-deletes the objects under a prefix.

mod commands;
mod exit_code;
mod output;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::commands::transfer::TransferArgs;
use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

const EXAMPLES: &str = "\
Examples:
  Download from S3 to local:
    xfer --source s3://bucket-name/prefix --destination /local/path

  Upload from local to S3:
    xfer --source /path/to/files --destination s3://bucket-name/prefix

  Recursive download of matching files only:
    xfer --source s3://bucket-name/prefix --destination /local/path -r --filter '*.jpg'

  Preview an upload without transferring anything:
    xfer --source /path/to/files --destination s3://bucket-name/prefix --dry-run

  Delete objects under a prefix:
    xfer --destination s3://bucket-name/prefix --delete [--recursive] [--filter '*.jpg']

  Use IFCB_DATA_DIR and AWS_UPLOAD_URL (or a .env file) as defaults:
    xfer --recursive";

/// Bulk transfers between local directories and S3
#[derive(Parser, Debug)]
#[command(name = "xfer", version, about, long_about = None, after_help = EXAMPLES)]
struct Cli {
    #[command(flatten)]
    transfer: TransferArgs,

    /// Only check that the configured credentials are accepted
    #[arg(long)]
    validate: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Output format: human-readable or JSON
    #[arg(long)]
    json: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Suppress progress bars and non-error output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // .env must be loaded before clap reads the environment
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_tracing(&cli);

    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };

    let code = if cli.validate {
        commands::validate::execute(output_config).await
    } else if !cli.transfer.has_location() {
        if Cli::command().print_help().is_ok() {
            println!();
        }
        ExitCode::Success
    } else {
        commands::transfer::execute(cli.transfer, output_config).await
    };

    code.into()
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.json || cli.quiet {
        "warn"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{level},aws_config=warn,aws_smithy_runtime=warn,hyper_util=warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .init();
}
