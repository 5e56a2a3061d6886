//! validate - check that the store accepts the configured credentials

use anyhow::Context;
use serde::Serialize;
use xfer_s3::S3Client;

use crate::commands::transfer::load_config;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

#[derive(Debug, Serialize)]
struct ValidateOutput {
    valid: bool,
}

/// Execute the credential check
pub async fn execute(output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    match check().await {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&ValidateOutput { valid: true });
            } else {
                formatter.success("AWS credentials validated");
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            ExitCode::Failure
        }
    }
}

async fn check() -> anyhow::Result<()> {
    let config = load_config(None)?;
    let client = S3Client::new(&config.store)
        .await
        .context("Failed to create S3 client")?;
    client
        .validate_credentials()
        .await
        .context("AWS credentials validation failed")
}
