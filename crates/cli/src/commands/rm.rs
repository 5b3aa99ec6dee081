//! rm and rm-folder commands - Delete objects
//!
//! Folder deletion keeps going past individual failures and reports them
//! at the end.

use clap::Args;

use super::{BulkOp, report_bulk};
use crate::context::{BucketArgs, open_gateway};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Delete one object
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Object key
    pub key: String,
}

/// Delete every object under a folder
#[derive(Args, Debug)]
pub struct RmFolderArgs {
    /// Folder name (without trailing slash)
    pub dir: String,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, bucket: &BucketArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let gateway = match open_gateway(bucket, &formatter).await {
        Ok(g) => g,
        Err(code) => return code,
    };

    match gateway.delete_file(&args.key).await {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&serde_json::json!({ "key": args.key, "deleted": true }));
            } else {
                formatter.success(&format!("Deleted {}", formatter.style_name(&args.key)));
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
    }
}

/// Execute the rm-folder command
pub async fn execute_folder(
    args: RmFolderArgs,
    bucket: &BucketArgs,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let gateway = match open_gateway(bucket, &formatter).await {
        Ok(g) => g,
        Err(code) => return code,
    };

    match gateway.delete_folder(&args.dir).await {
        Ok(report) => report_bulk(&formatter, BulkOp::Delete, &args.dir, &report),
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
    }
}
