//! mv and mv-folder commands - Rename objects
//!
//! A rename is a server-side copy followed by a delete of the source. It is
//! not atomic; a failure in between leaves both keys present.

use clap::Args;

use super::{BulkOp, report_bulk};
use crate::context::{BucketArgs, open_gateway};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Rename one object
#[derive(Args, Debug)]
pub struct MvArgs {
    /// Current key
    pub old: String,

    /// New key (must not exist)
    pub new: String,
}

/// Rename a folder by rewriting every key under it
#[derive(Args, Debug)]
pub struct MvFolderArgs {
    /// Current folder name
    pub old: String,

    /// New folder name; every occurrence of the old name in a key is replaced
    pub new: String,
}

/// Execute the mv command
pub async fn execute(args: MvArgs, bucket: &BucketArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let gateway = match open_gateway(bucket, &formatter).await {
        Ok(g) => g,
        Err(code) => return code,
    };

    match gateway.rename_file(&args.old, &args.new).await {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&serde_json::json!({
                    "key": args.old,
                    "target": args.new,
                    "renamed": true
                }));
            } else {
                formatter.success(&format!(
                    "Renamed {} -> {}",
                    formatter.style_name(&args.old),
                    formatter.style_name(&args.new)
                ));
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
    }
}

/// Execute the mv-folder command
pub async fn execute_folder(
    args: MvFolderArgs,
    bucket: &BucketArgs,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let gateway = match open_gateway(bucket, &formatter).await {
        Ok(g) => g,
        Err(code) => return code,
    };

    match gateway.rename_folder(&args.old, &args.new).await {
        Ok(report) => report_bulk(&formatter, BulkOp::Rename, &args.old, &report),
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
    }
}
