//! Command implementations

use bgw_core::{BulkReport, ItemResult};
use clap::Subcommand;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::Formatter;

pub mod get;
pub mod get_folder;
pub mod mv;
pub mod put;
pub mod rm;
pub mod serve;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP gateway
    Serve(serve::ServeArgs),

    /// Upload a local file (never overwrites)
    Put(put::PutArgs),

    /// Print a presigned download URL for an object
    Get(get::GetArgs),

    /// Download a folder or the whole bucket as .tar.gz
    GetFolder(get_folder::GetFolderArgs),

    /// Delete an object
    Rm(rm::RmArgs),

    /// Delete every object under a folder
    RmFolder(rm::RmFolderArgs),

    /// Rename an object
    Mv(mv::MvArgs),

    /// Rename a folder
    MvFolder(mv::MvFolderArgs),
}

/// Folder operation being reported
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum BulkOp {
    Delete,
    Rename,
}

impl BulkOp {
    fn past_tense(self) -> &'static str {
        match self {
            BulkOp::Delete => "Deleted",
            BulkOp::Rename => "Renamed",
        }
    }
}

#[derive(Debug, Serialize)]
struct BulkOutput<'a> {
    operation: BulkOp,
    folder: &'a str,
    success: bool,
    succeeded: usize,
    failed: usize,
    items: &'a [ItemResult],
}

/// Print the outcome of a folder operation and pick the exit code
pub(crate) fn report_bulk(
    formatter: &Formatter,
    operation: BulkOp,
    folder: &str,
    report: &BulkReport,
) -> ExitCode {
    let succeeded = report.succeeded();
    let failed = report.items.len() - succeeded;

    if formatter.is_json() {
        formatter.json(&BulkOutput {
            operation,
            folder,
            success: report.all_succeeded(),
            succeeded,
            failed,
            items: &report.items,
        });
    } else if report.all_succeeded() {
        formatter.success(&format!(
            "{} {succeeded} object(s) under {}",
            operation.past_tense(),
            formatter.style_name(&format!("{folder}/"))
        ));
    } else {
        formatter.warning(&format!(
            "{} {succeeded} of {} object(s) under {folder}/; {failed} failed",
            operation.past_tense(),
            report.items.len()
        ));
        formatter.println(&formatter.failure_table(report));
    }

    if report.all_succeeded() {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    }
}
