//! get-folder command - Download a folder or the whole bucket as .tar.gz

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::context::{BucketArgs, open_gateway};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Download every object under a folder (or the whole bucket) as a .tar.gz archive
#[derive(Args, Debug)]
pub struct GetFolderArgs {
    /// Folder to download; omit for the whole bucket
    pub dir: Option<String>,

    /// Directory to write the archive into
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
struct GetFolderOutput {
    bucket: String,
    folder: Option<String>,
    archive: String,
    size_bytes: u64,
    size_human: String,
}

/// Execute the get-folder command
pub async fn execute(
    args: GetFolderArgs,
    bucket: &BucketArgs,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);

    if !args.output.is_dir() {
        formatter.error(&format!(
            "Output directory does not exist: {}",
            args.output.display()
        ));
        return ExitCode::UsageError;
    }

    let gateway = match open_gateway(bucket, &formatter).await {
        Ok(g) => g,
        Err(code) => return code,
    };

    let what = args.dir.as_deref().unwrap_or(gateway.bucket()).to_string();
    let spinner = formatter.spinner(&format!("Packaging {what}"));
    let result = gateway.download_bucket(args.dir.as_deref()).await;
    spinner.finish_and_clear();

    let archive = match result {
        Ok(a) => a,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };

    let size = archive.size();
    let saved = match archive.persist_in(&args.output).await {
        Ok(path) => path,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };

    let size_human = humansize::format_size(size, humansize::BINARY);
    if formatter.is_json() {
        formatter.json(&GetFolderOutput {
            bucket: gateway.bucket().to_string(),
            folder: args.dir,
            archive: saved.display().to_string(),
            size_bytes: size,
            size_human,
        });
    } else {
        formatter.success(&format!(
            "Saved {} ({})",
            formatter.style_name(&saved.display().to_string()),
            formatter.style_size(&size_human)
        ));
    }

    ExitCode::Success
}
