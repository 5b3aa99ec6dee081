//! put command - Upload a local file
//!
//! Refuses to overwrite an existing object.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use crate::context::{BucketArgs, open_gateway};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Upload a local file to a new object key
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file to upload
    pub source: PathBuf,

    /// Destination object key
    pub key: String,

    /// Content-Type to store (guessed from the file name by default)
    #[arg(long)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    key: String,
    source: String,
    size_bytes: u64,
    size_human: String,
    content_type: String,
}

/// Content type for `path`, falling back to application/octet-stream
pub fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Execute the put command
pub async fn execute(args: PutArgs, bucket: &BucketArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let metadata = match std::fs::metadata(&args.source) {
        Ok(m) if m.is_file() => m,
        Ok(_) => {
            formatter.error(&format!("Not a file: {}", args.source.display()));
            return ExitCode::UsageError;
        }
        Err(e) => {
            formatter.error(&format!("Cannot read {}: {e}", args.source.display()));
            return ExitCode::UsageError;
        }
    };

    let content_type = args
        .content_type
        .clone()
        .unwrap_or_else(|| guess_content_type(&args.source));

    let gateway = match open_gateway(bucket, &formatter).await {
        Ok(g) => g,
        Err(code) => return code,
    };

    if let Err(e) = gateway
        .upload_file(&args.key, &args.source, &content_type)
        .await
    {
        formatter.error(&e.to_string());
        return ExitCode::from(&e);
    }

    let size_human = humansize::format_size(metadata.len(), humansize::BINARY);
    if formatter.is_json() {
        formatter.json(&PutOutput {
            key: args.key.clone(),
            source: args.source.display().to_string(),
            size_bytes: metadata.len(),
            size_human,
            content_type,
        });
    } else {
        formatter.success(&format!(
            "Uploaded {} to {} ({}, {content_type})",
            args.source.display(),
            formatter.style_name(&args.key),
            formatter.style_size(&size_human),
        ));
    }

    ExitCode::Success
}
