//! get command - Presigned download link for one object
//!
//! The link is time-limited and makes the client save the object under its
//! file name.

use clap::Args;

use crate::context::{BucketArgs, open_gateway};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Generate a presigned download URL for an object
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Object key
    pub key: String,
}

/// Execute the get command
pub async fn execute(args: GetArgs, bucket: &BucketArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let gateway = match open_gateway(bucket, &formatter).await {
        Ok(g) => g,
        Err(code) => return code,
    };

    let download = match gateway.download_file(&args.key).await {
        Ok(d) => d,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };

    if formatter.is_json() {
        formatter.json(&download);
    } else {
        formatter.println(&format!(
            "Download URL for {}:",
            formatter.style_name(&download.key)
        ));
        formatter.println(&formatter.style_url(&download.url));
        formatter.println("");
        formatter.println(&format!(
            "{} {}",
            formatter.style_key("Save as:"),
            download.file_name
        ));
        formatter.println(&format!(
            "{} {}",
            formatter.style_key("Expires:"),
            download.expires_at.strftime("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    ExitCode::Success
}
