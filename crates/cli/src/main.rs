//! bgw - bucket gateway
//!
//! Upload, download, delete and rename objects and folders in one S3 bucket,
//! from the command line or over HTTP with `bgw serve`.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod exit_code;
mod http;
mod output;

use commands::Commands;
use context::BucketArgs;
use output::OutputConfig;

#[derive(Parser, Debug)]
#[command(name = "bgw", version, about = "Bucket gateway for S3-compatible storage")]
struct Cli {
    #[command(flatten)]
    bucket: BucketArgs,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(debug: bool, serving: bool) {
    let fallback = if debug {
        "debug"
    } else if serving {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.debug, matches!(cli.command, Commands::Serve(_)));

    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };
    let bucket = &cli.bucket;

    let code = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, bucket, output_config).await,
        Commands::Put(args) => commands::put::execute(args, bucket, output_config).await,
        Commands::Get(args) => commands::get::execute(args, bucket, output_config).await,
        Commands::GetFolder(args) => {
            commands::get_folder::execute(args, bucket, output_config).await
        }
        Commands::Rm(args) => commands::rm::execute(args, bucket, output_config).await,
        Commands::RmFolder(args) => commands::rm::execute_folder(args, bucket, output_config).await,
        Commands::Mv(args) => commands::mv::execute(args, bucket, output_config).await,
        Commands::MvFolder(args) => commands::mv::execute_folder(args, bucket, output_config).await,
    };

    code.into()
}
