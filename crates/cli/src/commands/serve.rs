//! serve command - Run the HTTP gateway

use anyhow::Context;
use bgw_core::BucketGateway;
use clap::Args;
use tokio::net::TcpListener;

use crate::context::{BucketArgs, connect};
use crate::exit_code::ExitCode;
use crate::http;
use crate::output::{Formatter, OutputConfig};

/// Serve the gateway over HTTP
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (overrides [server].host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides [server].port)
    #[arg(long)]
    pub port: Option<u16>,
}

/// Execute the serve command
pub async fn execute(args: ServeArgs, bucket: &BucketArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let mut config = match bucket.load_config() {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let gateway = match connect(&config).await {
        Ok(g) => g,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };

    if let Err(e) = run(&config.server.addr(), gateway).await {
        formatter.error(&format!("{e:#}"));
        return ExitCode::GeneralError;
    }

    tracing::info!("Gateway stopped");
    ExitCode::Success
}

async fn run(addr: &str, gateway: BucketGateway) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local = listener
        .local_addr()
        .context("Failed to read bound address")?;

    tracing::info!(
        bucket = %gateway.bucket(),
        region = %gateway.region(),
        "Gateway listening on http://{local}"
    );

    axum::serve(listener, http::router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
