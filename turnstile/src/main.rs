#![forbid(unsafe_code)]

use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use turnstile_lib::config::load_from_path;
use turnstile_lib::gateway::{run, shutdown_on_signals};
use turnstile_lib::telemetry::{init_metrics, init_tracing, start_observability_server};

#[derive(Parser, Debug)]
#[command(author, version, about = "Turnstile rate limiting and abuse detection gateway")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "TURNSTILE_CONFIG",
        default_value = "config/turnstile.toml"
    )]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration from {}: {err}", cli.config.display());
            std::process::exit(1);
        }
    };

    if cli.check {
        println!("configuration OK: {}", cli.config.display());
        return;
    }

    if let Err(err) = init_tracing(&cfg.logging, &cfg.telemetry) {
        eprintln!("failed to initialize tracing: {err}");
        std::process::exit(1);
    }

    info!(
        ?cfg.listen,
        upstream = %cfg.upstream,
        routes = cfg.routes.len(),
        "configuration loaded"
    );

    let shutdown = CancellationToken::new();
    if let Err(err) = shutdown_on_signals(shutdown.clone()) {
        error!(%err, "failed to install signal handlers");
        std::process::exit(1);
    }

    let ready = Arc::new(AtomicBool::new(false));
    let mut metrics = None;
    let mut observability = None;

    if let Some(port) = cfg.telemetry.metrics_port {
        match init_metrics() {
            Ok((m, registry)) => {
                metrics = Some(m);
                observability = Some(tokio::spawn(start_observability_server(
                    port,
                    registry,
                    ready.clone(),
                    shutdown.child_token(),
                )));
            }
            Err(err) => warn!(%err, "failed to initialize metrics, continuing without them"),
        }
    }

    let result = run(Arc::new(cfg), metrics, Some(ready), shutdown.clone()).await;
    shutdown.cancel();

    if let Some(handle) = observability {
        match handle.await {
            Ok(Err(err)) => warn!(%err, "observability server exited with error"),
            Err(err) => warn!(%err, "observability server task failed"),
            Ok(Ok(())) => {}
        }
    }

    if let Err(err) = result {
        error!(%err, "gateway exited with error");
        std::process::exit(1);
    }
}
