use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, TurnstileError};
use crate::gateway::connection::ConnectionTracker;
use crate::gateway::handler::handle_request;
use crate::gateway::state::GatewayState;
use crate::security::{spawn_sweeper, Guard};
use crate::telemetry::{Metrics, Readiness};

/// Cancel `token` on SIGTERM or SIGINT
pub fn shutdown_on_signals(token: CancellationToken) -> Result<()> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
        TurnstileError::Io(std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))
    })?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).map_err(|e| {
        TurnstileError::Io(std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))
    })?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
            _ = token.cancelled() => {}
        }
        token.cancel();
    });
    Ok(())
}

/// Bind the configured address, start the expiry sweeper and serve until `shutdown`
pub async fn run(
    config: Arc<Config>,
    metrics: Option<Arc<Metrics>>,
    ready: Option<Readiness>,
    shutdown: CancellationToken,
) -> Result<()> {
    let guard = Arc::new(Guard::from_config(&config)?);
    let state = Arc::new(GatewayState::with_guard(&config, guard.clone(), metrics.clone()));

    let sweeper = spawn_sweeper(
        guard,
        std::time::Duration::from_secs(config.rate_limit.sweep_interval_secs),
        shutdown.child_token(),
        metrics,
    );

    let listener = TcpListener::bind(config.listen).await?;
    info!(addr = ?config.listen, upstream = %config.upstream, "Starting turnstile gateway");

    if let Some(ref r) = ready {
        r.store(true, Ordering::Release);
    }
    let result = serve(listener, state, shutdown.clone()).await;
    if let Some(ref r) = ready {
        r.store(false, Ordering::Release);
    }

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Window sweeper task failed");
    }
    result
}

/// Accept connections on `listener` and guard every request until `shutdown`
/// is cancelled, then drain open connections for up to the state's shutdown timeout
pub async fn serve(
    listener: TcpListener,
    state: Arc<GatewayState>,
    shutdown: CancellationToken,
) -> Result<()> {
    let builder = ConnBuilder::new(TokioExecutor::new());
    let tracker = ConnectionTracker::default();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };
                let _ = stream.set_nodelay(true);

                let conn_guard = tracker.track(state.metrics.as_ref());
                let builder = builder.clone();
                let state = state.clone();
                let shutdown = shutdown.clone();

                tokio::spawn(async move {
                    let _conn_guard = conn_guard;
                    serve_connection(builder, stream, peer, state, shutdown).await;
                });
            }
        }
    }

    drain(&tracker, state.shutdown_timeout).await;
    info!("Gateway stopped");
    Ok(())
}

async fn serve_connection(
    builder: ConnBuilder<TokioExecutor>,
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    state: Arc<GatewayState>,
    shutdown: CancellationToken,
) {
    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
        let state = state.clone();
        async move { Ok::<_, hyper::Error>(handle_request(req, &state, peer).await) }
    });

    let conn = builder.serve_connection(TokioIo::new(stream), svc);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(e) = result {
                warn!(?peer, error = %e, "serve_connection error");
            }
        }
        _ = shutdown.cancelled() => {
            // finish in-flight requests, then close keep-alive connections
            conn.as_mut().graceful_shutdown();
            if let Err(e) = conn.await {
                warn!(?peer, error = %e, "serve_connection error during shutdown");
            }
        }
    }
}

async fn drain(tracker: &ConnectionTracker, shutdown_timeout: std::time::Duration) {
    let mut closed = tracker.subscribe();
    info!(
        active_connections = tracker.active(),
        "Waiting for active connections to finish (timeout: {}s)",
        shutdown_timeout.as_secs()
    );

    let wait = async {
        while tracker.active() > 0 {
            if closed.changed().await.is_err() {
                break;
            }
        }
    };

    match timeout(shutdown_timeout, wait).await {
        Ok(()) => info!("All connections closed, shutdown complete"),
        Err(_) => warn!(
            active_connections = tracker.active(),
            "Shutdown timeout reached, connections still active"
        ),
    }
}
