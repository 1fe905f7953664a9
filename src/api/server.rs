//! Server lifecycle: bind, serve, and bounded graceful shutdown
//!
//! Shutdown is a two-stage race. The first stage waits for either the
//! external shutdown future or the serve task ending on its own. The second
//! stage waits for either the serve task to drain or the grace period to
//! elapse; in the latter case in-flight requests are answered with 503 and
//! the serve task is aborted if it still does not finish.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use super::types::ApiError;

/// How long cut-off responses get to flush before the serve task is aborted
pub const FORCE_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle states, published on a watch channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Starting,
    Serving,
    ShuttingDown,
    Stopped,
}

/// What started the shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// The shutdown future resolved
    Signal,
    /// The serve task ended without being asked to
    ServerExited,
}

/// How draining ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Completed,
    GracePeriodElapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub trigger: ShutdownTrigger,
    pub drain: DrainOutcome,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// A bound HTTP server that has not started serving yet
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router,
    grace_period: Duration,
    state: watch::Sender<ServerState>,
}

impl Server {
    /// Bind the listening socket; the server is `Starting` afterwards
    pub async fn bind(
        addr: SocketAddr,
        router: Router,
        grace_period: Duration,
    ) -> Result<Self, ServerError> {
        let bind_error = |source| ServerError::Bind { addr, source };

        let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;
        let (state, _) = watch::channel(ServerState::Starting);

        Ok(Self {
            listener,
            local_addr,
            router,
            grace_period,
            state,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Observe lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Serve until `shutdown` resolves or the server exits, then drain
    pub async fn run<F>(self, shutdown: F) -> ShutdownReport
    where
        F: Future<Output = ()> + Send,
    {
        let Self {
            listener,
            local_addr,
            router,
            grace_period,
            state,
        } = self;

        let (force_tx, force_rx) = watch::channel(false);
        let (drain_tx, drain_rx) = oneshot::channel::<()>();

        let app = router.layer(middleware::from_fn_with_state(
            force_rx,
            cut_off_when_forced,
        ));

        let serve_task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = drain_rx.await;
                })
                .await
        });

        state.send_replace(ServerState::Serving);
        info!(addr = %local_addr, "server listening");

        let report = supervise(
            serve_task,
            shutdown,
            Shutdown {
                drain: drain_tx,
                force: force_tx,
                grace_period,
            },
            &state,
        )
        .await;

        state.send_replace(ServerState::Stopped);
        info!(trigger = ?report.trigger, drain = ?report.drain, "server stopped");

        report
    }
}

/// Handles the supervisor uses to stop the serve task
struct Shutdown {
    drain: oneshot::Sender<()>,
    force: watch::Sender<bool>,
    grace_period: Duration,
}

async fn supervise<F>(
    mut serve_task: JoinHandle<io::Result<()>>,
    shutdown: F,
    handles: Shutdown,
    state: &watch::Sender<ServerState>,
) -> ShutdownReport
where
    F: Future<Output = ()>,
{
    let (trigger, exited) = tokio::select! {
        () = shutdown => {
            info!("shutdown signal received, draining connections");
            (ShutdownTrigger::Signal, None)
        }
        result = &mut serve_task => {
            warn!("server exited before a shutdown was requested");
            (ShutdownTrigger::ServerExited, Some(result))
        }
    };

    state.send_replace(ServerState::ShuttingDown);
    // Already gone when the server exited on its own
    let _ = handles.drain.send(());

    // A finished handle must not be polled again
    let (drain, result) = match exited {
        Some(result) => (DrainOutcome::Completed, result),
        None => {
            let drained = tokio::select! {
                result = &mut serve_task => Some(result),
                () = tokio::time::sleep(handles.grace_period) => None,
            };

            match drained {
                Some(result) => (DrainOutcome::Completed, result),
                None => {
                    warn!(
                        grace_period_ms = handles.grace_period.as_millis(),
                        "grace period elapsed, cutting off in-flight requests"
                    );
                    handles.force.send_replace(true);
                    (
                        DrainOutcome::GracePeriodElapsed,
                        force_close(serve_task).await,
                    )
                }
            }
        }
    };

    log_serve_result(result);

    ShutdownReport { trigger, drain }
}

async fn force_close(
    mut serve_task: JoinHandle<io::Result<()>>,
) -> Result<io::Result<()>, JoinError> {
    match tokio::time::timeout(FORCE_CLOSE_TIMEOUT, &mut serve_task).await {
        Ok(result) => result,
        Err(_) => {
            serve_task.abort();
            serve_task.await
        }
    }
}

fn log_serve_result(result: Result<io::Result<()>, JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "server error"),
        Err(e) if e.is_cancelled() => warn!("server task aborted with connections still open"),
        Err(e) => error!(error = %e, "server task panicked"),
    }
}

/// Answers 503 for requests still running when the grace period ends
async fn cut_off_when_forced(
    State(mut force): State<watch::Receiver<bool>>,
    request: Request,
    next: Next,
) -> Response {
    tokio::select! {
        response = next.run(request) => response,
        () = forced(&mut force) => {
            ApiError::unavailable("Server is shutting down").into_response()
        }
    }
}

async fn forced(force: &mut watch::Receiver<bool>) {
    let fired = force.wait_for(|forced| *forced).await.is_ok();
    if !fired {
        std::future::pending::<()>().await;
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix
///
/// If a handler cannot be installed the error is logged and that source is
/// ignored.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
