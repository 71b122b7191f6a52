use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    auth::require_auth,
    endpoint::{EndpointGuard, Listener, LocalEndpoint},
    errors::ServerError,
    status::{StatusLevel, StatusRequest},
};

/// Request bodies above this size are rejected before decoding.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;
pub const DEFAULT_DRAIN_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub socket_path: PathBuf,
    pub auth_token: String,
    pub agent_name: String,
}

impl ServerOptions {
    /// Reads the endpoint path, token and agent name from the environment.
    /// Returns `None` when no token is configured.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            socket_path: launcher_util::desktop_socket_path(),
            auth_token: launcher_util::desktop_token()?,
            agent_name: launcher_util::agent_name(),
        })
    }
}

#[derive(Clone)]
struct AppState {
    agent_name: Arc<str>,
    shutdown_tx: mpsc::Sender<()>,
    status_tx: Arc<watch::Sender<Option<StatusLevel>>>,
}

fn router(auth_token: &str, state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/shutdown", get(shutdown))
        .route("/status", post(set_status))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            Arc::<str>::from(auth_token),
            require_auth,
        ))
        .with_state(state)
}

async fn ping(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "pong": &*state.agent_name }))
}

async fn shutdown(State(state): State<AppState>) -> Json<Value> {
    match state.shutdown_tx.try_send(()) {
        Ok(()) => info!("shutdown requested over desktop channel"),
        Err(mpsc::error::TrySendError::Full(())) => debug!("shutdown already pending"),
        Err(mpsc::error::TrySendError::Closed(())) => {
            warn!("shutdown requested but no one is listening")
        }
    }
    Json(json!({ "msg": "shutting down" }))
}

async fn set_status(State(state): State<AppState>, Json(req): Json<StatusRequest>) -> StatusCode {
    info!(status = %req.status, "desktop status updated");
    state.status_tx.send_replace(Some(req.status));
    StatusCode::OK
}

/// A bound but not yet serving desktop endpoint.
pub struct DesktopServer {
    endpoint: LocalEndpoint,
    listener: Listener,
    app: Router,
    status_rx: watch::Receiver<Option<StatusLevel>>,
}

impl DesktopServer {
    /// Clears any stale artifact at the socket path and binds it. Requests
    /// to `/shutdown` are forwarded to `shutdown_tx`.
    pub async fn bind(
        options: ServerOptions,
        shutdown_tx: mpsc::Sender<()>,
    ) -> Result<Self, ServerError> {
        if options.auth_token.is_empty() {
            return Err(ServerError::EmptyToken);
        }
        let endpoint = LocalEndpoint::new(options.socket_path);
        endpoint.release().await?;
        let listener = endpoint.bind()?;

        let (status_tx, status_rx) = watch::channel(None);
        let state = AppState {
            agent_name: Arc::from(options.agent_name),
            shutdown_tx,
            status_tx: Arc::new(status_tx),
        };
        Ok(Self {
            endpoint,
            listener,
            app: router(&options.auth_token, state),
            status_rx,
        })
    }

    pub fn path(&self) -> &Path {
        self.endpoint.path()
    }

    /// Latest status pushed over `POST /status`, `None` until the first one.
    pub fn status_updates(&self) -> watch::Receiver<Option<StatusLevel>> {
        self.status_rx.clone()
    }

    pub fn spawn(self) -> RunningServer {
        let (stop_tx, stop_rx) = watch::channel(false);
        let endpoint = self.endpoint.clone();
        let handle = tokio::spawn(async move {
            let _guard = EndpointGuard(self.endpoint.clone());
            serve(self.listener, self.app, self.endpoint, stop_rx).await
        });
        RunningServer {
            endpoint,
            stop_tx,
            handle,
        }
    }
}

pub struct RunningServer {
    endpoint: LocalEndpoint,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<io::Result<()>>,
}

impl RunningServer {
    pub fn path(&self) -> &Path {
        self.endpoint.path()
    }

    /// Stops accepting, waits up to `deadline` for in-flight requests, then
    /// removes the endpoint. Connections still open at the deadline are
    /// dropped and [`ServerError::DrainTimeout`] is returned.
    pub async fn shutdown(mut self, deadline: Duration) -> Result<(), ServerError> {
        self.stop_tx.send_replace(true);
        let outcome = match tokio::time::timeout(deadline, &mut self.handle).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(err))) => Err(ServerError::Serve(err)),
            Ok(Err(err)) => Err(ServerError::Join(err.to_string())),
            Err(_) => {
                warn!(?deadline, "desktop server did not drain in time");
                self.handle.abort();
                let _ = (&mut self.handle).await;
                Err(ServerError::DrainTimeout { deadline })
            }
        };
        let released = self.endpoint.release().await;
        info!(path = %self.endpoint.path().display(), "desktop server stopped");
        outcome?;
        released?;
        Ok(())
    }
}

#[cfg(unix)]
async fn serve(
    listener: Listener,
    app: Router,
    _endpoint: LocalEndpoint,
    mut stop_rx: watch::Receiver<bool>,
) -> io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = stop_rx.wait_for(|stop| *stop).await;
        })
        .await
}

#[cfg(windows)]
async fn serve(
    mut listener: Listener,
    app: Router,
    endpoint: LocalEndpoint,
    mut stop_rx: watch::Receiver<bool>,
) -> io::Result<()> {
    use axum::{body::Body, http::Request};
    use hyper::body::Incoming;
    use hyper_util::{
        rt::{TokioExecutor, TokioIo},
        server::conn::auto::Builder,
        service::TowerToHyperService,
    };
    use tokio::{net::windows::named_pipe::ServerOptions as PipeOptions, task::JoinSet};
    use tower::ServiceExt as _;

    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            res = listener.connect() => {
                res?;
                let next = PipeOptions::new().create(endpoint.path())?;
                let connected = std::mem::replace(&mut listener, next);
                let service = TowerToHyperService::new(
                    app.clone()
                        .into_service()
                        .map_request(|req: Request<Incoming>| req.map(Body::new)),
                );
                connections.spawn(async move {
                    let builder = Builder::new(TokioExecutor::new());
                    if let Err(err) = builder.serve_connection(TokioIo::new(connected), service).await {
                        debug!(error = %err, "desktop pipe connection failed");
                    }
                });
            }
            _ = stop_rx.wait_for(|stop| *stop) => break,
        }
    }
    drop(listener);
    while connections.join_next().await.is_some() {}
    Ok(())
}
