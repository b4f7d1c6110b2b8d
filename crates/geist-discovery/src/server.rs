//! HTTP routes

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{debug, info, warn};

use geist_common::crd::GeistConnector;
use geist_common::redact::redact_connector;

use crate::auth::{extract_bearer_token, TokenVerifier};
use crate::error::{Error, Result};
use crate::kube_client::ConnectorSource;

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    /// Bearer token verifier
    pub verifier: Arc<TokenVerifier>,
    /// Where connectors come from
    pub source: Arc<dyn ConnectorSource>,
    /// Namespace connectors are listed from
    pub namespace: String,
}

/// Body of `GET /v1/connectors`
#[derive(Debug, Serialize)]
pub struct ConnectorList {
    /// Connectors with secrets and server-side metadata removed
    pub crds: Vec<GeistConnector>,
}

/// Body of `GET /v1/connectivity`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connectivity {
    /// API server version as `major.minor`
    pub kubernetes_version: String,
    /// Namespace connectors are listed from
    pub namespace: String,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/v1/connectors", get(list_connectors))
        .route("/v1/connectivity", get(connectivity))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .merge(v1)
        .with_state(state)
}

/// Serve until SIGINT or SIGTERM
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("failed to bind {addr}: {e}")))?;

    info!(addr = %addr, namespace = %state.namespace, "Starting discovery API");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down discovery API");
}

async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| Error::Unauthorized("missing bearer token".into()))?;

    let claims = state.verifier.verify(token).await.inspect_err(|e| {
        debug!(error = %e, path = %request.uri().path(), "rejected token");
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

async fn list_connectors(State(state): State<AppState>) -> Result<Json<ConnectorList>> {
    let mut crds = state.source.list_connectors(&state.namespace).await?;
    crds.iter_mut().for_each(redact_connector);
    Ok(Json(ConnectorList { crds }))
}

async fn connectivity(State(state): State<AppState>) -> Result<Json<Connectivity>> {
    let kubernetes_version = state.source.server_version().await?;
    Ok(Json(Connectivity {
        kubernetes_version,
        namespace: state.namespace.clone(),
    }))
}
