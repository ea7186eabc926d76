//! Axum hosting harness for the caching agent.
//!
//! Stands in for the platform that registers agent versions and routes client
//! traffic through them. Every request to the listen address is resolved
//! against the upstream origin and delivered to the active agent as a fetch
//! signal; while no agent is deployed, requests pass straight through to the
//! network, unobserved and uncached.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::Response,
    Router,
};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use url::Url;

use super::error::HostError;
use crate::agent::{ActivationReport, Agent, AgentError, Signal, SignalOutcome};
use crate::fetch::{Fetch, FetchRequest};
use crate::response::CachedResponse;

/// Host configuration options.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Shared host state: the upstream origin, the passthrough fetcher, and the
/// agent currently in control.
#[derive(Clone)]
pub struct HostState {
    origin: Url,
    fetcher: Arc<dyn Fetch>,
    active: Arc<RwLock<Option<Arc<Agent>>>>,
}

impl HostState {
    pub fn new(origin: Url, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            origin,
            fetcher,
            active: Arc::new(RwLock::new(None)),
        }
    }

    /// Roll out a new agent version: install, activate, take control.
    ///
    /// The new version starts answering requests only after both lifecycle
    /// signals have completed. On failure the previous arrangement, an older
    /// agent or plain passthrough, keeps serving and the error is returned.
    pub async fn deploy(&self, agent: Agent) -> Result<ActivationReport, AgentError> {
        let agent = Arc::new(agent);
        agent.handle(Signal::Install).await?;
        let outcome = agent.handle(Signal::Activate).await?;

        // Control passes to the new version for every request from here on
        tracing::info!(store = %agent.config().static_store, "Agent taking control");
        *self.active.write().await = Some(agent);

        let report = match outcome {
            SignalOutcome::Activated(report) => report,
            _ => ActivationReport::default(),
        };
        Ok(report)
    }

    /// The agent currently in control, if any.
    pub async fn active(&self) -> Option<Arc<Agent>> {
        self.active.read().await.clone()
    }
}

impl std::fmt::Debug for HostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostState")
            .field("origin", &self.origin.as_str())
            .finish()
    }
}

/// Resolve an incoming request against the upstream origin.
fn to_fetch_request(origin: &Url, request: &Request) -> Result<FetchRequest, HostError> {
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = origin.join(path_and_query).map_err(|e| {
        HostError::Internal(format!(
            "cannot resolve {path_and_query} against upstream origin: {e}"
        ))
    })?;
    Ok(FetchRequest::new(request.method().clone(), url))
}

/// Turn a stored response back into an HTTP response.
fn replay(response: CachedResponse) -> Result<Response, HostError> {
    let status = StatusCode::from_u16(response.status).map_err(|_| {
        HostError::Internal(format!(
            "stored status {} is not a valid HTTP status",
            response.status
        ))
    })?;

    let mut builder = axum::http::Response::builder().status(status);
    for (name, value) in &response.headers {
        // A stored header that no longer parses is dropped, not the response
        let Ok(name) = HeaderName::try_from(name.as_str()) else {
            continue;
        };
        let Ok(value) = HeaderValue::try_from(value.as_str()) else {
            continue;
        };
        builder = builder.header(name, value);
    }

    builder
        .body(Body::from(response.body))
        .map_err(|e| HostError::Internal(format!("failed to assemble response: {e}")))
}

/// Fallback handler: every path and method lands here and goes to the active
/// agent as a fetch signal.
async fn intercept(
    State(state): State<HostState>,
    request: Request,
) -> Result<Response, HostError> {
    let fetch_request = to_fetch_request(&state.origin, &request)?;

    match state.active().await {
        Some(agent) => match agent.handle(Signal::Fetch(fetch_request)).await? {
            SignalOutcome::Response(response) => replay(response),
            other => Err(HostError::Internal(format!(
                "fetch signal produced unexpected outcome: {other:?}"
            ))),
        },
        None => {
            let response = state.fetcher.fetch(&fetch_request).await?;
            replay(response)
        }
    }
}

/// Build the Axum router. A single fallback route intercepts everything.
fn build_router(state: HostState) -> Router {
    Router::new()
        .fallback(intercept)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the host.
///
/// This starts the Axum server and blocks until shutdown.
pub async fn run_server(state: HostState, config: HostConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let app = build_router(state);

    tracing::info!("Starting host at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
