//! Edge HTTP server.
//!
//! # Responsibilities
//! - Serve the `/health` liveness probe from the terminator itself
//! - Dispatch every other request through the route table
//! - Forward matched requests to the backend target over plain HTTP
//! - Stream responses back verbatim, minus hop-by-hop headers
//! - Bound per-request time spent waiting on the backend
//!
//! # Design Decisions
//! - `/health` answers 200 while the terminator is serving, even when every
//!   backend is down, distinguishing "edge is up" from "backend is up"
//! - No route match returns 404 without contacting any backend
//! - Each connection is an independent task; a hung backend on one request
//!   never blocks progress on others

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::uri::Scheme;
use axum::http::{header::HeaderName, HeaderMap, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ShipConfig;
use crate::observability::metrics;
use crate::routing::RouteTable;

/// Headers that belong to a single hop and must not be forwarded in either
/// direction (RFC 9110 §7.6.1).
const HOP_BY_HOP: [HeaderName; 8] = [
    HeaderName::from_static("connection"),
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-authenticate"),
    HeaderName::from_static("proxy-authorization"),
    HeaderName::from_static("te"),
    HeaderName::from_static("trailer"),
    HeaderName::from_static("transfer-encoding"),
    HeaderName::from_static("upgrade"),
];

/// Per-connection failure modes with client-visible responses.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// No route matches the request's host/path. No backend is contacted.
    #[error("no matching route")]
    NoRoute,

    /// The matched backend could not be reached or failed mid-exchange.
    #[error("backend unreachable: {0}")]
    BackendUnreachable(String),

    /// The backend did not answer within the bounded upstream timeout.
    #[error("backend timed out")]
    Timeout,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ProxyError::NoRoute => (StatusCode::NOT_FOUND, "no matching route"),
            ProxyError::BackendUnreachable(_) => {
                (StatusCode::BAD_GATEWAY, "upstream request failed")
            }
            ProxyError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "upstream timed out"),
        };
        (status, body).into_response()
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    routes: Arc<RouteTable>,
    client: Client<HttpConnector, Body>,
    upstream_timeout: Duration,
}

/// The TLS-terminating edge server.
pub struct EdgeServer {
    app: Router,
}

impl EdgeServer {
    /// Create the server from a resolved configuration and compiled routes.
    pub fn new(config: &ShipConfig, routes: Arc<RouteTable>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            routes,
            client,
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
        };

        let app = Router::new()
            .route("/health", get(health_handler))
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::REQUEST_TIMEOUT,
                        Duration::from_secs(config.timeouts.request_secs),
                    )),
            );

        Self { app }
    }

    /// Serve plain HTTP on an already-bound listener. Used on internal
    /// listeners and in tests; production fronts run [`EdgeServer::run_tls`].
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, tls = false, "Edge server starting");

        axum::serve(listener, self.app.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Edge server stopped");
        Ok(())
    }

    /// Serve TLS-terminated HTTPS. Plaintext connections on this port fail
    /// the rustls handshake and are rejected.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, tls = true, "Edge server starting");

        let handle = Handle::new();
        let drain_handle = handle.clone();
        tokio::spawn(async move {
            shutdown.await;
            drain_handle.graceful_shutdown(Some(Duration::from_secs(30)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.app.into_make_service())
            .await?;

        tracing::info!("Edge server stopped");
        Ok(())
    }
}

/// Liveness probe served by the terminator itself.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Main proxy handler: route lookup, forward, stream back.
async fn proxy_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let route = match state.routes.match_request(&request) {
        Some(route) => route,
        None => {
            tracing::debug!(method = %method, path = %path, "No route matched");
            metrics::record_request(&method, 404, "none", start);
            return Err(ProxyError::NoRoute);
        }
    };
    let route_name = route.name.clone();

    let (mut parts, body) = request.into_parts();
    strip_hop_by_hop(&mut parts.headers);

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(route.target.clone());
    let uri = Uri::from_parts(uri_parts)
        .map_err(|e| ProxyError::BackendUnreachable(e.to_string()))?;
    parts.uri = uri;

    let upstream_request = Request::from_parts(parts, body);

    let response = match tokio::time::timeout(
        state.upstream_timeout,
        state.client.request(upstream_request),
    )
    .await
    {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::warn!(route = %route_name, error = %e, "Upstream error");
            metrics::record_request(&method, 502, &route_name, start);
            return Err(ProxyError::BackendUnreachable(e.to_string()));
        }
        Err(_) => {
            tracing::warn!(route = %route_name, "Upstream timeout");
            metrics::record_request(&method, 504, &route_name, start);
            return Err(ProxyError::Timeout);
        }
    };

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    metrics::record_request(&method, parts.status.as_u16(), &route_name, start);

    // Status, remaining headers, and body stream through verbatim.
    Ok(Response::from_parts(parts, Body::new(body)))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}
