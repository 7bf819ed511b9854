//! HTTP(S) front-end.
//!
//! Accepts `POST /` only, authenticates with an optional bearer key, and
//! hands each body across a one-deep channel to the dispatcher. The
//! channel depth of one is the single-slot discipline: the dispatcher is
//! never asked to serve two requests concurrently, and requests reach it
//! strictly in arrival order. Excess connections park inside
//! `Sender::send` until the slot frees.

use crate::cert::TlsMaterial;
use crate::rpc;
use crate::{Error, Result};
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// How long a connection waits for the dispatcher before a synthesized
/// timeout envelope is returned.
pub const REQUEST_DEADLINE: Duration = Duration::from_secs(30);

const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

pub(crate) const PAUSED_MESSAGE: &str = "Server is paused. Wait 2-3 seconds and retry.";
const TIMEOUT_MESSAGE: &str = "Request timed out after 30 seconds";
const INTERRUPTED_MESSAGE: &str =
    "Request was interrupted before completion. This is recoverable - wait 2-3 seconds and retry.";
const SHUTDOWN_MESSAGE: &str = "Server is shutting down";
const UNAUTHORIZED_MESSAGE: &str = "Invalid or missing API key";

/// One request in flight between a gateway worker and the dispatcher.
pub struct GatewayRequest {
    pub body: String,
    /// Empty reply bytes mean "no response envelope" (notification).
    pub reply: oneshot::Sender<String>,
}

#[derive(Clone)]
struct GatewayState {
    slot: mpsc::Sender<GatewayRequest>,
    api_key: Option<Arc<str>>,
    paused: Arc<AtomicBool>,
}

/// TLS and authentication settings for one gateway instance.
#[derive(Default)]
pub struct GatewayOptions {
    pub api_key: Option<String>,
    pub tls: Option<TlsMaterial>,
}

/// Running gateway: bound address plus shutdown handles.
pub struct GatewayHandle {
    addr: SocketAddr,
    handle: axum_server::Handle,
    task: JoinHandle<std::io::Result<()>>,
}

impl GatewayHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Drain connections and stop serving.
    pub async fn shutdown(self) {
        self.handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        if let Err(e) = self.task.await {
            tracing::debug!(error = %e, "gateway task ended abnormally");
        }
    }
}

/// Whether this build can terminate TLS.
pub fn tls_available() -> bool {
    // The rustls backend is compiled in unconditionally.
    true
}

/// Bind the listening socket. Kept separate from [`start`] so the caller
/// owns the retry policy for ports still held by a previous instance.
pub fn bind(addr: SocketAddr) -> Result<std::net::TcpListener> {
    let listener = std::net::TcpListener::bind(addr)
        .map_err(|e| Error::Gateway(format!("failed to bind {}: {}", addr, e)))?;
    listener
        .set_nonblocking(true)
        .map_err(|e| Error::Gateway(format!("failed to configure listener: {}", e)))?;
    Ok(listener)
}

/// Start serving on an already-bound listener.
pub async fn start(
    listener: std::net::TcpListener,
    options: GatewayOptions,
    paused: Arc<AtomicBool>,
    slot: mpsc::Sender<GatewayRequest>,
) -> Result<GatewayHandle> {
    let addr = listener
        .local_addr()
        .map_err(|e| Error::Gateway(format!("failed to read local address: {}", e)))?;

    let state = GatewayState {
        slot,
        api_key: options.api_key.map(Arc::from),
        paused,
    };

    let app = Router::new()
        .route("/", any(handle_root))
        .fallback(handle_unknown_path)
        .with_state(state);

    let handle = axum_server::Handle::new();
    let task = match options.tls {
        Some(tls) => {
            let config = RustlsConfig::from_pem(tls.cert_pem.into_bytes(), tls.key_pem.into_bytes())
                .await
                .map_err(|e| Error::Gateway(format!("invalid TLS material: {}", e)))?;
            tokio::spawn(
                axum_server::from_tcp_rustls(listener, config)
                    .handle(handle.clone())
                    .serve(app.into_make_service()),
            )
        }
        None => tokio::spawn(
            axum_server::from_tcp(listener)
                .handle(handle.clone())
                .serve(app.into_make_service()),
        ),
    };

    tracing::info!(%addr, tls = tls_available(), "gateway listening");
    Ok(GatewayHandle { addr, handle, task })
}

async fn handle_root(
    State(state): State<GatewayState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        respond(StatusCode::NO_CONTENT, None)
    } else if method == Method::POST {
        handle_rpc(state, headers, body).await
    } else {
        respond(StatusCode::METHOD_NOT_ALLOWED, None)
    }
}

async fn handle_unknown_path() -> Response {
    respond(StatusCode::NOT_FOUND, None)
}

async fn handle_rpc(state: GatewayState, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(expected) = &state.api_key {
        let supplied = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if !crate::auth::check_bearer(supplied, expected) {
            let envelope =
                rpc::error(&rpc::RequestId::null(), rpc::INVALID_REQUEST, UNAUTHORIZED_MESSAGE);
            return respond(StatusCode::UNAUTHORIZED, Some(envelope));
        }
    }

    let body = match String::from_utf8(body.to_vec()) {
        Ok(body) => body,
        Err(_) => {
            let envelope = rpc::error(
                &rpc::RequestId::null(),
                rpc::PARSE_ERROR,
                "Parse error: request body is not valid UTF-8",
            );
            return respond(StatusCode::OK, Some(envelope));
        }
    };

    if state.paused.load(Ordering::SeqCst) {
        let envelope = rpc::error(&rpc::peek_id(&body), rpc::INTERNAL_ERROR, PAUSED_MESSAGE);
        return respond(StatusCode::OK, Some(envelope));
    }

    let id = rpc::peek_id(&body);
    let (reply_tx, reply_rx) = oneshot::channel();
    let request = GatewayRequest {
        body,
        reply: reply_tx,
    };

    if state.slot.send(request).await.is_err() {
        let envelope = rpc::error(&id, rpc::INTERNAL_ERROR, SHUTDOWN_MESSAGE);
        return respond(StatusCode::OK, Some(envelope));
    }

    match tokio::time::timeout(REQUEST_DEADLINE, reply_rx).await {
        Ok(Ok(response)) if response.is_empty() => respond(StatusCode::NO_CONTENT, None),
        Ok(Ok(response)) => respond(StatusCode::OK, Some(response)),
        Ok(Err(_)) => {
            // Dispatcher dropped the reply slot without answering.
            let envelope = rpc::error(&id, rpc::INTERNAL_ERROR, INTERRUPTED_MESSAGE);
            respond(StatusCode::OK, Some(envelope))
        }
        Err(_) => {
            // The handler may still complete; its late reply lands in a
            // dropped receiver and is discarded.
            let envelope = rpc::error(&rpc::RequestId::null(), rpc::INTERNAL_ERROR, TIMEOUT_MESSAGE);
            respond(StatusCode::OK, Some(envelope))
        }
    }
}

fn respond(status: StatusCode, body: Option<String>) -> Response {
    let mut builder = Response::builder()
        .status(status)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS")
        .header(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            "Content-Type, Authorization",
        );
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    builder
        .body(Body::from(body.unwrap_or_default()))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
