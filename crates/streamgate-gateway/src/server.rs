//! Axum-based HTTP gateway server.
//!
//! [`GatewayServer`] wires the activation gate, the live revision's filter
//! pipeline and the stream backend into two axum services: the public proxy
//! and the admin surface, each on its own listener.
//!
//! # Public endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness check, always `200 OK`. |
//! | `ANY`  | `/*` | Matched against the live route table. |

use crate::activation::{ActivationGate, Revision};
use crate::backend::StreamBackend;
use crate::error::{ProxyError, ProxyResult};
use crate::handlers::{admin, health};
use crate::settings::ServerSettings;
use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use streamgate_kernel::{
    FilterAction, GatewayContext, HttpMethod, InboundRequest, ProxyReply, RouteLookupError,
    shape_response,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// ─────────────────────────────────────────────────────────────────────────────
// Shared application state
// ─────────────────────────────────────────────────────────────────────────────

/// State injected into the proxy handler.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<ActivationGate>,
    pub backend: Arc<dyn StreamBackend>,
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

pub struct GatewayServer {
    settings: ServerSettings,
    gate: Arc<ActivationGate>,
    backend: Arc<dyn StreamBackend>,
}

impl GatewayServer {
    /// A server with a freshly provisioned gate and nothing live.
    pub fn new(settings: ServerSettings, backend: Arc<dyn StreamBackend>) -> Self {
        Self {
            settings,
            gate: Arc::new(ActivationGate::new()),
            backend,
        }
    }

    pub fn gate(&self) -> Arc<ActivationGate> {
        Arc::clone(&self.gate)
    }

    /// The public proxy service.
    pub fn public_router(&self) -> Router {
        let state = AppState {
            gate: self.gate(),
            backend: Arc::clone(&self.backend),
        };
        Router::new()
            .route("/health", get(health::health))
            .fallback(proxy_handler)
            .with_state(state)
    }

    /// The admin service: staging, deployment and inspection.
    pub fn admin_router(&self) -> Router {
        admin::admin_router(self.gate(), self.settings.admin_token.clone())
    }

    /// Bind both listeners and serve until either fails.
    pub async fn start(self) -> std::io::Result<()> {
        let public = self.public_router().layer(TraceLayer::new_for_http());
        let admin = self.admin_router().layer(TraceLayer::new_for_http());

        let public_listener = tokio::net::TcpListener::bind(&self.settings.listen).await?;
        let admin_listener = tokio::net::TcpListener::bind(&self.settings.admin_listen).await?;
        info!(
            listen = %self.settings.listen,
            admin_listen = %self.settings.admin_listen,
            backend = self.backend.name(),
            "streamgate starting"
        );
        if self.settings.admin_token.is_none() {
            warn!("admin surface has no token configured; bind it to a private address");
        }

        tokio::try_join!(
            async { axum::serve(public_listener, public).await },
            async { axum::serve(admin_listener, admin).await },
        )?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Proxy handler
// ─────────────────────────────────────────────────────────────────────────────

/// Route, filter, validate, transform, call the backend, shape the reply.
async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let path = uri.path().to_string();

    let Some(revision) = state.gate.live().await else {
        debug!(request_id = %request_id, path = %path, "no deployed revision");
        return error_response(ProxyError::RouteNotFound(path), &request_id);
    };

    let Some(http_method) = axum_method_to_kernel(&method) else {
        let allowed = revision.table.methods_for(&path);
        if allowed.is_empty() {
            return error_response(ProxyError::RouteNotFound(path), &request_id);
        }
        return error_response(ProxyError::MethodNotAllowed(allowed), &request_id);
    };

    let route_match = match revision.table.resolve(http_method, &path) {
        Ok(m) => m,
        Err(RouteLookupError::NotFound) => {
            debug!(request_id = %request_id, path = %path, "no route matched");
            return error_response(ProxyError::RouteNotFound(path), &request_id);
        }
        Err(RouteLookupError::MethodNotAllowed(allowed)) => {
            return error_response(ProxyError::MethodNotAllowed(allowed), &request_id);
        }
    };

    let mut req = InboundRequest::new(&request_id, http_method, &path).with_body(body.to_vec());
    req.query = query;
    for (name, value) in &headers {
        if let Ok(v) = value.to_str() {
            req = req.with_header(name.as_str(), v);
        }
    }
    let mut ctx = GatewayContext::new(req).with_route(route_match);

    let mut reply = match revision.pipeline.run_request(&mut ctx).await {
        Ok(FilterAction::Reject(status, msg)) => ProxyError::from_rejection(status, msg).to_reply(),
        // FilterAction is #[non_exhaustive]; anything but a rejection proceeds.
        Ok(_) => dispatch(&state, &revision, &ctx)
            .await
            .unwrap_or_else(|e| {
                debug!(request_id = %request_id, error = %e, "request failed");
                e.to_reply()
            }),
        Err(e) => ProxyError::Internal(e.to_string()).to_reply(),
    };

    if let Err(err) = revision.pipeline.run_response(&ctx, &mut reply).await {
        warn!(
            request_id = %request_id,
            error = %err,
            "response filter pipeline error (reply still returned)"
        );
    }

    reply_response(reply, &request_id)
}

async fn dispatch(state: &AppState, revision: &Revision, ctx: &GatewayContext) -> ProxyResult<ProxyReply> {
    let route_match = ctx
        .route_match
        .as_ref()
        .ok_or_else(|| ProxyError::Internal("request reached dispatch unrouted".to_string()))?;

    let call = revision.config.transformer.transform(route_match, &ctx.request)?;

    let timeout_ms = route_match.route.timeout_ms;
    let resp = tokio::time::timeout(Duration::from_millis(timeout_ms), state.backend.invoke(&call))
        .await
        .map_err(|_| ProxyError::Timeout(timeout_ms))??;

    Ok(shape_response(resp))
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Convert an axum [`Method`] to the kernel [`HttpMethod`].
fn axum_method_to_kernel(m: &Method) -> Option<HttpMethod> {
    HttpMethod::from_str_ci(m.as_str())
}

fn with_request_id(mut resp: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        resp.headers_mut().insert(HeaderName::from_static(REQUEST_ID_HEADER), v);
    }
    resp
}

fn reply_response(reply: ProxyReply, request_id: &str) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut resp = (status, reply.body).into_response();
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(reply.content_type));
    with_request_id(resp, request_id)
}

fn error_response(err: ProxyError, request_id: &str) -> Response {
    let allow = match &err {
        ProxyError::MethodNotAllowed(methods) if !methods.is_empty() => Some(
            methods
                .iter()
                .map(HttpMethod::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        _ => None,
    };
    let mut resp = with_request_id(err.into_response(), request_id);
    if let Some(v) = allow.and_then(|a| HeaderValue::from_str(&a).ok()) {
        resp.headers_mut().insert(header::ALLOW, v);
    }
    resp
}
