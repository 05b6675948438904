//! Admin surface.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/admin/config` | Validate and stage a configuration. |
//! | `POST` | `/admin/deployments` | Promote the staged revision to live. |
//! | `GET`  | `/admin/deployments` | Deployment history. |
//! | `GET`  | `/admin/outputs` | Gateway identifiers, role and policy names. |
//! | `GET`  | `/admin/policy` | Execution role and policies of the staged revision. |
//! | `GET`  | `/admin/routes` | Routes of the live revision. |
//!
//! `/admin/policy` answers for the most recently applied configuration,
//! deployed or not, and reports both revision numbers.  The permission
//! policy is returned as the exact document string that would be attached.
//!
//! When an admin token is configured every request must carry it in the
//! `Authorization` header, with or without a `Bearer ` prefix.

use crate::activation::ActivationGate;
use crate::error::{ProxyError, ProxyResult};
use crate::filter::bearer_token;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use streamgate_kernel::ProxyConfig;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AdminState {
    gate: Arc<ActivationGate>,
    admin_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeployRequest {
    description: Option<String>,
}

pub fn admin_router(gate: Arc<ActivationGate>, admin_token: Option<String>) -> Router {
    let state = AdminState { gate, admin_token };
    Router::new()
        .route("/admin/config", post(apply_config))
        .route("/admin/deployments", post(create_deployment).get(list_deployments))
        .route("/admin/outputs", get(outputs))
        .route("/admin/policy", get(policy))
        .route("/admin/routes", get(routes))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin_token))
        .with_state(state)
}

async fn require_admin_token(State(state): State<AdminState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.admin_token.as_deref() else {
        return next.run(req).await;
    };
    let accepted = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(bearer_token)
        .is_some_and(|token| bool::from(token.as_bytes().ct_eq(expected.as_bytes())));
    if accepted {
        next.run(req).await
    } else {
        warn!(path = %req.uri().path(), "admin request rejected");
        ProxyError::Unauthorized("admin token required".to_string()).into_response()
    }
}

/// POST /admin/config
async fn apply_config(
    State(state): State<AdminState>,
    Json(config): Json<ProxyConfig>,
) -> ProxyResult<impl IntoResponse> {
    let revision = state.gate.apply(&config).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "staged_revision": revision, "live": false })),
    ))
}

/// POST /admin/deployments
///
/// The body is optional: `{"description": "..."}`.
async fn create_deployment(State(state): State<AdminState>, body: Bytes) -> ProxyResult<impl IntoResponse> {
    let request: DeployRequest = if body.is_empty() {
        DeployRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ProxyError::InvalidRequest(e.to_string()))?
    };
    let deployment = state.gate.deploy(request.description).await?;
    info!(deployment = %deployment.id, "deployment created via admin api");
    Ok((StatusCode::CREATED, Json(deployment)))
}

/// GET /admin/deployments
async fn list_deployments(State(state): State<AdminState>) -> impl IntoResponse {
    Json(json!({ "deployments": state.gate.deployments().await }))
}

/// GET /admin/outputs
async fn outputs(State(state): State<AdminState>) -> impl IntoResponse {
    Json(state.gate.outputs().await)
}

/// GET /admin/policy
async fn policy(State(state): State<AdminState>) -> ProxyResult<Json<Value>> {
    let revision = state.gate.staged().await.ok_or(ProxyError::NothingStaged)?;
    let live_revision = state.gate.live().await.map(|live| live.number);
    let role = &revision.config.execution_role;
    Ok(Json(json!({
        "staged_revision": revision.number,
        "live_revision": live_revision,
        "role_name": role.name,
        "policy_name": role.policy_name,
        "custom": role.policy.is_custom(),
        "assume_role_policy": role.assume_role_policy(),
        "policy_document": role.policy.document_json(),
    })))
}

/// GET /admin/routes
async fn routes(State(state): State<AdminState>) -> impl IntoResponse {
    match state.gate.live().await {
        Some(revision) => Json(json!({
            "revision": revision.number,
            "routes": revision.table.routes(),
        })),
        None => Json(json!({ "revision": null, "routes": [] })),
    }
}
