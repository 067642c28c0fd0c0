//! REST API handlers.
//!
//! Each handler calls one `Broker` verb and returns JSON. Failures carry
//! `{"error": <kind>, "description": <message>}`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::warn;

use tenantdb_lifecycle::{
    BindOutcome, BindRequest, BrokerError, ControlPlaneError, ProvisionOutcome, ProvisionRequest,
};

use crate::ApiState;

fn error_response(kind: &str, msg: &str, status: StatusCode) -> impl IntoResponse {
    (status, Json(json!({ "error": kind, "description": msg })))
}

fn status_for(err: &BrokerError) -> StatusCode {
    match err {
        BrokerError::PlanUnsupported(_)
        | BrokerError::ClusterNotFound(_)
        | BrokerError::MissingParameter(_)
        | BrokerError::InvalidParameter(_)
        | BrokerError::ControlPlane(ControlPlaneError::InvalidName(_)) => StatusCode::BAD_REQUEST,
        BrokerError::InstanceAlreadyExists(_) | BrokerError::BindingAlreadyExists(_) => {
            StatusCode::CONFLICT
        }
        BrokerError::InstanceNotFound(_) | BrokerError::BindingNotFound(_) => StatusCode::NOT_FOUND,
        BrokerError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
        BrokerError::ControlPlane(ControlPlaneError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        BrokerError::ControlPlane(ControlPlaneError::Api { .. })
        | BrokerError::ControlPlane(ControlPlaneError::Connection(_)) => StatusCode::BAD_GATEWAY,
        BrokerError::ClusterConfig(_) | BrokerError::Store(_) | BrokerError::ControlPlane(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn broker_error(err: &BrokerError) -> axum::response::Response {
    let status = status_for(err);
    if status.is_server_error() {
        warn!(kind = err.kind(), error = %err, "request failed");
    }
    error_response(err.kind(), &err.to_string(), status).into_response()
}

/// Deletes answer 410 when there is nothing to delete.
fn gone_or_error(err: &BrokerError) -> axum::response::Response {
    match err {
        BrokerError::InstanceNotFound(_) | BrokerError::BindingNotFound(_) => {
            (StatusCode::GONE, Json(json!({}))).into_response()
        }
        _ => broker_error(err),
    }
}

fn bad_body(rejection: JsonRejection) -> axum::response::Response {
    error_response("BadRequest", &rejection.body_text(), StatusCode::BAD_REQUEST).into_response()
}

// ── Catalog ────────────────────────────────────────────────────

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /v2/catalog
pub async fn catalog(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.broker.catalog().clone())
}

// ── Instances ──────────────────────────────────────────────────

/// PUT /v2/service_instances/{instance_id}
pub async fn provision(
    State(state): State<ApiState>,
    Path(instance_id): Path<String>,
    body: Result<Json<ProvisionRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };

    match state.broker.provision(&instance_id, request).await {
        Ok(ProvisionOutcome::Created { operation }) => (
            StatusCode::CREATED,
            Json(json!({ "operation": operation })),
        )
            .into_response(),
        Ok(ProvisionOutcome::IdenticalAlreadyExists) => {
            (StatusCode::OK, Json(json!({}))).into_response()
        }
        Err(e) => broker_error(&e),
    }
}

/// GET /v2/service_instances/{instance_id}
pub async fn fetch_instance(
    State(state): State<ApiState>,
    Path(instance_id): Path<String>,
) -> impl IntoResponse {
    match state.broker.fetch_instance(&instance_id) {
        Ok(view) => Json(view).into_response(),
        Err(e) => broker_error(&e),
    }
}

/// PATCH /v2/service_instances/{instance_id}
pub async fn update(
    State(state): State<ApiState>,
    Path(instance_id): Path<String>,
) -> impl IntoResponse {
    match state.broker.update(&instance_id) {
        Ok(()) => Json(json!({})).into_response(),
        Err(e) => broker_error(&e),
    }
}

/// DELETE /v2/service_instances/{instance_id}
pub async fn deprovision(
    State(state): State<ApiState>,
    Path(instance_id): Path<String>,
) -> impl IntoResponse {
    match state.broker.deprovision(&instance_id) {
        Ok(_) => Json(json!({})).into_response(),
        Err(e) => gone_or_error(&e),
    }
}

/// GET /v2/service_instances/{instance_id}/last_operation
pub async fn last_operation(
    State(state): State<ApiState>,
    Path(instance_id): Path<String>,
) -> impl IntoResponse {
    match state.broker.last_operation(&instance_id) {
        Ok(()) => Json(json!({ "state": "succeeded" })).into_response(),
        Err(e) => broker_error(&e),
    }
}

// ── Bindings ───────────────────────────────────────────────────

/// PUT /v2/service_instances/{instance_id}/service_bindings/{binding_id}
pub async fn bind(
    State(state): State<ApiState>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    body: Result<Json<BindRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };

    match state.broker.bind(&instance_id, &binding_id, request).await {
        Ok(BindOutcome::Bound { credentials }) => (
            StatusCode::CREATED,
            Json(json!({ "credentials": credentials })),
        )
            .into_response(),
        Ok(BindOutcome::IdenticalAlreadyExists) => {
            (StatusCode::OK, Json(json!({}))).into_response()
        }
        Err(e) => broker_error(&e),
    }
}

/// DELETE /v2/service_instances/{instance_id}/service_bindings/{binding_id}
pub async fn unbind(
    State(state): State<ApiState>,
    Path((instance_id, binding_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.broker.unbind(&instance_id, &binding_id).await {
        Ok(()) => Json(json!({})).into_response(),
        Err(e) => gone_or_error(&e),
    }
}
