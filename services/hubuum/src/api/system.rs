//! System/health API handlers.
//!
//! # Purpose and responsibility
//! Provides unauthenticated endpoints for service metadata and health checks.
//!
//! # Key invariants and assumptions
//! - Health checks must be fast and side-effect free.
//! - System info is derived from in-memory state.
use crate::api::error::{ApiError, api_internal};
use crate::api::types::{HealthStatus, SystemInfo};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/api/system/info",
    tag = "system",
    responses(
        (status = 200, description = "Service identity and storage backend", body = SystemInfo)
    )
)]
pub(crate) async fn system_info(State(state): State<AppState>) -> Json<SystemInfo> {
    Json(SystemInfo {
        service: "hubuum".to_string(),
        api_version: state.api_version.clone(),
        storage_backend: state.store.backend_name().to_string(),
        durable_storage: state.store.is_durable(),
    })
}

#[utoipa::path(
    get,
    path = "/api/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Service health", body = HealthStatus),
        (status = 500, description = "Storage unavailable", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn system_health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, ApiError> {
    if let Err(err) = state.store.health_check().await {
        return Err(api_internal("storage unavailable", &err));
    }
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
    }))
}
