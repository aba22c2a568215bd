//! Hubuum HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
use crate::api;
use crate::auth::session;
use crate::observability;
use crate::store::HubuumStore;
use axum::Router;
use axum::routing::{get, post};
use hubuum_authz::ResourceKind;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Clone)]
pub struct AppState {
    pub api_version: String,
    pub store: Arc<dyn HubuumStore>,
    pub token_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(store: Arc<dyn HubuumStore>, token_ttl: chrono::Duration) -> Self {
        Self {
            api_version: "v1".to_string(),
            store,
            token_ttl,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    let mut router = Router::new()
        .route("/api/system/info", get(api::system::system_info))
        .route("/api/system/health", get(api::system::system_health))
        .route("/api/openapi.json", get(api::openapi::openapi_json))
        .route("/api/auth/login", post(session::login))
        .route("/api/auth/logout", post(session::logout))
        .route("/api/auth/logoutall", post(session::logout_all))
        .route(
            "/api/v1/namespaces",
            get(api::namespaces::list_namespaces).post(api::namespaces::create_namespace),
        )
        .route(
            "/api/v1/namespaces/:val",
            get(api::namespaces::get_namespace)
                .put(api::namespaces::put_namespace)
                .patch(api::namespaces::patch_namespace)
                .delete(api::namespaces::delete_namespace),
        )
        .route(
            "/api/v1/namespaces/:val/groups",
            get(api::grants::list_namespace_groups),
        )
        .route(
            "/api/v1/namespaces/:val/groups/:group",
            get(api::grants::get_grant)
                .post(api::grants::create_grant)
                .patch(api::method_not_allowed)
                .delete(api::grants::delete_grant),
        )
        .route(
            "/api/v1/permissions",
            get(api::permissions::list_permissions).post(api::permissions::create_permission),
        )
        .route(
            "/api/v1/permissions/:id",
            get(api::permissions::get_permission)
                .patch(api::method_not_allowed)
                .delete(api::permissions::delete_permission),
        )
        .route(
            "/api/v1/users",
            get(api::users::list_users).post(api::users::create_user),
        )
        .route(
            "/api/v1/users/:val",
            get(api::users::get_user)
                .patch(api::users::patch_user)
                .delete(api::users::delete_user),
        )
        .route(
            "/api/v1/groups",
            get(api::groups::list_groups).post(api::groups::create_group),
        )
        .route(
            "/api/v1/groups/:val",
            get(api::groups::get_group)
                .patch(api::groups::patch_group)
                .delete(api::groups::delete_group),
        )
        .route(
            "/api/v1/groups/:val/members/:user",
            get(api::groups::get_member)
                .post(api::groups::add_member)
                .delete(api::groups::remove_member),
        );
    for kind in ResourceKind::INVENTORY {
        router = router.merge(api::resources::routes(kind));
    }

    router.layer(trace_layer).with_state(state)
}
