pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::{
    http::Method,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use platform_core::error::AppError;
use platform_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AuthzConfig;
use crate::services::{AuthzEngine, Policy, PolicyBindings, PolicyError, PrincipalStore};

#[derive(Clone)]
pub struct AppState {
    pub config: AuthzConfig,
    pub engine: AuthzEngine,
    pub store: Arc<dyn PrincipalStore>,
    pub bindings: Arc<PolicyBindings>,
}

/// Policy table for this service's own routes, declared next to the route
/// registration below so binding and registration read together.
///
/// `/authz/context` and `/authz/check` stay unbound: any verified
/// principal may introspect itself. The per-principal inspection route is
/// for administrators.
pub fn service_policy_bindings(admin_role: &str) -> Result<PolicyBindings, PolicyError> {
    Ok(PolicyBindings::builder()
        .bind(
            Method::GET,
            "/authz/principals/:principal_id/roles",
            Policy::any([admin_role])?,
        )
        .build())
}

pub fn build_router(state: AppState) -> Router {
    // Everything under the authorization middleware requires a verified
    // identity; bound operations additionally require their policy.
    let protected = Router::new()
        .route("/authz/context", get(handlers::context::get_context))
        .route("/authz/check", post(handlers::context::check))
        .route(
            "/authz/principals/:principal_id/roles",
            get(handlers::principal::get_principal_roles),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::authorize_middleware,
        ));

    let cors_origins: Vec<axum::http::HeaderValue> = state
        .config
        .security
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", origin, e);
                None
            }
        })
        .collect();

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(cors_origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ]),
        )
}

/// Service health check
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        e
    })?;

    Ok(axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": "up"
        }
    })))
}
