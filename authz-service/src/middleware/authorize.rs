//! Request authorization middleware.
//!
//! Runs the engine for every request passing through it: establishes the
//! caller's identity, evaluates the policy bound to the matched operation
//! (if any), and attaches the resolved context for downstream handlers.

use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use platform_core::error::AppError;

use crate::services::{AuthContext, AuthzError, TokenError};
use crate::AppState;

pub async fn authorize_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Operation identity is the matched route template, not the concrete
    // path, so bindings survive path parameters.
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().clone();

    let policy = state.bindings.lookup(&method, &route);

    match state.engine.authorize(req.headers(), policy).await {
        Ok(context) => {
            req.extensions_mut().insert(context);
            Ok(next.run(req).await)
        }
        Err(err) => {
            log_denial(&err, &method, &route);
            Err(err.into())
        }
    }
}

/// One structured event per denial, keyed by the classification. The
/// response body stays opaque; this record is where the detail lives.
fn log_denial(err: &AuthzError, method: &axum::http::Method, route: &str) {
    match err {
        AuthzError::Store(store_err) => {
            tracing::error!(
                class = err.class(),
                method = %method,
                route = %route,
                error = %store_err,
                "Authorization aborted by store failure"
            );
        }
        AuthzError::InsufficientRoles {
            required,
            require_all,
            actual,
        } => {
            tracing::warn!(
                class = err.class(),
                method = %method,
                route = %route,
                required = ?required,
                require_all = *require_all,
                actual = ?actual,
                "Request denied"
            );
        }
        AuthzError::TokenInvalid(TokenError::Expired { expired_at }) => {
            tracing::warn!(
                class = err.class(),
                method = %method,
                route = %route,
                expired_at = %expired_at,
                "Request denied"
            );
        }
        AuthzError::PrincipalNotFound { subject_id } => {
            tracing::warn!(
                class = err.class(),
                method = %method,
                route = %route,
                subject_id = %subject_id,
                "Request denied"
            );
        }
        _ => {
            tracing::warn!(
                class = err.class(),
                method = %method,
                route = %route,
                "Request denied"
            );
        }
    }
}

/// Extractor handing handlers the context attached by the middleware.
pub struct Authorized(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Authorized
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts.extensions.get::<AuthContext>().cloned().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Authorization context missing from request extensions"
            ))
        })?;

        Ok(Authorized(context))
    }
}
