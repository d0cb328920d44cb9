//! Introspection handlers: what the engine decided for the calling request.

use axum::extract::{Json, State};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use platform_core::error::AppError;

use crate::middleware::Authorized;
use crate::services::Policy;
use crate::AppState;

/// The enriched request context, as downstream collaborators see it.
#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub subject_id: Uuid,
    pub effective_roles: Vec<String>,
}

/// Roles and identity resolved for the calling request.
///
/// GET /authz/context
pub async fn get_context(Authorized(context): Authorized) -> Json<ContextResponse> {
    Json(ContextResponse {
        subject_id: context.subject_id,
        effective_roles: context.effective_roles,
    })
}

/// Ad-hoc policy check request.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub required_roles: Vec<String>,
    #[serde(default)]
    pub require_all: bool,
    #[serde(default = "default_allow_admin_override")]
    pub allow_admin_override: bool,
}

fn default_allow_admin_override() -> bool {
    true
}

/// Verdict for an ad-hoc check.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub required_roles: Vec<String>,
    pub require_all: bool,
    pub effective_roles: Vec<String>,
}

/// Evaluate a caller-supplied policy against the caller's own roles.
///
/// Lets collaborating services ask for a verdict without duplicating the
/// evaluation rules. An empty required-role set is the caller attempting
/// to build an unsatisfiable policy and is rejected outright.
///
/// POST /authz/check
pub async fn check(
    State(state): State<AppState>,
    Authorized(context): Authorized,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, AppError> {
    let policy = Policy::new(req.required_roles, req.require_all)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;
    let policy = if req.allow_admin_override {
        policy
    } else {
        policy.without_admin_override()
    };

    let held: HashSet<String> = context.effective_roles.iter().cloned().collect();
    let allowed = policy.evaluate(&held, state.engine.admin_role());

    Ok(Json(CheckResponse {
        allowed,
        required_roles: policy.required_roles().to_vec(),
        require_all: policy.require_all(),
        effective_roles: context.effective_roles,
    }))
}
